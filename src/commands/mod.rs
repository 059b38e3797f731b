//! Implementations of each CLI subcommand.

pub mod apply;
pub mod branch;
pub mod create;
pub mod deploy;
pub mod seed;
pub mod transfer;
