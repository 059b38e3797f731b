//! dirt library: exposes modules for integration tests.

pub mod commands;
pub mod config;
pub mod discovery;
pub mod environment;
pub mod error;
pub mod framework;
pub mod git;
pub mod migrate;
pub mod mysql;
pub mod output;
pub mod profile;
pub mod project;
pub mod prompt;
pub mod remote;
pub mod repository;
pub mod runner;
pub mod sync;
pub mod template;
pub mod terminal;
pub mod transport;

#[cfg(test)]
pub mod test_support;
