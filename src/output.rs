//! Human-readable progress lines on stderr.

use crate::error::Result;

/// Runs `f` as a named step, printing `label... ` before and `OK` or `failed`
/// after. The label is printed before any error is returned, so a failure is
/// always attributed to the step that caused it.
pub fn step<T>(label: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    eprint!("{label}... ");
    match f() {
        Ok(value) => {
            eprintln!("OK");
            Ok(value)
        }
        Err(e) => {
            eprintln!("failed");
            Err(e)
        }
    }
}
