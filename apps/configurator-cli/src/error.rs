//! The top-level error context this binary reports failures under.

use std::fmt;

#[derive(Debug)]
pub struct CliError;

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("configurator-cli failed")
    }
}

impl error_stack::Context for CliError {}
