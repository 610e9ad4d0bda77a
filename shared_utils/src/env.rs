//! Environment variable access with structured errors.
//!
//! Adapter credentials (API keys for dealership inventory feeds) come from
//! the environment; a missing variable should name itself instead of
//! surfacing as a bare `VarError`.

use snafu::prelude::*;

/// An environment variable required by the application is not set.
#[derive(Debug, Snafu)]
#[snafu(display("Missing environment variable '{name}'"))]
#[snafu(visibility(pub))]
pub struct MissingEnvVarError {
    /// The variable that was looked up.
    pub name: String,
    source: std::env::VarError,
    backtrace: snafu::Backtrace,
}

/// Reads an environment variable, naming it in the error when absent.
pub fn get_env_var(name: &str) -> Result<String, MissingEnvVarError> {
    std::env::var(name).context(MissingEnvVarSnafu {
        name: name.to_string(),
    })
}
