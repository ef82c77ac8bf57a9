//! CLI error types

use std::path::PathBuf;
use thiserror::Error;

use crate::error::ModelError;

/// Errors reported by the command line front end
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to read {0}: {1}")]
    FileReadError(PathBuf, String),

    #[error("Failed to load configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Compile(#[from] ModelError),
}

impl CliError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::InvalidArgument(_) | CliError::Config(_) => 2,
            CliError::FileReadError(..) => 3,
            CliError::Compile(_) => 1,
        }
    }
}
