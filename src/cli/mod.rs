//! CLI module for the data-model-compiler binary

pub mod commands;
pub mod error;
pub mod output;

pub use error::CliError;
