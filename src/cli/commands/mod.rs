//! CLI command handlers

pub mod compile;

pub use compile::{CompileArgs, handle_compile};
