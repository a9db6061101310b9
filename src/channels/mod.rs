//! Embedding channels for the assistant core.

pub mod cli;

pub use cli::CliChannel;
