//! Terminal front end for the tempest client engine.

pub mod app;
pub mod cli;
pub mod console;
pub mod endpoint;
pub mod error;
pub mod host;
pub mod logging;
pub mod output;

pub use cli::Cli;
pub use error::{CliError, Result};
