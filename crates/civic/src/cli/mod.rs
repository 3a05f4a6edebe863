//! Command-line interface module.
//!
//! This module provides the CLI structure and command handlers for the civic binary.

mod ask;
mod commands;
mod status;

pub use ask::run_ask;
pub use commands::{Cli, Commands};
pub use status::{show_config, show_status};
