//! Gavel command-line client.
//!
//! Lists auctions, follows one auction live, places bids and manages the
//! account session from the terminal.

pub mod args;
pub mod commands;
pub mod config;
pub mod render;

pub use args::{Args, Command};
pub use commands::App;
pub use config::{CliConfig, ConfigError};
