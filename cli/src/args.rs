//! Command-line arguments.

use clap::{Parser, Subcommand};
use gavel_sdk::client::config::DEFAULT_BASE_URL;
use gavel_sdk::ws::config::DEFAULT_HUB_URL;

use crate::config::CliConfig;

/// Gavel command-line client.
#[derive(Parser, Debug)]
#[command(
    name = "gavel",
    about = "command-line client for the gavel auction marketplace",
    version
)]
pub struct Args {
    /// REST API base URL
    #[arg(long, env = "GAVEL_API_URL", default_value = DEFAULT_BASE_URL)]
    pub api_url: String,

    /// Auction hub URL
    #[arg(long, env = "GAVEL_HUB_URL", default_value = DEFAULT_HUB_URL)]
    pub hub_url: String,

    /// Access token from `gavel login`
    #[arg(long, env = "GAVEL_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value = "30")]
    pub timeout: u64,

    /// Do not re-fetch the auction after the live channel reconnects
    #[arg(long)]
    pub no_resync: bool,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List auctions with their current prices
    List,

    /// Follow one auction live until Ctrl+C
    Watch {
        /// Auction identifier
        auction_id: String,
    },

    /// Place a bid
    Bid {
        /// Auction identifier
        auction_id: String,

        /// Bidder name shown to other participants
        #[arg(long)]
        name: String,

        /// Bid amount in dollars
        #[arg(long)]
        amount: String,
    },

    /// Log in and print the access token
    Login {
        /// Account email
        #[arg(long)]
        email: String,

        /// Account password
        #[arg(long, env = "GAVEL_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create an account
    Register {
        /// First name
        #[arg(long)]
        first_name: String,

        /// Last name
        #[arg(long)]
        last_name: String,

        /// Account email
        #[arg(long)]
        email: String,

        /// Password (at least 6 characters)
        #[arg(long)]
        password: String,

        /// Password again
        #[arg(long)]
        confirm_password: String,
    },
}

impl Args {
    /// Builds the configuration from the parsed arguments.
    #[must_use]
    pub fn config(&self) -> CliConfig {
        CliConfig::default()
            .with_urls(self.api_url.clone(), self.hub_url.clone())
            .with_token(self.token.clone())
            .with_timeout_secs(self.timeout)
            .with_resync_on_reconnect(!self.no_resync)
    }
}
