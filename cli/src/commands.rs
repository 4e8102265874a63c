//! Command implementations.

use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use gavel_sdk::form::{bid_failure_message, suggested_minimum, BID_PLACED_MESSAGE};
use gavel_sdk::format::format_currency;
use gavel_sdk::{
    AuctionId, AuctionSnapshot, AuctionView, AuthSession, BidForm, ClientError, CredentialProvider, GavelClient,
    LiveBidChannel, LoginRequest, RegisterRequest, SessionCredentials, SharedAuctionSource,
    SharedCredentials, WsHubConnector,
};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::args::Command;
use crate::config::CliConfig;
use crate::render;

/// Message shown after a successful registration.
pub const ACCOUNT_CREATED_MESSAGE: &str = "Account created. You can now log in.";

/// Runs commands against one backend.
#[derive(Debug)]
pub struct App {
    config: CliConfig,
    client: Arc<GavelClient>,
    credentials: Arc<SessionCredentials>,
}

/// User-facing text for a client error.
#[must_use]
pub fn user_message(error: &ClientError) -> String {
    match error {
        ClientError::Validation(message) => message.clone(),
        other => other.to_string(),
    }
}

/// Line for the snapshot the receiver already holds.
///
/// A load that completed before `subscribe` is marked seen and would not
/// wake `changed()`.
fn current_snapshot_line(
    snapshots: &mut watch::Receiver<Option<AuctionSnapshot>>,
) -> Option<String> {
    let current = snapshots.borrow_and_update().clone();
    current.map(|snapshot| render::snapshot_line(&snapshot))
}

impl App {
    /// Creates the app.
    ///
    /// # Errors
    ///
    /// Returns an error if the REST client cannot be built.
    pub fn new(config: CliConfig) -> Result<Self> {
        let credentials = Arc::new(SessionCredentials::new());
        if let Some(token) = &config.token {
            credentials.sign_in(AuthSession {
                token: token.clone(),
                display_name: None,
            });
        }

        let client = GavelClient::new(config.client_config())
            .context("failed to build REST client")?
            .with_credentials(Arc::clone(&credentials) as SharedCredentials);

        Ok(Self {
            config,
            client: Arc::new(client),
            credentials,
        })
    }

    /// Runs one command.
    ///
    /// # Errors
    ///
    /// Returns a user-facing error if the command fails.
    pub async fn run(&self, command: Command) -> Result<()> {
        match command {
            Command::List => self.list().await,
            Command::Watch { auction_id } => self.watch(&auction_id).await,
            Command::Bid {
                auction_id,
                name,
                amount,
            } => self.bid(&auction_id, name, amount).await,
            Command::Login { email, password } => self.login(email, password).await,
            Command::Register {
                first_name,
                last_name,
                email,
                password,
                confirm_password,
            } => {
                self.register(RegisterRequest {
                    first_name,
                    last_name,
                    email,
                    password,
                    confirm_password,
                })
                .await
            }
        }
    }

    async fn list(&self) -> Result<()> {
        let auctions = self
            .client
            .list_auctions()
            .await
            .map_err(|e| anyhow!(user_message(&e)))?;
        debug!(count = auctions.len(), "auctions listed");
        println!("{}", render::auction_table(&auctions));
        Ok(())
    }

    async fn watch(&self, auction_id: &str) -> Result<()> {
        let auction_id = AuctionId::new(auction_id)?;
        let hub = self.config.hub_config();
        let connector = WsHubConnector::new(hub.clone())?
            .with_credentials(Arc::clone(&self.credentials) as SharedCredentials);
        let channel = LiveBidChannel::new(Arc::new(connector), hub);
        let source: SharedAuctionSource = Arc::clone(&self.client) as SharedAuctionSource;

        let mut view = AuctionView::new(source, channel);
        let store = view.bind(auction_id.clone()).await;
        let mut snapshots = store.subscribe();
        let mut states = view
            .subscribe_connection_state()
            .context("view lost its binding")?;
        let mut phase = view
            .subscribe_load_phase()
            .context("view lost its binding")?;

        info!(auction = %auction_id, "watching auction, press Ctrl+C to stop");
        if let Some(line) = current_snapshot_line(&mut snapshots) {
            println!("{}", line);
        }
        let outcome = loop {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    break result.context("failed to listen for Ctrl+C");
                }
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        break Ok(());
                    }
                    let snapshot = snapshots.borrow_and_update().clone();
                    if let Some(snapshot) = snapshot {
                        println!("{}", render::snapshot_line(&snapshot));
                    }
                }
                changed = states.changed(), if !states.borrow().is_terminal() => {
                    if changed.is_err() {
                        break Ok(());
                    }
                    let state = states.borrow_and_update().clone();
                    println!("{}", render::connection_line(&state));
                    if state.is_terminal() {
                        println!("{}", render::LIVE_UNAVAILABLE_NOTICE);
                    }
                }
                changed = phase.changed() => {
                    if changed.is_err() {
                        break Ok(());
                    }
                    let current = phase.borrow_and_update().clone();
                    if let Some(message) = render::load_failure(&current) {
                        break Err(anyhow!(message));
                    }
                }
            }
        };

        view.unbind().await;
        outcome
    }

    async fn bid(&self, auction_id: &str, name: String, amount: String) -> Result<()> {
        let auction_id = AuctionId::new(auction_id)?;
        let snapshot = self
            .client
            .get_auction(&auction_id)
            .await
            .map_err(|e| anyhow!(user_message(&e)))?;

        let request = match BidForm::new(auction_id)
            .with_bidder_name(name)
            .with_amount(amount)
            .validate(snapshot.current_price)
        {
            Ok(request) => request,
            Err(e) => bail!(
                "{} Minimum: {}",
                e,
                format_currency(suggested_minimum(snapshot.current_price))
            ),
        };

        self.client
            .place_bid(&request)
            .await
            .map_err(|e| anyhow!(bid_failure_message(&e)))?;

        println!("{}", BID_PLACED_MESSAGE);
        Ok(())
    }

    async fn login(&self, email: String, password: String) -> Result<()> {
        let session = self
            .client
            .login(&LoginRequest { email, password })
            .await
            .map_err(|e| anyhow!(user_message(&e)))?;

        self.credentials.sign_in(session);
        info!("signed in");

        match self.credentials.display_name() {
            Some(name) => println!("Welcome, {}.", name),
            None => println!("Logged in."),
        }
        if let Some(token) = self.credentials.access_token() {
            println!("export GAVEL_TOKEN={}", token);
        }
        Ok(())
    }

    async fn register(&self, request: RegisterRequest) -> Result<()> {
        self.client
            .register(&request)
            .await
            .map_err(|e| anyhow!(user_message(&e)))?;

        println!("{}", ACCOUNT_CREATED_MESSAGE);
        Ok(())
    }
}
