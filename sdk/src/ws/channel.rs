//! Live bid channel.
//!
//! [`LiveBidChannel::open`] starts a [`ChannelSession`] bound to one auction.
//! The session connects, joins the auction room and only then starts
//! delivering events to its [`ChannelHandlers`]. Dropped connections are
//! retried on the configured schedule, and the room is rejoined before
//! delivery resumes.
//!
//! Handlers run on the session's driver task while the handler slot is
//! locked. [`ChannelSession::close`] takes the slot, so once it returns no
//! handler runs again. A handler must not close its own session.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::client::{HubConnection, SharedHubConnector};
use super::config::HubConfig;
use super::error::HubError;
use super::messages::HubMessage;
use super::metrics::ChannelMetrics;
use crate::types::{AuctionId, BidEvent};

/// Connection state of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// No session.
    Idle,
    /// Connecting and waiting for the join acknowledgement.
    Connecting,
    /// Joined; events are delivered.
    Joined,
    /// Connection lost; retrying.
    Reconnecting {
        /// One-based attempt number.
        attempt: u32,
    },
    /// Closed by the client, the server, or after reconnection gave up.
    Closed,
    /// The first connect or join failed.
    Failed(String),
}

impl ConnectionState {
    /// Returns true when events are being delivered.
    #[must_use]
    pub fn is_joined(&self) -> bool {
        matches!(self, Self::Joined)
    }

    /// Returns true once the session can no longer deliver events.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Failed(_))
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Connecting => write!(f, "connecting"),
            Self::Joined => write!(f, "live"),
            Self::Reconnecting { attempt } => write!(f, "reconnecting (attempt {})", attempt),
            Self::Closed => write!(f, "closed"),
            Self::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

type BidHandler = Box<dyn Fn(BidEvent) + Send + Sync>;
type SignalHandler = Box<dyn Fn() + Send + Sync>;

/// Callbacks for a session.
pub struct ChannelHandlers {
    on_bid: BidHandler,
    on_ended: SignalHandler,
    on_rejoined: Option<SignalHandler>,
}

impl ChannelHandlers {
    /// Creates handlers for bids and the auction-ended signal.
    pub fn new(
        on_bid: impl Fn(BidEvent) + Send + Sync + 'static,
        on_ended: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        Self {
            on_bid: Box::new(on_bid),
            on_ended: Box::new(on_ended),
            on_rejoined: None,
        }
    }

    /// Adds a callback for every successful rejoin after a lost connection.
    #[must_use]
    pub fn on_rejoined(mut self, on_rejoined: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_rejoined = Some(Box::new(on_rejoined));
        self
    }
}

impl fmt::Debug for ChannelHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelHandlers")
            .field("on_rejoined", &self.on_rejoined.is_some())
            .finish_non_exhaustive()
    }
}

/// Handler slot shared by a session and its driver.
struct Dispatcher {
    handlers: Mutex<Option<ChannelHandlers>>,
}

impl Dispatcher {
    fn new(handlers: ChannelHandlers) -> Self {
        Self {
            handlers: Mutex::new(Some(handlers)),
        }
    }

    fn bid(&self, event: BidEvent) -> bool {
        match self.handlers.lock().as_ref() {
            Some(handlers) => {
                (handlers.on_bid)(event);
                true
            }
            None => false,
        }
    }

    fn ended(&self) -> bool {
        match self.handlers.lock().as_ref() {
            Some(handlers) => {
                (handlers.on_ended)();
                true
            }
            None => false,
        }
    }

    fn rejoined(&self) {
        if let Some(on_rejoined) = self
            .handlers
            .lock()
            .as_ref()
            .and_then(|handlers| handlers.on_rejoined.as_ref())
        {
            on_rejoined();
        }
    }

    fn unregister(&self) -> bool {
        self.handlers.lock().take().is_some()
    }
}

/// Opens live bid sessions.
#[derive(Debug, Clone)]
pub struct LiveBidChannel {
    connector: SharedHubConnector,
    config: HubConfig,
}

impl LiveBidChannel {
    /// Creates a channel over the given connector.
    #[must_use]
    pub fn new(connector: SharedHubConnector, config: HubConfig) -> Self {
        Self { connector, config }
    }

    /// Returns the hub configuration.
    #[must_use]
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Opens a session bound to `auction_id`.
    ///
    /// Returns immediately in [`ConnectionState::Connecting`]; the connect
    /// and join run on a spawned task, so this must be called inside a
    /// Tokio runtime.
    pub fn open(&self, auction_id: AuctionId, handlers: ChannelHandlers) -> ChannelSession {
        let (state, _) = watch::channel(ConnectionState::Connecting);
        let state = Arc::new(state);
        let (shutdown, shutdown_rx) = watch::channel(false);
        let dispatcher = Arc::new(Dispatcher::new(handlers));
        let metrics = Arc::new(ChannelMetrics::new());

        let driver = SessionDriver {
            auction_id: auction_id.clone(),
            connector: Arc::clone(&self.connector),
            config: self.config.clone(),
            state: Arc::clone(&state),
            dispatcher: Arc::clone(&dispatcher),
            metrics: Arc::clone(&metrics),
            next_invocation: 0,
        };

        info!(auction = %auction_id, "opening live bid session");
        let task = tokio::spawn(driver.run(shutdown_rx));

        ChannelSession {
            auction_id,
            state,
            dispatcher,
            shutdown,
            task: Some(task),
            metrics,
        }
    }

    /// Closes a session and waits for its connection to be released.
    pub async fn close(&self, session: ChannelSession) {
        session.shutdown().await;
    }
}

/// A live subscription to one auction's bid stream.
///
/// Dropping the session closes it.
pub struct ChannelSession {
    auction_id: AuctionId,
    state: Arc<watch::Sender<ConnectionState>>,
    dispatcher: Arc<Dispatcher>,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
    metrics: Arc<ChannelMetrics>,
}

impl fmt::Debug for ChannelSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelSession")
            .field("auction_id", &self.auction_id)
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl ChannelSession {
    /// Auction this session is bound to.
    #[must_use]
    pub fn auction_id(&self) -> &AuctionId {
        &self.auction_id
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    /// Subscribes to connection state changes.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Session counters.
    #[must_use]
    pub fn metrics(&self) -> Arc<ChannelMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Returns true once the session has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        *self.shutdown.borrow() || self.state.borrow().is_terminal()
    }

    /// Waits for the first join to settle.
    ///
    /// # Errors
    ///
    /// Returns the terminal state if the session failed or closed first.
    pub async fn joined(&self) -> Result<(), ConnectionState> {
        let mut rx = self.state.subscribe();
        let settled = match rx
            .wait_for(|state| state.is_joined() || state.is_terminal())
            .await
        {
            Ok(state) => state.clone(),
            Err(_) => ConnectionState::Closed,
        };

        if settled.is_joined() {
            Ok(())
        } else {
            Err(settled)
        }
    }

    /// Closes the session. Idempotent.
    ///
    /// No handler is invoked after this returns. The connection is released
    /// in the background; use [`ChannelSession::shutdown`] to wait for it.
    pub fn close(&mut self) {
        let was_open = self.dispatcher.unregister();
        self.shutdown.send_replace(true);
        self.state.send_if_modified(|state| {
            if state.is_terminal() {
                false
            } else {
                *state = ConnectionState::Closed;
                true
            }
        });

        if was_open {
            info!(auction = %self.auction_id, "live bid session closed");
        }
    }

    /// Closes the session and waits until its connection is released.
    pub async fn shutdown(mut self) {
        self.close();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(auction = %self.auction_id, error = %e, "session task ended abnormally");
            }
        }
    }
}

impl Drop for ChannelSession {
    fn drop(&mut self) {
        self.close();
    }
}

enum PumpExit {
    Shutdown,
    Lost(HubError),
    ServerClosed {
        error: Option<String>,
        allow_reconnect: bool,
    },
}

enum Recovery {
    Rejoined(Box<dyn HubConnection>),
    Shutdown,
    Exhausted,
}

async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    // A dropped sender also means shutdown.
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// Identifies the auction named by an `AuctionEnded` argument, if any.
fn tagged_auction(value: &Value) -> Option<AuctionId> {
    match value {
        Value::String(id) => AuctionId::new(id.as_str()).ok(),
        Value::Number(id) => AuctionId::new(id.to_string()).ok(),
        _ => None,
    }
}

struct SessionDriver {
    auction_id: AuctionId,
    connector: SharedHubConnector,
    config: HubConfig,
    state: Arc<watch::Sender<ConnectionState>>,
    dispatcher: Arc<Dispatcher>,
    metrics: Arc<ChannelMetrics>,
    next_invocation: u64,
}

impl SessionDriver {
    /// Terminal states are sticky.
    fn set_state(&self, next: ConnectionState) {
        self.state.send_if_modified(|state| {
            if state.is_terminal() || *state == next {
                false
            } else {
                *state = next;
                true
            }
        });
    }

    async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut conn = tokio::select! {
            biased;
            () = wait_for_shutdown(&mut shutdown) => return,
            result = self.attempt() => match result {
                Ok(conn) => conn,
                Err(e) => {
                    warn!(auction = %self.auction_id, error = %e, "failed to join auction room");
                    self.metrics.record_join_failure();
                    self.set_state(ConnectionState::Failed(e.to_string()));
                    return;
                }
            },
        };

        self.set_state(ConnectionState::Joined);
        info!(auction = %self.auction_id, "joined auction room");

        loop {
            let reason = match self.pump(conn.as_mut(), &mut shutdown).await {
                PumpExit::Shutdown => {
                    conn.close().await;
                    return;
                }
                PumpExit::ServerClosed {
                    error,
                    allow_reconnect: false,
                } => {
                    info!(auction = %self.auction_id, reason = ?error, "hub ended the session");
                    conn.close().await;
                    self.set_state(ConnectionState::Closed);
                    return;
                }
                PumpExit::ServerClosed {
                    error,
                    allow_reconnect: true,
                } => HubError::Closed(error),
                PumpExit::Lost(e) => e,
            };

            warn!(auction = %self.auction_id, error = %reason, "hub connection lost");
            conn.close().await;

            match self.recover(&mut shutdown).await {
                Recovery::Rejoined(next) => {
                    conn = next;
                    self.metrics.record_reconnect();
                    self.set_state(ConnectionState::Joined);
                    info!(auction = %self.auction_id, "rejoined auction room");
                    self.dispatcher.rejoined();
                }
                Recovery::Shutdown => return,
                Recovery::Exhausted => {
                    warn!(auction = %self.auction_id, "reconnect attempts exhausted");
                    self.set_state(ConnectionState::Closed);
                    return;
                }
            }
        }
    }

    /// Connect and join, bounded by the join timeout.
    async fn attempt(&mut self) -> Result<Box<dyn HubConnection>, HubError> {
        match tokio::time::timeout(self.config.join_timeout, self.establish()).await {
            Ok(result) => result,
            Err(_) => Err(HubError::JoinTimeout),
        }
    }

    async fn establish(&mut self) -> Result<Box<dyn HubConnection>, HubError> {
        let mut conn = self.connector.connect().await?;
        self.metrics.record_connection();

        if let Err(e) = self.join(conn.as_mut()).await {
            conn.close().await;
            return Err(e);
        }

        Ok(conn)
    }

    async fn join(&mut self, conn: &mut dyn HubConnection) -> Result<(), HubError> {
        let invocation_id = self.next_invocation.to_string();
        self.next_invocation += 1;

        conn.send(&HubMessage::invocation(
            invocation_id.clone(),
            self.config.join_method.clone(),
            vec![Value::String(self.auction_id.as_str().to_string())],
        ))
        .await?;
        debug!(auction = %self.auction_id, invocation_id = %invocation_id, "join requested");

        loop {
            match conn.recv().await {
                None => return Err(HubError::Closed(None)),
                Some(Err(HubError::Protocol(reason))) => {
                    debug!(reason = %reason, "undecodable record skipped during join");
                }
                Some(Err(e)) => return Err(e),
                Some(Ok(HubMessage::Completion {
                    invocation_id: acked,
                    error,
                    ..
                })) if acked == invocation_id => {
                    return match error {
                        Some(reason) => Err(HubError::JoinRejected(reason)),
                        None => Ok(()),
                    };
                }
                Some(Ok(HubMessage::Invocation { target, .. })) => {
                    debug!(target = %target, "event before join acknowledgement dropped");
                    self.metrics.record_dropped_before_join();
                }
                Some(Ok(HubMessage::Close { error, .. })) => return Err(HubError::Closed(error)),
                Some(Ok(_)) => {}
            }
        }
    }

    async fn pump(
        &mut self,
        conn: &mut dyn HubConnection,
        shutdown: &mut watch::Receiver<bool>,
    ) -> PumpExit {
        let period = self.config.keepalive_interval;
        let mut keepalive = tokio::time::interval_at(Instant::now() + period, period);
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_heard = Instant::now();

        loop {
            tokio::select! {
                biased;
                () = wait_for_shutdown(shutdown) => return PumpExit::Shutdown,
                message = conn.recv() => {
                    last_heard = Instant::now();
                    match message {
                        None => return PumpExit::Lost(HubError::Closed(None)),
                        Some(Err(HubError::Protocol(reason))) => {
                            warn!(auction = %self.auction_id, reason = %reason, "undecodable hub record skipped");
                            self.metrics.record_malformed();
                        }
                        Some(Err(e)) => return PumpExit::Lost(e),
                        Some(Ok(HubMessage::Invocation { target, arguments, .. })) => {
                            self.dispatch(&target, &arguments);
                        }
                        Some(Ok(HubMessage::Close { error, allow_reconnect })) => {
                            return PumpExit::ServerClosed { error, allow_reconnect };
                        }
                        Some(Ok(_)) => {}
                    }
                }
                _ = keepalive.tick() => {
                    if last_heard.elapsed() >= self.config.server_timeout {
                        return PumpExit::Lost(HubError::ServerTimeout);
                    }
                    if let Err(e) = conn.send(&HubMessage::Ping).await {
                        return PumpExit::Lost(e);
                    }
                    self.metrics.record_ping();
                }
            }
        }
    }

    fn dispatch(&self, target: &str, arguments: &[Value]) {
        if target.eq_ignore_ascii_case(&self.config.bid_event) {
            self.metrics.record_event_received();
            let Some(payload) = arguments.first() else {
                warn!(auction = %self.auction_id, "bid event without payload skipped");
                self.metrics.record_malformed();
                return;
            };

            match BidEvent::from_payload(payload, &self.auction_id) {
                Ok(event) if event.auction_id != self.auction_id => {
                    debug!(auction = %self.auction_id, other = %event.auction_id, "bid for another auction dropped");
                    self.metrics.record_other_auction();
                }
                Ok(event) => {
                    if self.dispatcher.bid(event) {
                        self.metrics.record_event_delivered();
                    }
                }
                Err(e) => {
                    warn!(auction = %self.auction_id, error = %e, "malformed bid event skipped");
                    self.metrics.record_malformed();
                }
            }
        } else if target.eq_ignore_ascii_case(&self.config.ended_event) {
            self.metrics.record_event_received();
            if let Some(other) = arguments.first().and_then(tagged_auction) {
                if other != self.auction_id {
                    self.metrics.record_other_auction();
                    return;
                }
            }
            if self.dispatcher.ended() {
                self.metrics.record_event_delivered();
            }
        } else {
            debug!(target = %target, "unhandled hub message");
        }
    }

    async fn recover(&mut self, shutdown: &mut watch::Receiver<bool>) -> Recovery {
        let delays = self.config.reconnect_delays.clone();

        for (index, delay) in delays.into_iter().enumerate() {
            let attempt = u32::try_from(index + 1).unwrap_or(u32::MAX);
            self.set_state(ConnectionState::Reconnecting { attempt });

            tokio::select! {
                biased;
                () = wait_for_shutdown(shutdown) => return Recovery::Shutdown,
                () = sleep(delay) => {}
            }

            tokio::select! {
                biased;
                () = wait_for_shutdown(shutdown) => return Recovery::Shutdown,
                result = self.attempt() => match result {
                    Ok(conn) => return Recovery::Rejoined(conn),
                    Err(e) => {
                        self.metrics.record_join_failure();
                        warn!(auction = %self.auction_id, attempt, error = %e, "reconnect attempt failed");
                    }
                },
            }
        }

        Recovery::Exhausted
    }
}
