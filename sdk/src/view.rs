//! Auction detail view.
//!
//! [`AuctionView`] ties one [`AuctionSnapshotStore`] to one
//! [`ChannelSession`] for the auction currently shown. Rebinding to another
//! auction tears the previous pair down completely before the next session
//! is opened, so no event or late load from the old auction can reach the
//! new store.

use std::fmt;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::store::{AuctionSnapshotStore, LoadError, SharedAuctionSource};
use crate::types::{AuctionId, AuctionSnapshot};
use crate::ws::{ChannelHandlers, ChannelMetrics, ChannelSession, ConnectionState, LiveBidChannel};

/// Progress of the initial detail fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadPhase {
    /// Fetch in flight.
    Loading,
    /// Snapshot held.
    Loaded,
    /// The auction does not exist.
    NotFound,
    /// The fetch failed.
    Failed(String),
}

impl fmt::Display for LoadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loading => write!(f, "loading"),
            Self::Loaded => write!(f, "loaded"),
            Self::NotFound => write!(f, "auction not found"),
            Self::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

struct Binding {
    auction_id: AuctionId,
    store: Arc<AuctionSnapshotStore>,
    session: ChannelSession,
    loader: JoinHandle<()>,
    phase: watch::Receiver<LoadPhase>,
}

/// Glue between the snapshot store and the live bid channel.
pub struct AuctionView {
    source: SharedAuctionSource,
    channel: LiveBidChannel,
    binding: Option<Binding>,
}

impl fmt::Debug for AuctionView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuctionView")
            .field("auction_id", &self.auction_id())
            .field("connection", &self.connection_state())
            .finish_non_exhaustive()
    }
}

impl Drop for AuctionView {
    fn drop(&mut self) {
        if let Some(mut binding) = self.binding.take() {
            binding.session.close();
            binding.store.detach();
            binding.loader.abort();
            debug!(auction = %binding.auction_id, "auction view dropped while bound");
        }
    }
}

impl AuctionView {
    /// Creates an unbound view.
    #[must_use]
    pub fn new(source: SharedAuctionSource, channel: LiveBidChannel) -> Self {
        Self {
            source,
            channel,
            binding: None,
        }
    }

    /// Binds the view to `auction_id` and returns its store.
    ///
    /// Starts the detail fetch and the live session concurrently. Binding
    /// the auction already shown is a no-op; binding another one first
    /// completes [`AuctionView::unbind`].
    pub async fn bind(&mut self, auction_id: AuctionId) -> Arc<AuctionSnapshotStore> {
        if let Some(binding) = &self.binding {
            if binding.auction_id == auction_id {
                return Arc::clone(&binding.store);
            }
        }
        self.unbind().await;

        let store = Arc::new(AuctionSnapshotStore::new(Arc::clone(&self.source)));
        let (resync_tx, resync_rx) = mpsc::unbounded_channel();

        let on_bid = Arc::clone(&store);
        let on_ended = Arc::clone(&store);
        let mut handlers = ChannelHandlers::new(
            move |event| {
                let outcome = on_bid.apply_bid_event(&event);
                debug!(amount = %event.amount, ?outcome, "live bid applied");
            },
            move || {
                let _ = on_ended.mark_ended();
            },
        );
        if self.channel.config().resync_on_reconnect {
            handlers = handlers.on_rejoined(move || {
                let _ = resync_tx.send(());
            });
        }

        let session = self.channel.open(auction_id.clone(), handlers);
        let (phase_tx, phase) = watch::channel(LoadPhase::Loading);
        let loader = tokio::spawn(run_loader(
            Arc::clone(&store),
            auction_id.clone(),
            phase_tx,
            resync_rx,
        ));

        info!(auction = %auction_id, "auction view bound");
        self.binding = Some(Binding {
            auction_id,
            store: Arc::clone(&store),
            session,
            loader,
            phase,
        });
        store
    }

    /// Tears down the current binding.
    ///
    /// The session is closed and the store detached before this awaits the
    /// release of the connection, so nothing from the old auction is applied
    /// once it returns.
    pub async fn unbind(&mut self) {
        let Some(binding) = self.binding.take() else {
            return;
        };
        let Binding {
            auction_id,
            store,
            mut session,
            loader,
            ..
        } = binding;

        session.close();
        store.detach();
        loader.abort();

        session.shutdown().await;
        let _ = loader.await;
        info!(auction = %auction_id, "auction view unbound");
    }

    /// Auction currently bound.
    #[must_use]
    pub fn auction_id(&self) -> Option<&AuctionId> {
        self.binding.as_ref().map(|binding| &binding.auction_id)
    }

    /// Store for the bound auction.
    #[must_use]
    pub fn store(&self) -> Option<Arc<AuctionSnapshotStore>> {
        self.binding
            .as_ref()
            .map(|binding| Arc::clone(&binding.store))
    }

    /// Snapshot currently held for the bound auction.
    #[must_use]
    pub fn snapshot(&self) -> Option<AuctionSnapshot> {
        self.binding
            .as_ref()
            .and_then(|binding| binding.store.current())
    }

    /// Subscribes to the detail fetch progress.
    #[must_use]
    pub fn subscribe_load_phase(&self) -> Option<watch::Receiver<LoadPhase>> {
        self.binding.as_ref().map(|binding| binding.phase.clone())
    }

    /// Detail fetch progress.
    #[must_use]
    pub fn load_phase(&self) -> Option<LoadPhase> {
        self.binding
            .as_ref()
            .map(|binding| binding.phase.borrow().clone())
    }

    /// Connection state of the live session, `Idle` when unbound.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.binding
            .as_ref()
            .map_or(ConnectionState::Idle, |binding| binding.session.state())
    }

    /// Subscribes to the live session's connection state.
    #[must_use]
    pub fn subscribe_connection_state(&self) -> Option<watch::Receiver<ConnectionState>> {
        self.binding
            .as_ref()
            .map(|binding| binding.session.subscribe_state())
    }

    /// Counters of the live session.
    #[must_use]
    pub fn channel_metrics(&self) -> Option<Arc<ChannelMetrics>> {
        self.binding
            .as_ref()
            .map(|binding| binding.session.metrics())
    }

    /// False once the live session failed or closed; the snapshot stays
    /// readable but no longer updates.
    #[must_use]
    pub fn live_updates_available(&self) -> bool {
        self.binding
            .as_ref()
            .is_some_and(|binding| !binding.session.state().is_terminal())
    }
}

async fn run_loader(
    store: Arc<AuctionSnapshotStore>,
    auction_id: AuctionId,
    phase: watch::Sender<LoadPhase>,
    mut resync: mpsc::UnboundedReceiver<()>,
) {
    let next = match store.load(&auction_id).await {
        Ok(_) => LoadPhase::Loaded,
        Err(LoadError::NotFound(_)) => LoadPhase::NotFound,
        Err(LoadError::Transport(e)) => {
            warn!(auction = %auction_id, error = %e, "auction load failed");
            LoadPhase::Failed(e.to_string())
        }
        Err(LoadError::Detached) => return,
    };

    let loaded = next == LoadPhase::Loaded;
    phase.send_replace(next);
    if !loaded {
        return;
    }

    while resync.recv().await.is_some() {
        debug!(auction = %auction_id, "resynchronizing after rejoin");
        match store.load(&auction_id).await {
            Ok(_) => {}
            Err(LoadError::Detached) => return,
            Err(e) => {
                warn!(auction = %auction_id, error = %e, "resync failed, keeping held snapshot");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientError;
    use crate::store::AuctionSource;
    use crate::types::{Amount, AuctionStatus};
    use crate::ws::fake::FakeConnector;
    use crate::ws::{HubConfig, SharedHubConnector};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use parking_lot::Mutex;
    use serde_json::json;
    use std::collections::HashMap;
    use std::time::Duration;
    use tokio::sync::Notify;
    use tokio::time::timeout;

    const STEP: Duration = Duration::from_secs(2);

    fn id(value: &str) -> AuctionId {
        AuctionId::new(value).expect("id")
    }

    fn snapshot(auction: &str, price: u64) -> AuctionSnapshot {
        AuctionSnapshot {
            id: id(auction),
            name: "Clock".to_string(),
            description: "Carriage clock".to_string(),
            current_price: Amount::from(price),
            end_time: Utc
                .with_ymd_and_hms(2030, 1, 1, 0, 0, 0)
                .single()
                .expect("time"),
            status: AuctionStatus::Active,
        }
    }

    #[derive(Default)]
    struct FakeSource {
        auctions: Mutex<HashMap<String, AuctionSnapshot>>,
        gate: Option<Notify>,
    }

    impl FakeSource {
        fn with(snapshots: Vec<AuctionSnapshot>) -> Arc<Self> {
            let source = Self::default();
            for snapshot in snapshots {
                source.set(snapshot);
            }
            Arc::new(source)
        }

        fn gated(snapshot: AuctionSnapshot) -> Arc<Self> {
            let source = Self {
                gate: Some(Notify::new()),
                ..Self::default()
            };
            source.set(snapshot);
            Arc::new(source)
        }

        fn set(&self, snapshot: AuctionSnapshot) {
            self.auctions
                .lock()
                .insert(snapshot.id.to_string(), snapshot);
        }

        fn release(&self) {
            if let Some(gate) = &self.gate {
                gate.notify_one();
            }
        }
    }

    #[async_trait]
    impl AuctionSource for FakeSource {
        async fn fetch_auction(&self, id: &AuctionId) -> Result<AuctionSnapshot, ClientError> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.auctions
                .lock()
                .get(id.as_str())
                .cloned()
                .ok_or_else(|| ClientError::NotFound(id.to_string()))
        }
    }

    fn channel(connector: &Arc<FakeConnector>) -> LiveBidChannel {
        let config = HubConfig::default()
            .with_keepalive_interval(Duration::from_secs(60))
            .with_server_timeout(Duration::from_secs(120))
            .with_join_timeout(Duration::from_secs(2))
            .with_reconnect_delays(vec![Duration::ZERO]);
        LiveBidChannel::new(Arc::clone(connector) as SharedHubConnector, config)
    }

    async fn wait_snapshot(
        store: &AuctionSnapshotStore,
        check: impl Fn(&AuctionSnapshot) -> bool,
    ) -> AuctionSnapshot {
        let mut rx = store.subscribe();
        let held = timeout(STEP, rx.wait_for(|held| held.as_ref().is_some_and(&check)))
            .await
            .expect("snapshot in time")
            .expect("store alive");
        held.clone().expect("snapshot held")
    }

    async fn wait_price(store: &AuctionSnapshotStore, price: u64) {
        wait_snapshot(store, |held| held.current_price == Amount::from(price)).await;
    }

    async fn wait_phase(view: &AuctionView) -> LoadPhase {
        let mut phase = view.subscribe_load_phase().expect("bound");
        let settled = timeout(STEP, phase.wait_for(|phase| *phase != LoadPhase::Loading))
            .await
            .expect("phase in time")
            .expect("loader alive");
        settled.clone()
    }

    async fn wait_until(check: impl Fn() -> bool) {
        timeout(STEP, async {
            while !check() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition in time");
    }

    #[tokio::test]
    async fn test_bind_loads_and_applies_live_bids() {
        let connector = FakeConnector::new();
        let mut remote = connector.script();
        let source = FakeSource::with(vec![snapshot("a", 100)]);
        let mut view = AuctionView::new(source, channel(&connector));

        let store = view.bind(id("a")).await;
        remote.accept_join().await;
        wait_price(&store, 100).await;

        remote.push_bid("a", 150);
        wait_price(&store, 150).await;

        assert_eq!(wait_phase(&view).await, LoadPhase::Loaded);
        assert_eq!(view.connection_state(), ConnectionState::Joined);
        assert!(view.live_updates_available());

        view.unbind().await;
        assert_eq!(view.connection_state(), ConnectionState::Idle);
    }

    #[tokio::test]
    async fn test_bids_before_load_are_ignored() {
        let connector = FakeConnector::new();
        let mut remote = connector.script();
        let source = FakeSource::gated(snapshot("a", 100));
        let mut view = AuctionView::new(Arc::clone(&source) as SharedAuctionSource, channel(&connector));

        let store = view.bind(id("a")).await;
        remote.accept_join().await;
        remote.push_bid("a", 150);

        let metrics = view.channel_metrics().expect("bound");
        wait_until(|| metrics.events_delivered() == 1).await;
        assert!(store.current().is_none());

        source.release();
        wait_price(&store, 100).await;

        remote.push_bid("a", 120);
        wait_price(&store, 120).await;
    }

    #[tokio::test]
    async fn test_rebind_tears_down_previous_auction_first() {
        let connector = FakeConnector::new();
        let mut remote_a = connector.script();
        let mut remote_b = connector.script();
        let source = FakeSource::with(vec![snapshot("a", 100), snapshot("b", 200)]);
        let mut view = AuctionView::new(source, channel(&connector));

        let store_a = view.bind(id("a")).await;
        remote_a.accept_join().await;
        wait_price(&store_a, 100).await;

        let store_b = view.bind(id("b")).await;
        remote_a.closed().await;
        assert!(store_a.is_detached());

        let arguments = remote_b.accept_join().await;
        assert_eq!(arguments, vec![json!("b")]);
        wait_price(&store_b, 200).await;

        remote_a.push_bid("a", 999);
        remote_b.push_bid("b", 250);
        wait_price(&store_b, 250).await;
        assert_eq!(
            store_a.current().map(|held| held.current_price),
            Some(Amount::from(100u64))
        );

        let log = connector.log();
        let released = log.iter().position(|entry| entry == "release#1");
        let reopened = log.iter().position(|entry| entry == "connect#2");
        assert!(released.is_some());
        assert!(released < reopened);
        assert_eq!(view.auction_id(), Some(&id("b")));
    }

    #[tokio::test]
    async fn test_binding_same_auction_keeps_session() {
        let connector = FakeConnector::new();
        let mut remote = connector.script();
        let source = FakeSource::with(vec![snapshot("a", 100)]);
        let mut view = AuctionView::new(source, channel(&connector));

        let first = view.bind(id("a")).await;
        remote.accept_join().await;
        let second = view.bind(id("a")).await;

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(connector.attempts(), 1);
    }

    #[tokio::test]
    async fn test_unbind_discards_pending_load() {
        let connector = FakeConnector::new();
        let _remote = connector.script();
        let source = FakeSource::gated(snapshot("a", 100));
        let mut view = AuctionView::new(Arc::clone(&source) as SharedAuctionSource, channel(&connector));

        let store = view.bind(id("a")).await;
        view.unbind().await;
        source.release();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(store.is_detached());
        assert!(store.current().is_none());
        assert!(view.store().is_none());
        assert!(view.load_phase().is_none());
    }

    #[tokio::test]
    async fn test_drop_discards_pending_load() {
        let connector = FakeConnector::new();
        let _remote = connector.script();
        let source = FakeSource::gated(snapshot("a", 100));
        let mut view = AuctionView::new(Arc::clone(&source) as SharedAuctionSource, channel(&connector));

        let store = view.bind(id("a")).await;
        drop(view);
        source.release();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(store.is_detached());
        assert!(store.current().is_none());
    }

    #[tokio::test]
    async fn test_channel_failure_keeps_loaded_snapshot() {
        let connector = FakeConnector::new();
        let source = FakeSource::with(vec![snapshot("a", 100)]);
        let mut view = AuctionView::new(source, channel(&connector));

        let store = view.bind(id("a")).await;
        wait_price(&store, 100).await;

        let mut state = view.subscribe_connection_state().expect("bound");
        timeout(STEP, state.wait_for(ConnectionState::is_terminal))
            .await
            .expect("failure in time")
            .expect("state alive");

        assert!(!view.live_updates_available());
        assert_eq!(wait_phase(&view).await, LoadPhase::Loaded);
        assert_eq!(
            view.snapshot().map(|held| held.current_price),
            Some(Amount::from(100u64))
        );
    }

    #[tokio::test]
    async fn test_resync_after_reconnect() {
        let connector = FakeConnector::new();
        let mut first = connector.script();
        let mut second = connector.script();
        let source = FakeSource::with(vec![snapshot("a", 100)]);
        let mut view = AuctionView::new(Arc::clone(&source) as SharedAuctionSource, channel(&connector));

        let store = view.bind(id("a")).await;
        first.accept_join().await;
        wait_price(&store, 100).await;

        // Bids placed while the connection was down.
        source.set(snapshot("a", 300));
        first.drop_connection();
        second.accept_join().await;

        wait_price(&store, 300).await;
    }

    #[tokio::test]
    async fn test_missing_auction_reports_not_found() {
        let connector = FakeConnector::new();
        let _remote = connector.script();
        let source = FakeSource::with(vec![]);
        let mut view = AuctionView::new(source, channel(&connector));

        view.bind(id("missing")).await;

        assert_eq!(wait_phase(&view).await, LoadPhase::NotFound);
        assert!(view.snapshot().is_none());
    }

    #[tokio::test]
    async fn test_auction_ended_event_marks_store() {
        let connector = FakeConnector::new();
        let mut remote = connector.script();
        let source = FakeSource::with(vec![snapshot("a", 100)]);
        let mut view = AuctionView::new(source, channel(&connector));

        let store = view.bind(id("a")).await;
        remote.accept_join().await;
        wait_price(&store, 100).await;

        remote.push_ended();
        let ended = wait_snapshot(&store, |held| held.status.is_ended()).await;
        assert!(!ended.accepts_bids());
    }
}
