//! Auction snapshot store.
//!
//! Holds the client's best-known [`AuctionSnapshot`] for one auction and
//! patches it with pushed bid events. Price updates merge max-wins, which
//! keeps the store correct under duplicated and reordered delivery.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::client::ClientError;
use crate::types::{AuctionId, AuctionSnapshot, AuctionStatus, BidEvent};

/// Fetches auction detail.
#[async_trait]
pub trait AuctionSource: Send + Sync {
    /// Fetches the current state of one auction.
    async fn fetch_auction(&self, id: &AuctionId) -> Result<AuctionSnapshot, ClientError>;
}

/// Shared auction source handle.
pub type SharedAuctionSource = Arc<dyn AuctionSource>;

/// Errors returned by [`AuctionSnapshotStore::load`].
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The auction does not exist.
    #[error("auction {0} not found")]
    NotFound(AuctionId),

    /// The fetch failed (network, non-2xx, malformed body).
    #[error("failed to load auction: {0}")]
    Transport(#[source] ClientError),

    /// The store was detached before the fetch resolved.
    #[error("store detached before the load completed")]
    Detached,
}

/// Result of a store mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The held snapshot changed (or, for `mark_ended`, is now ended).
    Applied,
    /// The update carried no new information.
    Ignored(IgnoreReason),
}

impl ApplyOutcome {
    /// Returns true if the update was applied.
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Why an update was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Nothing has been loaded yet.
    NoSnapshot,
    /// The event belongs to another auction.
    OtherAuction,
    /// The amount does not exceed the current price.
    NotHigher,
    /// The payload could not be parsed.
    Malformed,
    /// The store has been detached from its view.
    Detached,
}

#[derive(Debug, Default)]
struct Inner {
    snapshot: Option<AuctionSnapshot>,
    ended: bool,
    detached: bool,
}

/// Holds and patches the snapshot of one auction.
pub struct AuctionSnapshotStore {
    source: SharedAuctionSource,
    inner: Mutex<Inner>,
    notify: watch::Sender<Option<AuctionSnapshot>>,
}

impl std::fmt::Debug for AuctionSnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuctionSnapshotStore")
            .field("inner", &*self.inner.lock())
            .finish_non_exhaustive()
    }
}

impl AuctionSnapshotStore {
    /// Creates an empty store backed by the given source.
    #[must_use]
    pub fn new(source: SharedAuctionSource) -> Self {
        let (notify, _) = watch::channel(None);
        Self {
            source,
            inner: Mutex::new(Inner::default()),
            notify,
        }
    }

    /// Fetches the auction and installs the result.
    ///
    /// The first successful load installs the snapshot as fetched. A later
    /// load of the same auction replaces the descriptive fields but merges
    /// the price max-wins and never reverts an ended status, so a response
    /// that resolves after newer push events cannot regress the view.
    ///
    /// Failures leave the held state untouched and are not retried.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::NotFound` for a missing auction,
    /// `LoadError::Transport` for any other fetch failure, and
    /// `LoadError::Detached` if the store was detached meanwhile.
    pub async fn load(&self, id: &AuctionId) -> Result<AuctionSnapshot, LoadError> {
        if self.is_detached() {
            return Err(LoadError::Detached);
        }

        debug!(auction = %id, "loading auction");
        let fetched = self
            .source
            .fetch_auction(id)
            .await
            .map_err(|e| match e {
                ClientError::NotFound(_) => LoadError::NotFound(id.clone()),
                other => LoadError::Transport(other),
            })?;

        let mut inner = self.inner.lock();
        if inner.detached {
            debug!(auction = %id, "discarding load that resolved after detach");
            return Err(LoadError::Detached);
        }

        let merged = match inner.snapshot.take() {
            Some(held) if held.id == fetched.id => {
                let mut merged = fetched;
                if held.current_price > merged.current_price {
                    merged.current_price = held.current_price;
                }
                if held.status.is_ended() {
                    merged.status = AuctionStatus::Ended;
                }
                merged
            }
            _ => fetched,
        };

        let mut merged = merged;
        if inner.ended {
            merged.status = AuctionStatus::Ended;
        }

        info!(
            auction = %merged.id,
            price = %merged.current_price,
            status = %merged.status,
            "auction loaded"
        );
        inner.snapshot = Some(merged.clone());
        self.notify.send_replace(inner.snapshot.clone());
        Ok(merged)
    }

    /// Merges a bid event into the held snapshot.
    ///
    /// Applied only when a snapshot of the same auction is held and the
    /// amount is strictly higher than the current price.
    pub fn apply_bid_event(&self, event: &BidEvent) -> ApplyOutcome {
        let mut inner = self.inner.lock();
        if inner.detached {
            return ApplyOutcome::Ignored(IgnoreReason::Detached);
        }

        let Some(snapshot) = inner.snapshot.as_mut() else {
            debug!(auction = %event.auction_id, amount = %event.amount, "bid before load, ignored");
            return ApplyOutcome::Ignored(IgnoreReason::NoSnapshot);
        };

        if snapshot.id != event.auction_id {
            debug!(
                held = %snapshot.id,
                event = %event.auction_id,
                "bid for another auction, ignored"
            );
            return ApplyOutcome::Ignored(IgnoreReason::OtherAuction);
        }

        if event.amount <= snapshot.current_price {
            debug!(
                auction = %snapshot.id,
                amount = %event.amount,
                price = %snapshot.current_price,
                "stale or duplicate bid, ignored"
            );
            return ApplyOutcome::Ignored(IgnoreReason::NotHigher);
        }

        debug!(auction = %snapshot.id, from = %snapshot.current_price, to = %event.amount, "bid applied");
        snapshot.current_price = event.amount;
        self.notify.send_replace(inner.snapshot.clone());
        ApplyOutcome::Applied
    }

    /// Parses a raw push payload and merges it.
    ///
    /// Malformed payloads are logged and ignored.
    pub fn apply_raw(&self, payload: &Value, bound: &AuctionId) -> ApplyOutcome {
        match BidEvent::from_payload(payload, bound) {
            Ok(event) => self.apply_bid_event(&event),
            Err(e) => {
                warn!(auction = %bound, error = %e, "ignoring malformed bid event");
                ApplyOutcome::Ignored(IgnoreReason::Malformed)
            }
        }
    }

    /// Marks the auction as ended. Idempotent.
    ///
    /// When nothing is loaded yet the end is remembered and applied to the
    /// snapshot once it arrives.
    pub fn mark_ended(&self) -> ApplyOutcome {
        let mut inner = self.inner.lock();
        if inner.detached {
            return ApplyOutcome::Ignored(IgnoreReason::Detached);
        }

        inner.ended = true;
        if let Some(snapshot) = inner.snapshot.as_mut() {
            if !snapshot.status.is_ended() {
                info!(auction = %snapshot.id, "auction ended");
                snapshot.status = AuctionStatus::Ended;
                self.notify.send_replace(inner.snapshot.clone());
            }
        }
        ApplyOutcome::Applied
    }

    /// Returns the held snapshot, if any.
    #[must_use]
    pub fn current(&self) -> Option<AuctionSnapshot> {
        self.inner.lock().snapshot.clone()
    }

    /// Subscribes to snapshot changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<AuctionSnapshot>> {
        self.notify.subscribe()
    }

    /// Detaches the store from its view.
    ///
    /// Every later mutation, including a load that is still in flight, is
    /// discarded.
    pub fn detach(&self) {
        self.inner.lock().detached = true;
    }

    /// Returns true once the store has been detached.
    #[must_use]
    pub fn is_detached(&self) -> bool {
        self.inner.lock().detached
    }
}
