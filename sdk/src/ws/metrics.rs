//! Live bid channel metrics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one channel session.
#[derive(Debug, Default)]
pub struct ChannelMetrics {
    connections_opened: AtomicU64,
    reconnects: AtomicU64,
    join_failures: AtomicU64,
    events_received: AtomicU64,
    events_delivered: AtomicU64,
    events_dropped_before_join: AtomicU64,
    events_for_other_auctions: AtomicU64,
    malformed_events: AtomicU64,
    pings_sent: AtomicU64,
}

impl ChannelMetrics {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an established connection.
    pub fn record_connection(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a successful rejoin after a drop.
    pub fn record_reconnect(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a failed connect or join attempt.
    pub fn record_join_failure(&self) {
        self.join_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an event addressed to the session.
    pub fn record_event_received(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an event handed to the handlers.
    pub fn record_event_delivered(&self) {
        self.events_delivered.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an event that arrived before the join was acknowledged.
    pub fn record_dropped_before_join(&self) {
        self.events_dropped_before_join
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Records an event tagged with a different auction.
    pub fn record_other_auction(&self) {
        self.events_for_other_auctions
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Records an undecodable event payload.
    pub fn record_malformed(&self) {
        self.malformed_events.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a keepalive ping.
    pub fn record_ping(&self) {
        self.pings_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Connections established so far.
    #[must_use]
    pub fn connections_opened(&self) -> u64 {
        self.connections_opened.load(Ordering::Relaxed)
    }

    /// Successful rejoins.
    #[must_use]
    pub fn reconnects(&self) -> u64 {
        self.reconnects.load(Ordering::Relaxed)
    }

    /// Failed connect or join attempts.
    #[must_use]
    pub fn join_failures(&self) -> u64 {
        self.join_failures.load(Ordering::Relaxed)
    }

    /// Events received while joined.
    #[must_use]
    pub fn events_received(&self) -> u64 {
        self.events_received.load(Ordering::Relaxed)
    }

    /// Events delivered to handlers.
    #[must_use]
    pub fn events_delivered(&self) -> u64 {
        self.events_delivered.load(Ordering::Relaxed)
    }

    /// Events dropped because the join was still pending.
    #[must_use]
    pub fn events_dropped_before_join(&self) -> u64 {
        self.events_dropped_before_join.load(Ordering::Relaxed)
    }

    /// Events dropped because they named another auction.
    #[must_use]
    pub fn events_for_other_auctions(&self) -> u64 {
        self.events_for_other_auctions.load(Ordering::Relaxed)
    }

    /// Malformed event payloads.
    #[must_use]
    pub fn malformed_events(&self) -> u64 {
        self.malformed_events.load(Ordering::Relaxed)
    }

    /// Keepalive pings sent.
    #[must_use]
    pub fn pings_sent(&self) -> u64 {
        self.pings_sent.load(Ordering::Relaxed)
    }
}
