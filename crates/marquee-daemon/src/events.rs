//! In-process event bus.
//!
//! Handlers publish what happened (a purchase, a promo redemption, a
//! truncated feed) and any number of subscribers may listen. Each
//! subscriber has an independent buffer; a slow one lags rather than
//! blocking the publisher.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

pub const DAEMON_STARTED: &str = "DaemonStarted";
pub const PURCHASE_COMPLETED: &str = "PurchaseCompleted";
pub const PROMO_REDEEMED: &str = "PromoRedeemed";
pub const PROMO_COMMIT_FAILED: &str = "PromoCommitFailed";
pub const REPORT_GENERATED: &str = "ReportGenerated";
pub const FEED_TRUNCATED: &str = "FeedTruncated";

/// An event emitted by the daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Event type name (e.g. "PurchaseCompleted", "DaemonStarted").
    pub event_type: String,
    /// Unix timestamp.
    pub timestamp: u64,
    /// Type-specific payload.
    pub payload: serde_json::Value,
}

impl Event {
    /// An event stamped with the current time.
    pub fn now(event_type: &str, payload: serde_json::Value) -> Self {
        Self {
            event_type: event_type.to_string(),
            timestamp: u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default(),
            payload,
        }
    }
}

/// Event bus for broadcasting events to subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
    sequence: Arc<AtomicU64>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Emit an event to all subscribers.
    pub fn emit(&self, event: Event) {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        debug!(seq, category = categorize_event(&event.event_type), event = %event.event_type, "event");
        // No subscribers is not an error.
        let _ = self.sender.send(event);
    }

    /// Subscribe to events. Returns a receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Number of events emitted so far.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}

/// Categorize an event type into a category.
pub fn categorize_event(event_type: &str) -> &'static str {
    match event_type {
        s if s.starts_with("Report") || s.starts_with("Feed") => "revenue",
        s if s.starts_with("Purchase") || s.starts_with("Promo") => "checkout",
        _ => "system",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_bus_emit_subscribe() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.emit(Event {
            event_type: DAEMON_STARTED.to_string(),
            timestamp: 1000,
            payload: serde_json::json!({"version": "0.1.0"}),
        });

        let event = rx.try_recv().expect("receive event");
        assert_eq!(event.event_type, "DaemonStarted");
        assert_eq!(bus.sequence(), 1);
    }

    #[test]
    fn test_emit_without_subscribers_counts() {
        let bus = EventBus::new(4);
        bus.emit(Event::now(REPORT_GENERATED, serde_json::json!({})));
        bus.emit(Event::now(FEED_TRUNCATED, serde_json::json!({})));
        assert_eq!(bus.sequence(), 2);
    }

    #[test]
    fn test_categorize_event() {
        assert_eq!(categorize_event(REPORT_GENERATED), "revenue");
        assert_eq!(categorize_event(FEED_TRUNCATED), "revenue");
        assert_eq!(categorize_event(PURCHASE_COMPLETED), "checkout");
        assert_eq!(categorize_event(PROMO_REDEEMED), "checkout");
        assert_eq!(categorize_event(PROMO_COMMIT_FAILED), "checkout");
        assert_eq!(categorize_event(DAEMON_STARTED), "system");
    }
}
