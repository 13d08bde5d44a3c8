//! Event types for the Reel event system
//!
//! Provides the shared event definitions and the EventBus. The review relation
//! emits one event per committed write; the live feed subscribes to them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::ids::{MovieId, ReviewId, UserId};

/// Reel event types
///
/// Events are broadcast via EventBus and can be serialized for SSE transmission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ReelEvent {
    /// A review was inserted
    ///
    /// Triggers:
    /// - Live feed: re-materialize the global list
    ReviewCreated {
        review_id: ReviewId,
        subject_id: MovieId,
        author_id: UserId,
        timestamp: DateTime<Utc>,
    },

    /// A review's text was replaced
    ///
    /// Triggers:
    /// - Live feed: re-materialize the global list
    ReviewUpdated {
        review_id: ReviewId,
        subject_id: MovieId,
        timestamp: DateTime<Utc>,
    },

    /// A review was removed
    ///
    /// Triggers:
    /// - Live feed: re-materialize the global list
    ReviewDeleted {
        review_id: ReviewId,
        subject_id: MovieId,
        timestamp: DateTime<Utc>,
    },
}

impl ReelEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            ReelEvent::ReviewCreated { .. } => "ReviewCreated",
            ReelEvent::ReviewUpdated { .. } => "ReviewUpdated",
            ReelEvent::ReviewDeleted { .. } => "ReviewDeleted",
        }
    }

    /// Review the event refers to
    pub fn review_id(&self) -> ReviewId {
        match self {
            ReelEvent::ReviewCreated { review_id, .. }
            | ReelEvent::ReviewUpdated { review_id, .. }
            | ReelEvent::ReviewDeleted { review_id, .. } => *review_id,
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Fan-out of committed review writes
///
/// Backed by a bounded `tokio::sync::broadcast` channel. Writers never wait on
/// readers; a reader that falls more than `capacity` events behind sees
/// `RecvError::Lagged` and must resynchronize from the relation.
///
/// # Examples
///
/// ```
/// use reel_common::events::{EventBus, ReelEvent};
/// use reel_common::{MovieId, ReviewId};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(ReelEvent::ReviewDeleted {
///     review_id: ReviewId::generate(),
///     subject_id: MovieId(238),
///     timestamp: reel_common::time::now(),
/// });
///
/// assert_eq!(rx.try_recv().unwrap().event_type(), "ReviewDeleted");
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ReelEvent>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// `capacity` is the number of events buffered per subscriber before the
    /// oldest are dropped and the subscriber observes a lag.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<ReelEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: ReelEvent) {
        let _ = self.tx.send(event);
    }
}
