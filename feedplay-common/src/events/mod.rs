//! Event types for the feedplay event system
//!
//! The coordinator reports everything a feed UI may react to through
//! `FeedEvent`s broadcast on an `EventBus`. There is no other structured
//! signal path: the public control surface never returns errors for
//! conditions expected in normal operation.

mod playback_types;

pub use playback_types::{SourceKind, Visibility};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Feed playback events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FeedEvent {
    /// A slot became the lessee of the playback resource
    SlotActivated {
        slot_id: String,
        source_kind: SourceKind,
        muted: bool,
        timestamp: DateTime<Utc>,
    },

    /// The active slot was torn down and the resource detached
    SlotDeactivated {
        slot_id: String,
        timestamp: DateTime<Utc>,
    },

    /// Source is loaded but playback did not start
    ///
    /// Commonly the autoplay policy requiring a user gesture, or the host
    /// page being hidden. Informational only; no automatic retry.
    PlaybackDeferred {
        slot_id: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// Loading the slot's source failed
    ///
    /// Callers typically show a fallback state or skip to the next slot.
    LoadFailed {
        slot_id: String,
        source_kind: SourceKind,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// Activation requested for a slot that is not registered
    UnknownSlot {
        slot_id: String,
        timestamp: DateTime<Utc>,
    },

    /// The activation sweep stopped instances not owned by the coordinator
    StrayInstancesSilenced {
        count: usize,
        timestamp: DateTime<Utc>,
    },

    /// The play listener stopped a foreign instance the moment it started
    RoguePlaybackStopped {
        element_id: String,
        timestamp: DateTime<Utc>,
    },

    /// Host page visibility changed
    VisibilityChanged {
        visibility: Visibility,
        timestamp: DateTime<Utc>,
    },

    /// The coordinator released everything and will ignore further requests
    CoordinatorDestroyed { timestamp: DateTime<Utc> },
}

impl FeedEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            FeedEvent::SlotActivated { .. } => "SlotActivated",
            FeedEvent::SlotDeactivated { .. } => "SlotDeactivated",
            FeedEvent::PlaybackDeferred { .. } => "PlaybackDeferred",
            FeedEvent::LoadFailed { .. } => "LoadFailed",
            FeedEvent::UnknownSlot { .. } => "UnknownSlot",
            FeedEvent::StrayInstancesSilenced { .. } => "StrayInstancesSilenced",
            FeedEvent::RoguePlaybackStopped { .. } => "RoguePlaybackStopped",
            FeedEvent::VisibilityChanged { .. } => "VisibilityChanged",
            FeedEvent::CoordinatorDestroyed { .. } => "CoordinatorDestroyed",
        }
    }

    /// Slot the event refers to, if any
    pub fn slot_id(&self) -> Option<&str> {
        match self {
            FeedEvent::SlotActivated { slot_id, .. }
            | FeedEvent::SlotDeactivated { slot_id, .. }
            | FeedEvent::PlaybackDeferred { slot_id, .. }
            | FeedEvent::LoadFailed { slot_id, .. }
            | FeedEvent::UnknownSlot { slot_id, .. } => Some(slot_id),
            _ => None,
        }
    }

    /// Serialize as a single JSON line
    pub fn to_json(&self) -> crate::Result<String> {
        serde_json::to_string(self).map_err(|e| crate::Error::Internal(e.to_string()))
    }
}

/// Broadcast bus for `FeedEvent`s
///
/// Cloning shares the underlying channel. Slow subscribers lose the oldest
/// events once `capacity` is exceeded (`broadcast` lag semantics).
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<FeedEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: FeedEvent,
    ) -> std::result::Result<usize, broadcast::error::SendError<FeedEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: FeedEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
