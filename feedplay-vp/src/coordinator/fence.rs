//! Global audio fence
//!
//! Two layers against playback instances the coordinator does not own:
//! a sweep run at the start of every activation, and a capture-phase
//! listener that stops a foreign instance the moment it starts playing.
//! Neither touches the coordinator's own state machine.

use super::CoordinatorInner;
use crate::host::{MediaElementId, PlayListener};
use feedplay_common::events::{EventBus, FeedEvent};
use std::sync::Arc;
use tracing::warn;

impl CoordinatorInner {
    /// Pause, mute and rewind every instance except the owned one
    ///
    /// Returns how many of them were playing or audible.
    pub(super) fn silence_all(&self) -> usize {
        let mut silenced = 0;
        for element in self.document.media_elements() {
            if element.id() == self.owned_id {
                continue;
            }
            if !element.is_paused() || !element.is_muted() {
                silenced += 1;
            }
            element.pause();
            element.set_muted(true);
            element.set_current_time(0.0);
        }

        if silenced > 0 {
            warn!("Silenced {} stray playback instance(s)", silenced);
            self.events.emit_lossy(FeedEvent::StrayInstancesSilenced {
                count: silenced,
                timestamp: chrono::Utc::now(),
            });
        }
        silenced
    }
}

/// Listener that stops any instance other than `owned` as soon as it plays
///
/// Captures only the owned id and the bus, never the coordinator itself.
pub(super) fn play_guard(owned: MediaElementId, events: EventBus) -> PlayListener {
    Arc::new(move |element| {
        if element.id() == owned {
            return;
        }
        warn!("Stopping rogue playback instance {}", element.id());
        element.pause();
        element.set_muted(true);
        events.emit_lossy(FeedEvent::RoguePlaybackStopped {
            element_id: element.id().to_string(),
            timestamp: chrono::Utc::now(),
        });
    })
}
