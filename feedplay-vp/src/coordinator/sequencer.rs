//! Activation sequencer and targeted teardown
//!
//! Ordering invariant: the resource is fully released from the previous
//! slot (paused, muted, rewound, session destroyed, source released, grace
//! period elapsed, detached) before it is attached to the next slot.
//! Both paths run with the binding lock held, so at most one teardown or
//! attach sequence touches the resource at any time. The lock is the drain
//! guard: a queued activation only acquires it after the previous teardown
//! has finished. `CoordinatorState::tearing_down` mirrors that window for
//! observers of `state()` and `subscribe_state()`, which do not take the lock.

use super::binding::EngineBinding;
use super::state::{ActivateOptions, ActivateOutcome, CoordinatorPhase};
use super::CoordinatorInner;
use crate::error::LoadError;
use crate::host::PlayError;
use crate::registry::{Slot, SlotId};
use feedplay_common::events::{FeedEvent, SourceKind};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

impl CoordinatorInner {
    /// Full activation sequence for one request
    ///
    /// The sweep already ran in the caller before the ticket was drawn.
    pub(super) async fn run_activation(
        self: Arc<Self>,
        slot_id: SlotId,
        options: ActivateOptions,
        ticket: u64,
    ) -> ActivateOutcome {
        let mut binding = self.binding.lock().await;

        if self.destroyed.load(Ordering::SeqCst) {
            return ActivateOutcome::Destroyed;
        }

        if self.config.coalesce_activations && self.requests.load(Ordering::SeqCst) != ticket {
            debug!("Activation of {} superseded by a newer request", slot_id);
            return ActivateOutcome::Superseded;
        }

        let Some(slot) = self.registry.get(&slot_id) else {
            warn!("Activation requested for unknown slot {}", slot_id);
            self.events.emit_lossy(FeedEvent::UnknownSlot {
                slot_id: slot_id.to_string(),
                timestamp: chrono::Utc::now(),
            });
            return ActivateOutcome::UnknownSlot;
        };

        match self.active_slot() {
            Some(current) if current == slot_id => {
                match binding.loaded_kind() {
                    Some(kind) if binding.holds(&slot) => {
                        return self.reactivate(&slot, kind, options).await;
                    }
                    Some(_) => debug!("Slot {} re-registered since activation, reloading", slot_id),
                    None => debug!("Slot {} active without a playable source, reloading", slot_id),
                }
                self.teardown(&mut binding).await;
            }
            Some(current) => {
                debug!("Handing off {} -> {}", current, slot_id);
                self.teardown(&mut binding).await;
            }
            None => {}
        }

        self.attach_and_start(&mut binding, &slot, options).await
    }

    /// Attach, mute, load, seek, play; then record the new lessee
    async fn attach_and_start(
        &self,
        binding: &mut EngineBinding,
        slot: &Slot,
        options: ActivateOptions,
    ) -> ActivateOutcome {
        self.state.send_modify(|s| s.phase = CoordinatorPhase::Activating);

        self.element.attach(&slot.surface);
        binding.record_lease(slot);
        self.element.set_muted(options.muted);

        let loaded = binding.load_source(&slot.sources, &self.config).await;
        let outcome = match loaded {
            Ok(kind) => {
                self.seek_when_ready(options.start_at).await;
                let outcome = self.attempt_play(&slot.id, kind).await;
                if matches!(outcome, ActivateOutcome::LoadFailed { .. }) {
                    binding.mark_unplayable();
                } else {
                    info!("Slot {} active ({})", slot.id, kind);
                    self.events.emit_lossy(FeedEvent::SlotActivated {
                        slot_id: slot.id.to_string(),
                        source_kind: kind,
                        muted: options.muted,
                        timestamp: chrono::Utc::now(),
                    });
                }
                outcome
            }
            Err(LoadError { kind, reason }) => self.load_failed(&slot.id, kind, reason),
        };

        // The slot holds the lease even after a load failure; the next
        // hand-off tears it down through the normal path.
        let slot_id = slot.id.clone();
        self.state.send_modify(move |s| {
            s.active_slot = Some(slot_id);
            s.phase = CoordinatorPhase::Active;
        });
        outcome
    }

    /// Same slot requested again: keep the source, re-apply mute/seek/play
    async fn reactivate(
        &self,
        slot: &Slot,
        kind: SourceKind,
        options: ActivateOptions,
    ) -> ActivateOutcome {
        debug!("Slot {} already active, re-applying options", slot.id);
        self.element.set_muted(options.muted);
        self.seek_when_ready(options.start_at).await;
        self.attempt_play(&slot.id, kind).await
    }

    async fn seek_when_ready(&self, start_at: Option<f64>) {
        let Some(position) = start_at.filter(|secs| *secs > 0.0) else {
            return;
        };
        match timeout(self.config.ready_timeout(), self.element.wait_ready()).await {
            Ok(Ok(())) => {
                debug!("Seeking to {:.3}s", position);
                self.element.set_current_time(position);
            }
            Ok(Err(e)) => warn!("Skipping seek to {:.3}s: {}", position, e),
            Err(_) => warn!(
                "Skipping seek to {:.3}s: not ready within {:?}",
                position,
                self.config.ready_timeout()
            ),
        }
    }

    /// Request playback; rejection by policy is informational only
    async fn attempt_play(&self, slot_id: &SlotId, kind: SourceKind) -> ActivateOutcome {
        if self.snapshot().hidden {
            return self.deferred(slot_id, "host page hidden".to_string());
        }

        match self.element.play().await {
            Ok(()) => ActivateOutcome::Playing,
            Err(PlayError::NotAllowed(reason)) => {
                info!("Playback of {} not permitted yet: {}", slot_id, reason);
                self.deferred(slot_id, reason)
            }
            Err(PlayError::Source(reason)) => self.load_failed(slot_id, kind, reason),
        }
    }

    fn deferred(&self, slot_id: &SlotId, reason: String) -> ActivateOutcome {
        self.events.emit_lossy(FeedEvent::PlaybackDeferred {
            slot_id: slot_id.to_string(),
            reason: reason.clone(),
            timestamp: chrono::Utc::now(),
        });
        ActivateOutcome::PlaybackDeferred { reason }
    }

    fn load_failed(&self, slot_id: &SlotId, kind: SourceKind, reason: String) -> ActivateOutcome {
        error!("Load failed for slot {} ({}): {}", slot_id, kind, reason);
        self.events.emit_lossy(FeedEvent::LoadFailed {
            slot_id: slot_id.to_string(),
            source_kind: kind,
            reason: reason.clone(),
            timestamp: chrono::Utc::now(),
        });
        ActivateOutcome::LoadFailed { reason }
    }

    /// Targeted teardown of whatever the resource currently holds
    ///
    /// Not reentrant: returns false if a teardown is already in flight.
    pub(super) async fn teardown(&self, binding: &mut EngineBinding) -> bool {
        let state = self.snapshot();
        if state.tearing_down {
            debug!("Teardown already in flight");
            return false;
        }
        let previous = state.active_slot;

        self.state.send_modify(|s| {
            s.tearing_down = true;
            s.phase = CoordinatorPhase::Deactivating;
        });

        // Silence first, before any suspension point.
        self.element.pause();
        self.element.set_muted(true);
        self.element.set_current_time(0.0);

        binding.release();

        sleep(self.config.teardown_grace()).await;

        self.element.detach();

        self.state.send_modify(|s| {
            s.active_slot = None;
            s.tearing_down = false;
            s.phase = CoordinatorPhase::Idle;
        });

        if let Some(slot_id) = previous {
            info!("Slot {} deactivated", slot_id);
            self.events.emit_lossy(FeedEvent::SlotDeactivated {
                slot_id: slot_id.to_string(),
                timestamp: chrono::Utc::now(),
            });
        }
        true
    }
}
