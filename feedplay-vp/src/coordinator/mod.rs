//! Exclusive playback coordinator
//!
//! Dozens of feed slots may be registered at once, but a single owned
//! decode/render resource is leased to at most one of them. Hand-off always
//! releases the previous lessee completely before the next one is attached.
//!
//! **Module Structure:**
//! - `state.rs`: phase, observable state, activation options and outcomes
//! - `binding.rs`: the owned resource's adaptive session and source loading
//! - `sequencer.rs`: activation hand-off and targeted teardown
//! - `fence.rs`: document-wide sweep and capture-phase play listener
//! - `lifecycle.rs`: visibility hook and destroy

mod binding;
mod fence;
mod lifecycle;
mod sequencer;
mod state;

pub use state::{ActivateOptions, ActivateOutcome, CoordinatorPhase, CoordinatorState};

use crate::config::CoordinatorConfig;
use crate::host::{AdaptiveStreaming, ListenerId, MediaDocument, MediaElement, MediaElementId, SurfaceHandle};
use crate::registry::{Slot, SlotId, SlotRegistry, SourceSet};
use binding::EngineBinding;
use feedplay_common::events::{EventBus, FeedEvent};
use parking_lot::Mutex as SyncMutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch, Mutex};
use tracing::{debug, error, info};

/// Playback coordinator handle
///
/// Cheap to clone; every clone drives the same coordinator.
#[derive(Clone)]
pub struct PlaybackCoordinator {
    inner: Arc<CoordinatorInner>,
}

pub(crate) struct CoordinatorInner {
    config: CoordinatorConfig,
    document: Arc<dyn MediaDocument>,

    /// The one owned resource, shared with `binding` for lock-free pause/mute
    element: Arc<dyn MediaElement>,
    owned_id: MediaElementId,

    registry: SlotRegistry,

    /// Single writer of the resource; FIFO so queued activations run in order
    binding: Mutex<EngineBinding>,

    state: watch::Sender<CoordinatorState>,
    events: EventBus,

    /// Ticket counter for "latest call wins" coalescing
    requests: AtomicU64,

    play_listener: SyncMutex<Option<ListenerId>>,
    destroyed: AtomicBool,
}

impl PlaybackCoordinator {
    /// Create a coordinator owning `element` for its whole lifetime
    ///
    /// `element` must belong to `document` so the sweep can recognize it.
    /// Installs the document-wide play listener immediately.
    pub fn new(
        config: CoordinatorConfig,
        document: Arc<dyn MediaDocument>,
        element: Arc<dyn MediaElement>,
        adaptive: Arc<dyn AdaptiveStreaming>,
    ) -> Self {
        let events = EventBus::new(config.event_capacity);
        let owned_id = element.id();
        let (state, _) = watch::channel(CoordinatorState::default());

        let listener_id =
            document.add_play_listener(fence::play_guard(owned_id, events.clone()));
        info!("Playback coordinator created (resource {})", owned_id);

        Self {
            inner: Arc::new(CoordinatorInner {
                binding: Mutex::new(EngineBinding::new(Arc::clone(&element), adaptive)),
                config,
                document,
                element,
                owned_id,
                registry: SlotRegistry::new(),
                state,
                events,
                requests: AtomicU64::new(0),
                play_listener: SyncMutex::new(Some(listener_id)),
                destroyed: AtomicBool::new(false),
            }),
        }
    }

    /// Register or replace a slot; no effect on current playback
    pub fn register_slot(
        &self,
        slot_id: impl Into<SlotId>,
        surface: SurfaceHandle,
        sources: SourceSet,
    ) {
        let slot = Slot {
            id: slot_id.into(),
            surface,
            sources: Arc::new(sources),
        };
        debug!("Registering slot {}", slot.id);
        if self.inner.registry.insert(slot).is_some() {
            debug!("Slot replaced");
        }
    }

    /// Remove a slot, tearing it down first if it holds the resource
    ///
    /// Returns false if the slot was not registered.
    pub async fn unregister_slot(&self, slot_id: impl Into<SlotId>) -> bool {
        let slot_id = slot_id.into();
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            let mut binding = inner.binding.lock().await;
            if inner.active_slot().as_ref() == Some(&slot_id) {
                info!("Unregistering active slot {}, tearing down", slot_id);
                inner.teardown(&mut binding).await;
            }
            inner.registry.remove(&slot_id).is_some()
        });
        match task.await {
            Ok(removed) => removed,
            Err(e) => {
                error!("Unregister task failed: {}", e);
                false
            }
        }
    }

    /// Make `slot_id` the one playing slot
    ///
    /// Returns once playback has been requested, not once it is confirmed.
    /// The sequence runs in its own task: dropping the returned future does
    /// not abort a teardown that has already started.
    pub async fn activate(
        &self,
        slot_id: impl Into<SlotId>,
        options: ActivateOptions,
    ) -> ActivateOutcome {
        let slot_id = slot_id.into();
        if self.inner.destroyed.load(Ordering::SeqCst) {
            debug!("Activation of {} ignored, coordinator destroyed", slot_id);
            return ActivateOutcome::Destroyed;
        }

        self.inner.silence_all();
        let ticket = self.inner.requests.fetch_add(1, Ordering::SeqCst) + 1;

        let inner = Arc::clone(&self.inner);
        match tokio::spawn(inner.run_activation(slot_id, options, ticket)).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Activation task failed: {}", e);
                ActivateOutcome::LoadFailed {
                    reason: format!("activation task failed: {}", e),
                }
            }
        }
    }

    /// Run the targeted teardown of the active slot, if any
    pub async fn deactivate(&self) -> bool {
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            let mut binding = inner.binding.lock().await;
            if inner.active_slot().is_none() {
                return false;
            }
            inner.teardown(&mut binding).await
        });
        task.await.unwrap_or_else(|e| {
            error!("Deactivation task failed: {}", e);
            false
        })
    }

    /// Pause and mute the owned resource; keeps the source loaded
    pub fn pause_all(&self) {
        self.inner.pause_all();
    }

    /// Toggle mute on the owned resource only
    pub fn set_muted(&self, muted: bool) {
        debug!("Set muted: {}", muted);
        self.inner.element.set_muted(muted);
    }

    /// The owned resource while a slot holds it
    pub fn active_element(&self) -> Option<Arc<dyn MediaElement>> {
        self.inner
            .active_slot()
            .map(|_| Arc::clone(&self.inner.element))
    }

    /// Stop every instance in the document other than the owned one
    ///
    /// Returns how many were audible or playing. Runs automatically at the
    /// start of every activation.
    pub fn silence_all(&self) -> usize {
        self.inner.silence_all()
    }

    pub fn active_slot(&self) -> Option<SlotId> {
        self.inner.active_slot()
    }

    pub fn state(&self) -> CoordinatorState {
        self.inner.snapshot()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<CoordinatorState> {
        self.inner.state.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<FeedEvent> {
        self.inner.events.subscribe()
    }

    pub fn owned_element_id(&self) -> MediaElementId {
        self.inner.owned_id
    }

    pub fn slot_ids(&self) -> Vec<SlotId> {
        self.inner.registry.ids()
    }

    pub fn slot_count(&self) -> usize {
        self.inner.registry.len()
    }

    pub fn contains_slot(&self, slot_id: impl Into<SlotId>) -> bool {
        self.inner.registry.contains(&slot_id.into())
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }
}

impl CoordinatorInner {
    pub(crate) fn snapshot(&self) -> CoordinatorState {
        self.state.borrow().clone()
    }

    pub(crate) fn active_slot(&self) -> Option<SlotId> {
        self.state.borrow().active_slot.clone()
    }

    pub(crate) fn pause_all(&self) {
        debug!("Pausing owned resource");
        self.element.pause();
        self.element.set_muted(true);
    }
}
