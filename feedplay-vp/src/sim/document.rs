//! In-memory document hosting every playback instance

use super::adaptive::SimAdaptive;
use super::element::SimElement;
use super::journal::Journal;
use crate::config::CoordinatorConfig;
use crate::coordinator::PlaybackCoordinator;
use crate::host::{ListenerId, MediaDocument, MediaElement, MediaElementId, PlayListener};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Injected host behavior
#[derive(Debug)]
pub(super) struct Faults {
    pub(super) reject_play: bool,
    pub(super) native_hls: bool,
    pub(super) adaptive_supported: bool,
    pub(super) failing_manifests: HashSet<String>,
    pub(super) failing_sources: HashSet<String>,
    pub(super) manifest_delay: Duration,
}

impl Default for Faults {
    fn default() -> Self {
        Self {
            reject_play: false,
            native_hls: false,
            adaptive_supported: true,
            failing_manifests: HashSet::new(),
            failing_sources: HashSet::new(),
            manifest_delay: Duration::ZERO,
        }
    }
}

pub(crate) struct HostShared {
    elements: Mutex<Vec<Arc<SimElement>>>,
    listeners: Mutex<Vec<(ListenerId, PlayListener)>>,
    next_listener: AtomicU64,
    pub(super) journal: Journal,
    pub(super) faults: Mutex<Faults>,
    pub(super) live_sessions: AtomicUsize,
    pub(super) sessions_created: AtomicUsize,
}

impl HostShared {
    fn element(&self, id: MediaElementId) -> Option<Arc<SimElement>> {
        self.elements
            .lock()
            .iter()
            .find(|element| element.id() == id)
            .cloned()
    }

    /// Run every play listener for `id`, with no host lock held
    pub(super) fn dispatch_play(&self, id: MediaElementId) {
        let Some(element) = self.element(id) else {
            return;
        };
        let element: Arc<dyn MediaElement> = element;
        let listeners: Vec<PlayListener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(&element);
        }
    }
}

/// In-memory [`MediaDocument`] with fault injection and a call journal
///
/// Cloning shares the same document.
#[derive(Clone)]
pub struct SimDocument {
    shared: Arc<HostShared>,
}

impl SimDocument {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(HostShared {
                elements: Mutex::new(Vec::new()),
                listeners: Mutex::new(Vec::new()),
                next_listener: AtomicU64::new(1),
                journal: Journal::new(),
                faults: Mutex::new(Faults::default()),
                live_sessions: AtomicUsize::new(0),
                sessions_created: AtomicUsize::new(0),
            }),
        }
    }

    /// Add a new, idle playback instance to the document
    pub fn create_element(&self) -> Arc<SimElement> {
        let element = Arc::new(SimElement::new(Arc::downgrade(&self.shared)));
        self.shared.elements.lock().push(Arc::clone(&element));
        element
    }

    /// Adaptive-streaming runtime backed by this document
    pub fn adaptive(&self) -> Arc<SimAdaptive> {
        Arc::new(SimAdaptive::new(Arc::downgrade(&self.shared)))
    }

    /// Build a coordinator owning a fresh instance of this document
    pub fn coordinator(&self, config: CoordinatorConfig) -> PlaybackCoordinator {
        let element: Arc<dyn MediaElement> = self.create_element();
        PlaybackCoordinator::new(config, Arc::new(self.clone()), element, self.adaptive())
    }

    /// Create an unrelated, audible instance that is already playing
    pub fn spawn_stray(&self, url: &str) -> Arc<SimElement> {
        let element = self.create_element();
        element.set_source(url);
        element.load();
        element.set_muted(false);
        element.begin_playback();
        self.shared.dispatch_play(element.id());
        element
    }

    /// Start any instance playing, bypassing autoplay policy
    pub fn start_playback(&self, id: MediaElementId) -> bool {
        let Some(element) = self.shared.element(id) else {
            return false;
        };
        element.begin_playback();
        self.shared.dispatch_play(id);
        true
    }

    pub fn element(&self, id: MediaElementId) -> Option<Arc<SimElement>> {
        self.shared.element(id)
    }

    /// Instances currently not paused
    pub fn playing_elements(&self) -> Vec<MediaElementId> {
        self.shared
            .elements
            .lock()
            .iter()
            .filter(|element| !element.is_paused())
            .map(|element| element.id())
            .collect()
    }

    /// Instances currently playing with sound
    pub fn audible_elements(&self) -> Vec<MediaElementId> {
        self.shared
            .elements
            .lock()
            .iter()
            .filter(|element| !element.is_paused() && !element.is_muted())
            .map(|element| element.id())
            .collect()
    }

    pub fn journal(&self) -> Journal {
        self.shared.journal.clone()
    }

    pub fn listener_count(&self) -> usize {
        self.shared.listeners.lock().len()
    }

    /// Sessions created and not yet destroyed
    pub fn live_sessions(&self) -> usize {
        self.shared.live_sessions.load(Ordering::SeqCst)
    }

    pub fn sessions_created(&self) -> usize {
        self.shared.sessions_created.load(Ordering::SeqCst)
    }

    pub fn set_reject_play(&self, reject: bool) {
        self.shared.faults.lock().reject_play = reject;
    }

    pub fn set_native_hls(&self, native: bool) {
        self.shared.faults.lock().native_hls = native;
    }

    pub fn set_adaptive_supported(&self, supported: bool) {
        self.shared.faults.lock().adaptive_supported = supported;
    }

    pub fn fail_manifest(&self, url: &str) {
        self.shared.faults.lock().failing_manifests.insert(url.to_string());
    }

    pub fn fail_source(&self, url: &str) {
        self.shared.faults.lock().failing_sources.insert(url.to_string());
    }

    pub fn set_manifest_delay(&self, delay: Duration) {
        self.shared.faults.lock().manifest_delay = delay;
    }
}

impl Default for SimDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaDocument for SimDocument {
    fn media_elements(&self) -> Vec<Arc<dyn MediaElement>> {
        self.shared
            .elements
            .lock()
            .iter()
            .map(|element| Arc::clone(element) as Arc<dyn MediaElement>)
            .collect()
    }

    fn add_play_listener(&self, listener: PlayListener) -> ListenerId {
        let id = ListenerId(self.shared.next_listener.fetch_add(1, Ordering::SeqCst));
        self.shared.listeners.lock().push((id, listener));
        id
    }

    fn remove_play_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.shared.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }
}
