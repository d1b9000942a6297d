//! In-memory playback instance

use super::document::HostShared;
use super::journal::HostOp;
use crate::host::{EngineError, MediaElement, MediaElementId, PlayError, SurfaceHandle, HLS_MIME_TYPE};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Weak;

#[derive(Debug)]
struct ElementState {
    paused: bool,
    muted: bool,
    current_time: f64,
    source: Option<String>,
    loaded: bool,
    surface: Option<SurfaceHandle>,
}

/// Playback instance living in a [`super::SimDocument`]
///
/// Starts paused, unmuted, without a source and detached.
pub struct SimElement {
    id: MediaElementId,
    shared: Weak<HostShared>,
    state: Mutex<ElementState>,
}

impl SimElement {
    pub(super) fn new(shared: Weak<HostShared>) -> Self {
        Self {
            id: MediaElementId::new(),
            shared,
            state: Mutex::new(ElementState {
                paused: true,
                muted: false,
                current_time: 0.0,
                source: None,
                loaded: false,
                surface: None,
            }),
        }
    }

    /// Whether a source is assigned and `load` was requested for it
    pub fn is_loaded(&self) -> bool {
        self.state.lock().loaded
    }

    /// Start playing without going through autoplay policy (stray/rogue instances)
    pub(super) fn begin_playback(&self) {
        self.state.lock().paused = false;
        self.record(HostOp::Play);
    }

    fn record(&self, op: HostOp) {
        if let Some(shared) = self.shared.upgrade() {
            shared.journal.record(self.id, op);
        }
    }
}

#[async_trait]
impl MediaElement for SimElement {
    fn id(&self) -> MediaElementId {
        self.id
    }

    fn pause(&self) {
        self.state.lock().paused = true;
        self.record(HostOp::Pause);
    }

    fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    fn set_muted(&self, muted: bool) {
        self.state.lock().muted = muted;
        self.record(HostOp::Mute(muted));
    }

    fn is_muted(&self) -> bool {
        self.state.lock().muted
    }

    fn set_current_time(&self, secs: f64) {
        self.state.lock().current_time = secs.max(0.0);
        self.record(HostOp::Seek(secs));
    }

    fn current_time(&self) -> f64 {
        self.state.lock().current_time
    }

    fn set_source(&self, url: &str) {
        {
            let mut state = self.state.lock();
            state.source = Some(url.to_string());
            state.loaded = false;
        }
        self.record(HostOp::SetSource(url.to_string()));
    }

    fn source(&self) -> Option<String> {
        self.state.lock().source.clone()
    }

    fn load(&self) {
        {
            let mut state = self.state.lock();
            state.loaded = state.source.is_some();
            state.paused = true;
        }
        self.record(HostOp::Load);
    }

    fn release_source(&self) {
        {
            let mut state = self.state.lock();
            state.source = None;
            state.loaded = false;
            state.paused = true;
        }
        self.record(HostOp::ReleaseSource);
    }

    fn can_play_type(&self, mime: &str) -> bool {
        if mime == HLS_MIME_TYPE {
            return self
                .shared
                .upgrade()
                .map(|shared| shared.faults.lock().native_hls)
                .unwrap_or(false);
        }
        mime.starts_with("video/mp4") || mime.starts_with("video/webm")
    }

    fn attach(&self, surface: &SurfaceHandle) {
        self.state.lock().surface = Some(surface.clone());
        self.record(HostOp::Attach(surface.clone()));
    }

    fn detach(&self) {
        self.state.lock().surface = None;
        self.record(HostOp::Detach);
    }

    fn attached_surface(&self) -> Option<SurfaceHandle> {
        self.state.lock().surface.clone()
    }

    async fn play(&self) -> Result<(), PlayError> {
        let Some(shared) = self.shared.upgrade() else {
            return Err(PlayError::Source("document discarded".to_string()));
        };

        let source = self.state.lock().source.clone();
        let rejection = {
            let faults = shared.faults.lock();
            match &source {
                None => Some(PlayError::Source("no source assigned".to_string())),
                Some(url) if faults.failing_sources.contains(url) => {
                    Some(PlayError::Source(format!("{} could not be decoded", url)))
                }
                Some(_) if faults.reject_play => Some(PlayError::NotAllowed(
                    "play() requires a user gesture".to_string(),
                )),
                Some(_) => None,
            }
        };

        if let Some(err) = rejection {
            self.record(HostOp::PlayRejected(err.to_string()));
            return Err(err);
        }

        self.begin_playback();
        shared.dispatch_play(self.id);
        Ok(())
    }

    async fn wait_ready(&self) -> Result<(), EngineError> {
        let (source, loaded) = {
            let state = self.state.lock();
            (state.source.clone(), state.loaded)
        };
        let Some(url) = source else {
            return Err(EngineError::Media("no source assigned".to_string()));
        };
        if !loaded {
            return Err(EngineError::Media(format!("{} was never loaded", url)));
        }
        let failing = self
            .shared
            .upgrade()
            .map(|shared| shared.faults.lock().failing_sources.contains(&url))
            .unwrap_or(false);
        if failing {
            return Err(EngineError::Media(format!("{} could not be decoded", url)));
        }
        Ok(())
    }
}
