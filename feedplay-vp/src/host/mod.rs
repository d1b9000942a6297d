//! Host seams: the document, its playback instances and the adaptive-streaming runtime
//!
//! The coordinator never talks to a platform directly. Everything it drives
//! goes through these traits so a browser binding, a native player or the
//! in-memory [`crate::sim`] host can sit underneath it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// MIME type probed to decide whether a resource plays adaptive streams natively
pub const HLS_MIME_TYPE: &str = "application/vnd.apple.mpegurl";

/// Identity of one playback instance in the document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaElementId(Uuid);

impl MediaElementId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MediaElementId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MediaElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Caller-owned mount point the resource can be attached to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurfaceHandle(Arc<str>);

impl SurfaceHandle {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SurfaceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rejection of a play request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlayError {
    /// Playback is not permitted yet (autoplay policy, missing user gesture)
    #[error("playback not allowed: {0}")]
    NotAllowed(String),

    /// The loaded source cannot be played
    #[error("source cannot play: {0}")]
    Source(String),
}

/// Engine-level failure while loading a source
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Adaptive manifest could not be fetched or parsed
    #[error("manifest error: {0}")]
    Manifest(String),

    /// Media pipeline error on the resource itself
    #[error("media error: {0}")]
    Media(String),

    /// Streaming session could not be created
    #[error("session unavailable: {0}")]
    Session(String),
}

/// One playback instance (decode/render resource)
///
/// Mutators take `&self`: an instance is shared between the document that
/// enumerates it and whoever drives it, and implementations synchronize
/// internally.
#[async_trait]
pub trait MediaElement: Send + Sync {
    fn id(&self) -> MediaElementId;

    fn pause(&self);
    fn is_paused(&self) -> bool;

    fn set_muted(&self, muted: bool);
    fn is_muted(&self) -> bool;

    /// Playback position in seconds
    fn set_current_time(&self, secs: f64);
    fn current_time(&self) -> f64;

    fn set_source(&self, url: &str);
    fn source(&self) -> Option<String>;

    /// Ask the pipeline to (re)load whatever source is assigned
    fn load(&self);

    /// Drop the source and have the pipeline free its decode buffers
    ///
    /// Stronger than `pause`: afterwards the instance holds no media.
    fn release_source(&self);

    fn can_play_type(&self, mime: &str) -> bool;

    fn attach(&self, surface: &SurfaceHandle);
    fn detach(&self);
    fn attached_surface(&self) -> Option<SurfaceHandle>;

    /// Request playback; resolves once the request is accepted or rejected
    async fn play(&self) -> Result<(), PlayError>;

    /// Resolves when the loaded source has metadata and can be seeked
    async fn wait_ready(&self) -> Result<(), EngineError>;
}

/// Capture-phase "playback started" listener
pub type PlayListener = Arc<dyn Fn(&Arc<dyn MediaElement>) + Send + Sync>;

/// Handle returned when a listener is installed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// The document hosting every playback instance
pub trait MediaDocument: Send + Sync {
    /// Every playback instance currently present, owned or not
    fn media_elements(&self) -> Vec<Arc<dyn MediaElement>>;

    /// Install a listener invoked synchronously whenever any instance starts playing
    fn add_play_listener(&self, listener: PlayListener) -> ListenerId;

    /// Remove a listener; returns false if it was not installed
    fn remove_play_listener(&self, id: ListenerId) -> bool;
}

/// Settings for a new adaptive-streaming session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveSessionConfig {
    /// Parse/transmux in a worker
    pub enable_worker: bool,
    /// Seconds of already-played media retained behind the playhead
    pub back_buffer_length_secs: u32,
    pub low_latency_mode: bool,
}

impl Default for AdaptiveSessionConfig {
    fn default() -> Self {
        Self {
            enable_worker: true,
            back_buffer_length_secs: 30,
            low_latency_mode: false,
        }
    }
}

/// Adaptive-streaming runtime (capability probe + session factory)
pub trait AdaptiveStreaming: Send + Sync {
    /// Checked at every load, never cached
    fn is_supported(&self) -> bool;

    fn create_session(
        &self,
        config: &AdaptiveSessionConfig,
    ) -> Result<Box<dyn AdaptiveSession>, EngineError>;
}

/// One adaptive-streaming session bound to one resource
#[async_trait]
pub trait AdaptiveSession: Send {
    fn attach_media(&mut self, element: Arc<dyn MediaElement>);

    fn load_source(&mut self, url: &str);

    /// Resolves on the manifest-parsed signal, or with the engine's error
    async fn manifest_parsed(&mut self) -> Result<(), EngineError>;

    /// Detach from the resource and free everything the session holds
    fn destroy(&mut self);
}
