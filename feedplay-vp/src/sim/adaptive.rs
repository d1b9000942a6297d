//! In-memory adaptive-streaming runtime

use super::document::HostShared;
use super::journal::HostOp;
use crate::host::{AdaptiveSession, AdaptiveSessionConfig, AdaptiveStreaming, EngineError, MediaElement};
use async_trait::async_trait;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Weak};
use tracing::debug;

/// Adaptive runtime whose support flag and failures come from the document faults
pub struct SimAdaptive {
    shared: Weak<HostShared>,
}

impl SimAdaptive {
    pub(super) fn new(shared: Weak<HostShared>) -> Self {
        Self { shared }
    }
}

impl AdaptiveStreaming for SimAdaptive {
    fn is_supported(&self) -> bool {
        self.shared
            .upgrade()
            .map(|shared| shared.faults.lock().adaptive_supported)
            .unwrap_or(false)
    }

    fn create_session(
        &self,
        config: &AdaptiveSessionConfig,
    ) -> Result<Box<dyn AdaptiveSession>, EngineError> {
        let shared = self
            .shared
            .upgrade()
            .ok_or_else(|| EngineError::Session("document discarded".to_string()))?;
        shared.sessions_created.fetch_add(1, Ordering::SeqCst);
        shared.live_sessions.fetch_add(1, Ordering::SeqCst);
        debug!(
            "Sim session created (worker={}, back_buffer={}s)",
            config.enable_worker, config.back_buffer_length_secs
        );
        Ok(Box::new(SimSession {
            shared: self.shared.clone(),
            element: None,
            url: None,
            destroyed: false,
        }))
    }
}

/// Session that "parses" a manifest by assigning a blob source to its element
///
/// Dropping a session without `destroy` leaves it counted as live, which is
/// how tests detect orphaned sessions.
pub struct SimSession {
    shared: Weak<HostShared>,
    element: Option<Arc<dyn MediaElement>>,
    url: Option<String>,
    destroyed: bool,
}

impl SimSession {
    fn record(&self, op: HostOp) {
        if let (Some(shared), Some(element)) = (self.shared.upgrade(), &self.element) {
            shared.journal.record(element.id(), op);
        }
    }
}

#[async_trait]
impl AdaptiveSession for SimSession {
    fn attach_media(&mut self, element: Arc<dyn MediaElement>) {
        self.element = Some(element);
        self.record(HostOp::SessionAttached);
    }

    fn load_source(&mut self, url: &str) {
        self.url = Some(url.to_string());
        self.record(HostOp::SessionLoad(url.to_string()));
    }

    async fn manifest_parsed(&mut self) -> Result<(), EngineError> {
        let (delay, failing) = {
            let Some(shared) = self.shared.upgrade() else {
                return Err(EngineError::Session("document discarded".to_string()));
            };
            let faults = shared.faults.lock();
            let failing = self
                .url
                .as_ref()
                .map(|url| faults.failing_manifests.contains(url))
                .unwrap_or(false);
            (faults.manifest_delay, failing)
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let Some(url) = self.url.clone() else {
            return Err(EngineError::Manifest("no manifest loaded".to_string()));
        };
        if failing {
            return Err(EngineError::Manifest(format!("{} returned 404", url)));
        }
        let Some(element) = &self.element else {
            return Err(EngineError::Media("no media attached".to_string()));
        };

        element.set_source(&format!("blob:{}", url));
        element.load();
        Ok(())
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.record(HostOp::SessionDestroyed);
        if let Some(shared) = self.shared.upgrade() {
            shared.live_sessions.fetch_sub(1, Ordering::SeqCst);
        }
        self.element = None;
    }
}
