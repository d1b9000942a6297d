//! Engine binding: the owned resource plus its optional adaptive session
//!
//! Source selection is evaluated at load time so the capability probe is
//! always fresh:
//! 1. adaptive URL + supported adaptive runtime -> streaming session
//! 2. adaptive URL + resource plays the format natively -> direct assignment
//! 3. otherwise -> progressive fallback
//!
//! Any previous session is destroyed before a new source of either kind loads.

use crate::config::CoordinatorConfig;
use crate::error::LoadError;
use crate::host::{AdaptiveSession, AdaptiveStreaming, MediaElement, SurfaceHandle, HLS_MIME_TYPE};
use crate::registry::{Slot, SourceSet};
use feedplay_common::events::SourceKind;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, warn};

pub(crate) struct EngineBinding {
    element: Arc<dyn MediaElement>,
    adaptive: Arc<dyn AdaptiveStreaming>,
    session: Option<Box<dyn AdaptiveSession>>,
    /// Path taken by the currently loaded source
    loaded: Option<SourceKind>,
    /// Registry entry the resource was attached for
    lease: Option<(SurfaceHandle, Arc<SourceSet>)>,
}

impl EngineBinding {
    pub(crate) fn new(element: Arc<dyn MediaElement>, adaptive: Arc<dyn AdaptiveStreaming>) -> Self {
        Self {
            element,
            adaptive,
            session: None,
            loaded: None,
            lease: None,
        }
    }

    pub(crate) fn loaded_kind(&self) -> Option<SourceKind> {
        self.loaded
    }

    /// Remember the surface and sources of the slot just attached
    pub(crate) fn record_lease(&mut self, slot: &Slot) {
        self.lease = Some((slot.surface.clone(), Arc::clone(&slot.sources)));
    }

    /// Whether the resource still holds exactly this registry entry
    ///
    /// A re-registration swaps the `SourceSet` allocation, so pointer
    /// identity tells a remounted slot apart from the leased one.
    pub(crate) fn holds(&self, slot: &Slot) -> bool {
        match &self.lease {
            Some((surface, sources)) => {
                *surface == slot.surface && Arc::ptr_eq(sources, &slot.sources)
            }
            None => false,
        }
    }

    /// Forget the loaded source after the resource reported it unplayable
    pub(crate) fn mark_unplayable(&mut self) {
        self.loaded = None;
    }

    /// Destroy the session and release the source from the resource
    pub(crate) fn release(&mut self) {
        self.destroy_session();
        self.element.release_source();
        self.loaded = None;
        self.lease = None;
    }

    #[cfg(test)]
    pub(crate) fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Destroy and null the adaptive session, if any
    pub(crate) fn destroy_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.destroy();
            debug!("Adaptive session destroyed");
        }
    }

    /// Load the preferred source onto the resource
    ///
    /// No fallback after a failure: the branch is chosen once, here.
    pub(crate) async fn load_source(
        &mut self,
        sources: &SourceSet,
        config: &CoordinatorConfig,
    ) -> Result<SourceKind, LoadError> {
        self.destroy_session();
        self.loaded = None;

        let kind = self.select_and_load(sources, config).await?;
        self.loaded = Some(kind);
        Ok(kind)
    }

    async fn select_and_load(
        &mut self,
        sources: &SourceSet,
        config: &CoordinatorConfig,
    ) -> Result<SourceKind, LoadError> {
        if let Some(url) = sources.adaptive_url() {
            if self.adaptive.is_supported() {
                self.load_adaptive(url, config).await?;
                return Ok(SourceKind::Adaptive);
            }
            if self.element.can_play_type(HLS_MIME_TYPE) {
                debug!("Resource plays adaptive streams natively: {}", url);
                self.element.set_source(url);
                self.element.load();
                return Ok(SourceKind::NativeAdaptive);
            }
            debug!("Adaptive streaming unavailable, using progressive fallback");
        }

        self.element.set_source(sources.progressive_url());
        self.element.load();
        Ok(SourceKind::Progressive)
    }

    async fn load_adaptive(
        &mut self,
        url: &str,
        config: &CoordinatorConfig,
    ) -> Result<(), LoadError> {
        let mut session = self
            .adaptive
            .create_session(&config.adaptive)
            .map_err(|e| LoadError::new(SourceKind::Adaptive, e))?;
        session.attach_media(Arc::clone(&self.element));
        session.load_source(url);

        let parsed = timeout(config.manifest_timeout(), session.manifest_parsed()).await;
        match parsed {
            Ok(Ok(())) => {
                debug!("Manifest parsed: {}", url);
                self.session = Some(session);
                Ok(())
            }
            Ok(Err(e)) => {
                session.destroy();
                Err(LoadError::new(SourceKind::Adaptive, e))
            }
            Err(_) => {
                warn!(
                    "Manifest not parsed within {:?}: {}",
                    config.manifest_timeout(),
                    url
                );
                session.destroy();
                Err(LoadError::new(
                    SourceKind::Adaptive,
                    format!("manifest not parsed within {:?}", config.manifest_timeout()),
                ))
            }
        }
    }
}
