//! Lifecycle hooks: host visibility and destroy

use super::{CoordinatorInner, PlaybackCoordinator};
use feedplay_common::events::{FeedEvent, Visibility};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

impl PlaybackCoordinator {
    /// Host page visibility changed
    ///
    /// Hidden pauses everything (when `pause_on_hidden`), and activations
    /// made while hidden load their source but defer playback. Becoming
    /// visible again does not resume anything by itself.
    pub fn set_visibility(&self, visibility: Visibility) {
        let hidden = visibility == Visibility::Hidden;
        let changed = self.inner.state.send_if_modified(|s| {
            let changed = s.hidden != hidden;
            s.hidden = hidden;
            changed
        });
        if !changed {
            return;
        }

        info!("Host page {}", visibility);
        self.inner.events.emit_lossy(FeedEvent::VisibilityChanged {
            visibility,
            timestamp: chrono::Utc::now(),
        });
        if hidden && self.inner.config.pause_on_hidden {
            self.inner.pause_all();
        }
    }

    /// Follow a visibility feed until its sender is dropped
    pub fn spawn_visibility_watcher(
        &self,
        mut visibility: watch::Receiver<Visibility>,
    ) -> JoinHandle<()> {
        let coordinator = self.clone();
        tokio::spawn(async move {
            let initial = *visibility.borrow_and_update();
            coordinator.set_visibility(initial);
            while visibility.changed().await.is_ok() {
                let current = *visibility.borrow_and_update();
                coordinator.set_visibility(current);
            }
            debug!("Visibility feed closed");
        })
    }

    /// Remove the play listener, tear down, clear the registry, detach
    ///
    /// Idempotent: later calls return immediately.
    pub async fn destroy(&self) {
        if self.inner.destroyed.swap(true, Ordering::SeqCst) {
            debug!("Coordinator already destroyed");
            return;
        }

        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            inner.remove_play_listener();

            let mut binding = inner.binding.lock().await;
            inner.teardown(&mut binding).await;
            let dropped = inner.registry.clear();
            inner.element.detach();

            inner.state.send_modify(|s| s.destroyed = true);
            info!("Playback coordinator destroyed ({} slot(s) dropped)", dropped);
            inner.events.emit_lossy(FeedEvent::CoordinatorDestroyed {
                timestamp: chrono::Utc::now(),
            });
        });
        if let Err(e) = task.await {
            error!("Destroy task failed: {}", e);
        }
    }
}

impl CoordinatorInner {
    fn remove_play_listener(&self) {
        if let Some(id) = self.play_listener.lock().take() {
            self.document.remove_play_listener(id);
            debug!("Play listener removed");
        }
    }
}

impl Drop for CoordinatorInner {
    fn drop(&mut self) {
        // Without destroy(): at least stop listening and leave nothing playing.
        self.remove_play_listener();
        if !self.destroyed.load(Ordering::SeqCst) {
            self.binding.get_mut().destroy_session();
            self.element.pause();
            self.element.release_source();
            self.element.detach();
        }
    }
}
