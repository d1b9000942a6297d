//! Shared fixtures for coordinator integration tests

#![allow(dead_code)]

use feedplay_common::events::FeedEvent;
use feedplay_vp::config::CoordinatorConfig;
use feedplay_vp::host::SurfaceHandle;
use feedplay_vp::sim::{HostOp, SimDocument, SimElement};
use feedplay_vp::{PlaybackCoordinator, SourceSet};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Short grace period so hand-offs stay fast in tests
pub fn test_config() -> CoordinatorConfig {
    CoordinatorConfig {
        teardown_grace_ms: 10,
        ..CoordinatorConfig::default()
    }
}

pub fn surface(slot: &str) -> SurfaceHandle {
    SurfaceHandle::new(format!("surface-{}", slot))
}

pub fn progressive_url(slot: &str) -> String {
    format!("https://cdn.test/{}.mp4", slot)
}

pub fn manifest_url(slot: &str) -> String {
    format!("https://cdn.test/{}/master.m3u8", slot)
}

/// A coordinator on a fresh in-memory document
pub struct Feed {
    pub document: SimDocument,
    pub coordinator: PlaybackCoordinator,
}

impl Feed {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: CoordinatorConfig) -> Self {
        let document = SimDocument::new();
        let coordinator = document.coordinator(config);
        Self {
            document,
            coordinator,
        }
    }

    pub fn register_progressive(&self, slot: &str) {
        self.coordinator.register_slot(
            slot,
            surface(slot),
            SourceSet::progressive(progressive_url(slot)).unwrap(),
        );
    }

    pub fn register_adaptive(&self, slot: &str) {
        self.coordinator.register_slot(
            slot,
            surface(slot),
            SourceSet::adaptive(manifest_url(slot), progressive_url(slot)).unwrap(),
        );
    }

    /// The coordinator's own resource
    pub fn owned(&self) -> Arc<SimElement> {
        self.document
            .element(self.coordinator.owned_element_id())
            .expect("owned element lives in the document")
    }

    /// Journal of calls made on the owned resource
    pub fn owned_ops(&self) -> Vec<HostOp> {
        self.document
            .journal()
            .ops_for(self.coordinator.owned_element_id())
    }
}

/// Everything currently buffered on an event receiver
pub fn drain_events(rx: &mut broadcast::Receiver<FeedEvent>) -> Vec<FeedEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn count_events(events: &[FeedEvent], event_type: &str) -> usize {
    events
        .iter()
        .filter(|event| event.event_type() == event_type)
        .count()
}

/// Only the attach / release / detach steps, in order
pub fn lease_ops(ops: &[HostOp]) -> Vec<HostOp> {
    ops.iter()
        .filter(|op| {
            matches!(
                op,
                HostOp::Attach(_) | HostOp::ReleaseSource | HostOp::Detach
            )
        })
        .cloned()
        .collect()
}

pub fn position(ops: &[HostOp], target: &HostOp) -> usize {
    ops.iter()
        .position(|op| op == target)
        .unwrap_or_else(|| panic!("{:?} not found in {:?}", target, ops))
}
