//! Slot registry
//!
//! Maps opaque slot ids to inert metadata: the caller's mount surface and
//! the candidate sources. The live playback resource is never stored here;
//! it is leased to at most one slot at a time by the coordinator.

use crate::host::SurfaceHandle;
use feedplay_common::Error as CommonError;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Opaque slot identifier chosen by the caller
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(String);

impl SlotId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SlotId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for SlotId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&SlotId> for SlotId {
    fn from(id: &SlotId) -> Self {
        id.clone()
    }
}

impl std::fmt::Display for SlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Candidate sources for one slot
///
/// Immutable once built; re-registering a slot replaces the whole set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSet {
    adaptive: Option<String>,
    progressive: String,
}

impl SourceSet {
    /// Build a source set; the progressive fallback is required
    ///
    /// An empty adaptive URL is treated as absent.
    pub fn new(
        adaptive: Option<String>,
        progressive: impl Into<String>,
    ) -> Result<Self, CommonError> {
        let progressive = progressive.into();
        if progressive.trim().is_empty() {
            return Err(CommonError::InvalidInput(
                "progressive fallback URL is required".to_string(),
            ));
        }
        Ok(Self {
            adaptive: adaptive.filter(|url| !url.trim().is_empty()),
            progressive,
        })
    }

    /// Progressive-only source set
    pub fn progressive(url: impl Into<String>) -> Result<Self, CommonError> {
        Self::new(None, url)
    }

    /// Adaptive stream with a progressive fallback
    pub fn adaptive(
        manifest_url: impl Into<String>,
        fallback_url: impl Into<String>,
    ) -> Result<Self, CommonError> {
        Self::new(Some(manifest_url.into()), fallback_url)
    }

    pub fn adaptive_url(&self) -> Option<&str> {
        self.adaptive.as_deref()
    }

    pub fn progressive_url(&self) -> &str {
        &self.progressive
    }
}

/// A registered slot
#[derive(Debug, Clone)]
pub struct Slot {
    pub id: SlotId,
    pub surface: SurfaceHandle,
    pub sources: Arc<SourceSet>,
}

/// Registry of mounted slots
#[derive(Debug, Default)]
pub struct SlotRegistry {
    slots: RwLock<HashMap<SlotId, Slot>>,
}

impl SlotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert; returns the entry that was replaced, if any
    pub fn insert(&self, slot: Slot) -> Option<Slot> {
        self.slots.write().insert(slot.id.clone(), slot)
    }

    pub fn remove(&self, id: &SlotId) -> Option<Slot> {
        self.slots.write().remove(id)
    }

    pub fn get(&self, id: &SlotId) -> Option<Slot> {
        self.slots.read().get(id).cloned()
    }

    pub fn contains(&self, id: &SlotId) -> bool {
        self.slots.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }

    /// Registered ids in sorted order
    pub fn ids(&self) -> Vec<SlotId> {
        let mut ids: Vec<SlotId> = self.slots.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Remove everything; returns how many slots were dropped
    pub fn clear(&self) -> usize {
        let mut slots = self.slots.write();
        let count = slots.len();
        slots.clear();
        count
    }
}
