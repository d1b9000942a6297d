//! Coordinator state and activation request/outcome types

use crate::registry::SlotId;
use serde::{Deserialize, Serialize};

/// Activation sequencer phase (one instance per coordinator, not per slot)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CoordinatorPhase {
    #[default]
    Idle,
    Activating,
    Active,
    Deactivating,
}

impl std::fmt::Display for CoordinatorPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoordinatorPhase::Idle => write!(f, "idle"),
            CoordinatorPhase::Activating => write!(f, "activating"),
            CoordinatorPhase::Active => write!(f, "active"),
            CoordinatorPhase::Deactivating => write!(f, "deactivating"),
        }
    }
}

/// Observable coordinator state
///
/// `active_slot` only changes inside the sequencer, after any prior teardown
/// completed. `tearing_down` is true for the duration of one teardown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoordinatorState {
    pub phase: CoordinatorPhase,
    pub active_slot: Option<SlotId>,
    pub tearing_down: bool,
    pub hidden: bool,
    pub destroyed: bool,
}

/// Caller-supplied activation options
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActivateOptions {
    /// Applied before any load or play attempt
    pub muted: bool,
    /// Seconds; only values > 0 cause a seek
    pub start_at: Option<f64>,
}

impl Default for ActivateOptions {
    fn default() -> Self {
        Self {
            muted: true,
            start_at: None,
        }
    }
}

impl ActivateOptions {
    pub fn muted(muted: bool) -> Self {
        Self {
            muted,
            ..Self::default()
        }
    }

    pub fn start_at(mut self, secs: f64) -> Self {
        self.start_at = Some(secs);
        self
    }
}

/// Result of an activation request
///
/// Never an error: every variant is a condition a feed UI meets in normal use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ActivateOutcome {
    /// Playback was requested and accepted
    Playing,
    /// Loaded and paused-but-ready; playback was not started
    PlaybackDeferred { reason: String },
    /// The slot's source failed to load
    LoadFailed { reason: String },
    /// The slot is not registered; nothing changed
    UnknownSlot,
    /// A newer activation overtook this one while it was queued
    Superseded,
    /// The coordinator was destroyed
    Destroyed,
}

impl ActivateOutcome {
    /// Whether the slot now holds the resource
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ActivateOutcome::Playing
                | ActivateOutcome::PlaybackDeferred { .. }
                | ActivateOutcome::LoadFailed { .. }
        )
    }
}
