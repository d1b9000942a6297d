//! Playback-related type definitions
//!
//! Supporting types carried by `FeedEvent` variants.

use serde::{Deserialize, Serialize};

/// Which loading path a slot's source took
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Adaptive stream consumed through a streaming session
    Adaptive,
    /// Adaptive stream assigned directly (resource understands the format)
    NativeAdaptive,
    /// Single-file progressive source
    Progressive,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Adaptive => write!(f, "adaptive"),
            SourceKind::NativeAdaptive => write!(f, "native_adaptive"),
            SourceKind::Progressive => write!(f, "progressive"),
        }
    }
}

/// Host page visibility
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Visibility::Visible => write!(f, "visible"),
            Visibility::Hidden => write!(f, "hidden"),
        }
    }
}
