//! Error types for feedplay-vp
//!
//! Only configuration, scenario and source-loading failures are errors here.
//! Source loading has its own `LoadError` since it carries the branch taken.
//! Conditions expected in normal feed operation (unknown slot, autoplay
//! rejection) are reported as `ActivateOutcome` values and events instead.

use feedplay_common::events::SourceKind;
use thiserror::Error;

/// Main error type for feedplay-vp
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Scenario script errors
    #[error("Scenario error: {0}")]
    Scenario(String),

    /// Errors from the shared library
    #[error(transparent)]
    Common(#[from] feedplay_common::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type using feedplay-vp Error
pub type Result<T> = std::result::Result<T, Error>;

/// Loading a slot's source failed on the branch chosen for it
///
/// Surfaced to callers as `ActivateOutcome::LoadFailed` and
/// `FeedEvent::LoadFailed`, never as an `Err` from the control surface.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Load failed ({kind}): {reason}")]
pub struct LoadError {
    pub kind: SourceKind,
    pub reason: String,
}

impl LoadError {
    pub(crate) fn new(kind: SourceKind, reason: impl std::fmt::Display) -> Self {
        Self {
            kind,
            reason: reason.to_string(),
        }
    }
}
