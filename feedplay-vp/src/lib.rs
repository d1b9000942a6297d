//! # Feedplay Video Player Library (feedplay-vp)
//!
//! Exclusive playback coordinator for a vertically scrolling short-video feed.
//!
//! **Purpose:** Many feed slots are registered at once, but exactly one owned
//! decode/render resource exists. The coordinator leases it to one slot at a
//! time, always releasing the previous slot before attaching the next, and
//! silences any other playback instance in the document.
//!
//! **Architecture:** host traits (`host`) + slot registry (`registry`) +
//! sequenced coordinator (`coordinator`), with an in-memory host (`sim`)
//! for tests and scripted scenarios (`scenario`).

pub mod config;
pub mod coordinator;
pub mod error;
pub mod host;
pub mod registry;
pub mod scenario;
pub mod sim;

pub use coordinator::{
    ActivateOptions, ActivateOutcome, CoordinatorPhase, CoordinatorState, PlaybackCoordinator,
};
pub use error::{Error, LoadError, Result};
pub use registry::{SlotId, SourceSet};
