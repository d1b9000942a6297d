//! # Feedplay Common Library
//!
//! Shared code for the feedplay crates:
//! - Error types
//! - Bootstrap configuration loading (TOML, environment, defaults)
//! - Event types (`FeedEvent`) and the `EventBus` broadcaster

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
