//! In-memory host
//!
//! A complete, instrumented implementation of the host traits. Used by the
//! integration tests and by the scenario binary to replay a scripted feed
//! scroll without a real media stack.

mod adaptive;
mod document;
mod element;
mod journal;

pub use adaptive::{SimAdaptive, SimSession};
pub use document::SimDocument;
pub use element::SimElement;
pub use journal::{HostCall, HostOp, Journal};
