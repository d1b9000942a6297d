//! Call journal for the in-memory host
//!
//! Records every host call in order so tests can assert interleavings
//! (release before attach, one teardown per hand-off, ...).

use crate::host::{MediaElementId, SurfaceHandle};
use parking_lot::Mutex;
use std::sync::Arc;

/// One recorded host operation
#[derive(Debug, Clone, PartialEq)]
pub enum HostOp {
    Attach(SurfaceHandle),
    Detach,
    Pause,
    Mute(bool),
    Seek(f64),
    SetSource(String),
    Load,
    ReleaseSource,
    Play,
    PlayRejected(String),
    SessionAttached,
    SessionLoad(String),
    SessionDestroyed,
}

/// A journal entry
#[derive(Debug, Clone, PartialEq)]
pub struct HostCall {
    /// Position in the journal
    pub seq: usize,
    pub element: MediaElementId,
    pub op: HostOp,
}

/// Shared, append-only call journal
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<HostCall>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, element: MediaElementId, op: HostOp) {
        let mut entries = self.entries.lock();
        let seq = entries.len();
        entries.push(HostCall { seq, element, op });
    }

    pub fn entries(&self) -> Vec<HostCall> {
        self.entries.lock().clone()
    }

    /// Operations recorded for one element, in order
    pub fn ops_for(&self, element: MediaElementId) -> Vec<HostOp> {
        self.entries
            .lock()
            .iter()
            .filter(|call| call.element == element)
            .map(|call| call.op.clone())
            .collect()
    }

    pub fn count(&self, element: MediaElementId, pred: impl Fn(&HostOp) -> bool) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|call| call.element == element && pred(&call.op))
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_in_order_per_element() {
        let journal = Journal::new();
        let a = MediaElementId::new();
        let b = MediaElementId::new();

        journal.record(a, HostOp::Pause);
        journal.record(b, HostOp::Load);
        journal.record(a, HostOp::Mute(true));

        assert_eq!(journal.len(), 3);
        assert_eq!(journal.ops_for(a), vec![HostOp::Pause, HostOp::Mute(true)]);
        assert_eq!(journal.count(b, |op| *op == HostOp::Load), 1);
        assert_eq!(journal.entries()[2].seq, 2);

        journal.clear();
        assert!(journal.is_empty());
    }
}
