//! Session registry - one record per session kind

use std::sync::atomic::{AtomicU64, Ordering};

use vpcm_core::SessionKind;

use crate::{PathId, SessionRecord, SessionSnapshot};

/// Fixed table of session records, indexed by kind.
///
/// Every record has its own lock; there is no registry-wide lock.
#[derive(Debug)]
pub struct SessionRegistry {
    records: [SessionRecord; SessionKind::COUNT],
    next_path: AtomicU64,
}

impl SessionRegistry {
    /// Create a registry with every session idle
    pub fn new() -> Self {
        SessionRegistry {
            records: SessionKind::ALL.map(SessionRecord::new),
            next_path: AtomicU64::new(1),
        }
    }

    pub fn record_for(&self, kind: SessionKind) -> &SessionRecord {
        &self.records[kind.index()]
    }

    /// Snapshot every record, taking one lock at a time
    pub fn snapshots(&self) -> Vec<SessionSnapshot> {
        self.records.iter().map(SessionRecord::snapshot).collect()
    }

    pub(crate) fn next_path_id(&self) -> PathId {
        PathId(self.next_path.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
