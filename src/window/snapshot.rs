//! Snapshot publication.
//!
//! The writer builds a fresh `Snapshot` after every mutation and swaps it in
//! through `ArcSwap`. Readers load the current `Arc` without locking, so they
//! may see a snapshot that is a few writes behind but never a half-built one.

use arc_swap::ArcSwap;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Immutable copy of the window aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub count: u64,
    pub sum: Decimal,
    pub avg: Decimal,
    pub min: Option<Decimal>,
    pub max: Option<Decimal>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self {
            count: 0,
            sum: Decimal::ZERO,
            avg: Decimal::ZERO,
            min: None,
            max: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}

#[derive(Debug)]
pub struct SnapshotPublisher {
    current: ArcSwap<Snapshot>,
}

impl SnapshotPublisher {
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(Snapshot::empty()),
        }
    }

    pub fn publish(&self, snapshot: Snapshot) {
        self.current.store(Arc::new(snapshot));
    }

    #[inline]
    pub fn read(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }
}

impl Default for SnapshotPublisher {
    fn default() -> Self {
        Self::new()
    }
}
