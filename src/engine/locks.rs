use std::sync::Arc;

use chrono::NaiveDate;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::model::{IsoWeek, Shift};

/// A unit of contention for admissions. Two saves that touch the same key
/// must not run their check-then-insert sequences concurrently.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BucketKey {
    /// Capacity bucket shared by all vendors.
    Slot { day: NaiveDate, shift: Shift },
    /// Weekly quota bucket of one vendor.
    Quota {
        vendor: String,
        week: IsoWeek,
        shift: Shift,
    },
}

/// Lazily created async mutexes, one per live `BucketKey`.
#[derive(Default)]
pub struct BucketLocks {
    locks: DashMap<BucketKey, Arc<Mutex<()>>>,
}

impl BucketLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock every key, in sorted order to prevent deadlocks.
    pub async fn acquire(&self, mut keys: Vec<BucketKey>) -> BucketGuard<'_> {
        keys.sort();
        keys.dedup();
        let mut guards = Vec::with_capacity(keys.len());
        for key in &keys {
            let lock = self.locks.entry(key.clone()).or_default().value().clone();
            guards.push(lock.lock_owned().await);
        }
        BucketGuard {
            owner: self,
            keys,
            guards,
        }
    }

    /// Number of keys currently tracked.
    pub fn tracked(&self) -> usize {
        self.locks.len()
    }
}

/// Releases its keys on drop and forgets the ones nobody else is waiting on.
pub struct BucketGuard<'a> {
    owner: &'a BucketLocks,
    keys: Vec<BucketKey>,
    guards: Vec<OwnedMutexGuard<()>>,
}

impl Drop for BucketGuard<'_> {
    fn drop(&mut self) {
        self.guards.clear();
        for key in &self.keys {
            self.owner
                .locks
                .remove_if(key, |_, lock| Arc::strong_count(lock) == 1);
        }
    }
}
