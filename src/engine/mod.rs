mod admission;
mod error;
mod listing;
mod locks;
mod mutations;
mod policy;
mod queries;
mod shift;
mod store;
mod wal_store;

pub use admission::{Candidate, Verdict, contended_buckets, evaluate};
pub use error::{EngineError, RejectReason};
pub use listing::{Schedule, project};
pub use locks::{BucketGuard, BucketKey, BucketLocks};
pub use policy::{CalendarPolicy, DEFAULT_CAPACITIES, DEFAULT_WEEKLY_QUOTA};
pub use shift::{Granularity, same_shift, shift_of};
pub use store::{MemoryStore, ReservationStore, StoreError};
#[cfg(test)]
pub(crate) use store::FailingStore;
pub use wal_store::{WalStats, WalStore};

use std::sync::Arc;

/// The reservation facade: validates input, serializes admissions per
/// bucket, runs the rule chain and persists accepted bookings.
pub struct Engine {
    store: Arc<dyn ReservationStore>,
    policy: CalendarPolicy,
    granularity: Granularity,
    locks: BucketLocks,
}

impl Engine {
    pub fn new(
        store: Arc<dyn ReservationStore>,
        policy: CalendarPolicy,
        granularity: Granularity,
    ) -> Self {
        Self {
            store,
            policy,
            granularity,
            locks: BucketLocks::new(),
        }
    }

    /// Engine over a fresh `MemoryStore`.
    pub fn in_memory(policy: CalendarPolicy, granularity: Granularity) -> Self {
        Self::new(Arc::new(MemoryStore::new()), policy, granularity)
    }

    pub fn policy(&self) -> &CalendarPolicy {
        &self.policy
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn store(&self) -> &Arc<dyn ReservationStore> {
        &self.store
    }
}
