use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use tokio::sync::RwLock;
use ulid::Ulid;

use crate::model::*;

use super::shift::shift_of;

#[derive(Debug)]
pub enum StoreError {
    Wal(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Wal(e) => write!(f, "WAL error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Durable keyed reservation records, as the admission engine sees them.
///
/// Every sequence comes back in the store's natural order: ascending instant,
/// insertion order among equal instants.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    async fn find_all(&self) -> Result<Vec<Reservation>, StoreError>;

    async fn find_by_vendor(&self, vendor: &str) -> Result<Vec<Reservation>, StoreError>;

    /// Monday 00:00:00 through Sunday 23:59:59 of `week`.
    async fn find_by_vendor_in_week(
        &self,
        vendor: &str,
        week: IsoWeek,
    ) -> Result<Vec<Reservation>, StoreError>;

    /// Reservations in the `(day, shift)` bucket. `Shift::WholeDay` matches
    /// the whole calendar day regardless of time.
    async fn find_by_day_or_shift(
        &self,
        day: NaiveDate,
        shift: Shift,
    ) -> Result<Vec<Reservation>, StoreError>;

    async fn find_exact(
        &self,
        vendor: &str,
        instant: NaiveDateTime,
    ) -> Result<Option<Reservation>, StoreError>;

    async fn insert(&self, vendor: &str, instant: NaiveDateTime)
    -> Result<ReservationId, StoreError>;

    /// `Ok(false)` when no reservation has `id`.
    async fn delete(&self, id: ReservationId) -> Result<bool, StoreError>;
}

// ── Shared read helpers over a ReservationBook ───────────────────

pub(super) fn vendor_in_week(book: &ReservationBook, vendor: &str, week: IsoWeek) -> Vec<Reservation> {
    book.within(&week.window())
        .filter(|r| r.vendor == vendor)
        .cloned()
        .collect()
}

pub(super) fn in_bucket(book: &ReservationBook, day: NaiveDate, shift: Shift) -> Vec<Reservation> {
    book.within(&Window::day(day))
        .filter(|r| shift == Shift::WholeDay || shift_of(r.instant) == shift)
        .cloned()
        .collect()
}

/// Volatile store. Used by tests and by deployments that accept losing
/// reservations on restart.
#[derive(Default)]
pub struct MemoryStore {
    book: RwLock<ReservationBook>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.book.read().await.len()
    }
}

#[async_trait]
impl ReservationStore for MemoryStore {
    async fn find_all(&self) -> Result<Vec<Reservation>, StoreError> {
        Ok(self.book.read().await.iter().cloned().collect())
    }

    async fn find_by_vendor(&self, vendor: &str) -> Result<Vec<Reservation>, StoreError> {
        let book = self.book.read().await;
        Ok(book.iter().filter(|r| r.vendor == vendor).cloned().collect())
    }

    async fn find_by_vendor_in_week(
        &self,
        vendor: &str,
        week: IsoWeek,
    ) -> Result<Vec<Reservation>, StoreError> {
        Ok(vendor_in_week(&*self.book.read().await, vendor, week))
    }

    async fn find_by_day_or_shift(
        &self,
        day: NaiveDate,
        shift: Shift,
    ) -> Result<Vec<Reservation>, StoreError> {
        Ok(in_bucket(&*self.book.read().await, day, shift))
    }

    async fn find_exact(
        &self,
        vendor: &str,
        instant: NaiveDateTime,
    ) -> Result<Option<Reservation>, StoreError> {
        Ok(self.book.read().await.find_exact(vendor, instant).cloned())
    }

    async fn insert(
        &self,
        vendor: &str,
        instant: NaiveDateTime,
    ) -> Result<ReservationId, StoreError> {
        let id = Ulid::new();
        self.book.write().await.insert(Reservation {
            id,
            vendor: vendor.to_string(),
            instant,
        });
        Ok(id)
    }

    async fn delete(&self, id: ReservationId) -> Result<bool, StoreError> {
        Ok(self.book.write().await.remove(id).is_some())
    }
}

/// Reads from an inner `MemoryStore`; every write fails as if the log could
/// not be synced.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct FailingStore {
    pub(crate) inner: MemoryStore,
}

#[cfg(test)]
#[async_trait]
impl ReservationStore for FailingStore {
    async fn find_all(&self) -> Result<Vec<Reservation>, StoreError> {
        self.inner.find_all().await
    }

    async fn find_by_vendor(&self, vendor: &str) -> Result<Vec<Reservation>, StoreError> {
        self.inner.find_by_vendor(vendor).await
    }

    async fn find_by_vendor_in_week(
        &self,
        vendor: &str,
        week: IsoWeek,
    ) -> Result<Vec<Reservation>, StoreError> {
        self.inner.find_by_vendor_in_week(vendor, week).await
    }

    async fn find_by_day_or_shift(
        &self,
        day: NaiveDate,
        shift: Shift,
    ) -> Result<Vec<Reservation>, StoreError> {
        self.inner.find_by_day_or_shift(day, shift).await
    }

    async fn find_exact(
        &self,
        vendor: &str,
        instant: NaiveDateTime,
    ) -> Result<Option<Reservation>, StoreError> {
        self.inner.find_exact(vendor, instant).await
    }

    async fn insert(
        &self,
        _vendor: &str,
        _instant: NaiveDateTime,
    ) -> Result<ReservationId, StoreError> {
        Err(StoreError::Wal("disk full".into()))
    }

    async fn delete(&self, _id: ReservationId) -> Result<bool, StoreError> {
        Err(StoreError::Wal("disk full".into()))
    }
}
