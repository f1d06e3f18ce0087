use chrono::{Datelike, NaiveDateTime};

use crate::model::*;

use super::error::RejectReason;
use super::locks::BucketKey;
use super::policy::CalendarPolicy;
use super::shift::Granularity;
use super::store::{ReservationStore, StoreError};

/// A proposed booking, already normalized for the active granularity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub vendor: String,
    pub instant: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject(RejectReason),
}

/// The buckets whose counts `evaluate` reads. Holding them for the whole
/// check-then-insert keeps capacity and quota intact under concurrency.
pub fn contended_buckets(granularity: Granularity, candidate: &Candidate) -> Vec<BucketKey> {
    let day = candidate.instant.date();
    let shift = granularity.shift_of(candidate.instant);
    vec![
        BucketKey::Slot { day, shift },
        BucketKey::Quota {
            vendor: candidate.vendor.clone(),
            week: IsoWeek::of(day),
            shift,
        },
    ]
}

/// Run the admission rules in order, stopping at the first failure. The
/// order decides which reason a multiply-invalid request reports:
///
/// 1. weekly quota of the vendor for the candidate's shift-kind
/// 2. duplicate bucket for the same vendor
/// 3. zero-capacity day
/// 4. bucket capacity across all vendors
pub async fn evaluate(
    policy: &CalendarPolicy,
    granularity: Granularity,
    store: &dyn ReservationStore,
    candidate: &Candidate,
) -> Result<Verdict, StoreError> {
    let day = candidate.instant.date();
    let shift = granularity.shift_of(candidate.instant);

    let week = store
        .find_by_vendor_in_week(&candidate.vendor, IsoWeek::of(day))
        .await?;
    let used = week
        .iter()
        .filter(|r| granularity.shift_of(r.instant) == shift)
        .count();
    if used >= policy.weekly_quota() as usize {
        return Ok(Verdict::Reject(RejectReason::WeeklyQuotaExceeded));
    }

    if week
        .iter()
        .any(|r| granularity.collides(r.instant, candidate.instant))
    {
        return Ok(Verdict::Reject(RejectReason::AlreadyReserved));
    }

    if !policy.is_bookable(day.weekday()) {
        return Ok(Verdict::Reject(RejectReason::WeekendNotBookable));
    }

    let taken = store.find_by_day_or_shift(day, shift).await?.len();
    if taken >= policy.capacity_for(day.weekday()) as usize {
        return Ok(Verdict::Reject(RejectReason::SlotsFull));
    }

    Ok(Verdict::Accept)
}
