use chrono::NaiveDateTime;

use super::store::StoreError;

/// Why an admission was refused. These are ordinary outcomes, not faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    WeeklyQuotaExceeded,
    AlreadyReserved,
    WeekendNotBookable,
    SlotsFull,
}

impl RejectReason {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::WeeklyQuotaExceeded => "weekly_quota_exceeded",
            RejectReason::AlreadyReserved => "already_reserved",
            RejectReason::WeekendNotBookable => "weekend_not_bookable",
            RejectReason::SlotsFull => "slots_full",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            RejectReason::WeeklyQuotaExceeded => "weekly reservation quota exceeded",
            RejectReason::AlreadyReserved => "already reserved for this slot",
            RejectReason::WeekendNotBookable => "reservations are not possible on this day",
            RejectReason::SlotsFull => "all slots are reserved",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

#[derive(Debug)]
pub enum EngineError {
    Rejected(RejectReason),
    NotFound {
        vendor: String,
        instant: NaiveDateTime,
    },
    InvalidVendor,
    LimitExceeded(&'static str),
    Store(StoreError),
}

impl EngineError {
    pub fn reject_reason(&self) -> Option<RejectReason> {
        match self {
            EngineError::Rejected(reason) => Some(*reason),
            _ => None,
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::Rejected(reason) => write!(f, "reservation rejected: {reason}"),
            EngineError::NotFound { vendor, instant } => {
                write!(f, "reservation not found: {vendor} at {instant}")
            }
            EngineError::InvalidVendor => write!(f, "vendor must not be empty"),
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::Store(e) => write!(f, "store error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        EngineError::Store(e)
    }
}

impl From<RejectReason> for EngineError {
    fn from(reason: RejectReason) -> Self {
        EngineError::Rejected(reason)
    }
}
