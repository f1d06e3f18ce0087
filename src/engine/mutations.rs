use chrono::NaiveDateTime;
use tracing::{debug, info};

use crate::limits::MAX_VENDOR_LEN;
use crate::model::ReservationId;
use crate::observability::ADMISSIONS_TOTAL;

use super::admission::{Candidate, Verdict, contended_buckets, evaluate};
use super::{Engine, EngineError};

fn validate_vendor(vendor: &str) -> Result<(), EngineError> {
    if vendor.trim().is_empty() {
        return Err(EngineError::InvalidVendor);
    }
    if vendor.len() > MAX_VENDOR_LEN {
        return Err(EngineError::LimitExceeded("vendor name too long"));
    }
    Ok(())
}

impl Engine {
    /// Admit and persist a reservation, or say why not.
    pub async fn save(
        &self,
        vendor: &str,
        instant: NaiveDateTime,
    ) -> Result<ReservationId, EngineError> {
        validate_vendor(vendor)?;
        let candidate = Candidate {
            vendor: vendor.to_string(),
            instant: self.granularity.normalize(instant),
        };

        let _buckets = self
            .locks
            .acquire(contended_buckets(self.granularity, &candidate))
            .await;

        let verdict = evaluate(&self.policy, self.granularity, self.store.as_ref(), &candidate).await?;
        if let Verdict::Reject(reason) = verdict {
            debug!("rejected {} at {}: {}", candidate.vendor, candidate.instant, reason.code());
            metrics::counter!(ADMISSIONS_TOTAL, "outcome" => reason.code()).increment(1);
            return Err(EngineError::Rejected(reason));
        }

        let id = self.store.insert(&candidate.vendor, candidate.instant).await?;
        info!("reserved {id}: {} at {}", candidate.vendor, candidate.instant);
        metrics::counter!(ADMISSIONS_TOTAL, "outcome" => "accepted").increment(1);
        Ok(id)
    }

    /// Remove the reservation matching `vendor` and the normalized `instant`
    /// exactly.
    pub async fn delete(
        &self,
        vendor: &str,
        instant: NaiveDateTime,
    ) -> Result<ReservationId, EngineError> {
        let instant = self.granularity.normalize(instant);
        let not_found = || EngineError::NotFound {
            vendor: vendor.to_string(),
            instant,
        };

        let existing = self
            .store
            .find_exact(vendor, instant)
            .await?
            .ok_or_else(not_found)?;
        if !self.store.delete(existing.id).await? {
            // Removed by a concurrent delete between lookup and removal.
            return Err(not_found());
        }
        info!("cancelled {}: {vendor} at {instant}", existing.id);
        Ok(existing.id)
    }
}
