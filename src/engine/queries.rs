use crate::model::Reservation;

use super::listing::{Schedule, project};
use super::{Engine, EngineError};

impl Engine {
    /// Weekday-bucketed view of every live reservation.
    pub async fn list(&self) -> Result<Schedule, EngineError> {
        let all = self.store.find_all().await?;
        Ok(project(&all))
    }

    /// Every live reservation in store order.
    pub async fn reservations(&self) -> Result<Vec<Reservation>, EngineError> {
        Ok(self.store.find_all().await?)
    }

    pub async fn reservations_of(&self, vendor: &str) -> Result<Vec<Reservation>, EngineError> {
        Ok(self.store.find_by_vendor(vendor).await?)
    }
}
