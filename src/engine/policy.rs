use chrono::Weekday;

/// Mon..Thu 8 slots, Fri 7, weekend closed.
pub const DEFAULT_CAPACITIES: [u32; 7] = [8, 8, 8, 8, 7, 0, 0];

/// Reservations one vendor may hold per ISO week and shift-kind.
pub const DEFAULT_WEEKLY_QUOTA: u32 = 3;

/// Per-deployment calendar limits. Pure lookups, no state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarPolicy {
    /// Indexed Monday-first.
    capacities: [u32; 7],
    weekly_quota: u32,
}

impl Default for CalendarPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITIES, DEFAULT_WEEKLY_QUOTA)
    }
}

impl CalendarPolicy {
    pub fn new(capacities: [u32; 7], weekly_quota: u32) -> Self {
        Self {
            capacities,
            weekly_quota,
        }
    }

    /// Slots per `(day, shift)` bucket on `day`. Zero means the day cannot be
    /// booked at all, which is distinct from a bucket filled by other vendors.
    pub fn capacity_for(&self, day: Weekday) -> u32 {
        self.capacities[day.num_days_from_monday() as usize]
    }

    pub fn is_bookable(&self, day: Weekday) -> bool {
        self.capacity_for(day) > 0
    }

    pub fn weekly_quota(&self) -> u32 {
        self.weekly_quota
    }

    pub fn capacities(&self) -> &[u32; 7] {
        &self.capacities
    }
}
