//! Wear accrual for returned holders

use tms_shared::defaults;

/// Parameters of the wear accrual function
#[derive(Debug, Clone)]
pub struct WearModel {
    /// Minutes of borrow time that consume one percent of useful life
    pub minutes_per_percent: u32,
    /// Minimum percent added per completed borrow, regardless of duration
    pub floor_percent: u8,
}

impl Default for WearModel {
    fn default() -> Self {
        Self {
            minutes_per_percent: defaults::MINUTES_PER_WEAR_PCT,
            floor_percent: defaults::WEAR_FLOOR_PCT,
        }
    }
}

/// Wear after a borrow of `duration_min` minutes.
///
/// Adds the larger of the floor increment and the duration-proportional
/// term, clamped to 100. Monotonic in both wear and duration.
pub fn wear_after_use(wear_before: u8, duration_min: u64, model: &WearModel) -> u8 {
    let proportional = if model.minutes_per_percent > 0 {
        duration_min as f64 / model.minutes_per_percent as f64
    } else {
        0.0
    };
    let increment = proportional.max(model.floor_percent as f64);

    let after = wear_before as f64 + increment;
    after.clamp(0.0, 100.0).round() as u8
}
