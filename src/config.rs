//! Coordinator configuration

use crate::resource::WearModel;
use std::time::Duration;
use tms_shared::defaults;

/// Tunable parameters for the coordinator
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// How long a transaction may stay PENDING before a poll force-fails it
    pub tx_timeout: Duration,
    /// Wear accrual parameters for returned holders
    pub wear: WearModel,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            tx_timeout: Duration::from_secs(defaults::TX_TIMEOUT_SECS),
            wear: WearModel::default(),
        }
    }
}
