//! Timeout reconciliation for pending transactions

use super::apply::{apply_outcome, Outcome};
use crate::config::CoordinatorConfig;
use crate::ledger::Ledger;
use crate::resource::ResourceStore;
use std::sync::Arc;
use tms_shared::now_ms;
use tracing::info;

/// Failure reason written by the reconciler
pub const TIMEOUT_REASON: &str = "timeout";

/// Force-fails transactions that have been PENDING too long.
///
/// Runs on the poll path, not on a background timer: an abandoned row
/// that nobody polls is an inert record and may stay PENDING. A race with
/// a genuinely arriving ack is decided by whoever takes the resource lock
/// first; the loser's attempt is a no-op.
pub struct Reconciler {
    store: Arc<ResourceStore>,
    ledger: Arc<Ledger>,
    config: CoordinatorConfig,
}

impl Reconciler {
    /// Create a new reconciler
    pub fn new(store: Arc<ResourceStore>, ledger: Arc<Ledger>, config: CoordinatorConfig) -> Self {
        Self {
            store,
            ledger,
            config,
        }
    }

    /// Fail the transaction if it has outlived the timeout
    pub async fn reconcile(&self, tx_id: u64) {
        let Some(tx) = self.ledger.get(tx_id).await else {
            return;
        };
        if tx.state.is_terminal() {
            return;
        }

        let age_ms = tx.age_ms(now_ms());
        if age_ms > self.config.tx_timeout.as_millis() as u64 {
            info!(tx_id, age_ms, "pending transaction timed out, forcing FAILED");
            apply_outcome(
                &self.store,
                &self.ledger,
                &self.config,
                tx_id,
                Outcome::TimedOut {
                    reason: TIMEOUT_REASON,
                },
            )
            .await;
        }
    }
}
