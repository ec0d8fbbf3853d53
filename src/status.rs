//! Status poll API - the read side callers see

use crate::command::Reconciler;
use crate::ledger::{Ledger, TxState};
use serde::Serialize;
use std::sync::Arc;

/// Poll-visible transaction status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PollStatus {
    Pending,
    Success,
    Failed,
    /// No such transaction id - a value, not an error, so callers can
    /// treat "not found" without exception handling
    Unknown,
}

impl From<TxState> for PollStatus {
    fn from(state: TxState) -> Self {
        match state {
            TxState::Pending => PollStatus::Pending,
            TxState::Success => PollStatus::Success,
            TxState::Failed => PollStatus::Failed,
        }
    }
}

/// Read-only snapshot returned to pollers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub status: PollStatus,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity_after: Option<u32>,
}

impl StatusSnapshot {
    fn unknown() -> Self {
        Self {
            status: PollStatus::Unknown,
            reason: "tx_not_found".into(),
            quantity_after: None,
        }
    }
}

/// Poll endpoint: reconciles first, then snapshots the row
pub struct StatusApi {
    ledger: Arc<Ledger>,
    reconciler: Reconciler,
}

impl StatusApi {
    /// Create a new poll endpoint
    pub fn new(ledger: Arc<Ledger>, reconciler: Reconciler) -> Self {
        Self { ledger, reconciler }
    }

    /// Status of a transaction by id
    pub async fn status(&self, tx_id: u64) -> StatusSnapshot {
        self.reconciler.reconcile(tx_id).await;

        match self.ledger.get(tx_id).await {
            Some(tx) => StatusSnapshot {
                status: tx.state.into(),
                reason: tx.failure_reason.unwrap_or_default(),
                quantity_after: tx.quantity_after,
            },
            None => StatusSnapshot::unknown(),
        }
    }
}
