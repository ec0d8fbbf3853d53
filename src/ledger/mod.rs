//! Transaction ledger
//!
//! One row per hardware operation attempt, keyed by transaction id.
//! Rows move PENDING -> SUCCESS | FAILED exactly once and are never
//! deleted; the ledger is the audit trail.

use std::collections::HashMap;
use tms_shared::{now_ms, CommandKind};
use tokio::sync::RwLock;

/// Kind of hardware operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxKind {
    /// Take a unique holder out
    Borrow,
    /// Put a unique holder back, or put tool stock back
    Return,
    /// Add tool stock (restock/purchase)
    StockIn,
    /// Take tool stock out
    StockOut,
}

impl TxKind {
    /// The wire command verb this operation maps to
    pub fn command(self) -> CommandKind {
        match self {
            TxKind::Borrow | TxKind::StockOut => CommandKind::BorrowStart,
            TxKind::Return | TxKind::StockIn => CommandKind::ReturnStart,
        }
    }
}

/// Processing state of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Pending,
    Success,
    Failed,
}

impl TxState {
    /// SUCCESS and FAILED are absorbing
    pub fn is_terminal(self) -> bool {
        matches!(self, TxState::Success | TxState::Failed)
    }
}

/// One hardware operation attempt
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub tx_id: u64,
    /// Code of the resource this operation targets
    pub resource: String,
    pub kind: TxKind,
    /// Always 1 for holders
    pub requested_qty: u32,
    pub state: TxState,
    pub created_at_ms: u64,
    pub resolved_at_ms: Option<u64>,
    pub failure_reason: Option<String>,
    /// Stock snapshots for tool operations
    pub quantity_before: Option<u32>,
    pub quantity_after: Option<u32>,
    /// Wear snapshots for holder operations
    pub wear_before: Option<u8>,
    pub wear_after: Option<u8>,
    /// Borrow duration in minutes, filled when the return resolves
    pub duration_min: Option<u64>,
    /// RFID credential of the requesting user
    pub actor_rfid: String,
    /// Project / production order reference
    pub project: String,
    pub note: String,
    /// Return is a maintenance hand-back; resets wear on success
    pub maintenance: bool,
    /// A SUCCESS borrow is settled once its return succeeds
    pub settled: bool,
}

impl Transaction {
    /// Create a fresh PENDING row
    pub fn pending(tx_id: u64, resource: impl Into<String>, kind: TxKind, qty: u32) -> Self {
        Self {
            tx_id,
            resource: resource.into(),
            kind,
            requested_qty: qty,
            state: TxState::Pending,
            created_at_ms: now_ms(),
            resolved_at_ms: None,
            failure_reason: None,
            quantity_before: None,
            quantity_after: None,
            wear_before: None,
            wear_after: None,
            duration_min: None,
            actor_rfid: String::new(),
            project: String::new(),
            note: String::new(),
            maintenance: false,
            settled: false,
        }
    }

    /// Age of the row relative to `now` in milliseconds
    pub fn age_ms(&self, now: u64) -> u64 {
        now.saturating_sub(self.created_at_ms)
    }

    /// This borrow row still blocks the asset: in flight, or taken and
    /// not yet returned
    pub fn is_open_borrow(&self) -> bool {
        self.kind == TxKind::Borrow
            && match self.state {
                TxState::Pending => true,
                TxState::Success => !self.settled,
                TxState::Failed => false,
            }
    }
}

/// Fields written on a successful resolution
#[derive(Debug, Clone, Default)]
pub struct SuccessPatch {
    pub quantity_after: Option<u32>,
    pub wear_after: Option<u8>,
    pub duration_min: Option<u64>,
}

/// Durable map of all transactions, keyed by id
pub struct Ledger {
    rows: RwLock<HashMap<u64, Transaction>>,
}

impl Ledger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
        }
    }

    /// Record a new row
    pub async fn insert(&self, tx: Transaction) {
        let mut rows = self.rows.write().await;
        rows.insert(tx.tx_id, tx);
    }

    /// Read-only copy of a row
    pub async fn get(&self, tx_id: u64) -> Option<Transaction> {
        let rows = self.rows.read().await;
        rows.get(&tx_id).cloned()
    }

    /// Number of rows ever recorded
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    /// True when no transaction has been recorded yet
    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    /// Resolve a row to SUCCESS. No-op returning `false` when the row is
    /// missing or already terminal.
    pub async fn mark_success(&self, tx_id: u64, patch: SuccessPatch) -> bool {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&tx_id) {
            Some(tx) if !tx.state.is_terminal() => {
                tx.state = TxState::Success;
                tx.resolved_at_ms = Some(now_ms());
                tx.failure_reason = None;
                if patch.quantity_after.is_some() {
                    tx.quantity_after = patch.quantity_after;
                }
                if patch.wear_after.is_some() {
                    tx.wear_after = patch.wear_after;
                }
                if patch.duration_min.is_some() {
                    tx.duration_min = patch.duration_min;
                }
                true
            }
            _ => false,
        }
    }

    /// Resolve a row to FAILED. No-op returning `false` when the row is
    /// missing or already terminal.
    pub async fn mark_failed(&self, tx_id: u64, reason: &str) -> bool {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&tx_id) {
            Some(tx) if !tx.state.is_terminal() => {
                tx.state = TxState::Failed;
                tx.resolved_at_ms = Some(now_ms());
                tx.failure_reason = Some(reason.to_string());
                true
            }
            _ => false,
        }
    }

    /// Close an open SUCCESS borrow when its return resolves, recording
    /// the usage bookkeeping on the borrow row as well.
    pub async fn settle_borrow(
        &self,
        tx_id: u64,
        wear_before: u8,
        wear_after: u8,
        duration_min: u64,
    ) -> bool {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&tx_id) {
            Some(tx) if tx.kind == TxKind::Borrow && tx.state == TxState::Success && !tx.settled => {
                tx.settled = true;
                tx.wear_before = Some(wear_before);
                tx.wear_after = Some(wear_after);
                tx.duration_min = Some(duration_min);
                true
            }
            _ => false,
        }
    }

    /// Latest borrow row that still blocks the given asset, if any.
    /// The publisher keeps this at most one per resource.
    pub async fn open_borrow(&self, resource: &str) -> Option<Transaction> {
        let rows = self.rows.read().await;
        rows.values()
            .filter(|tx| tx.resource == resource && tx.is_open_borrow())
            .max_by_key(|tx| (tx.created_at_ms, tx.tx_id))
            .cloned()
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_terminal_states_are_absorbing() {
        let ledger = Ledger::new();
        ledger.insert(Transaction::pending(1, "T1", TxKind::StockOut, 3)).await;

        assert!(ledger.mark_success(1, SuccessPatch::default()).await);
        // Late failure and duplicate success are both no-ops
        assert!(!ledger.mark_failed(1, "timeout").await);
        assert!(!ledger.mark_success(1, SuccessPatch::default()).await);

        let tx = ledger.get(1).await.unwrap();
        assert_eq!(tx.state, TxState::Success);
        assert!(tx.failure_reason.is_none());
    }

    #[tokio::test]
    async fn test_failed_keeps_reason() {
        let ledger = Ledger::new();
        ledger.insert(Transaction::pending(2, "T1", TxKind::StockOut, 1)).await;

        assert!(ledger.mark_failed(2, "door_jam").await);
        let tx = ledger.get(2).await.unwrap();
        assert_eq!(tx.state, TxState::Failed);
        assert_eq!(tx.failure_reason.as_deref(), Some("door_jam"));
        assert!(tx.resolved_at_ms.is_some());
    }

    #[tokio::test]
    async fn test_open_borrow_lifecycle() {
        let ledger = Ledger::new();
        ledger.insert(Transaction::pending(10, "H1", TxKind::Borrow, 1)).await;

        // Pending borrow blocks the asset
        assert_eq!(ledger.open_borrow("H1").await.unwrap().tx_id, 10);

        // Successful but unsettled borrow still blocks it
        ledger.mark_success(10, SuccessPatch::default()).await;
        assert_eq!(ledger.open_borrow("H1").await.unwrap().tx_id, 10);

        // Settling on return releases it
        assert!(ledger.settle_borrow(10, 0, 10, 5).await);
        assert!(ledger.open_borrow("H1").await.is_none());

        let tx = ledger.get(10).await.unwrap();
        assert_eq!(tx.wear_after, Some(10));
        assert_eq!(tx.duration_min, Some(5));
    }

    #[tokio::test]
    async fn test_failed_borrow_does_not_block() {
        let ledger = Ledger::new();
        ledger.insert(Transaction::pending(11, "H1", TxKind::Borrow, 1)).await;
        ledger.mark_failed(11, "timeout").await;
        assert!(ledger.open_borrow("H1").await.is_none());
    }

    #[tokio::test]
    async fn test_settle_requires_open_success_borrow() {
        let ledger = Ledger::new();
        ledger.insert(Transaction::pending(12, "H1", TxKind::Borrow, 1)).await;

        // Still pending: cannot settle
        assert!(!ledger.settle_borrow(12, 0, 10, 1).await);

        ledger.mark_success(12, SuccessPatch::default()).await;
        assert!(ledger.settle_borrow(12, 0, 10, 1).await);
        // Already settled
        assert!(!ledger.settle_borrow(12, 0, 20, 2).await);
    }
}
