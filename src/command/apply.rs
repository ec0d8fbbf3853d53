//! The single transition path to a terminal transaction state
//!
//! Every resolution - device ack, device failure, forced timeout - goes
//! through [`apply_outcome`]. It holds the resource lock while it applies
//! the transition and the resource side effects, and it drops anything
//! aimed at an unknown or already-terminal row, which is what makes
//! duplicate and late messages harmless.

use crate::config::CoordinatorConfig;
use crate::ledger::{Ledger, SuccessPatch, Transaction, TxKind, TxState};
use crate::resource::{wear_after_use, Availability, Holder, Resource, ResourceStore, Tool};
use std::sync::Arc;
use tms_shared::now_ms;
use tracing::{debug, info, warn};

/// How a pending transaction resolved
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Device confirmed the operation
    Ok,
    /// Device reported a failure with its own reason
    DeviceFailed { reason: String },
    /// Nobody heard from the device in time
    TimedOut { reason: &'static str },
}

/// Apply an outcome to a transaction. Returns `true` when the transition
/// was actually applied, `false` when it was dropped by the guards.
pub async fn apply_outcome(
    store: &ResourceStore,
    ledger: &Arc<Ledger>,
    config: &CoordinatorConfig,
    tx_id: u64,
    outcome: Outcome,
) -> bool {
    let Some(tx) = ledger.get(tx_id).await else {
        // Possibly a message for a different process generation
        warn!(tx_id, "event for unknown transaction, dropping");
        return false;
    };
    if tx.state.is_terminal() {
        debug!(tx_id, state = ?tx.state, "event for terminal transaction, dropping");
        return false;
    }

    let Some(handle) = store.handle(&tx.resource).await else {
        // Resource rows are coordinator-owned, so this is a data defect;
        // fail the row rather than leave it pending forever
        warn!(tx_id, resource = %tx.resource, "transaction references missing resource");
        return ledger.mark_failed(tx_id, "resource_missing").await;
    };

    let mut resource = handle.lock().await;

    // Re-check under the lock: a racing resolution may have won
    let Some(tx) = ledger.get(tx_id).await else {
        return false;
    };
    if tx.state.is_terminal() {
        debug!(tx_id, "lost resolution race, dropping");
        return false;
    }

    match outcome {
        Outcome::DeviceFailed { reason } => {
            info!(tx_id, %reason, "device reported failure");
            ledger.mark_failed(tx_id, &reason).await
        }
        Outcome::TimedOut { reason } => ledger.mark_failed(tx_id, reason).await,
        Outcome::Ok => apply_success(&mut resource, &tx, ledger, config).await,
    }
}

/// Resource mutation on confirmed success, under the resource lock
async fn apply_success(
    resource: &mut Resource,
    tx: &Transaction,
    ledger: &Arc<Ledger>,
    config: &CoordinatorConfig,
) -> bool {
    match (resource, tx.kind) {
        (Resource::Tool(t), TxKind::StockOut) => {
            let before = tx.quantity_before.unwrap_or(t.quantity);
            let after = before.saturating_sub(tx.requested_qty);
            resolve_tool(t, tx, ledger, after).await
        }
        (Resource::Tool(t), TxKind::StockIn | TxKind::Return) => {
            let before = tx.quantity_before.unwrap_or(t.quantity);
            let after = before.saturating_add(tx.requested_qty);
            resolve_tool(t, tx, ledger, after).await
        }
        (Resource::Holder(h), TxKind::Borrow) => {
            h.availability = Availability::Borrowed;
            info!(tx_id = tx.tx_id, holder = %h.code, "holder borrowed");
            ledger.mark_success(tx.tx_id, SuccessPatch::default()).await
        }
        (Resource::Holder(h), TxKind::Return) => resolve_holder_return(h, tx, ledger, config).await,
        (res, kind) => {
            // Unreachable through begin(), which validates kind vs variant
            warn!(
                tx_id = tx.tx_id,
                resource = %res.code(),
                ?kind,
                "operation kind does not match resource kind"
            );
            ledger.mark_failed(tx.tx_id, "resource_kind_mismatch").await
        }
    }
}

async fn resolve_tool(t: &mut Tool, tx: &Transaction, ledger: &Arc<Ledger>, after: u32) -> bool {
    t.quantity = after;
    info!(
        tx_id = tx.tx_id,
        tool = %t.code,
        kind = ?tx.kind,
        quantity = after,
        "stock updated"
    );
    if t.is_low_stock() {
        warn!(tool = %t.code, quantity = t.quantity, threshold = t.low_stock_threshold, "low stock");
    }
    ledger
        .mark_success(
            tx.tx_id,
            SuccessPatch {
                quantity_after: Some(after),
                ..Default::default()
            },
        )
        .await
}

/// Close out a returned holder: wear accrual, availability flip, and
/// settling of the open borrow row
async fn resolve_holder_return(
    h: &mut Holder,
    tx: &Transaction,
    ledger: &Arc<Ledger>,
    config: &CoordinatorConfig,
) -> bool {
    let borrow = ledger.open_borrow(&h.code).await.filter(|b| b.state == TxState::Success);

    let mut patch = SuccessPatch::default();
    if let Some(b) = &borrow {
        let taken_at = b.resolved_at_ms.unwrap_or(b.created_at_ms);
        let duration_min = now_ms().saturating_sub(taken_at) / 60_000;
        let wear_before = h.wear;
        let wear_after = if tx.maintenance {
            0
        } else {
            wear_after_use(wear_before, duration_min, &config.wear)
        };

        h.wear = wear_after;
        ledger
            .settle_borrow(b.tx_id, wear_before, wear_after, duration_min)
            .await;

        info!(
            tx_id = tx.tx_id,
            holder = %h.code,
            duration_min,
            wear_before,
            wear_after,
            maintenance = tx.maintenance,
            "holder returned"
        );
        patch.wear_after = Some(wear_after);
        patch.duration_min = Some(duration_min);
    } else {
        // Should not happen through begin(); keep the asset usable anyway
        warn!(tx_id = tx.tx_id, holder = %h.code, "return with no open borrow, wear untouched");
    }

    h.availability = Availability::Available;
    ledger.mark_success(tx.tx_id, patch).await
}
