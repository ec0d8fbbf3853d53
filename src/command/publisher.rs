//! Command publisher - validates requests and emits cabinet commands

use crate::bus::CommandSink;
use crate::ledger::{Ledger, Transaction, TxKind, TxState};
use crate::resource::{Availability, Resource, ResourceStore};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tms_shared::{codec, CommandEnvelope};
use tracing::{info, warn};

/// Reason the publisher marks a row FAILED when the broker publish errors
pub const PUBLISH_ERROR_REASON: &str = "publish_error";

/// Request-rejected errors, detected before any transaction exists.
/// No row is written and no command is sent for any of these.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BeginError {
    /// No resource with this code is registered
    #[error("unknown resource: {0}")]
    UnknownResource(String),

    /// STOCK_OUT asked for more than is on hand
    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: u32, available: u32 },

    /// The holder is not borrowable right now
    #[error("resource unavailable: {0}")]
    ResourceUnavailable(String),

    /// RETURN with no borrow to close
    #[error("no open borrow for {0}")]
    NoOpenBorrow(String),

    /// Zero quantity, or quantity other than 1 for a holder
    #[error("invalid quantity: {0}")]
    InvalidQuantity(u32),

    /// Operation kind does not apply to this resource kind
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),
}

/// A caller's request to start a hardware operation
#[derive(Debug, Clone)]
pub struct BeginRequest {
    /// Resource code
    pub resource: String,
    pub kind: TxKind,
    pub quantity: u32,
    /// RFID credential of the requesting user
    pub actor_rfid: String,
    /// Return hands the holder back from maintenance; resets wear
    pub maintenance: bool,
    /// Project / production order reference
    pub project: String,
    pub note: String,
}

impl BeginRequest {
    /// Build a request with empty bookkeeping fields
    pub fn new(
        resource: impl Into<String>,
        kind: TxKind,
        quantity: u32,
        actor_rfid: impl Into<String>,
    ) -> Self {
        Self {
            resource: resource.into(),
            kind,
            quantity,
            actor_rfid: actor_rfid.into(),
            maintenance: false,
            project: String::new(),
            note: String::new(),
        }
    }
}

/// Creates PENDING transactions and emits the matching cabinet commands.
///
/// Validation and the ledger write happen under the resource lock; the
/// publish happens after the lock is released, so a command visible on the
/// wire always has a matching ledger row. Resource state itself is never
/// mutated here - that only happens on confirmed success.
pub struct CommandPublisher {
    store: Arc<ResourceStore>,
    ledger: Arc<Ledger>,
    sink: Arc<dyn CommandSink>,
    next_tx_id: AtomicU64,
}

impl CommandPublisher {
    /// Create a new publisher
    pub fn new(store: Arc<ResourceStore>, ledger: Arc<Ledger>, sink: Arc<dyn CommandSink>) -> Self {
        Self {
            store,
            ledger,
            sink,
            next_tx_id: AtomicU64::new(0),
        }
    }

    /// Allocate the next transaction id
    fn next_tx_id(&self) -> u64 {
        self.next_tx_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Start a hardware operation.
    ///
    /// On `Ok`, a PENDING row exists under the returned id and the command
    /// has been handed to the bus (or the row is already FAILED with
    /// `publish_error` if the bus rejected it). Either way the caller has
    /// an id to poll.
    pub async fn begin(&self, req: BeginRequest) -> Result<u64, BeginError> {
        if req.quantity == 0 {
            return Err(BeginError::InvalidQuantity(0));
        }

        let handle = self
            .store
            .handle(&req.resource)
            .await
            .ok_or_else(|| BeginError::UnknownResource(req.resource.clone()))?;

        let tx_id;
        let envelope;
        {
            // Critical section: read-validate-write, no bus I/O inside
            let guard = handle.lock().await;

            self.validate(&guard, &req).await?;

            tx_id = self.next_tx_id();
            let mut tx = Transaction::pending(tx_id, &req.resource, req.kind, req.quantity);
            tx.actor_rfid = req.actor_rfid.clone();
            tx.project = req.project.clone();
            tx.note = req.note.clone();
            tx.maintenance = req.maintenance;
            match &*guard {
                Resource::Tool(t) => tx.quantity_before = Some(t.quantity),
                Resource::Holder(h) => tx.wear_before = Some(h.wear),
            }
            self.ledger.insert(tx).await;

            envelope = build_envelope(&guard, &req, tx_id);
        }

        info!(
            tx_id,
            resource = %req.resource,
            kind = ?req.kind,
            qty = req.quantity,
            "transaction created, publishing command"
        );

        match codec::encode_command(&envelope) {
            Ok(frame) => {
                if let Err(e) = self.sink.publish(frame).await {
                    warn!(tx_id, error = %e, "publish failed, failing transaction");
                    self.ledger.mark_failed(tx_id, PUBLISH_ERROR_REASON).await;
                }
            }
            Err(e) => {
                warn!(tx_id, error = %e, "command encoding failed, failing transaction");
                self.ledger.mark_failed(tx_id, PUBLISH_ERROR_REASON).await;
            }
        }

        Ok(tx_id)
    }

    /// Synchronous preconditions, evaluated under the resource lock
    async fn validate(&self, resource: &Resource, req: &BeginRequest) -> Result<(), BeginError> {
        match (resource, req.kind) {
            (Resource::Tool(_), TxKind::Borrow) => Err(BeginError::UnsupportedOperation(
                "tools are stocked in/out, not borrowed".into(),
            )),
            (Resource::Tool(t), TxKind::StockOut) => {
                if req.quantity > t.quantity {
                    Err(BeginError::InsufficientStock {
                        requested: req.quantity,
                        available: t.quantity,
                    })
                } else {
                    Ok(())
                }
            }
            (Resource::Tool(_), TxKind::StockIn | TxKind::Return) => Ok(()),

            (Resource::Holder(_), TxKind::StockIn | TxKind::StockOut) => {
                Err(BeginError::UnsupportedOperation(
                    "holders are borrowed/returned, not stocked".into(),
                ))
            }
            (Resource::Holder(h), TxKind::Borrow) => {
                if req.quantity != 1 {
                    return Err(BeginError::InvalidQuantity(req.quantity));
                }
                if h.availability != Availability::Available {
                    return Err(BeginError::ResourceUnavailable(format!(
                        "{} is {:?}",
                        h.code, h.availability
                    )));
                }
                // A borrow still in flight blocks a second one even though
                // availability has not flipped yet
                if self.ledger.open_borrow(&h.code).await.is_some() {
                    return Err(BeginError::ResourceUnavailable(format!(
                        "{} has a borrow in flight",
                        h.code
                    )));
                }
                Ok(())
            }
            (Resource::Holder(h), TxKind::Return) => {
                if req.quantity != 1 {
                    return Err(BeginError::InvalidQuantity(req.quantity));
                }
                // A still-pending borrow does not qualify: nothing was
                // physically taken yet
                match self.ledger.open_borrow(&h.code).await {
                    Some(b) if b.state == TxState::Success => Ok(()),
                    _ => Err(BeginError::NoOpenBorrow(h.code.clone())),
                }
            }
        }
    }
}

/// Build the wire command for a validated request
fn build_envelope(resource: &Resource, req: &BeginRequest, tx_id: u64) -> CommandEnvelope {
    let cmd = req.kind.command();
    match resource {
        Resource::Tool(t) => CommandEnvelope::tool(
            cmd,
            tx_id,
            t.slot.locker.clone(),
            t.slot.cell,
            req.actor_rfid.clone(),
            t.code.clone(),
            req.quantity,
        ),
        Resource::Holder(h) => CommandEnvelope::holder(
            cmd,
            tx_id,
            h.slot.locker.clone(),
            h.slot.cell,
            req.actor_rfid.clone(),
            h.rfid.clone(),
        ),
    }
}
