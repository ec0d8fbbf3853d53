//! Acknowledgment consumer - the single subscriber on the uplink topic

use super::apply::{apply_outcome, Outcome};
use crate::bus::AckSource;
use crate::config::CoordinatorConfig;
use crate::ledger::Ledger;
use crate::resource::ResourceStore;
use std::sync::Arc;
use tms_shared::{codec, AckEnvelope};
use tracing::{debug, info, warn};

/// Consumes cabinet acknowledgments and resolves transactions.
///
/// Runs as one long-lived task; ordering within a resource is not
/// guaranteed by the transport, so correctness comes from the idempotent,
/// lock-guarded transitions in [`apply_outcome`], not from sequencing.
/// Nothing a device sends can crash this loop.
pub struct AckConsumer {
    store: Arc<ResourceStore>,
    ledger: Arc<Ledger>,
    config: CoordinatorConfig,
}

impl AckConsumer {
    /// Create a new consumer
    pub fn new(store: Arc<ResourceStore>, ledger: Arc<Ledger>, config: CoordinatorConfig) -> Self {
        Self {
            store,
            ledger,
            config,
        }
    }

    /// Receive frames until the subscription closes
    pub async fn run<S: AckSource>(&self, mut source: S) {
        info!("ack consumer started");
        while let Some(frame) = source.recv().await {
            self.handle_frame(&frame).await;
        }
        info!("ack source closed, consumer stopping");
    }

    /// Decode one frame and dispatch it; malformed input is logged and
    /// dropped, never an error
    pub async fn handle_frame(&self, frame: &[u8]) {
        match codec::decode_ack(frame) {
            Ok(ack) => self.handle_ack(&ack).await,
            Err(e) => warn!(error = %e, "dropping malformed ack frame"),
        }
    }

    /// Apply a decoded acknowledgment
    pub async fn handle_ack(&self, ack: &AckEnvelope) {
        debug!(tx = ack.tx, ev = ?ack.ev, reason = %ack.reason, "ack received");

        let outcome = if ack.is_failure() {
            Outcome::DeviceFailed {
                reason: ack.reason.clone(),
            }
        } else {
            Outcome::Ok
        };

        apply_outcome(&self.store, &self.ledger, &self.config, ack.tx, outcome).await;
    }
}
