//! Message bus seam between the coordinator and the broker
//!
//! The broker itself is an external collaborator; delivery is assumed
//! at-most-once and unordered. Correctness therefore never relies on the
//! bus: it comes from the ledger's idempotent, lock-guarded transitions.

mod local;
mod traits;

pub use local::{local_bus, DeviceSide, LocalAckSource, LocalCommandSink};
pub use traits::{AckSource, CommandSink};
