//! Hardware transaction coordinator for electronically locked tool cabinets.
//!
//! Issues borrow/return commands to cabinet controllers over a
//! publish/subscribe channel, tracks every operation as a durable
//! transaction row, consumes out-of-band acknowledgments, resolves
//! timeouts on poll, and applies exactly-once mutations to inventory
//! state under per-resource locks.

pub mod bus;
pub mod command;
pub mod config;
pub mod ledger;
pub mod resource;
pub mod status;

pub use command::{AckConsumer, BeginError, BeginRequest, CommandPublisher, Reconciler};
pub use config::CoordinatorConfig;
pub use ledger::{Ledger, Transaction, TxKind, TxState};
pub use resource::{Availability, Resource, ResourceStore};
pub use status::{PollStatus, StatusApi, StatusSnapshot};
