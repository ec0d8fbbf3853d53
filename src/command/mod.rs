//! Command flow: publish, resolve, reconcile

mod apply;
mod consumer;
mod publisher;
mod timeout;

pub use apply::Outcome;
pub use consumer::AckConsumer;
pub use publisher::{BeginError, BeginRequest, CommandPublisher, PUBLISH_ERROR_REASON};
pub use timeout::{Reconciler, TIMEOUT_REASON};
