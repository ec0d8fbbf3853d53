//! Bus trait abstractions for pluggable broker backends

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;

/// Publishes command frames on the downlink topic
#[async_trait]
pub trait CommandSink: Send + Sync {
    /// Publish one frame; an error means the broker rejected or never
    /// received it
    async fn publish(&self, frame: Bytes) -> Result<()>;

    /// Human-readable name for this bus backend
    fn name(&self) -> &'static str;
}

/// Receives acknowledgment frames from the uplink topic
#[async_trait]
pub trait AckSource: Send {
    /// Wait for the next frame; `None` means the subscription closed
    async fn recv(&mut self) -> Option<Bytes>;
}
