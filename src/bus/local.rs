//! In-process bus backed by tokio channels
//!
//! Used by the demo binary and the integration tests; a production
//! deployment plugs a broker client into the same traits.

use super::{AckSource, CommandSink};
use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

/// Coordinator-side command publisher
pub struct LocalCommandSink {
    tx: mpsc::Sender<Bytes>,
}

/// Coordinator-side ack subscription
pub struct LocalAckSource {
    rx: mpsc::Receiver<Bytes>,
}

/// Device-side endpoints, handed to a cabinet simulator
pub struct DeviceSide {
    /// Command frames published by the coordinator
    pub commands: mpsc::Receiver<Bytes>,
    /// Channel for the device's acknowledgment frames
    pub acks: mpsc::Sender<Bytes>,
}

/// Build a connected in-process bus
pub fn local_bus(capacity: usize) -> (LocalCommandSink, LocalAckSource, DeviceSide) {
    let (cmd_tx, cmd_rx) = mpsc::channel(capacity);
    let (ack_tx, ack_rx) = mpsc::channel(capacity);

    (
        LocalCommandSink { tx: cmd_tx },
        LocalAckSource { rx: ack_rx },
        DeviceSide {
            commands: cmd_rx,
            acks: ack_tx,
        },
    )
}

#[async_trait]
impl CommandSink for LocalCommandSink {
    async fn publish(&self, frame: Bytes) -> Result<()> {
        self.tx
            .send(frame)
            .await
            .map_err(|_| anyhow::anyhow!("local bus closed"))
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

#[async_trait]
impl AckSource for LocalAckSource {
    async fn recv(&mut self) -> Option<Bytes> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_frames_flow_both_ways() {
        let (sink, mut source, mut device) = local_bus(4);

        sink.publish(Bytes::from_static(b"cmd\n")).await.unwrap();
        assert_eq!(device.commands.recv().await.unwrap(), "cmd\n");

        device.acks.send(Bytes::from_static(b"ack\n")).await.unwrap();
        assert_eq!(source.recv().await.unwrap(), "ack\n");
    }

    #[tokio::test]
    async fn test_publish_fails_when_device_side_dropped() {
        let (sink, _source, device) = local_bus(4);
        drop(device);
        assert!(sink.publish(Bytes::from_static(b"cmd\n")).await.is_err());
    }
}
