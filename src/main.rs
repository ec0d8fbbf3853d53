use std::sync::Arc;
use std::time::Duration;

use tms_coordinator::bus::{local_bus, DeviceSide};
use tms_coordinator::{
    AckConsumer, BeginRequest, CommandPublisher, CoordinatorConfig, Ledger, PollStatus, Reconciler,
    Resource, ResourceStore, StatusApi, TxKind,
};
use tms_coordinator::resource::{Holder, Slot, Tool};
use tms_shared::{codec, AckEnvelope, AckKind, CommandKind};

use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = CoordinatorConfig {
        tx_timeout: Duration::from_secs(5),
        ..Default::default()
    };

    info!("Coordinator starting");
    info!("  tx timeout: {:?}", config.tx_timeout);

    // Seed the inventory
    let store = Arc::new(ResourceStore::new());
    store
        .insert(Resource::Tool(Tool::new(
            "T-DRL-001",
            "HSS drill 6mm",
            5,
            2,
            Slot::new("L1", 3),
        )))
        .await;
    store
        .insert(Resource::Holder(Holder::new(
            "H-BT40-01",
            "HLD-0001",
            "BT40 face mill holder",
            Slot::new("L1", 7),
        )))
        .await;
    info!("Seeded {} resources", store.count().await);

    let ledger = Arc::new(Ledger::new());
    let (sink, source, device) = local_bus(16);

    // Stand-in for the real cabinet controller
    tokio::spawn(cabinet_simulator(device));

    let publisher = CommandPublisher::new(store.clone(), ledger.clone(), Arc::new(sink));
    let consumer = AckConsumer::new(store.clone(), ledger.clone(), config.clone());
    tokio::spawn(async move { consumer.run(source).await });

    let reconciler = Reconciler::new(store.clone(), ledger.clone(), config.clone());
    let status = StatusApi::new(ledger.clone(), reconciler);

    // Take 3 drills out of stock
    let tx = publisher
        .begin(BeginRequest::new("T-DRL-001", TxKind::StockOut, 3, "U000"))
        .await?;
    let snap = poll_until_terminal(&status, tx).await;
    info!("stock-out tx {}: {:?} quantity_after={:?}", tx, snap.status, snap.quantity_after);

    // Borrow the holder, then hand it back
    let tx = publisher
        .begin(BeginRequest::new("H-BT40-01", TxKind::Borrow, 1, "U000"))
        .await?;
    let snap = poll_until_terminal(&status, tx).await;
    info!("borrow tx {}: {:?}", tx, snap.status);

    let tx = publisher
        .begin(BeginRequest::new("H-BT40-01", TxKind::Return, 1, "U000"))
        .await?;
    let snap = poll_until_terminal(&status, tx).await;
    info!("return tx {}: {:?}", tx, snap.status);

    if let Some(Resource::Holder(h)) = store.snapshot("H-BT40-01").await {
        info!("holder {} now {:?}, wear {}%", h.code, h.availability, h.wear);
    }
    if let Some(Resource::Tool(t)) = store.snapshot("T-DRL-001").await {
        info!("tool {} now {} on hand", t.code, t.quantity);
    }
    info!("{} transactions in the ledger", ledger.len().await);

    Ok(())
}

/// Poll a transaction until it leaves PENDING
async fn poll_until_terminal(
    status: &StatusApi,
    tx_id: u64,
) -> tms_coordinator::StatusSnapshot {
    loop {
        let snap = status.status(tx_id).await;
        if snap.status != PollStatus::Pending {
            return snap;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Answers every command with the matching success event, the way a
/// well-behaved cabinet would
async fn cabinet_simulator(mut device: DeviceSide) {
    while let Some(frame) = device.commands.recv().await {
        let cmd = match codec::decode_command(&frame) {
            Ok(cmd) => cmd,
            Err(e) => {
                warn!("simulator dropping malformed command: {}", e);
                continue;
            }
        };

        // Door motors take a moment
        tokio::time::sleep(Duration::from_millis(50)).await;

        let ev = match (cmd.tool_code.is_some(), cmd.cmd) {
            (true, CommandKind::BorrowStart) => AckKind::ToolBorrowOk,
            (true, CommandKind::ReturnStart) => AckKind::ToolReturnOk,
            (false, CommandKind::BorrowStart) => AckKind::HolderBorrowOk,
            (false, CommandKind::ReturnStart) => AckKind::HolderReturnOk,
        };

        let ack = AckEnvelope::ok(cmd.tx, ev);
        match codec::encode_ack(&ack) {
            Ok(frame) => {
                if device.acks.send(frame).await.is_err() {
                    break;
                }
            }
            Err(e) => warn!("simulator failed to encode ack: {}", e),
        }
    }
}
