//! TMS Shared Wire Types
//!
//! This crate provides the JSON envelopes and line codec for communication
//! between the transaction coordinator and the embedded cabinet controllers.
//! Cabinet firmware simulators and relay processes link against this crate
//! so both sides agree on field names and framing.

pub mod codec;

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Tunable parameters with their stock values
pub mod defaults {
    /// Seconds a transaction may stay PENDING before a poll force-fails it
    pub const TX_TIMEOUT_SECS: u64 = 60;

    /// Minimum wear added per completed borrow, in percent
    pub const WEAR_FLOOR_PCT: u8 = 10;

    /// Minutes of borrow time that consume one percent of useful life
    pub const MINUTES_PER_WEAR_PCT: u32 = 120;

    /// Maximum wire frame size to accept
    pub const MAX_FRAME_SIZE: usize = 64 * 1024;
}

/// Command verbs understood by the cabinet controllers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// Open the cell so an item (or quantity) can be taken out
    BorrowStart,
    /// Open the cell so an item (or quantity) can be put back
    ReturnStart,
}

/// Outbound command envelope, published on the command topic.
///
/// Tool commands carry `tool_code` + `qty`; holder commands carry
/// `holder_rfid_expected` so the cabinet can verify the right item moved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub cmd: CommandKind,
    pub tx: u64,
    pub locker: String,
    pub cell: u32,
    pub user_rfid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qty: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holder_rfid_expected: Option<String>,
}

impl CommandEnvelope {
    /// Create a command for a countable tool cell
    pub fn tool(
        cmd: CommandKind,
        tx: u64,
        locker: impl Into<String>,
        cell: u32,
        user_rfid: impl Into<String>,
        tool_code: impl Into<String>,
        qty: u32,
    ) -> Self {
        Self {
            cmd,
            tx,
            locker: locker.into(),
            cell,
            user_rfid: user_rfid.into(),
            tool_code: Some(tool_code.into()),
            qty: Some(qty),
            holder_rfid_expected: None,
        }
    }

    /// Create a command for a unique holder cell
    pub fn holder(
        cmd: CommandKind,
        tx: u64,
        locker: impl Into<String>,
        cell: u32,
        user_rfid: impl Into<String>,
        holder_rfid: impl Into<String>,
    ) -> Self {
        Self {
            cmd,
            tx,
            locker: locker.into(),
            cell,
            user_rfid: user_rfid.into(),
            tool_code: None,
            qty: None,
            holder_rfid_expected: Some(holder_rfid.into()),
        }
    }
}

/// Event kinds a cabinet controller reports back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckKind {
    ToolBorrowOk,
    ToolReturnOk,
    HolderBorrowOk,
    HolderReturnOk,
    ToolBorrowFailed,
    ToolReturnFailed,
    HolderBorrowFailed,
    HolderReturnFailed,
}

impl AckKind {
    /// True for the `*_failed` family of events
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            AckKind::ToolBorrowFailed
                | AckKind::ToolReturnFailed
                | AckKind::HolderBorrowFailed
                | AckKind::HolderReturnFailed
        )
    }
}

/// Inbound acknowledgment envelope, consumed from the uplink topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AckEnvelope {
    pub tx: u64,
    pub ev: AckKind,
    /// Device-supplied failure reason, empty on success
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
}

impl AckEnvelope {
    /// Create a success acknowledgment
    pub fn ok(tx: u64, ev: AckKind) -> Self {
        Self {
            tx,
            ev,
            reason: String::new(),
        }
    }

    /// Create a failure acknowledgment with the device's reason
    pub fn failed(tx: u64, ev: AckKind, reason: impl Into<String>) -> Self {
        Self {
            tx,
            ev,
            reason: reason.into(),
        }
    }

    /// True when this ack reports a failed operation
    pub fn is_failure(&self) -> bool {
        self.ev.is_failure()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_command_wire_shape() {
        let cmd = CommandEnvelope::tool(
            CommandKind::BorrowStart,
            100,
            "L1",
            3,
            "U000",
            "T-DRL-001",
            2,
        );
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["cmd"], "borrow_start");
        assert_eq!(json["tx"], 100);
        assert_eq!(json["locker"], "L1");
        assert_eq!(json["cell"], 3);
        assert_eq!(json["tool_code"], "T-DRL-001");
        assert_eq!(json["qty"], 2);
        assert!(json.get("holder_rfid_expected").is_none());
    }

    #[test]
    fn test_holder_command_wire_shape() {
        let cmd = CommandEnvelope::holder(
            CommandKind::ReturnStart,
            7,
            "L2",
            1,
            "U001",
            "HLD-0001",
        );
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["cmd"], "return_start");
        assert_eq!(json["holder_rfid_expected"], "HLD-0001");
        assert!(json.get("tool_code").is_none());
        assert!(json.get("qty").is_none());
    }

    #[test]
    fn test_ack_parse() {
        let ack: AckEnvelope =
            serde_json::from_str(r#"{"tx":100,"ev":"tool_borrow_ok"}"#).unwrap();
        assert_eq!(ack.tx, 100);
        assert_eq!(ack.ev, AckKind::ToolBorrowOk);
        assert!(!ack.is_failure());
        assert!(ack.reason.is_empty());
    }

    #[test]
    fn test_failed_ack_parse() {
        let ack: AckEnvelope = serde_json::from_str(
            r#"{"tx":5,"ev":"holder_return_failed","reason":"rfid_mismatch"}"#,
        )
        .unwrap();
        assert!(ack.is_failure());
        assert_eq!(ack.reason, "rfid_mismatch");
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        let res: Result<AckEnvelope, _> =
            serde_json::from_str(r#"{"tx":5,"ev":"door_opened"}"#);
        assert!(res.is_err());
    }

    #[test]
    fn test_now_ms_is_monotonic_enough() {
        let a = now_ms();
        let b = now_ms();
        assert!(b >= a);
        assert!(a > 0);
    }
}
