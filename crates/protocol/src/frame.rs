//! RPC frames and capability descriptors.
//!
//! Every message on the wire is one [`Frame`]. Calls and returns carry a JSON
//! body plus a cap table; the body refers to entries of that table through
//! [`CapRef`] objects (`{"$cap": 0}`).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Export id of the peer's bootstrap capability.
pub const BOOTSTRAP_TARGET: u64 = 0;

/// Reference from a JSON body into the frame's cap table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapRef {
	#[serde(rename = "$cap")]
	pub index: u32,
}

impl CapRef {
	pub fn new(index: u32) -> Self {
		Self { index }
	}
}

/// Describes one entry of a frame's cap table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CapDescriptor {
	/// An object exported by the sender of the frame, by export id.
	SenderHosted(u64),
	/// One of the receiver's own exports, handed back to it.
	ReceiverHosted(u64),
}

/// Error reported by the peer in a `return` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
	/// Error type name (e.g. "Disconnected", "Failed")
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	/// Human-readable error message
	pub message: String,
}

/// One message of the capability RPC protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
	/// Invoke `method` on the receiver's export `target`.
	Call {
		id: u32,
		target: u64,
		method: String,
		#[serde(default)]
		params: Value,
		#[serde(default, skip_serializing_if = "Vec::is_empty")]
		caps: Vec<CapDescriptor>,
	},
	/// Completes the call with the same `id` sent by the receiver.
	Return {
		id: u32,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		result: Option<Value>,
		#[serde(default, skip_serializing_if = "Vec::is_empty")]
		caps: Vec<CapDescriptor>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		error: Option<ErrorPayload>,
	},
	/// Drops `count` references to the receiver's export `target`.
	Release {
		target: u64,
		#[serde(default = "one")]
		count: u32,
	},
}

fn one() -> u32 {
	1
}
