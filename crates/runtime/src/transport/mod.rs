//! Transports carrying JSON frames between client and server.
//!
//! - [`PipeTransport`]: length-prefixed JSON over any async byte stream
//!   (u32 little-endian length, then the JSON bytes)
//! - [`WebSocketTransport`]: one JSON text frame per message
//!
//! Both split into a sending half ([`Transport`]) and a reading half
//! ([`TransportReceiver`]) that pushes decoded frames into an unbounded queue
//! consumed by the [`Connection`](crate::Connection).

mod pipe;
mod websocket;


use serde_json::Value;
use tokio::sync::mpsc;

pub use pipe::{PipeTransport, PipeTransportReceiver, PipeTransportSender};
pub use websocket::{RPC_SUBPROTOCOL, WebSocketTransport, WebSocketTransportReceiver, WebSocketTransportSender};

use crate::capability::BoxFuture;
use crate::error::Result;

/// Upper bound on a single frame; larger length prefixes are treated as corruption.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024;

/// Sending half of a transport.
pub trait Transport: Send {
	/// Writes one message.
	fn send(&mut self, message: Value) -> BoxFuture<'_, Result<()>>;
}

/// Reading half of a transport.
pub trait TransportReceiver: Send {
	/// Reads messages into the queue until the stream ends or fails.
	fn run(self: Box<Self>) -> BoxFuture<'static, Result<()>>;
}

/// Both halves of a transport plus the queue its receiver feeds.
pub struct TransportParts {
	pub sender: Box<dyn Transport>,
	pub receiver: Box<dyn TransportReceiver>,
	pub message_rx: mpsc::UnboundedReceiver<Value>,
}
