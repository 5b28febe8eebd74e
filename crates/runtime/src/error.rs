//! Error types for the tempest runtime.

use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to a tempest server.
#[derive(Debug, Error)]
pub enum Error {
	/// Failed to establish a connection with the server.
	#[error("Failed to connect to server: {0}")]
	ConnectionFailed(String),

	/// Transport-level error (framing, socket I/O).
	#[error("Transport error: {0}")]
	TransportError(String),

	/// Protocol-level error (malformed or unexpected frame).
	#[error("Protocol error: {0}")]
	ProtocolError(String),

	/// The peer failed the call.
	#[error("{name}: {message}")]
	Remote {
		/// Error type name reported by the peer (defaults to "Failed")
		name: String,
		/// Human-readable error message
		message: String,
	},

	/// A call targeted an export id this side does not (or no longer) hold.
	#[error("Unknown capability: export {0}")]
	UnknownCapability(u64),

	/// A call result or notification did not have the expected shape.
	#[error("Decode error: {0}")]
	Decode(String),

	/// The method is not implemented by the target object.
	#[error("Unimplemented method: {0}")]
	Unimplemented(String),

	/// I/O error.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	/// JSON serialization/deserialization error.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	/// Connection closed before the call completed.
	#[error("Channel closed unexpectedly")]
	ChannelClosed,
}

impl Error {
	/// Returns the peer's error name if this is a Remote error.
	pub fn error_name(&self) -> Option<&str> {
		match self {
			Error::Remote { name, .. } => Some(name),
			_ => None,
		}
	}

	/// Returns true if the connection is gone rather than the call failing.
	pub fn is_disconnected(&self) -> bool {
		match self {
			Error::ChannelClosed | Error::TransportError(_) => true,
			Error::Remote { name, .. } => name == "Disconnected",
			_ => false,
		}
	}
}
