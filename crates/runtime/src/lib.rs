//! Tempest Runtime - capability handles, RPC connection and transports
//!
//! This crate provides the low-level infrastructure for talking to a tempest
//! server:
//!
//! - **Capabilities**: owning, reference-counted handles to remote objects
//! - **Connection**: call/return correlation, capability import/export tables
//! - **Transport**: length-prefixed pipes or WebSocket text frames
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │   tempest    │  Typed interfaces, Model, dispatch loop
//! └──────┬───────┘
//!        │ holds Capability handles
//! ┌──────▼───────┐
//! │   runtime    │  This crate
//! │  ┌────────┐  │
//! │  │ Cap    │  │  add_ref / release, ClientHook
//! │  └────────┘  │
//! │  ┌────────┐  │
//! │  │ Conn   │  │  Frame correlation, imports/exports
//! │  └────────┘  │
//! │  ┌────────┐  │
//! │  │ Trans  │  │  Pipe/WebSocket transport
//! │  └────────┘  │
//! └──────────────┘
//! ```
//!
//! # Decoupling via ClientHook
//!
//! Client code only sees [`Capability`]. Whether the object behind it lives on
//! the server ([`ImportHook`]) or in-process (a collection pusher, a test
//! double) is decided by the [`ClientHook`] it wraps.

pub mod capability;
pub mod connection;
pub mod error;
pub mod transport;

// Re-export key types at crate root
pub use capability::{BoxFuture, Capability, ClientHook, Payload};
pub use connection::{Connection, ExportTable, ImportHook};
pub use error::{Error, Result};
pub use transport::{
	PipeTransport, PipeTransportReceiver, PipeTransportSender, Transport, TransportParts,
	TransportReceiver, WebSocketTransport, WebSocketTransportReceiver, WebSocketTransportSender,
};
