//! Wire types for the tempest capability RPC protocol.
//!
//! This crate contains the serde-serializable types exchanged with a tempest
//! server: RPC frames, capability descriptors, collection push notifications
//! and the param/result shapes of every remote method the client calls.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! - **Pure data**: No behavior beyond serialization/deserialization
//! - **Capability-free**: Capabilities appear only as [`CapRef`] indices into a
//!   frame's cap table; turning them into live handles is the runtime's job
//! - **Stable**: Changes only when the wire protocol changes
//!
//! Capability handles, the connection and the typed interfaces are built on
//! top of these types in `tempest-runtime` and `tempest`.

pub mod frame;
pub mod ids;
pub mod methods;
pub mod types;

pub use frame::*;
pub use ids::*;
pub use methods::*;
pub use types::*;
