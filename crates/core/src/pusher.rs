//! Server-to-client collection sync.
//!
//! The server keeps a client-side keyed collection up to date by calling
//! `upsert`, `remove` and `clear` on a pusher object the client passes it.
//! [`Pusher`] is that object: it decodes each notification with its
//! [`PusherHooks`] and queues exactly one [`Message`] per call, in arrival
//! order. It keeps no state of its own.

use serde::de::DeserializeOwned;
use tempest_protocol::methods::{PushRemove, PushUpsert, pusher};
use tempest_protocol::{GrainId, PackageDescriptor, PackageId, UiViewDescriptor};
use tempest_runtime::{BoxFuture, Capability, ClientHook, Error, Payload, Result};

use crate::command::MessageSender;
use crate::error::Error as ClientError;
use crate::message::Message;
use crate::model::{Grain, Package};

/// Per-collection behavior of a [`Pusher`].
pub trait PusherHooks: Send + Sync + 'static {
	type Key: DeserializeOwned;
	/// Value as it appears on the wire.
	type Wire: DeserializeOwned;
	type Value;

	/// Converts a wire value, duplicating any capability it refers to out of `payload`.
	fn decode(&self, wire: Self::Wire, payload: &Payload) -> Result<Self::Value>;

	fn upsert(&self, key: Self::Key, value: Self::Value) -> Message;

	fn remove(&self, key: Self::Key) -> Message;

	fn clear(&self) -> Message;
}

/// Client-side object receiving collection notifications.
pub struct Pusher<H> {
	sender: MessageSender,
	hooks: H,
}

impl<H: PusherHooks> Pusher<H> {
	pub fn new(sender: MessageSender, hooks: H) -> Self {
		Self { sender, hooks }
	}

	/// Wraps the pusher into a capability that can be passed to the server.
	pub fn into_capability(self) -> Capability {
		Capability::new(self)
	}

	fn translate(&self, method: &str, params: &Payload) -> Result<Message> {
		match method {
			pusher::UPSERT => {
				let PushUpsert { key, value } = params.decode::<PushUpsert<H::Key, H::Wire>>()?;
				let value = self.hooks.decode(value, params)?;
				Ok(self.hooks.upsert(key, value))
			}
			pusher::REMOVE => {
				let PushRemove { key } = params.decode::<PushRemove<H::Key>>()?;
				Ok(self.hooks.remove(key))
			}
			pusher::CLEAR => Ok(self.hooks.clear()),
			other => Err(Error::Unimplemented(other.to_string())),
		}
	}
}

/// Error answered to the server for a notification the client could not apply.
fn rejection(error: &Error) -> Error {
	match error {
		Error::Unimplemented(method) => Error::Unimplemented(method.clone()),
		other => Error::Decode(other.to_string()),
	}
}

impl<H: PusherHooks> ClientHook for Pusher<H> {
	fn call(&self, method: &str, params: Payload) -> BoxFuture<'static, Result<Payload>> {
		let result = match self.translate(method, &params) {
			Ok(msg) => {
				tracing::trace!(method, message = msg.name(), "push notification");
				self.sender.send(msg);
				Ok(Payload::empty())
			}
			Err(e) => {
				tracing::warn!(method, error = %e, "rejected push notification");
				let reply = rejection(&e);
				// The local collection has drifted from the server's.
				self.sender.send(Message::NewError(ClientError::Rpc(e)));
				Err(reply)
			}
		};
		Box::pin(std::future::ready(result))
	}
}

/// Grains visible to a session (`VisitorSession.listViews`).
#[derive(Debug, Clone, Copy, Default)]
pub struct GrainPusher;

impl PusherHooks for GrainPusher {
	type Key = GrainId;
	type Wire = UiViewDescriptor;
	type Value = Grain;

	fn decode(&self, wire: UiViewDescriptor, payload: &Payload) -> Result<Grain> {
		Grain::from_descriptor(wire, payload)
	}

	fn upsert(&self, id: GrainId, grain: Grain) -> Message {
		Message::UpsertGrain { id, grain }
	}

	fn remove(&self, id: GrainId) -> Message {
		Message::RemoveGrain { id }
	}

	fn clear(&self) -> Message {
		Message::ClearGrains
	}
}

/// Packages installed by the user (`UserSession.listPackages`).
#[derive(Debug, Clone, Copy, Default)]
pub struct PackagePusher;

impl PusherHooks for PackagePusher {
	type Key = PackageId;
	type Wire = PackageDescriptor;
	type Value = Package;

	fn decode(&self, wire: PackageDescriptor, payload: &Payload) -> Result<Package> {
		Package::from_descriptor(wire, payload)
	}

	fn upsert(&self, id: PackageId, package: Package) -> Message {
		Message::UpsertPackage { id, package }
	}

	fn remove(&self, id: PackageId) -> Message {
		Message::RemovePackage { id }
	}

	fn clear(&self) -> Message {
		Message::ClearPackages
	}
}
