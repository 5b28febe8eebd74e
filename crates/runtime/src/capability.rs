//! Capability handles - reference-counted references to remote (or local) objects.
//!
//! A [`Capability`] is the only way client code reaches a server object. Every
//! handle owns one reference: [`Capability::add_ref`] duplicates it and
//! [`Capability::release`] (or dropping the handle) gives it back. When the
//! last duplicate goes away the underlying [`ClientHook`] is released exactly
//! once, which for an imported object means one `release` frame to the peer.
//!
//! Capabilities never travel inside JSON bodies. A [`Payload`] pairs the JSON
//! content of a call or return with its cap table, and the content refers to
//! table entries through [`CapRef`]s.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use downcast_rs::{DowncastSync, impl_downcast};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tempest_protocol::CapRef;

use crate::error::{Error, Result};

/// Boxed, sendable future used at the hook boundary.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Backing implementation of a capability.
///
/// Imports from a [`Connection`](crate::Connection) forward calls over the
/// wire; local objects (such as collection pushers) implement the trait
/// directly and can be exported to the peer by passing them in call params.
pub trait ClientHook: DowncastSync {
	/// Invokes `method` on the object.
	fn call(&self, method: &str, params: Payload) -> BoxFuture<'static, Result<Payload>>;

	/// Called once, when the last handle referring to this hook is released.
	fn release(&self) {}
}

impl_downcast!(sync ClientHook);

struct Shared {
	hook: Box<dyn ClientHook>,
}

impl Drop for Shared {
	fn drop(&mut self) {
		self.hook.release();
	}
}

/// Owning handle to a capability.
///
/// Not `Clone`: duplicating a reference is always an explicit
/// [`add_ref`](Self::add_ref). Each handle is released exactly once, either by
/// [`release`](Self::release) or when it is dropped, so capturing an
/// `add_ref`'d handle into an async task releases it on every exit path.
pub struct Capability {
	shared: Arc<Shared>,
}

impl Capability {
	/// Wraps a hook into a fresh capability holding the only reference.
	pub fn new<H: ClientHook>(hook: H) -> Self {
		Self {
			shared: Arc::new(Shared {
				hook: Box::new(hook),
			}),
		}
	}

	/// Duplicates this reference. The object stays alive until every
	/// duplicate is released.
	pub fn add_ref(&self) -> Capability {
		Capability {
			shared: Arc::clone(&self.shared),
		}
	}

	/// Gives this reference back.
	pub fn release(self) {
		drop(self);
	}

	/// Number of live handles sharing this reference.
	pub fn ref_count(&self) -> usize {
		Arc::strong_count(&self.shared)
	}

	/// Returns true if both handles are duplicates of the same reference.
	pub fn same_reference(&self, other: &Capability) -> bool {
		Arc::ptr_eq(&self.shared, &other.shared)
	}

	/// Returns the backing hook.
	pub fn hook(&self) -> &dyn ClientHook {
		self.shared.hook.as_ref()
	}

	/// Sends a raw call.
	pub fn call_raw(&self, method: &str, params: Payload) -> BoxFuture<'static, Result<Payload>> {
		tracing::trace!(method, caps = params.caps.len(), "capability call");
		self.shared.hook.call(method, params)
	}

	/// Sends a call with serializable params and no capabilities.
	pub async fn call<P: Serialize>(&self, method: &str, params: P) -> Result<Payload> {
		let params = Payload::from_params(params)?;
		self.call_raw(method, params).await
	}

	/// Sends a call with no parameters.
	pub async fn call_no_params(&self, method: &str) -> Result<Payload> {
		self.call_raw(method, Payload::empty()).await
	}

	/// Sends a call whose result carries nothing of interest.
	pub async fn call_no_result<P: Serialize>(&self, method: &str, params: P) -> Result<()> {
		self.call(method, params).await?;
		Ok(())
	}
}

impl fmt::Debug for Capability {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Capability")
			.field("refs", &self.ref_count())
			.finish()
	}
}

/// JSON content plus the capabilities it refers to.
#[derive(Debug)]
pub struct Payload {
	pub content: Value,
	pub caps: Vec<Capability>,
}

impl Payload {
	pub fn new(content: Value) -> Self {
		Self {
			content,
			caps: Vec::new(),
		}
	}

	pub fn empty() -> Self {
		Self::new(Value::Null)
	}

	pub fn with_caps(content: Value, caps: Vec<Capability>) -> Self {
		Self { content, caps }
	}

	/// Serializes `params` as the content of a capability-free payload.
	pub fn from_params<P: Serialize>(params: P) -> Result<Self> {
		Ok(Self::new(serde_json::to_value(params)?))
	}

	/// Decodes the content into `T`.
	pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
		T::deserialize(&self.content).map_err(|e| Error::Decode(e.to_string()))
	}

	/// Duplicates the capability `cap_ref` points at.
	///
	/// The payload keeps its own reference, so the returned handle stays valid
	/// after the payload is dropped.
	pub fn cap(&self, cap_ref: CapRef) -> Result<Capability> {
		self.caps
			.get(cap_ref.index as usize)
			.map(Capability::add_ref)
			.ok_or_else(|| {
				Error::Decode(format!(
					"cap index {} out of range (table has {})",
					cap_ref.index,
					self.caps.len()
				))
			})
	}
}
