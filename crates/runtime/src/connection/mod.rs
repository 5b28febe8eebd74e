//! Capability RPC connection.
//!
//! This module implements the call/return correlation layer on top of a
//! transport, plus the two capability tables that make references work
//! across the wire:
//!
//! - **Imports**: every `senderHosted` descriptor received from the peer becomes
//!   a [`Capability`] backed by an [`ImportHook`]. Releasing the last duplicate
//!   of that handle sends one `release` frame.
//! - **Exports**: local capabilities passed in call params (e.g. collection
//!   pushers) are stored in an [`ExportTable`] and served when the peer calls
//!   them. The peer's `release` frames drop them again.
//!
//! # Message Flow
//!
//! 1. Client calls a capability; its [`ImportHook`] calls [`Connection::send_call`]
//! 2. Connection generates a unique ID, registers a oneshot callback and queues the frame
//! 3. Writer task hands the frame to the transport
//! 4. Dispatch loop receives the matching `return`, imports its caps and
//!    completes the oneshot
//! 5. Incoming `call` frames are served inline, so calls on one export are
//!    handled strictly in arrival order

mod exports;

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::task::{Context, Poll};

use parking_lot::Mutex;
use serde_json::Value;
use tempest_protocol::{BOOTSTRAP_TARGET, CapDescriptor, ErrorPayload, Frame};
use tokio::sync::{mpsc, oneshot};

pub use exports::ExportTable;

use crate::capability::{BoxFuture, Capability, ClientHook, Payload};
use crate::error::{Error, Result};
use crate::transport::{Transport, TransportParts, TransportReceiver};

/// Pending call callbacks keyed by request ID.
type CallbackMap = Arc<Mutex<HashMap<u32, oneshot::Sender<Result<Payload>>>>>;

/// RAII guard ensuring callback cleanup when a call future is dropped.
struct CancelGuard {
	id: u32,
	callbacks: CallbackMap,
	completed: bool,
}

impl CancelGuard {
	fn new(id: u32, callbacks: CallbackMap) -> Self {
		Self {
			id,
			callbacks,
			completed: false,
		}
	}

	fn complete(&mut self) {
		self.completed = true;
	}
}

impl Drop for CancelGuard {
	fn drop(&mut self) {
		if self.completed {
			return;
		}
		if self.callbacks.lock().remove(&self.id).is_some() {
			tracing::debug!(id = self.id, "CancelGuard: removed orphaned callback");
		}
	}
}

/// Future returned by [`Connection::send_call`] with automatic cancellation cleanup.
struct ResponseFuture {
	rx: oneshot::Receiver<Result<Payload>>,
	guard: CancelGuard,
}

impl Future for ResponseFuture {
	type Output = Result<Payload>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		match Pin::new(&mut self.rx).poll(cx) {
			Poll::Ready(result) => {
				self.guard.complete();
				Poll::Ready(result.map_err(|_| Error::ChannelClosed).and_then(|r| r))
			}
			Poll::Pending => Poll::Pending,
		}
	}
}

/// Hook of a capability imported from the peer.
pub struct ImportHook {
	id: u64,
	connection: Arc<Connection>,
}

impl ImportHook {
	/// Export id of the object on the peer.
	pub fn id(&self) -> u64 {
		self.id
	}
}

impl ClientHook for ImportHook {
	fn call(&self, method: &str, params: Payload) -> BoxFuture<'static, Result<Payload>> {
		let connection = Arc::clone(&self.connection);
		let target = self.id;
		let method = method.to_string();
		Box::pin(async move { connection.send_call(target, &method, params).await })
	}

	fn release(&self) {
		self.connection.send_release(self.id);
	}
}

/// Capability RPC connection to a tempest server.
///
/// Manages call/return correlation, capability imports and exports, and
/// serving calls the peer makes on exported objects.
pub struct Connection {
	/// Sequential request ID counter
	last_id: AtomicU32,
	/// Pending call callbacks keyed by request ID
	callbacks: CallbackMap,
	/// Channel for sending outbound frames to the writer task
	outbound_tx: mpsc::UnboundedSender<Value>,
	/// Objects exported to the peer
	exports: ExportTable,
	/// Transport halves and queues, taken once by run()
	parts: Mutex<Option<RunParts>>,
}

struct RunParts {
	sender: Box<dyn Transport>,
	receiver: Box<dyn TransportReceiver>,
	message_rx: mpsc::UnboundedReceiver<Value>,
	outbound_rx: mpsc::UnboundedReceiver<Value>,
}

impl Connection {
	/// Creates a new Connection over the given transport.
	pub fn new(parts: TransportParts) -> Arc<Self> {
		let TransportParts {
			sender,
			receiver,
			message_rx,
		} = parts;

		let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

		Arc::new(Self {
			last_id: AtomicU32::new(0),
			callbacks: Arc::new(Mutex::new(HashMap::new())),
			outbound_tx,
			exports: ExportTable::new(),
			parts: Mutex::new(Some(RunParts {
				sender,
				receiver,
				message_rx,
				outbound_rx,
			})),
		})
	}

	/// Creates a Connection that serves `bootstrap` to the peer as its bootstrap object.
	pub fn with_bootstrap(parts: TransportParts, bootstrap: Capability) -> Arc<Self> {
		let connection = Self::new(parts);
		connection.exports.insert_bootstrap(bootstrap);
		connection
	}

	/// Returns the peer's bootstrap capability.
	pub fn bootstrap(self: &Arc<Self>) -> Capability {
		self.import(BOOTSTRAP_TARGET)
	}

	/// Number of capabilities currently exported to the peer.
	pub fn export_count(&self) -> usize {
		self.exports.len()
	}

	fn import(self: &Arc<Self>, id: u64) -> Capability {
		Capability::new(ImportHook {
			id,
			connection: Arc::clone(self),
		})
	}

	/// Sends a call to the peer's export `target` and awaits the return.
	pub async fn send_call(self: &Arc<Self>, target: u64, method: &str, params: Payload) -> Result<Payload> {
		let id = self.last_id.fetch_add(1, Ordering::SeqCst);

		tracing::debug!(id, target, method, "Sending call");

		let Payload { content, caps } = params;
		let descriptors: Vec<CapDescriptor> = caps.iter().map(|cap| self.describe(cap)).collect();

		let (tx, rx) = oneshot::channel();
		self.callbacks.lock().insert(id, tx);
		let guard = CancelGuard::new(id, Arc::clone(&self.callbacks));

		let frame = Frame::Call {
			id,
			target,
			method: method.to_string(),
			params: content,
			caps: descriptors,
		};
		self.queue(&frame)?;
		// Receiver-hosted duplicates may only be released after the call frame is queued.
		drop(caps);

		ResponseFuture { rx, guard }.await
	}

	fn send_release(&self, target: u64) {
		tracing::debug!(target, "Releasing import");
		if let Err(e) = self.queue(&Frame::Release { target, count: 1 }) {
			tracing::debug!(target, error = %e, "release not sent (connection closed)");
		}
	}

	fn queue(&self, frame: &Frame) -> Result<()> {
		let value = serde_json::to_value(frame)?;
		self.outbound_tx.send(value).map_err(|_| {
			tracing::error!("Failed to queue frame: outbound channel closed");
			Error::ChannelClosed
		})
	}

	/// Describes `cap` for the peer, exporting it if it is not the peer's own object.
	fn describe(self: &Arc<Self>, cap: &Capability) -> CapDescriptor {
		if let Some(import) = cap.hook().downcast_ref::<ImportHook>() {
			if Arc::ptr_eq(&import.connection, self) {
				return CapDescriptor::ReceiverHosted(import.id);
			}
		}
		CapDescriptor::SenderHosted(self.exports.insert(cap.add_ref()))
	}

	fn resolve(self: &Arc<Self>, descriptors: Vec<CapDescriptor>) -> Result<Vec<Capability>> {
		descriptors
			.into_iter()
			.map(|descriptor| match descriptor {
				CapDescriptor::SenderHosted(id) => Ok(self.import(id)),
				CapDescriptor::ReceiverHosted(id) => self.exports.get(id),
			})
			.collect()
	}

	/// Runs the frame dispatch loop until the transport closes.
	pub async fn run(self: &Arc<Self>) -> Result<()> {
		let RunParts {
			mut sender,
			receiver,
			mut message_rx,
			mut outbound_rx,
		} = self
			.parts
			.lock()
			.take()
			.ok_or_else(|| Error::ProtocolError("run() can only be called once".to_string()))?;

		let reader_handle = tokio::spawn(async move {
			if let Err(e) = receiver.run().await {
				tracing::error!("Transport read error: {}", e);
			}
		});

		let writer_handle = tokio::spawn(async move {
			while let Some(message) = outbound_rx.recv().await {
				if let Err(e) = sender.send(message).await {
					tracing::error!("Transport write error: {}", e);
					break;
				}
			}
		});

		while let Some(message_value) = message_rx.recv().await {
			match serde_json::from_value::<Frame>(message_value) {
				Ok(frame) => {
					if let Err(e) = self.dispatch_internal(frame).await {
						tracing::error!("Error dispatching frame: {}", e);
					}
				}
				Err(e) => {
					tracing::error!("Failed to parse frame: {}", e);
				}
			}
		}

		tracing::debug!("Transport closed, failing pending calls");
		self.callbacks.lock().clear();
		self.exports.clear();

		let _ = reader_handle.await;
		writer_handle.abort();
		Ok(())
	}

	/// Dispatch an incoming frame (test-only public version)
	#[cfg(test)]
	pub async fn dispatch(self: &Arc<Self>, frame: Frame) -> Result<()> {
		self.dispatch_internal(frame).await
	}

	async fn dispatch_internal(self: &Arc<Self>, frame: Frame) -> Result<()> {
		match frame {
			Frame::Return {
				id,
				result,
				caps,
				error,
			} => {
				tracing::debug!(id, "Processing return");
				// Imported before the lookup so an orphaned return still releases its caps.
				let caps = self.resolve(caps)?;
				let callback = self.callbacks.lock().remove(&id).ok_or_else(|| {
					Error::ProtocolError(format!("Cannot find call to complete: id={}", id))
				})?;

				let result = match error {
					Some(error) => Err(parse_protocol_error(error)),
					None => Ok(Payload::with_caps(result.unwrap_or(Value::Null), caps)),
				};

				let _ = callback.send(result);
				Ok(())
			}
			Frame::Call {
				id,
				target,
				method,
				params,
				caps,
			} => {
				tracing::debug!(id, target, method = %method, "Serving call");
				let outcome = match self.resolve(caps) {
					Ok(caps) => match self.exports.get(target) {
						Ok(export) => export.call_raw(&method, Payload::with_caps(params, caps)).await,
						Err(e) => Err(e),
					},
					Err(e) => Err(e),
				};
				let mut held = Vec::new();
				let frame = match outcome {
					Ok(Payload { content, caps }) => {
						let descriptors = caps.iter().map(|cap| self.describe(cap)).collect();
						held = caps;
						Frame::Return {
							id,
							result: Some(content),
							caps: descriptors,
							error: None,
						}
					}
					Err(e) => {
						tracing::debug!(id, target, method = %method, error = %e, "Call failed");
						Frame::Return {
							id,
							result: None,
							caps: Vec::new(),
							error: Some(ErrorPayload {
								name: Some("Failed".to_string()),
								message: e.to_string(),
							}),
						}
					}
				};
				let queued = self.queue(&frame);
				drop(held);
				queued
			}
			Frame::Release { target, count } => {
				self.exports.release(target, count);
				Ok(())
			}
		}
	}
}

/// Converts [`ErrorPayload`] from the peer into [`Error::Remote`].
fn parse_protocol_error(error: ErrorPayload) -> Error {
	Error::Remote {
		name: error.name.unwrap_or_else(|| "Failed".to_string()),
		message: error.message,
	}
}
