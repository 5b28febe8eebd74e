//! Testing infrastructure for tempest.
//!
//! Provides in-process stand-ins for the server's objects and the host, so
//! the reducer, Commands and the dispatch loop can be exercised without a
//! connection:
//!
//! - [`MockObject`]: a scripted remote object that records calls and counts releases
//! - [`RecordingHost`]: a [`Host`] that records redirects
//! - [`SnapshotView`]: a [`View`] that publishes a [`ModelSummary`] per transition
//!
//! # Example
//!
//! ```ignore
//! use tempest::testing::{MockObject, collect};
//!
//! let controller = MockObject::new();
//! controller.on("makeSharingToken", |_| Ok(Payload::new(json!({"token": "t"}))));
//! let messages = collect(share_grain(UiViewController::new(controller.capability()))).await;
//! assert!(messages.is_empty());
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use serde_json::Value;
use tempest_runtime::{BoxFuture, Capability, ClientHook, Error, Payload, Result};
use tokio::sync::mpsc;

use crate::command::{Command, CommandContext, Host, MessageSender};
use crate::message::Message;
use crate::model::{Model, ModelSummary};
use crate::program::View;

type Responder = Arc<dyn Fn(Payload) -> Result<Payload> + Send + Sync>;

#[derive(Default)]
struct MockState {
	responders: Mutex<HashMap<String, Responder>>,
	calls: Mutex<Vec<(String, Value)>>,
	releases: AtomicUsize,
}

/// Scripted remote object.
///
/// Every [`capability`](Self::capability) call mints a fresh reference backed
/// by the same script; [`releases`](Self::releases) counts how many of those
/// references have been fully released. Methods without a responder fail with
/// [`Error::Unimplemented`].
#[derive(Clone, Default)]
pub struct MockObject {
	state: Arc<MockState>,
}

impl MockObject {
	pub fn new() -> Self {
		Self::default()
	}

	/// Answers calls of `method` with `responder`.
	pub fn on<F>(&self, method: &str, responder: F) -> &Self
	where
		F: Fn(Payload) -> Result<Payload> + Send + Sync + 'static,
	{
		self.state
			.responders
			.lock()
			.insert(method.to_string(), Arc::new(responder));
		self
	}

	/// A new reference to this object.
	pub fn capability(&self) -> Capability {
		Capability::new(MockHook {
			state: Arc::clone(&self.state),
		})
	}

	/// Names of the methods called so far, in call order.
	pub fn calls(&self) -> Vec<String> {
		self.state
			.calls
			.lock()
			.iter()
			.map(|(method, _)| method.clone())
			.collect()
	}

	/// Params content of every call to `method`.
	pub fn params(&self, method: &str) -> Vec<Value> {
		self.state
			.calls
			.lock()
			.iter()
			.filter(|(m, _)| m == method)
			.map(|(_, params)| params.clone())
			.collect()
	}

	pub fn releases(&self) -> usize {
		self.state.releases.load(Ordering::SeqCst)
	}
}

struct MockHook {
	state: Arc<MockState>,
}

impl ClientHook for MockHook {
	fn call(&self, method: &str, params: Payload) -> BoxFuture<'static, Result<Payload>> {
		self.state
			.calls
			.lock()
			.push((method.to_string(), params.content.clone()));
		let responder = self.state.responders.lock().get(method).cloned();
		let result = match responder {
			Some(responder) => responder(params),
			None => Err(Error::Unimplemented(method.to_string())),
		};
		Box::pin(std::future::ready(result))
	}

	fn release(&self) {
		self.state.releases.fetch_add(1, Ordering::SeqCst);
	}
}

/// Error as the connection reports a failure raised by the peer.
pub fn remote_error(message: &str) -> Error {
	Error::Remote {
		name: "Failed".to_string(),
		message: message.to_string(),
	}
}

/// Host that records redirects instead of navigating.
#[derive(Debug, Default)]
pub struct RecordingHost {
	redirects: Mutex<Vec<String>>,
}

impl RecordingHost {
	pub fn redirects(&self) -> Vec<String> {
		self.redirects.lock().clone()
	}
}

impl Host for RecordingHost {
	fn redirect(&self, href: &str) {
		self.redirects.lock().push(href.to_string());
	}
}

/// Runs `command` to completion against `host` and returns the messages it emitted.
pub async fn run_with_host(command: Command, host: Arc<dyn Host>) -> Vec<Message> {
	let (tx, mut rx) = mpsc::unbounded_channel();
	command
		.run(CommandContext::new(MessageSender::new(tx), host))
		.await;
	let mut messages = Vec::new();
	while let Ok(msg) = rx.try_recv() {
		messages.push(msg);
	}
	messages
}

/// Runs `command` to completion and returns the messages it emitted.
pub async fn collect(command: Command) -> Vec<Message> {
	run_with_host(command, Arc::new(RecordingHost::default())).await
}

/// View that publishes a summary of every rendered Model.
pub struct SnapshotView {
	tx: mpsc::UnboundedSender<ModelSummary>,
}

impl SnapshotView {
	pub fn new() -> (Self, mpsc::UnboundedReceiver<ModelSummary>) {
		let (tx, rx) = mpsc::unbounded_channel();
		(Self { tx }, rx)
	}
}

impl View for SnapshotView {
	fn render(&mut self, model: &Model) {
		let _ = self.tx.send(model.summary());
	}
}
