//! The dispatch loop.
//!
//! [`Program`] owns the [`Model`] and applies queued messages one at a time.
//! After each transition the model is handed to the [`View`], and the
//! resulting [`Command`], if any, is spawned as its own task. Commands reach
//! the model only by queueing further messages.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::command::{Command, CommandContext, Host, MessageSender};
use crate::message::Message;
use crate::model::Model;
use crate::shutdown::Shutdown;
use crate::update::update;

/// Rendering seam, called with the model after every transition.
pub trait View: Send {
	fn render(&mut self, model: &Model);
}

/// View that logs a one-line summary of each rendered model.
#[derive(Debug, Default)]
pub struct TracingView;

impl View for TracingView {
	fn render(&mut self, model: &Model) {
		tracing::debug!(
			grains = model.grains.len(),
			packages = model.packages.len(),
			open = model.open_grains.len(),
			focus = ?model.focus,
			errors = model.errors.len(),
			"render"
		);
	}
}

pub struct Program<V> {
	model: Model,
	tx: mpsc::UnboundedSender<Message>,
	rx: mpsc::UnboundedReceiver<Message>,
	view: V,
	host: Arc<dyn Host>,
	shutdown: Shutdown,
}

impl<V: View> Program<V> {
	pub fn new(model: Model, view: V, host: Arc<dyn Host>, shutdown: Shutdown) -> Self {
		let (tx, rx) = mpsc::unbounded_channel();
		Self {
			model,
			tx,
			rx,
			view,
			host,
			shutdown,
		}
	}

	/// Handle for queueing messages from outside (host events, startup input).
	pub fn sender(&self) -> MessageSender {
		MessageSender::new(self.tx.clone())
	}

	pub fn model(&self) -> &Model {
		&self.model
	}

	pub fn view_mut(&mut self) -> &mut V {
		&mut self.view
	}

	/// Runs `command` as its own task, cancelled when shutdown fires.
	pub fn spawn(&self, command: Command) {
		let ctx = CommandContext::new(self.sender(), Arc::clone(&self.host));
		let shutdown = self.shutdown.clone();
		let name = command.name();
		tracing::debug!(command = name, "spawning command");
		tokio::spawn(async move {
			tokio::select! {
				_ = shutdown.wait() => tracing::debug!(command = name, "command cancelled"),
				_ = command.run(ctx) => tracing::trace!(command = name, "command finished"),
			}
		});
	}

	/// Applies messages until shutdown fires, then returns the final model.
	pub async fn run(mut self) -> Model {
		self.view.render(&self.model);
		loop {
			let msg = tokio::select! {
				biased;
				_ = self.shutdown.wait() => break,
				msg = self.rx.recv() => match msg {
					Some(msg) => msg,
					None => break,
				},
			};
			self.step(msg);
		}
		tracing::debug!("dispatch loop stopped");
		self.model
	}

	fn step(&mut self, msg: Message) {
		tracing::trace!(message = msg.name(), "applying message");
		let command = update(&mut self.model, msg);
		self.view.render(&self.model);
		if let Some(command) = command {
			self.spawn(command);
		}
	}
}
