//! Asynchronous work scheduled by the dispatch loop.

use std::future::Future;
use std::sync::Arc;

use tempest_runtime::BoxFuture;
use tokio::sync::mpsc;

use crate::error::Error;
use crate::message::Message;

/// Services of the environment hosting the client.
pub trait Host: Send + Sync {
	/// Navigates the host to `href` (a path on the server, e.g. `/login/email/<token>`).
	fn redirect(&self, href: &str);
}

/// Sending half of the dispatch loop's message queue.
#[derive(Debug, Clone)]
pub struct MessageSender {
	tx: mpsc::UnboundedSender<Message>,
}

impl MessageSender {
	pub fn new(tx: mpsc::UnboundedSender<Message>) -> Self {
		Self { tx }
	}

	/// Queues `msg`. Messages sent after the loop stopped are dropped.
	pub fn send(&self, msg: Message) {
		if let Err(mpsc::error::SendError(msg)) = self.tx.send(msg) {
			tracing::debug!(message = msg.name(), "dispatch loop gone, dropping message");
		}
	}
}

/// What a running [`Command`] may touch: the message queue and the host.
#[derive(Clone)]
pub struct CommandContext {
	sender: MessageSender,
	host: Arc<dyn Host>,
}

impl CommandContext {
	pub fn new(sender: MessageSender, host: Arc<dyn Host>) -> Self {
		Self { sender, host }
	}

	pub fn send(&self, msg: Message) {
		self.sender.send(msg);
	}

	pub fn sender(&self) -> &MessageSender {
		&self.sender
	}

	pub fn host(&self) -> &dyn Host {
		self.host.as_ref()
	}
}

type CommandFn = Box<dyn FnOnce(CommandContext) -> BoxFuture<'static, ()> + Send>;

/// A unit of asynchronous work returned by [`update`](crate::update).
///
/// Commands own everything they use (capabilities are `add_ref`'d when the
/// command is built) and talk back to the Model only through messages.
pub struct Command {
	name: &'static str,
	run: CommandFn,
}

impl Command {
	pub fn new<F, Fut>(name: &'static str, f: F) -> Self
	where
		F: FnOnce(CommandContext) -> Fut + Send + 'static,
		Fut: Future<Output = ()> + Send + 'static,
	{
		Self {
			name,
			run: Box::new(move |ctx: CommandContext| -> BoxFuture<'static, ()> {
				Box::pin(f(ctx))
			}),
		}
	}

	/// A command whose failure is reported as exactly one [`Message::NewError`].
	pub fn fallible<F, Fut>(name: &'static str, f: F) -> Self
	where
		F: FnOnce(CommandContext) -> Fut + Send + 'static,
		Fut: Future<Output = Result<(), Error>> + Send + 'static,
	{
		Self::new(name, move |ctx: CommandContext| async move {
			if let Err(error) = f(ctx.clone()).await {
				tracing::debug!(command = name, %error, "command failed");
				ctx.send(Message::NewError(error));
			}
		})
	}

	/// A command that only reports `error`.
	pub fn fail(error: Error) -> Self {
		Self::new("fail", move |ctx: CommandContext| async move {
			ctx.send(Message::NewError(error));
		})
	}

	pub fn name(&self) -> &'static str {
		self.name
	}

	pub async fn run(self, ctx: CommandContext) {
		(self.run)(ctx).await
	}
}

impl std::fmt::Debug for Command {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Command").field("name", &self.name).finish()
	}
}
