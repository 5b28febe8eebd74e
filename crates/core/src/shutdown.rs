//! Process-wide cancellation signal.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// One-shot, idempotent shutdown signal. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
	state: Arc<ShutdownState>,
}

#[derive(Debug, Default)]
struct ShutdownState {
	is_shutting_down: AtomicBool,
	notify: Notify,
}

impl Shutdown {
	pub fn new() -> Self {
		Self::default()
	}

	/// Fires the signal. Returns `false` if it had already fired.
	pub fn trigger(&self) -> bool {
		if self
			.state
			.is_shutting_down
			.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
			.is_ok()
		{
			tracing::debug!("shutdown requested");
			self.state.notify.notify_waiters();
			true
		} else {
			false
		}
	}

	pub fn is_triggered(&self) -> bool {
		self.state.is_shutting_down.load(Ordering::SeqCst)
	}

	/// Resolves once the signal has fired.
	pub async fn wait(&self) {
		let notified = self.state.notify.notified();
		tokio::pin!(notified);
		// Register before checking the flag so a concurrent trigger is not missed.
		notified.as_mut().enable();
		if self.is_triggered() {
			return;
		}
		notified.await;
	}
}
