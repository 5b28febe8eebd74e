//! Terminal rendering of the model.

use tempest::{Message, MessageSender, Model, ModelSummary, PackageFile, View};

/// Logs what changed after each transition and plays the part of the user
/// for input queued on the command line.
#[derive(Default)]
pub struct ConsoleView {
	pending_install: Option<(MessageSender, PackageFile)>,
	last: ModelSummary,
}

impl ConsoleView {
	pub fn new() -> Self {
		Self::default()
	}

	/// Queues `file` for upload through `sender` once the login attempt has
	/// resolved.
	pub fn install_after_login(&mut self, sender: MessageSender, file: PackageFile) {
		self.pending_install = Some((sender, file));
	}

	fn report_changes(&self, summary: &ModelSummary) {
		for error in summary.errors.iter().skip(self.last.errors.len()) {
			tracing::error!("{error}");
		}
		if summary.logged_in != self.last.logged_in {
			tracing::info!(logged_in = ?summary.logged_in, "login resolved");
		}
		for (id, title) in &summary.grains {
			match self.last.grains.get(id) {
				None => tracing::info!(grain = %id, %title, "grain added"),
				Some(old) if old != title => tracing::info!(grain = %id, %title, "grain renamed"),
				Some(_) => {}
			}
		}
		for id in self.last.grains.keys().filter(|id| !summary.grains.contains_key(*id)) {
			tracing::info!(grain = %id, "grain removed");
		}
		for id in summary.packages.difference(&self.last.packages) {
			tracing::info!(package = %id, "package available");
		}
		if summary.focus != self.last.focus {
			tracing::info!(focus = ?summary.focus, "focus changed");
		}
	}
}

impl View for ConsoleView {
	fn render(&mut self, model: &Model) {
		let summary = model.summary();
		if summary == self.last {
			return;
		}
		self.report_changes(&summary);
		if summary.logged_in.is_some() {
			if let Some((sender, file)) = self.pending_install.take() {
				tracing::info!(name = %file.name, size = file.size, "installing package");
				sender.send(Message::NewAppPkgFile(file));
			}
		}
		self.last = summary;
	}
}
