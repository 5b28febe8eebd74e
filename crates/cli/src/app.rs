//! Wiring of a terminal session: connect, run the dispatch loop, report.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempest::api::ExternalApi;
use tempest::{Message, Model, ModelSummary, PackageFile, Program, Shutdown, commands};
use tempest_runtime::{Connection, WebSocketTransport};

use crate::cli::Cli;
use crate::console::ConsoleView;
use crate::endpoint::rpc_endpoint;
use crate::error::{CliError, Result};
use crate::host::TerminalHost;

/// Opens the package at `path` for streaming upload.
pub async fn open_package(path: &Path) -> Result<PackageFile> {
	let open_error = |source| CliError::OpenPackage {
		path: path.to_path_buf(),
		source,
	};
	let file = tokio::fs::File::open(path).await.map_err(open_error)?;
	let size = file.metadata().await.map_err(open_error)?.len();
	let name = path
		.file_name()
		.map(|name| name.to_string_lossy().into_owned())
		.unwrap_or_else(|| path.display().to_string());
	Ok(PackageFile::new(name, size, file))
}

/// Messages standing in for what a user would type into the login form.
pub fn login_input(cli: &Cli) -> Vec<Message> {
	let mut messages = Vec::new();
	if let Some(address) = &cli.login_email {
		messages.push(Message::EditEmailLogin(address.clone()));
		messages.push(Message::SubmitEmailLogin);
	}
	if let Some(token) = &cli.login_token {
		messages.push(Message::EditEmailToken(token.clone()));
		messages.push(Message::SubmitEmailToken);
	}
	messages
}

/// Runs a session against the server named by `cli.url` until Ctrl-C, the
/// `--run-for` deadline, or the connection closing. Returns the final state.
pub async fn run(cli: &Cli) -> Result<ModelSummary> {
	let package = match &cli.install {
		Some(path) => Some(open_package(path).await?),
		None => None,
	};

	let endpoint = rpc_endpoint(&cli.url)?;
	tracing::info!(%endpoint, "connecting");
	let (transport, message_rx) = WebSocketTransport::connect(endpoint.as_str()).await?;
	let connection = Connection::new(transport.into_transport_parts(message_rx));

	let shutdown = Shutdown::new();
	{
		let connection = Arc::clone(&connection);
		let shutdown = shutdown.clone();
		tokio::spawn(async move {
			if let Err(error) = connection.run().await {
				tracing::error!(%error, "connection failed");
			}
			if shutdown.trigger() {
				tracing::info!("connection closed");
			}
		});
	}

	let api = ExternalApi::new(connection.bootstrap());
	let host = Arc::new(TerminalHost::new(cli.url.clone()));
	let mut program = Program::new(Model::new(api.add_ref()), ConsoleView::new(), host, shutdown.clone());
	let sender = program.sender();
	if let Some(package) = package {
		program.view_mut().install_after_login(sender.clone(), package);
	}

	program.spawn(commands::fetch_sessions(api));
	for msg in login_input(cli) {
		sender.send(msg);
	}

	{
		let shutdown = shutdown.clone();
		let run_for = cli.run_for.map(Duration::from_secs);
		tokio::spawn(async move {
			let deadline = async {
				match run_for {
					Some(duration) => tokio::time::sleep(duration).await,
					None => std::future::pending().await,
				}
			};
			tokio::select! {
				_ = tokio::signal::ctrl_c() => tracing::info!("interrupted"),
				_ = deadline => tracing::debug!("run time elapsed"),
				_ = shutdown.wait() => {}
			}
			shutdown.trigger();
		});
	}

	let model = program.run().await;
	Ok(model.summary())
}
