//! The Command library.
//!
//! Every constructor takes owned capability handles, so the caller
//! `add_ref`s whatever it reads out of the Model and the command releases it
//! when its future completes or is dropped.

use tempest_protocol::MakeSharingTokenParams;
use tokio::io::AsyncReadExt;

use crate::api::{ExternalApi, PackageController, UiViewController, UserSession};
use crate::command::Command;
use crate::error::Error;
use crate::message::{Message, PackageFile};
use crate::pusher::{GrainPusher, PackagePusher, Pusher};

/// Bytes per `ByteStream.write` call during package upload.
pub const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Fetches the session roots, subscribes to the visitor's grains and reports
/// the outcome as [`Message::LoginSessionResult`].
pub fn fetch_sessions(api: ExternalApi) -> Command {
	Command::new("fetch_sessions", move |ctx| async move {
		let result = match api.get_sessions().await {
			Ok(sessions) => {
				let pusher = Pusher::new(ctx.sender().clone(), GrainPusher).into_capability();
				if let Err(e) = sessions.visitor.list_views(pusher).await {
					tracing::warn!(error = %e, "listViews failed");
					ctx.send(Message::NewError(e.into()));
				}
				Ok(sessions)
			}
			Err(e) => {
				tracing::warn!(error = %e, "getSessions failed");
				Err(Error::from(e))
			}
		};
		ctx.send(Message::LoginSessionResult(result));
	})
}

/// Subscribes to the user's installed packages.
pub fn list_packages(user: UserSession) -> Command {
	Command::fallible("list_packages", move |ctx| async move {
		let pusher = Pusher::new(ctx.sender().clone(), PackagePusher).into_capability();
		user.list_packages(pusher).await?;
		Ok(())
	})
}

/// Creates a grain titled `title` and brings it to front.
pub fn spawn_grain(controller: PackageController, title: String, action_index: u32) -> Command {
	Command::fallible("spawn_grain", move |ctx| async move {
		let (id, grain) = controller.create(&title, action_index).await?;
		tracing::info!(grain = %id, title = %grain.title, "grain created");
		ctx.send(Message::UpsertGrain {
			id: id.clone(),
			grain,
		});
		ctx.send(Message::FocusGrain { id });
		Ok(())
	})
}

/// Asks the server to mail a login token to `address`.
pub fn send_email_login(api: ExternalApi, address: String) -> Command {
	Command::fallible("send_email_login", move |_ctx| async move {
		let authenticator = api.authenticator().await?;
		authenticator.send_email_auth_token(&address).await?;
		tracing::debug!(%address, "login token sent");
		Ok(())
	})
}

/// Sends the host to the token login page.
pub fn redirect_to_email_login(token: String) -> Command {
	Command::new("redirect_to_email_login", move |ctx| async move {
		ctx.host().redirect(&format!("/login/email/{token}"));
	})
}

/// Streams `file` into a package install and upserts the resulting package.
pub fn upload_package(user: UserSession, file: PackageFile) -> Command {
	Command::fallible("upload_package", move |ctx| async move {
		let PackageFile {
			name,
			size,
			mut reader,
		} = file;
		tracing::info!(%name, size, "installing package");

		let stream = user.install_package().await?;
		let mut chunk = vec![0u8; UPLOAD_CHUNK_SIZE];
		let mut sent = 0u64;
		loop {
			let n = reader.read(&mut chunk).await.map_err(Error::Upload)?;
			if n == 0 {
				break;
			}
			stream.write(&chunk[..n]).await?;
			sent += n as u64;
		}
		stream.done().await?;
		tracing::debug!(%name, sent, "package bytes sent");

		let (id, package) = stream.get_package().await?;
		tracing::info!(package = %id, "package installed");
		ctx.send(Message::UpsertPackage { id, package });
		Ok(())
	})
}

/// Requests a sharing token for a grain. The token is only logged.
pub fn share_grain(controller: UiViewController) -> Command {
	Command::fallible("share_grain", move |_ctx| async move {
		let token = controller
			.make_sharing_token(MakeSharingTokenParams::default())
			.await?;
		tracing::info!(%token, "sharing token");
		Ok(())
	})
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;
	use std::sync::atomic::{AtomicUsize, Ordering};

	use serde_json::json;
	use tempest_protocol::methods::{byte_stream, external_api, ui_view_controller, user_session, visitor_session};
	use tempest_runtime::Payload;

	use super::*;
	use crate::testing::{MockObject, RecordingHost, collect, remote_error};

	fn install_stream(fail_after_writes: Option<usize>) -> MockObject {
		let stream = MockObject::new();
		let writes = Arc::new(AtomicUsize::new(0));
		stream.on(byte_stream::WRITE, move |_| {
			let n = writes.fetch_add(1, Ordering::SeqCst);
			match fail_after_writes {
				Some(limit) if n >= limit => Err(remote_error("disk full")),
				_ => Ok(Payload::empty()),
			}
		});
		stream.on(byte_stream::DONE, |_| Ok(Payload::empty()));
		let controller = MockObject::new();
		stream.on(byte_stream::GET_PACKAGE, move |_| {
			Ok(Payload::with_caps(
				json!({"id": "pkg1", "package": {"controller": {"$cap": 0}}}),
				vec![controller.capability()],
			))
		});
		stream
	}

	fn user_with_stream(stream: &MockObject) -> MockObject {
		let user = MockObject::new();
		let stream = stream.clone();
		user.on(user_session::INSTALL_PACKAGE, move |_| {
			Ok(Payload::with_caps(
				json!({"stream": {"$cap": 0}}),
				vec![stream.capability()],
			))
		});
		user
	}

	#[tokio::test]
	async fn upload_streams_chunks_then_upserts() {
		let stream = install_stream(None);
		let user = user_with_stream(&stream);
		let bytes = vec![7u8; UPLOAD_CHUNK_SIZE + 10];
		let file = PackageFile::new("app.spk", bytes.len() as u64, std::io::Cursor::new(bytes));

		let messages = collect(upload_package(UserSession::new(user.capability()), file)).await;

		assert_eq!(messages.len(), 1);
		assert!(matches!(&messages[0], Message::UpsertPackage { id, .. } if id.as_str() == "pkg1"));
		assert_eq!(
			stream.calls(),
			vec![byte_stream::WRITE, byte_stream::WRITE, byte_stream::DONE, byte_stream::GET_PACKAGE]
		);
		let written: usize = stream
			.params(byte_stream::WRITE)
			.iter()
			.map(|p| p["data"].as_str().unwrap().len())
			.sum();
		assert!(written > 0);
	}

	#[tokio::test]
	async fn upload_write_error_reports_once() {
		let stream = install_stream(Some(1));
		let user = user_with_stream(&stream);
		let bytes = vec![1u8; UPLOAD_CHUNK_SIZE * 3];
		let file = PackageFile::new("app.spk", bytes.len() as u64, std::io::Cursor::new(bytes));

		let messages = collect(upload_package(UserSession::new(user.capability()), file)).await;

		assert_eq!(messages.len(), 1);
		assert!(matches!(messages[0], Message::NewError(Error::Rpc(_))));
		assert!(!stream.calls().contains(&byte_stream::GET_PACKAGE.to_string()));
		// The command's handles are all given back.
		assert_eq!(stream.releases(), 1);
		assert_eq!(user.releases(), 1);
	}

	/// Yields `limit` bytes, then fails every read.
	struct FailingReader {
		remaining: usize,
	}

	impl tokio::io::AsyncRead for FailingReader {
		fn poll_read(
			mut self: std::pin::Pin<&mut Self>,
			_cx: &mut std::task::Context<'_>,
			buf: &mut tokio::io::ReadBuf<'_>,
		) -> std::task::Poll<std::io::Result<()>> {
			if self.remaining == 0 {
				return std::task::Poll::Ready(Err(std::io::Error::other("device unplugged")));
			}
			let n = self.remaining.min(buf.remaining());
			buf.put_slice(&vec![3u8; n]);
			self.remaining -= n;
			std::task::Poll::Ready(Ok(()))
		}
	}

	#[tokio::test]
	async fn upload_read_error_reports_once() {
		let stream = install_stream(None);
		let user = user_with_stream(&stream);
		let file = PackageFile::new(
			"app.spk",
			(UPLOAD_CHUNK_SIZE * 4) as u64,
			FailingReader {
				remaining: UPLOAD_CHUNK_SIZE + 100,
			},
		);

		let messages = collect(upload_package(UserSession::new(user.capability()), file)).await;

		assert_eq!(messages.len(), 1);
		assert!(matches!(&messages[0], Message::NewError(Error::Upload(e)) if e.to_string() == "device unplugged"));
		let calls = stream.calls();
		assert!(calls.iter().all(|c| c == byte_stream::WRITE));
		assert!(!calls.is_empty());
		assert_eq!(stream.releases(), 1);
	}

	#[tokio::test]
	async fn fetch_sessions_reports_result_after_subscribing() {
		let visitor = MockObject::new();
		visitor.on(visitor_session::LIST_VIEWS, |_| Ok(Payload::empty()));
		let user = MockObject::new();
		let api = MockObject::new();
		{
			let visitor = visitor.clone();
			api.on(external_api::GET_SESSIONS, move |_| {
				Ok(Payload::with_caps(
					json!({"visitor": {"$cap": 0}, "user": {"$cap": 1}}),
					vec![visitor.capability(), user.capability()],
				))
			});
		}

		let messages = collect(fetch_sessions(ExternalApi::new(api.capability()))).await;
		assert_eq!(visitor.calls(), vec![visitor_session::LIST_VIEWS]);
		assert_eq!(messages.len(), 1);
		assert!(matches!(messages[0], Message::LoginSessionResult(Ok(_))));
	}

	#[tokio::test]
	async fn fetch_sessions_failure_is_login_result() {
		let api = MockObject::new();
		api.on(external_api::GET_SESSIONS, |_| Err(remote_error("offline")));

		let messages = collect(fetch_sessions(ExternalApi::new(api.capability()))).await;
		assert_eq!(messages.len(), 1);
		assert!(matches!(messages[0], Message::LoginSessionResult(Err(_))));
	}

	#[tokio::test]
	async fn redirect_uses_host() {
		let host = Arc::new(RecordingHost::default());
		crate::testing::run_with_host(redirect_to_email_login("abc".into()), host.clone()).await;
		assert_eq!(host.redirects(), vec!["/login/email/abc"]);
	}

	#[tokio::test]
	async fn share_grain_only_logs_token() {
		let controller = MockObject::new();
		controller.on(ui_view_controller::MAKE_SHARING_TOKEN, |_| Ok(Payload::new(json!({"token": "t0k"}))));

		let messages = collect(share_grain(UiViewController::new(controller.capability()))).await;
		assert!(messages.is_empty());
		assert_eq!(controller.calls(), vec![ui_view_controller::MAKE_SHARING_TOKEN]);
		assert_eq!(controller.releases(), 1);
	}

	#[tokio::test]
	async fn share_grain_failure_reports_once() {
		let controller = MockObject::new();
		controller.on(ui_view_controller::MAKE_SHARING_TOKEN, |_| Err(remote_error("denied")));

		let messages = collect(share_grain(UiViewController::new(controller.capability()))).await;
		assert_eq!(messages.len(), 1);
		assert!(matches!(messages[0], Message::NewError(Error::Rpc(_))));
	}
}
