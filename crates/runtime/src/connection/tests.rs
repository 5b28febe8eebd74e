use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::json;
use tempest_protocol::GetSessionsResults;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, duplex};

use super::*;
use crate::transport::PipeTransport;

/// The server end of a duplex pipe, speaking raw frames.
struct Peer {
	read: DuplexStream,
	write: DuplexStream,
}

impl Peer {
	async fn recv(&mut self) -> Frame {
		let mut len_buf = [0u8; 4];
		self.read.read_exact(&mut len_buf).await.unwrap();
		let mut body = vec![0u8; u32::from_le_bytes(len_buf) as usize];
		self.read.read_exact(&mut body).await.unwrap();
		serde_json::from_slice(&body).unwrap()
	}

	async fn send(&mut self, frame: &Frame) {
		let bytes = serde_json::to_vec(frame).unwrap();
		self.write.write_all(&(bytes.len() as u32).to_le_bytes()).await.unwrap();
		self.write.write_all(&bytes).await.unwrap();
		self.write.flush().await.unwrap();
	}
}

fn create_test_connection() -> (Arc<Connection>, Peer) {
	let (peer_read, client_write) = duplex(64 * 1024);
	let (client_read, peer_write) = duplex(64 * 1024);

	let (transport, message_rx) = PipeTransport::new(client_write, client_read);
	let connection = Connection::new(transport.into_transport_parts(message_rx));

	(
		connection,
		Peer {
			read: peer_read,
			write: peer_write,
		},
	)
}

fn spawn_run(connection: &Arc<Connection>) {
	let runner = Arc::clone(connection);
	tokio::spawn(async move { runner.run().await });
}

struct RecordingHook {
	seen: Arc<Mutex<Vec<String>>>,
}

impl ClientHook for RecordingHook {
	fn call(&self, method: &str, _params: Payload) -> BoxFuture<'static, Result<Payload>> {
		self.seen.lock().push(method.to_string());
		Box::pin(async { Ok(Payload::empty()) })
	}
}

#[test]
fn test_request_id_increments() {
	let (connection, _peer) = create_test_connection();

	let id1 = connection.last_id.fetch_add(1, Ordering::SeqCst);
	let id2 = connection.last_id.fetch_add(1, Ordering::SeqCst);

	assert_eq!(id1, 0);
	assert_eq!(id2, 1);
}

#[tokio::test]
async fn test_bootstrap_call_imports_and_releases_caps() {
	let (connection, mut peer) = create_test_connection();
	spawn_run(&connection);

	let api = connection.bootstrap();
	let pending = tokio::spawn(api.call_raw("getSessions", Payload::empty()));

	let id = match peer.recv().await {
		Frame::Call {
			id, target, method, ..
		} => {
			assert_eq!(target, BOOTSTRAP_TARGET);
			assert_eq!(method, "getSessions");
			id
		}
		other => panic!("Expected Call, got {other:?}"),
	};
	peer.send(&Frame::Return {
		id,
		result: Some(json!({"visitor": {"$cap": 0}, "user": {"$cap": 1}})),
		caps: vec![CapDescriptor::SenderHosted(5), CapDescriptor::SenderHosted(6)],
		error: None,
	})
	.await;

	let payload = pending.await.unwrap().unwrap();
	let results: GetSessionsResults = payload.decode().unwrap();
	let visitor = payload.cap(results.visitor).unwrap();

	drop(payload);
	assert_eq!(peer.recv().await, Frame::Release { target: 6, count: 1 });

	visitor.release();
	assert_eq!(peer.recv().await, Frame::Release { target: 5, count: 1 });
}

#[tokio::test]
async fn test_remote_error() {
	let (connection, mut peer) = create_test_connection();
	spawn_run(&connection);

	let api = connection.bootstrap();
	let pending = tokio::spawn(api.call_raw("authenticator", Payload::empty()));

	let Frame::Call { id, .. } = peer.recv().await else {
		panic!("Expected Call");
	};
	peer.send(&Frame::Return {
		id,
		result: None,
		caps: vec![],
		error: Some(ErrorPayload {
			name: Some("Disconnected".to_string()),
			message: "server restarting".to_string(),
		}),
	})
	.await;

	let err = pending.await.unwrap().unwrap_err();
	assert_eq!(err.error_name(), Some("Disconnected"));
	assert!(err.is_disconnected());
}

#[tokio::test]
async fn test_exported_hook_served_in_arrival_order() {
	let (connection, mut peer) = create_test_connection();
	spawn_run(&connection);

	let seen = Arc::new(Mutex::new(Vec::new()));
	let pusher = Capability::new(RecordingHook {
		seen: Arc::clone(&seen),
	});

	let api = connection.bootstrap();
	let pending = tokio::spawn(api.call_raw(
		"listViews",
		Payload::with_caps(json!({"into": {"$cap": 0}}), vec![pusher.add_ref()]),
	));

	let (list_id, export_id) = match peer.recv().await {
		Frame::Call { id, caps, .. } => match caps.as_slice() {
			[CapDescriptor::SenderHosted(export)] => (id, *export),
			other => panic!("Expected one sender-hosted cap, got {other:?}"),
		},
		other => panic!("Expected Call, got {other:?}"),
	};
	assert_eq!(connection.export_count(), 1);

	for (id, method) in [(100, "upsert"), (101, "remove"), (102, "clear")] {
		peer.send(&Frame::Call {
			id,
			target: export_id,
			method: method.to_string(),
			params: json!({"key": "g1"}),
			caps: vec![],
		})
		.await;
	}
	for expected in [100, 101, 102] {
		match peer.recv().await {
			Frame::Return { id, error, .. } => {
				assert_eq!(id, expected);
				assert!(error.is_none());
			}
			other => panic!("Expected Return, got {other:?}"),
		}
	}
	assert_eq!(*seen.lock(), vec!["upsert", "remove", "clear"]);

	peer.send(&Frame::Return {
		id: list_id,
		result: None,
		caps: vec![],
		error: None,
	})
	.await;
	pending.await.unwrap().unwrap();

	peer.send(&Frame::Release {
		target: export_id,
		count: 1,
	})
	.await;
	tokio::time::timeout(Duration::from_secs(1), async {
		while connection.export_count() > 0 {
			tokio::time::sleep(Duration::from_millis(1)).await;
		}
	})
	.await
	.expect("export was not released");
	assert_eq!(pusher.ref_count(), 1);
}

#[tokio::test]
async fn test_call_on_unknown_export_fails() {
	let (connection, mut peer) = create_test_connection();
	spawn_run(&connection);

	peer.send(&Frame::Call {
		id: 7,
		target: 42,
		method: "upsert".to_string(),
		params: Value::Null,
		caps: vec![],
	})
	.await;

	match peer.recv().await {
		Frame::Return { id, error, .. } => {
			assert_eq!(id, 7);
			assert!(error.unwrap().message.contains("Unknown capability"));
		}
		other => panic!("Expected Return, got {other:?}"),
	}
}

#[tokio::test]
async fn test_own_import_sent_back_as_receiver_hosted() {
	let (connection, mut peer) = create_test_connection();
	spawn_run(&connection);

	let api = connection.bootstrap();
	let _pending = tokio::spawn(api.call_raw(
		"echo",
		Payload::with_caps(json!({"cap": {"$cap": 0}}), vec![api.add_ref()]),
	));

	match peer.recv().await {
		Frame::Call { caps, .. } => {
			assert_eq!(caps, vec![CapDescriptor::ReceiverHosted(BOOTSTRAP_TARGET)]);
		}
		other => panic!("Expected Call, got {other:?}"),
	}
	assert_eq!(connection.export_count(), 0);
}

#[tokio::test]
async fn test_dropped_call_removes_callback() {
	let (connection, _peer) = create_test_connection();

	let result = tokio::time::timeout(
		Duration::from_millis(10),
		connection.send_call(BOOTSTRAP_TARGET, "getSessions", Payload::empty()),
	)
	.await;

	assert!(result.is_err());
	assert!(connection.callbacks.lock().is_empty());
}

#[tokio::test]
async fn test_return_for_unknown_call() {
	let (connection, _peer) = create_test_connection();

	let result = connection
		.dispatch(Frame::Return {
			id: 99,
			result: None,
			caps: vec![],
			error: None,
		})
		.await;

	assert!(matches!(result, Err(Error::ProtocolError(_))));
}

#[tokio::test]
async fn test_bootstrap_export_outlives_peer_releases() {
	let (peer_read, server_write) = duplex(64 * 1024);
	let (server_read, peer_write) = duplex(64 * 1024);
	let (transport, message_rx) = PipeTransport::new(server_write, server_read);
	let seen = Arc::new(Mutex::new(Vec::new()));
	let server = Connection::with_bootstrap(
		transport.into_transport_parts(message_rx),
		Capability::new(RecordingHook {
			seen: Arc::clone(&seen),
		}),
	);
	spawn_run(&server);
	let mut peer = Peer {
		read: peer_read,
		write: peer_write,
	};

	// A peer that imported the bootstrap twice drops one of the handles.
	peer.send(&Frame::Release {
		target: BOOTSTRAP_TARGET,
		count: 1,
	})
	.await;
	peer.send(&Frame::Call {
		id: 1,
		target: BOOTSTRAP_TARGET,
		method: "getSessions".to_string(),
		params: Value::Null,
		caps: vec![],
	})
	.await;

	match peer.recv().await {
		Frame::Return { id, error, .. } => {
			assert_eq!(id, 1);
			assert!(error.is_none());
		}
		other => panic!("Expected Return, got {other:?}"),
	}
	assert_eq!(*seen.lock(), vec!["getSessions"]);
	assert_eq!(server.export_count(), 1);
}
