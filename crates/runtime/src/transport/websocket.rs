use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use super::{Transport, TransportParts, TransportReceiver};
use crate::capability::BoxFuture;
use crate::error::{Error, Result};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Subprotocol the server's RPC endpoint speaks.
pub const RPC_SUBPROTOCOL: &str = "capnp-rpc";

/// JSON-over-WebSocket transport, one text frame per message.
pub struct WebSocketTransport {
	stream: WsStream,
	message_tx: mpsc::UnboundedSender<Value>,
}

impl WebSocketTransport {
	/// Connects to `url` requesting the RPC subprotocol.
	pub async fn connect(url: &str) -> Result<(Self, mpsc::UnboundedReceiver<Value>)> {
		let mut request = url
			.into_client_request()
			.map_err(|e| Error::ConnectionFailed(format!("{url}: {e}")))?;
		request
			.headers_mut()
			.insert("Sec-WebSocket-Protocol", HeaderValue::from_static(RPC_SUBPROTOCOL));

		let (stream, response) = tokio_tungstenite::connect_async(request)
			.await
			.map_err(|e| Error::ConnectionFailed(format!("{url}: {e}")))?;
		tracing::debug!(url, status = %response.status(), "WebSocket connected");

		let (message_tx, message_rx) = mpsc::unbounded_channel();
		Ok((Self { stream, message_tx }, message_rx))
	}

	/// Splits into sending and reading halves.
	pub fn into_parts(self) -> (WebSocketTransportSender, WebSocketTransportReceiver) {
		let (sink, stream) = self.stream.split();
		(
			WebSocketTransportSender { sink },
			WebSocketTransportReceiver {
				stream,
				message_tx: self.message_tx,
			},
		)
	}

	/// Splits into boxed halves ready for a [`Connection`](crate::Connection).
	pub fn into_transport_parts(self, message_rx: mpsc::UnboundedReceiver<Value>) -> TransportParts {
		let (sender, receiver) = self.into_parts();
		TransportParts {
			sender: Box::new(sender),
			receiver: Box::new(receiver),
			message_rx,
		}
	}
}

/// Sending half of a [`WebSocketTransport`].
pub struct WebSocketTransportSender {
	sink: SplitSink<WsStream, WsMessage>,
}

impl Transport for WebSocketTransportSender {
	fn send(&mut self, message: Value) -> BoxFuture<'_, Result<()>> {
		Box::pin(async move {
			let text = serde_json::to_string(&message)?;
			self.sink
				.send(WsMessage::Text(text))
				.await
				.map_err(|e| Error::TransportError(e.to_string()))
		})
	}
}

/// Reading half of a [`WebSocketTransport`].
pub struct WebSocketTransportReceiver {
	stream: SplitStream<WsStream>,
	message_tx: mpsc::UnboundedSender<Value>,
}

impl TransportReceiver for WebSocketTransportReceiver {
	fn run(self: Box<Self>) -> BoxFuture<'static, Result<()>> {
		Box::pin(async move {
			let WebSocketTransportReceiver {
				mut stream,
				message_tx,
			} = *self;

			while let Some(frame) = stream.next().await {
				let frame = frame.map_err(|e| Error::TransportError(e.to_string()))?;
				let parsed = match frame {
					WsMessage::Text(text) => serde_json::from_str::<Value>(&text),
					WsMessage::Binary(bytes) => serde_json::from_slice::<Value>(&bytes),
					WsMessage::Close(reason) => {
						tracing::debug!(?reason, "WebSocket closed by peer");
						break;
					}
					_ => continue,
				};
				let message = match parsed {
					Ok(message) => message,
					Err(e) => {
						tracing::warn!(error = %e, "Skipping frame that is not JSON");
						continue;
					}
				};
				if message_tx.send(message).is_err() {
					break;
				}
			}
			Ok(())
		})
	}
}
