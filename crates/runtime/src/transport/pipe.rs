use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use super::{MAX_MESSAGE_SIZE, Transport, TransportParts, TransportReceiver};
use crate::capability::BoxFuture;
use crate::error::{Error, Result};

/// Length-prefixed JSON transport over an async byte stream.
pub struct PipeTransport<W, R> {
	writer: W,
	reader: R,
	message_tx: mpsc::UnboundedSender<Value>,
}

impl<W, R> PipeTransport<W, R>
where
	W: AsyncWrite + Unpin + Send + 'static,
	R: AsyncRead + Unpin + Send + 'static,
{
	/// Creates a transport and the queue incoming messages are delivered to.
	pub fn new(writer: W, reader: R) -> (Self, mpsc::UnboundedReceiver<Value>) {
		let (message_tx, message_rx) = mpsc::unbounded_channel();
		(
			Self {
				writer,
				reader,
				message_tx,
			},
			message_rx,
		)
	}

	/// Reads messages until EOF, a framing error, or the queue is dropped.
	pub async fn run(&mut self) -> Result<()> {
		read_loop(&mut self.reader, &self.message_tx).await
	}

	/// Splits into sending and reading halves.
	pub fn into_parts(self) -> (PipeTransportSender<W>, PipeTransportReceiver<R>) {
		(
			PipeTransportSender {
				writer: self.writer,
			},
			PipeTransportReceiver {
				reader: self.reader,
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

/// Sending half of a [`PipeTransport`].
pub struct PipeTransportSender<W> {
	writer: W,
}

impl<W: AsyncWrite + Unpin + Send + 'static> Transport for PipeTransportSender<W> {
	fn send(&mut self, message: Value) -> BoxFuture<'_, Result<()>> {
		Box::pin(async move {
			let bytes = serde_json::to_vec(&message)?;
			let length = u32::try_from(bytes.len())
				.map_err(|_| Error::TransportError(format!("Message too large: {} bytes", bytes.len())))?;

			self.writer.write_all(&length.to_le_bytes()).await?;
			self.writer.write_all(&bytes).await?;
			self.writer.flush().await?;
			Ok(())
		})
	}
}

/// Reading half of a [`PipeTransport`].
pub struct PipeTransportReceiver<R> {
	reader: R,
	message_tx: mpsc::UnboundedSender<Value>,
}

impl<R: AsyncRead + Unpin + Send + 'static> TransportReceiver for PipeTransportReceiver<R> {
	fn run(self: Box<Self>) -> BoxFuture<'static, Result<()>> {
		Box::pin(async move {
			let mut this = *self;
			read_loop(&mut this.reader, &this.message_tx).await
		})
	}
}

async fn read_loop<R: AsyncRead + Unpin>(
	reader: &mut R,
	message_tx: &mpsc::UnboundedSender<Value>,
) -> Result<()> {
	loop {
		let mut len_buf = [0u8; 4];
		let mut filled = 0;
		while filled < len_buf.len() {
			let n = reader
				.read(&mut len_buf[filled..])
				.await
				.map_err(|e| Error::TransportError(format!("Failed to read length prefix: {e}")))?;
			if n == 0 {
				if filled == 0 {
					tracing::debug!("Pipe closed by peer");
					return Ok(());
				}
				return Err(Error::TransportError(format!(
					"Failed to read length prefix: stream ended after {filled} bytes"
				)));
			}
			filled += n;
		}

		let length = u32::from_le_bytes(len_buf) as usize;
		if length > MAX_MESSAGE_SIZE {
			return Err(Error::TransportError(format!(
				"Message length {length} exceeds limit of {MAX_MESSAGE_SIZE} bytes"
			)));
		}

		let mut body = vec![0u8; length];
		reader
			.read_exact(&mut body)
			.await
			.map_err(|e| Error::TransportError(format!("Failed to read message body: {e}")))?;

		let message: Value = match serde_json::from_slice(&body) {
			Ok(message) => message,
			Err(e) => {
				tracing::warn!(length, error = %e, "Skipping frame that is not JSON");
				continue;
			}
		};
		if message_tx.send(message).is_err() {
			tracing::debug!("Message queue closed, stopping pipe reader");
			return Ok(());
		}
	}
}
