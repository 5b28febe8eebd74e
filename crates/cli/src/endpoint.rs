//! RPC endpoint derivation.
//!
//! The server hosts its capability API next to the web UI: a page served
//! from `https://host/...` talks to `wss://host/_capnp-api`.

use url::Url;

use crate::error::{CliError, Result};

/// Path of the WebSocket RPC endpoint on the server.
pub const RPC_PATH: &str = "/_capnp-api";

/// Derives the WebSocket RPC endpoint from the server's page URL.
pub fn rpc_endpoint(location: &Url) -> Result<Url> {
	let scheme = if location.scheme() == "https" { "wss" } else { "ws" };
	let host = location
		.host_str()
		.ok_or_else(|| CliError::MissingHost(location.clone()))?;
	let endpoint = match location.port() {
		Some(port) => format!("{scheme}://{host}:{port}{RPC_PATH}"),
		None => format!("{scheme}://{host}{RPC_PATH}"),
	};
	Ok(Url::parse(&endpoint)?)
}
