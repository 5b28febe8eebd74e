use std::path::PathBuf;

use thiserror::Error;
use url::Url;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
	#[error("server URL has no host: {0}")]
	MissingHost(Url),

	#[error("invalid RPC endpoint: {0}")]
	Endpoint(#[from] url::ParseError),

	#[error("cannot open package {path}")]
	OpenPackage {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("connection failed: {0}")]
	Connect(#[from] tempest_runtime::Error),
}
