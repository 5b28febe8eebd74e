//! Error types for the client engine.

use tempest_protocol::{GrainId, PackageId};
use thiserror::Error;

/// Everything that can end up in the Model's error log.
#[derive(Debug, Error)]
pub enum Error {
	/// The remote call, its transport or its result decoding failed.
	#[error(transparent)]
	Rpc(#[from] tempest_runtime::Error),

	#[error("not logged in yet; cannot install an app")]
	NoLoginSession,

	#[error("login failed: {0}")]
	LoginFailed(String),

	#[error("unknown package: {0}")]
	UnknownPackage(PackageId),

	#[error("unknown grain: {0}")]
	UnknownGrain(GrainId),

	#[error("malformed package manifest: {0}")]
	Manifest(#[from] ManifestError),

	/// Reading the local package file failed mid-upload.
	#[error("reading package file: {0}")]
	Upload(#[source] std::io::Error),
}

/// Reasons a package manifest cannot describe a launch action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManifestError {
	#[error("package has no manifest")]
	Missing,

	#[error("manifest has no app title")]
	MissingAppTitle,

	#[error("action index {index} out of range ({count} actions)")]
	ActionOutOfRange { index: usize, count: usize },

	#[error("action {0} has no noun phrase")]
	MissingNounPhrase(usize),
}

pub type Result<T> = std::result::Result<T, Error>;
