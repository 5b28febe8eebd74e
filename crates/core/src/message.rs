//! Intents consumed by the dispatch loop.

use std::fmt;
use std::pin::Pin;

use tempest_protocol::{GrainId, PackageId};
use tokio::io::AsyncRead;

use crate::api::Sessions;
use crate::error::Error;
use crate::model::{Focus, Grain, Package};

/// A package file picked for installation.
pub struct PackageFile {
	pub name: String,
	/// Size in bytes as reported by the source
	pub size: u64,
	pub reader: Pin<Box<dyn AsyncRead + Send>>,
}

impl PackageFile {
	pub fn new(name: impl Into<String>, size: u64, reader: impl AsyncRead + Send + 'static) -> Self {
		Self {
			name: name.into(),
			size,
			reader: Box::pin(reader),
		}
	}
}

impl fmt::Debug for PackageFile {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PackageFile")
			.field("name", &self.name)
			.field("size", &self.size)
			.finish_non_exhaustive()
	}
}

/// Every input the [`Model`](crate::Model) reacts to.
///
/// Each message is applied exactly once by [`update`](crate::update).
#[derive(Debug)]
pub enum Message {
	/// Appends to the error log.
	NewError(Error),

	UpsertGrain { id: GrainId, grain: Grain },
	RemoveGrain { id: GrainId },
	ClearGrains,

	UpsertPackage { id: PackageId, package: Package },
	RemovePackage { id: PackageId },
	ClearPackages,

	ChangeFocus(Focus),
	FocusGrain { id: GrainId },
	CloseGrain { id: GrainId },
	/// Launches a new grain from `package_id` using its `action_index`th action.
	SpawnGrain { package_id: PackageId, action_index: usize },
	ShareGrain { id: GrainId },

	EditEmailLogin(String),
	EditEmailToken(String),
	SubmitEmailLogin,
	SubmitEmailToken,
	LoginSessionResult(Result<Sessions, Error>),

	NewAppPkgFile(PackageFile),

	/// The host's location changed.
	Navigate { old_url: String, new_url: String },
}

impl Message {
	/// Variant name, for logs.
	pub fn name(&self) -> &'static str {
		match self {
			Self::NewError(_) => "NewError",
			Self::UpsertGrain { .. } => "UpsertGrain",
			Self::RemoveGrain { .. } => "RemoveGrain",
			Self::ClearGrains => "ClearGrains",
			Self::UpsertPackage { .. } => "UpsertPackage",
			Self::RemovePackage { .. } => "RemovePackage",
			Self::ClearPackages => "ClearPackages",
			Self::ChangeFocus(_) => "ChangeFocus",
			Self::FocusGrain { .. } => "FocusGrain",
			Self::CloseGrain { .. } => "CloseGrain",
			Self::SpawnGrain { .. } => "SpawnGrain",
			Self::ShareGrain { .. } => "ShareGrain",
			Self::EditEmailLogin(_) => "EditEmailLogin",
			Self::EditEmailToken(_) => "EditEmailToken",
			Self::SubmitEmailLogin => "SubmitEmailLogin",
			Self::SubmitEmailToken => "SubmitEmailToken",
			Self::LoginSessionResult(_) => "LoginSessionResult",
			Self::NewAppPkgFile(_) => "NewAppPkgFile",
			Self::Navigate { .. } => "Navigate",
		}
	}
}
