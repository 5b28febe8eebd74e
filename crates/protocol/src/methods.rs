//! Method names and param/result shapes of each remote interface.

use serde::{Deserialize, Serialize};

use crate::frame::CapRef;
use crate::ids::{GrainId, PackageId};
use crate::types::{PackageDescriptor, UiViewDescriptor};

/// `ExternalApi`, the bootstrap interface.
pub mod external_api {
	pub const GET_SESSIONS: &str = "getSessions";
	pub const AUTHENTICATOR: &str = "authenticator";
}

/// `VisitorSession`, available to anyone (logged in or not).
pub mod visitor_session {
	pub const LIST_VIEWS: &str = "listViews";
}

/// `UserSession`, available only to logged-in users.
pub mod user_session {
	pub const LIST_PACKAGES: &str = "listPackages";
	pub const INSTALL_PACKAGE: &str = "installPackage";
}

/// `Package.Controller`.
pub mod package_controller {
	pub const CREATE: &str = "create";
}

/// `UiView.Controller`.
pub mod ui_view_controller {
	pub const MAKE_SHARING_TOKEN: &str = "makeSharingToken";
}

/// `Authenticator`.
pub mod authenticator {
	pub const SEND_EMAIL_AUTH_TOKEN: &str = "sendEmailAuthToken";
}

/// `util.ByteStream` and the install stream built on it.
pub mod byte_stream {
	pub const WRITE: &str = "write";
	pub const DONE: &str = "done";
	pub const GET_PACKAGE: &str = "getPackage";
}

/// `collection.Pusher`, implemented by the client.
pub mod pusher {
	pub const UPSERT: &str = "upsert";
	pub const REMOVE: &str = "remove";
	pub const CLEAR: &str = "clear";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetSessionsResults {
	pub visitor: CapRef,
	pub user: CapRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatorResults {
	pub authenticator: CapRef,
}

/// Params of `listViews` / `listPackages`: the pusher to stream into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParams {
	pub into: CapRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateParams {
	pub title: String,
	pub action_index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateResults {
	pub id: GrainId,
	pub view: UiViewDescriptor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallPackageResults {
	pub stream: CapRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetPackageResults {
	pub id: PackageId,
	pub package: PackageDescriptor,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MakeSharingTokenParams {
	/// One flag per permission declared by the grain's app
	#[serde(default)]
	pub permissions: Vec<bool>,
	#[serde(default)]
	pub note: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MakeSharingTokenResults {
	pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendEmailAuthTokenParams {
	pub address: String,
}

/// Params of `ByteStream.write`; the chunk travels base64-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteParams {
	#[serde(with = "base64_bytes")]
	pub data: Vec<u8>,
}

/// Params of `Pusher.upsert`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushUpsert<K, V> {
	pub key: K,
	pub value: V,
}

/// Params of `Pusher.remove`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushRemove<K> {
	pub key: K,
}

mod base64_bytes {
	use base64::Engine;
	use base64::engine::general_purpose::STANDARD;
	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&STANDARD.encode(bytes))
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
		let encoded = String::deserialize(deserializer)?;
		STANDARD
			.decode(encoded.as_bytes())
			.map_err(serde::de::Error::custom)
	}
}
