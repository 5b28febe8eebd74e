//! Descriptors of server-side objects as they appear in call results and
//! push notifications.

use serde::{Deserialize, Serialize};

use crate::frame::CapRef;

/// Text with a default rendering (localizations are not carried).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalizedText {
	pub default_text: String,
}

impl LocalizedText {
	pub fn new(text: impl Into<String>) -> Self {
		Self {
			default_text: text.into(),
		}
	}
}

/// One way of launching an application, e.g. "New Document".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
	/// Noun phrase naming what the action creates ("document", "spreadsheet")
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub noun_phrase: Option<LocalizedText>,
}

/// Package manifest: application title and its launch actions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub app_title: Option<LocalizedText>,
	#[serde(default)]
	pub actions: Vec<Action>,
}

/// An installed package as pushed by `UserSession.listPackages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageDescriptor {
	/// `Package.Controller` capability
	pub controller: CapRef,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub manifest: Option<Manifest>,
}

/// A grain's view as seen by a session (`UiView`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiViewDescriptor {
	pub title: String,
	pub session_token: String,
	/// `UiView.Controller` capability
	pub controller: CapRef,
}
