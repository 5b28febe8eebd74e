//! Client state owned by the dispatch loop.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tempest_protocol::{GrainId, Manifest, PackageDescriptor, PackageId, UiViewDescriptor};
use tempest_runtime::Payload;

use crate::api::{ExternalApi, PackageController, Sessions, UiViewController};
use crate::dom_order::{DomIndex, DomOrder};
use crate::error::{Error, ManifestError};

/// A running application instance.
#[derive(Debug)]
pub struct Grain {
	pub title: String,
	pub session_token: String,
	pub controller: UiViewController,
}

impl Grain {
	/// Builds a grain from a view descriptor, duplicating its controller out of `payload`.
	pub fn from_descriptor(view: UiViewDescriptor, payload: &Payload) -> tempest_runtime::Result<Self> {
		Ok(Self {
			title: view.title,
			session_token: view.session_token,
			controller: UiViewController::new(payload.cap(view.controller)?),
		})
	}
}

/// An installed application package.
#[derive(Debug)]
pub struct Package {
	pub controller: PackageController,
	pub manifest: Option<Manifest>,
}

impl Package {
	/// Builds a package from its descriptor, duplicating its controller out of `payload`.
	pub fn from_descriptor(
		package: PackageDescriptor,
		payload: &Payload,
	) -> tempest_runtime::Result<Self> {
		Ok(Self {
			controller: PackageController::new(payload.cap(package.controller)?),
			manifest: package.manifest,
		})
	}

	/// Title for a fresh grain launched through `action_index`, e.g.
	/// "Untitled Etherpad document".
	pub fn spawn_title(&self, action_index: usize) -> Result<String, ManifestError> {
		let manifest = self.manifest.as_ref().ok_or(ManifestError::Missing)?;
		let app_title = manifest
			.app_title
			.as_ref()
			.ok_or(ManifestError::MissingAppTitle)?;
		let action = manifest
			.actions
			.get(action_index)
			.ok_or(ManifestError::ActionOutOfRange {
				index: action_index,
				count: manifest.actions.len(),
			})?;
		let noun_phrase = action
			.noun_phrase
			.as_ref()
			.ok_or(ManifestError::MissingNounPhrase(action_index))?;
		Ok(format!(
			"Untitled {} {}",
			app_title.default_text, noun_phrase.default_text
		))
	}
}

/// Which part of the UI is in front.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Focus {
	#[default]
	GrainList,
	OpenGrain(GrainId),
}

/// Bookkeeping for a grain that is currently displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenGrain {
	pub dom_index: DomIndex,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
	pub email_input: String,
	pub token_input: String,
	pub token_sent: bool,
}

/// The whole client state. Mutated only by [`update`](crate::update).
#[derive(Debug)]
pub struct Model {
	pub grains: HashMap<GrainId, Grain>,
	pub packages: HashMap<PackageId, Package>,
	pub open_grains: HashMap<GrainId, OpenGrain>,
	pub grain_dom_order: DomOrder<GrainId>,
	pub focus: Focus,
	/// `None` until the session fetch resolves.
	pub login_sessions: Option<Result<Sessions, Error>>,
	pub login_form: LoginForm,
	/// Append-only diagnostic log.
	pub errors: Vec<Error>,
	pub api: ExternalApi,
}

impl Model {
	pub fn new(api: ExternalApi) -> Self {
		Self {
			grains: HashMap::new(),
			packages: HashMap::new(),
			open_grains: HashMap::new(),
			grain_dom_order: DomOrder::new(),
			focus: Focus::GrainList,
			login_sessions: None,
			login_form: LoginForm::default(),
			errors: Vec::new(),
			api,
		}
	}

	/// The focused grain, if a grain is in front.
	pub fn focused_grain(&self) -> Option<&GrainId> {
		match &self.focus {
			Focus::OpenGrain(id) => Some(id),
			Focus::GrainList => None,
		}
	}

	/// Opens `id` (appending it to the display order if needed) and brings it to front.
	pub fn focus_grain(&mut self, id: GrainId) {
		if !self.open_grains.contains_key(&id) {
			let dom_index = self.grain_dom_order.push(id.clone());
			self.open_grains.insert(id.clone(), OpenGrain { dom_index });
		}
		self.focus = Focus::OpenGrain(id);
	}

	/// Closes `id` if open. Focus falls back to the grain list when `id` was in front.
	pub fn close_grain(&mut self, id: &GrainId) {
		let Some(open) = self.open_grains.remove(id) else {
			return;
		};
		self.grain_dom_order.remove(open.dom_index);
		if self.focused_grain() == Some(id) {
			self.focus = Focus::GrainList;
		}
	}

	/// Open grains in display order.
	pub fn open_grain_order(&self) -> Vec<GrainId> {
		self.grain_dom_order.iter().cloned().collect()
	}

	/// The user session, if login succeeded.
	pub fn user_session(&self) -> Result<&Sessions, Error> {
		match &self.login_sessions {
			None => Err(Error::NoLoginSession),
			Some(Err(e)) => Err(Error::LoginFailed(e.to_string())),
			Some(Ok(sessions)) => Ok(sessions),
		}
	}

	/// Plain-data snapshot for rendering and assertions.
	pub fn summary(&self) -> ModelSummary {
		ModelSummary {
			grains: self
				.grains
				.iter()
				.map(|(id, grain)| (id.clone(), grain.title.clone()))
				.collect(),
			packages: self.packages.keys().cloned().collect(),
			open_grains: self.open_grain_order(),
			focus: self.focus.clone(),
			logged_in: self.login_sessions.as_ref().map(Result::is_ok),
			token_sent: self.login_form.token_sent,
			errors: self.errors.iter().map(ToString::to_string).collect(),
		}
	}
}

/// Capability-free view of a [`Model`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelSummary {
	/// Grain titles by id
	pub grains: BTreeMap<GrainId, String>,
	pub packages: BTreeSet<PackageId>,
	pub open_grains: Vec<GrainId>,
	pub focus: Focus,
	pub logged_in: Option<bool>,
	pub token_sent: bool,
	pub errors: Vec<String>,
}
