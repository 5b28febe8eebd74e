//! The transition function.
//!
//! [`update`] applies one [`Message`] to the [`Model`] and returns at most one
//! [`Command`]. It never fails: anything that can go wrong becomes a Command
//! that reports a [`Message::NewError`].
//!
//! Capability discipline: a handle stored in the Model is released exactly
//! once, when an upsert supersedes it, a remove deletes it, or a clear empties
//! its collection. Commands get `add_ref`'d duplicates.


use tempest_protocol::{GrainId, PackageId};

use crate::api::Sessions;
use crate::command::Command;
use crate::commands;
use crate::error::{Error, ManifestError};
use crate::message::{Message, PackageFile};
use crate::model::{Focus, Grain, Model, Package};

pub fn update(model: &mut Model, msg: Message) -> Option<Command> {
	match msg {
		Message::NewError(error) => {
			tracing::warn!(%error, "error");
			model.errors.push(error);
			None
		}

		Message::UpsertGrain { id, grain } => {
			upsert_grain(model, id, grain);
			None
		}
		Message::RemoveGrain { id } => {
			if let Some(old) = model.grains.remove(&id) {
				old.controller.release();
			}
			None
		}
		Message::ClearGrains => {
			for (_, grain) in model.grains.drain() {
				grain.controller.release();
			}
			None
		}

		Message::UpsertPackage { id, package } => {
			upsert_package(model, id, package);
			None
		}
		Message::RemovePackage { id } => {
			if let Some(old) = model.packages.remove(&id) {
				old.controller.release();
			}
			None
		}
		Message::ClearPackages => {
			for (_, package) in model.packages.drain() {
				package.controller.release();
			}
			None
		}

		Message::ChangeFocus(Focus::GrainList) => {
			model.focus = Focus::GrainList;
			None
		}
		Message::ChangeFocus(Focus::OpenGrain(id)) | Message::FocusGrain { id } => {
			model.focus_grain(id);
			None
		}
		Message::CloseGrain { id } => {
			model.close_grain(&id);
			None
		}
		Message::SpawnGrain {
			package_id,
			action_index,
		} => Some(spawn_grain(model, package_id, action_index)),
		Message::ShareGrain { id } => Some(match model.grains.get(&id) {
			Some(grain) => commands::share_grain(grain.controller.add_ref()),
			None => Command::fail(Error::UnknownGrain(id)),
		}),

		Message::EditEmailLogin(value) => {
			model.login_form.email_input = value;
			None
		}
		Message::EditEmailToken(value) => {
			model.login_form.token_input = value;
			None
		}
		Message::SubmitEmailLogin => {
			let address = std::mem::take(&mut model.login_form.email_input);
			model.login_form.token_sent = true;
			Some(commands::send_email_login(model.api.add_ref(), address))
		}
		Message::SubmitEmailToken => {
			let token = model.login_form.token_input.trim().to_string();
			Some(commands::redirect_to_email_login(token))
		}
		Message::LoginSessionResult(result) => login_session_result(model, result),

		Message::NewAppPkgFile(file) => Some(upload_package(model, file)),

		Message::Navigate { old_url, new_url } => {
			tracing::debug!(%old_url, %new_url, "navigate");
			None
		}
	}
}

fn upsert_grain(model: &mut Model, id: GrainId, grain: Grain) {
	if let Some(old) = model.grains.remove(&id) {
		old.controller.release();
	}
	model.grains.insert(id, grain);
}

fn upsert_package(model: &mut Model, id: PackageId, package: Package) {
	if let Some(old) = model.packages.remove(&id) {
		old.controller.release();
	}
	model.packages.insert(id, package);
}

fn spawn_grain(model: &Model, package_id: PackageId, action_index: usize) -> Command {
	let Some(package) = model.packages.get(&package_id) else {
		return Command::fail(Error::UnknownPackage(package_id));
	};
	let title = match package.spawn_title(action_index) {
		Ok(title) => title,
		Err(e) => return Command::fail(e.into()),
	};
	let Ok(action_index) = u32::try_from(action_index) else {
		return Command::fail(
			ManifestError::ActionOutOfRange {
				index: action_index,
				count: package.manifest.as_ref().map_or(0, |m| m.actions.len()),
			}
			.into(),
		);
	};
	commands::spawn_grain(package.controller.add_ref(), title, action_index)
}

fn login_session_result(model: &mut Model, result: Result<Sessions, Error>) -> Option<Command> {
	let command = match &result {
		Ok(sessions) => Some(commands::list_packages(sessions.user.add_ref())),
		Err(error) => {
			tracing::warn!(%error, "login failed");
			None
		}
	};
	model.login_sessions = Some(result);
	command
}

fn upload_package(model: &Model, file: PackageFile) -> Command {
	match model.user_session() {
		Ok(sessions) => commands::upload_package(sessions.user.add_ref(), file),
		Err(e) => Command::fail(e),
	}
}
