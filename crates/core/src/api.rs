//! Typed wrappers over the server's remote interfaces.
//!
//! Each wrapper owns one [`Capability`] reference. `add_ref` duplicates it for
//! capture into a Command, and dropping the wrapper (or calling `release`)
//! gives the reference back. Results that carry capabilities are decoded into
//! owned values whose handles are duplicated out of the result payload, so they
//! stay valid once the payload is gone.

use tempest_protocol::methods::{
	AuthenticatorResults, CreateParams, CreateResults, GetPackageResults, GetSessionsResults,
	InstallPackageResults, ListParams, MakeSharingTokenParams, MakeSharingTokenResults,
	SendEmailAuthTokenParams, WriteParams, authenticator, byte_stream, external_api,
	package_controller, ui_view_controller, user_session, visitor_session,
};
use tempest_protocol::{CapRef, GrainId, PackageId};
use tempest_runtime::{Capability, Payload, Result};

use crate::model::{Grain, Package};

macro_rules! capability_wrapper {
	($(#[$meta:meta])* $name:ident) => {
		$(#[$meta])*
		#[derive(Debug)]
		pub struct $name(Capability);

		impl $name {
			pub fn new(cap: Capability) -> Self {
				Self(cap)
			}

			/// Duplicates the underlying reference.
			pub fn add_ref(&self) -> Self {
				Self(self.0.add_ref())
			}

			/// Gives the underlying reference back.
			pub fn release(self) {
				self.0.release();
			}

			pub fn capability(&self) -> &Capability {
				&self.0
			}
		}

		impl From<Capability> for $name {
			fn from(cap: Capability) -> Self {
				Self(cap)
			}
		}
	};
}

capability_wrapper!(
	/// Root interface, reached through the connection's bootstrap capability.
	ExternalApi
);
capability_wrapper!(
	/// Session available to every visitor, logged in or not.
	VisitorSession
);
capability_wrapper!(
	/// Session available only to logged-in users.
	UserSession
);
capability_wrapper!(PackageController);
capability_wrapper!(UiViewController);
capability_wrapper!(Authenticator);
capability_wrapper!(
	/// Write sink of a package install; also answers `getPackage` once done.
	InstallStream
);

/// The two session roots returned by [`ExternalApi::get_sessions`].
#[derive(Debug)]
pub struct Sessions {
	pub visitor: VisitorSession,
	pub user: UserSession,
}

impl Sessions {
	pub fn add_ref(&self) -> Self {
		Self {
			visitor: self.visitor.add_ref(),
			user: self.user.add_ref(),
		}
	}
}

/// Call params carrying a single capability under `into`.
fn sink_params(into: Capability) -> Result<Payload> {
	let content = serde_json::to_value(ListParams {
		into: CapRef::new(0),
	})?;
	Ok(Payload::with_caps(content, vec![into]))
}

impl ExternalApi {
	pub async fn get_sessions(&self) -> Result<Sessions> {
		let results = self.0.call_no_params(external_api::GET_SESSIONS).await?;
		let refs: GetSessionsResults = results.decode()?;
		Ok(Sessions {
			visitor: VisitorSession(results.cap(refs.visitor)?),
			user: UserSession(results.cap(refs.user)?),
		})
	}

	pub async fn authenticator(&self) -> Result<Authenticator> {
		let results = self.0.call_no_params(external_api::AUTHENTICATOR).await?;
		let refs: AuthenticatorResults = results.decode()?;
		Ok(Authenticator(results.cap(refs.authenticator)?))
	}
}

impl VisitorSession {
	/// Subscribes `into` (a pusher of grain views) to this session's views.
	pub async fn list_views(&self, into: Capability) -> Result<()> {
		self.0
			.call_raw(visitor_session::LIST_VIEWS, sink_params(into)?)
			.await?;
		Ok(())
	}
}

impl UserSession {
	/// Subscribes `into` (a pusher of packages) to the user's installed packages.
	pub async fn list_packages(&self, into: Capability) -> Result<()> {
		self.0
			.call_raw(user_session::LIST_PACKAGES, sink_params(into)?)
			.await?;
		Ok(())
	}

	pub async fn install_package(&self) -> Result<InstallStream> {
		let results = self.0.call_no_params(user_session::INSTALL_PACKAGE).await?;
		let refs: InstallPackageResults = results.decode()?;
		Ok(InstallStream(results.cap(refs.stream)?))
	}
}

impl InstallStream {
	pub async fn write(&self, data: &[u8]) -> Result<()> {
		let params = WriteParams {
			data: data.to_vec(),
		};
		self.0.call_no_result(byte_stream::WRITE, params).await
	}

	/// Marks the end of the package bytes.
	pub async fn done(&self) -> Result<()> {
		self.0.call_no_params(byte_stream::DONE).await?;
		Ok(())
	}

	/// Waits for the server to finish installing and returns the package.
	pub async fn get_package(&self) -> Result<(PackageId, Package)> {
		let results = self.0.call_no_params(byte_stream::GET_PACKAGE).await?;
		let GetPackageResults { id, package } = results.decode()?;
		let package = Package::from_descriptor(package, &results)?;
		Ok((id, package))
	}
}

impl PackageController {
	/// Creates a new grain running `action_index` of this package.
	pub async fn create(&self, title: &str, action_index: u32) -> Result<(GrainId, Grain)> {
		let params = CreateParams {
			title: title.to_string(),
			action_index,
		};
		let results = self.0.call(package_controller::CREATE, params).await?;
		let CreateResults { id, view } = results.decode()?;
		let grain = Grain::from_descriptor(view, &results)?;
		Ok((id, grain))
	}
}

impl UiViewController {
	pub async fn make_sharing_token(&self, params: MakeSharingTokenParams) -> Result<String> {
		let results = self
			.0
			.call(ui_view_controller::MAKE_SHARING_TOKEN, params)
			.await?;
		let MakeSharingTokenResults { token } = results.decode()?;
		Ok(token)
	}
}

impl Authenticator {
	/// Asks the server to mail a one-time login token to `address`.
	pub async fn send_email_auth_token(&self, address: &str) -> Result<()> {
		let params = SendEmailAuthTokenParams {
			address: address.to_string(),
		};
		self.0
			.call_no_result(authenticator::SEND_EMAIL_AUTH_TOKEN, params)
			.await
	}
}
