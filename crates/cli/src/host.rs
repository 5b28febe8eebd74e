use tempest::Host;
use url::Url;

/// Host for a terminal session: redirects are printed for the user to open.
#[derive(Debug, Clone)]
pub struct TerminalHost {
	location: Url,
}

impl TerminalHost {
	pub fn new(location: Url) -> Self {
		Self { location }
	}

	/// Absolute URL for a server-relative `href`.
	pub fn resolve(&self, href: &str) -> Option<Url> {
		self.location.join(href).ok()
	}
}

impl Host for TerminalHost {
	fn redirect(&self, href: &str) {
		match self.resolve(href) {
			Some(url) => {
				tracing::info!(%url, "redirect");
				println!("open {url} to continue");
			}
			None => tracing::warn!(href, "cannot resolve redirect target"),
		}
	}
}
