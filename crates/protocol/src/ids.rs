//! Identifier newtypes for server-maintained collections.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies one grain (a running application instance).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GrainId(pub String);

/// Identifies one installed application package.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageId(pub String);

macro_rules! string_id {
	($ty:ident) => {
		impl $ty {
			pub fn new(id: impl Into<String>) -> Self {
				Self(id.into())
			}

			pub fn as_str(&self) -> &str {
				&self.0
			}
		}

		impl fmt::Display for $ty {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				f.write_str(&self.0)
			}
		}

		impl From<&str> for $ty {
			fn from(id: &str) -> Self {
				Self(id.to_string())
			}
		}

		impl From<String> for $ty {
			fn from(id: String) -> Self {
				Self(id)
			}
		}
	};
}

string_id!(GrainId);
string_id!(PackageId);
