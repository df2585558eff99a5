//! Expected-origin resolution and matching.

use url::{Origin, Url};

use crate::error::{Error, Result};

/// Scheme, host and port of the session URL.
///
/// Derived once at session start. Inbound messages are authenticated by
/// comparing their declared origin to [`ExpectedOrigin::as_str`] with exact
/// string equality: no prefix, suffix or case-folding rules apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedOrigin {
	serialized: String,
}

impl ExpectedOrigin {
	/// Resolves the origin of an absolute session URL.
	pub fn from_url(url: &Url) -> Result<Self> {
		match url.origin() {
			origin @ Origin::Tuple(..) => Ok(Self {
				serialized: origin.ascii_serialization(),
			}),
			Origin::Opaque(_) => Err(Error::OpaqueOrigin(url.to_string())),
		}
	}

	/// Parses `raw` as an absolute URL and resolves its origin.
	pub fn parse(raw: &str) -> Result<(Url, Self)> {
		let url = Url::parse(raw).map_err(|err| Error::InvalidUrl {
			url: raw.to_string(),
			reason: err.to_string(),
		})?;
		let origin = Self::from_url(&url)?;
		Ok((url, origin))
	}

	/// Browser serialization, e.g. `https://pay.example.com:8443`.
	pub fn as_str(&self) -> &str {
		&self.serialized
	}

	pub fn matches(&self, declared: &str) -> bool {
		self.serialized == declared
	}
}

impl std::fmt::Display for ExpectedOrigin {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.serialized)
	}
}
