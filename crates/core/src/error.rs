//! Error types for session orchestration.

use std::fmt;

use thiserror::Error;

use crate::platform::HostError;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Which half of a [`crate::CredentialPair`] was missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialField {
	AccessToken,
	CsrfToken,
}

impl fmt::Display for CredentialField {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			CredentialField::AccessToken => write!(f, "access token"),
			CredentialField::CsrfToken => write!(f, "csrf token"),
		}
	}
}

/// Broad classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
	/// Rejected before any resource was allocated.
	Configuration,
	/// The target surface (or a primitive it needs) could not be acquired.
	Environment,
	/// The private channel or credential delivery failed after `READY`.
	Protocol,
	/// The orchestrator was destroyed.
	Disposed,
	/// The session was torn down without reaching an outcome.
	Ended,
}

/// Errors surfaced by the orchestrator.
///
/// `Clone` so the same value can be handed to `on_error` and returned to the
/// caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
	#[error("invalid session url `{url}`: {reason}")]
	InvalidUrl { url: String, reason: String },

	#[error("session url `{0}` has no scheme/host/port origin")]
	OpaqueOrigin(String),

	#[error("credential pair is missing the {0}")]
	MissingCredential(CredentialField),

	#[error("popup window could not be opened (blocked by the browser?)")]
	PopupBlocked,

	#[error("failed to mount checkout frame: {0}")]
	FrameMount(HostError),

	#[error("navigation to checkout failed: {0}")]
	Navigation(HostError),

	#[error("failed to install message listener: {0}")]
	ListenerInstall(HostError),

	#[error("failed to start popup close watcher: {0}")]
	WatcherInstall(HostError),

	#[error("failed to open private channel: {0}")]
	ChannelOpen(HostError),

	#[error("failed to deliver credentials: {0}")]
	InitDelivery(HostError),

	#[error("orchestrator has been destroyed")]
	Disposed,

	#[error("session ended without an outcome")]
	Ended,
}

impl Error {
	pub fn kind(&self) -> ErrorKind {
		match self {
			Error::InvalidUrl { .. } | Error::OpaqueOrigin(_) | Error::MissingCredential(_) => ErrorKind::Configuration,
			Error::PopupBlocked
			| Error::FrameMount(_)
			| Error::Navigation(_)
			| Error::ListenerInstall(_)
			| Error::WatcherInstall(_) => ErrorKind::Environment,
			Error::ChannelOpen(_) | Error::InitDelivery(_) => ErrorKind::Protocol,
			Error::Disposed => ErrorKind::Disposed,
			Error::Ended => ErrorKind::Ended,
		}
	}

	pub fn is_configuration(&self) -> bool {
		self.kind() == ErrorKind::Configuration
	}

	pub fn is_disposed(&self) -> bool {
		matches!(self, Error::Disposed)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn kinds_follow_taxonomy() {
		assert_eq!(Error::MissingCredential(CredentialField::CsrfToken).kind(), ErrorKind::Configuration);
		assert_eq!(Error::PopupBlocked.kind(), ErrorKind::Environment);
		assert_eq!(Error::ChannelOpen(HostError::new("boom")).kind(), ErrorKind::Protocol);
		assert_eq!(Error::InitDelivery(HostError::new("boom")).kind(), ErrorKind::Protocol);
		assert!(Error::Disposed.is_disposed());
	}

	#[test]
	fn messages_name_the_missing_field() {
		let err = Error::MissingCredential(CredentialField::AccessToken);
		assert_eq!(err.to_string(), "credential pair is missing the access token");
	}
}
