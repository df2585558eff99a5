//! Session and orchestrator configuration.
//!
//! A [`SessionConfig`] is built per session from a [`SessionKind`]
//! constructor, a [`Display`] mode and builder-style callback setters.
//! [`OrchestratorOptions`] carry instance-wide defaults and can be loaded from
//! JSON.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CredentialField, Error, Result};
use crate::session::{Outcome, Success};

/// Flow served by the remote surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
	/// Charge flow; completes with `PAYMENT_COMPLETED`.
	Payment,
	/// Save-payment-method flow; completes with `PAYMENT_METHOD_ADDED`.
	Setup,
}

impl fmt::Display for SessionKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SessionKind::Payment => write!(f, "payment"),
			SessionKind::Setup => write!(f, "setup"),
		}
	}
}

/// Short-lived credentials delivered to the remote surface.
///
/// Held in memory for one session only. `Debug` never prints the tokens.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPair {
	access_token: String,
	csrf_token: String,
	#[serde(default)]
	expires_at: Option<String>,
}

impl CredentialPair {
	pub fn new(access_token: impl Into<String>, csrf_token: impl Into<String>) -> Self {
		Self {
			access_token: access_token.into(),
			csrf_token: csrf_token.into(),
			expires_at: None,
		}
	}

	/// Attaches the backend's opaque expiry marker.
	pub fn with_expiry(mut self, expires_at: impl Into<String>) -> Self {
		self.expires_at = Some(expires_at.into());
		self
	}

	pub fn access_token(&self) -> &str {
		&self.access_token
	}

	pub fn csrf_token(&self) -> &str {
		&self.csrf_token
	}

	pub fn expires_at(&self) -> Option<&str> {
		self.expires_at.as_deref()
	}

	/// Fails on the first empty token.
	pub fn validate(&self) -> Result<()> {
		if self.access_token.is_empty() {
			return Err(Error::MissingCredential(CredentialField::AccessToken));
		}
		if self.csrf_token.is_empty() {
			return Err(Error::MissingCredential(CredentialField::CsrfToken));
		}
		Ok(())
	}

	/// Empties every field in place.
	pub fn clear(&mut self) {
		self.access_token.clear();
		self.csrf_token.clear();
		self.expires_at = None;
	}

	pub fn is_cleared(&self) -> bool {
		self.access_token.is_empty() && self.csrf_token.is_empty() && self.expires_at.is_none()
	}
}

impl fmt::Debug for CredentialPair {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CredentialPair")
			.field("access_token", &"<redacted>")
			.field("csrf_token", &"<redacted>")
			.field("expires_at", &self.expires_at.as_ref().map(|_| "<redacted>"))
			.finish()
	}
}

/// Per-session popup parameters. Unset fields fall back to
/// [`PopupDefaults`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PopupOptions {
	pub width: Option<u32>,
	pub height: Option<u32>,
	pub name: Option<String>,
}

impl PopupOptions {
	pub fn with_size(mut self, width: u32, height: u32) -> Self {
		self.width = Some(width);
		self.height = Some(height);
		self
	}

	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}
}

/// Per-session frame parameters. `host` is the caller-owned element the
/// frame is attached to; its existing children are removed first.
#[derive(Debug, Clone)]
pub struct FrameOptions<E> {
	pub host: E,
	pub width: Option<String>,
	pub height: Option<String>,
	pub class_name: Option<String>,
	pub allow: Option<String>,
}

impl<E> FrameOptions<E> {
	pub fn new(host: E) -> Self {
		Self {
			host,
			width: None,
			height: None,
			class_name: None,
			allow: None,
		}
	}

	pub fn with_size(mut self, width: impl Into<String>, height: impl Into<String>) -> Self {
		self.width = Some(width.into());
		self.height = Some(height.into());
		self
	}

	pub fn with_class_name(mut self, class_name: impl Into<String>) -> Self {
		self.class_name = Some(class_name.into());
		self
	}

	/// Overrides the frame's `allow` attribute (default: `payment`).
	pub fn with_allow(mut self, allow: impl Into<String>) -> Self {
		self.allow = Some(allow.into());
		self
	}
}

/// How the remote surface is presented.
#[derive(Debug, Clone)]
pub enum Display<E> {
	Popup(PopupOptions),
	Frame(FrameOptions<E>),
	/// Full-page navigation. Terminal: no listener, channel or callback.
	Redirect,
}

impl<E> Display<E> {
	pub fn label(&self) -> &'static str {
		match self {
			Display::Popup(_) => "popup",
			Display::Frame(_) => "frame",
			Display::Redirect => "redirect",
		}
	}
}

/// Terminal callbacks for one session.
///
/// Each callback is `FnOnce` and the set is consumed when a session ends, so
/// at most one of them runs, at most once.
#[derive(Default)]
pub struct CallbackSet {
	on_success: Option<Box<dyn FnOnce(Success)>>,
	on_cancel: Option<Box<dyn FnOnce()>>,
	on_error: Option<Box<dyn FnOnce(&Error)>>,
}

impl CallbackSet {
	pub fn on_success(mut self, f: impl FnOnce(Success) + 'static) -> Self {
		self.on_success = Some(Box::new(f));
		self
	}

	pub fn on_cancel(mut self, f: impl FnOnce() + 'static) -> Self {
		self.on_cancel = Some(Box::new(f));
		self
	}

	pub fn on_error(mut self, f: impl FnOnce(&Error) + 'static) -> Self {
		self.on_error = Some(Box::new(f));
		self
	}

	pub(crate) fn fire_error(self, err: &Error) {
		if let Some(f) = self.on_error {
			f(err);
		}
	}

	/// Runs the single callback matching `termination`.
	pub(crate) fn dispatch(self, termination: &Result<Outcome>) {
		match termination {
			Ok(Outcome::Canceled) => {
				if let Some(f) = self.on_cancel {
					f();
				}
			}
			Ok(outcome) => {
				if let (Some(f), Some(success)) = (self.on_success, outcome.success()) {
					f(success);
				}
			}
			Err(err) => self.fire_error(err),
		}
	}
}

impl fmt::Debug for CallbackSet {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CallbackSet")
			.field("on_success", &self.on_success.is_some())
			.field("on_cancel", &self.on_cancel.is_some())
			.field("on_error", &self.on_error.is_some())
			.finish()
	}
}

/// Everything needed to start one session.
///
/// `E` is the platform's host element type, used only by [`Display::Frame`].
#[derive(Debug)]
pub struct SessionConfig<E> {
	pub kind: SessionKind,
	pub url: String,
	pub credentials: CredentialPair,
	pub display: Display<E>,
	pub callbacks: CallbackSet,
	/// Raises log verbosity for this session. No protocol effect.
	pub debug: bool,
}

impl<E> SessionConfig<E> {
	pub fn new(kind: SessionKind, url: impl Into<String>, credentials: CredentialPair, display: Display<E>) -> Self {
		Self {
			kind,
			url: url.into(),
			credentials,
			display,
			callbacks: CallbackSet::default(),
			debug: false,
		}
	}

	/// Payment (charge) session.
	pub fn payment(url: impl Into<String>, credentials: CredentialPair, display: Display<E>) -> Self {
		Self::new(SessionKind::Payment, url, credentials, display)
	}

	/// Setup (save payment method) session.
	pub fn setup(url: impl Into<String>, credentials: CredentialPair, display: Display<E>) -> Self {
		Self::new(SessionKind::Setup, url, credentials, display)
	}

	pub fn on_success(mut self, f: impl FnOnce(Success) + 'static) -> Self {
		self.callbacks = self.callbacks.on_success(f);
		self
	}

	pub fn on_cancel(mut self, f: impl FnOnce() + 'static) -> Self {
		self.callbacks = self.callbacks.on_cancel(f);
		self
	}

	pub fn on_error(mut self, f: impl FnOnce(&Error) + 'static) -> Self {
		self.callbacks = self.callbacks.on_error(f);
		self
	}

	pub fn with_callbacks(mut self, callbacks: CallbackSet) -> Self {
		self.callbacks = callbacks;
		self
	}

	pub fn with_debug(mut self, debug: bool) -> Self {
		self.debug = debug;
		self
	}
}

/// Popup fallbacks applied when [`PopupOptions`] leaves a field unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopupDefaults {
	pub width: u32,
	pub height: u32,
	pub name: String,
}

impl Default for PopupDefaults {
	fn default() -> Self {
		Self {
			width: 500,
			height: 700,
			name: "paybridge_checkout".to_string(),
		}
	}
}

/// Frame fallbacks applied when [`FrameOptions`] leaves a field unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameDefaults {
	pub width: String,
	pub height: String,
	pub allow: String,
}

impl Default for FrameDefaults {
	fn default() -> Self {
		Self {
			width: "100%".to_string(),
			height: "700px".to_string(),
			allow: "payment".to_string(),
		}
	}
}

/// Instance-wide orchestrator settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorOptions {
	/// Popup-closed check interval in milliseconds.
	pub poll_interval_ms: u64,
	pub popup: PopupDefaults,
	pub frame: FrameDefaults,
}

impl Default for OrchestratorOptions {
	fn default() -> Self {
		Self {
			poll_interval_ms: crate::DEFAULT_POLL_INTERVAL_MS,
			popup: PopupDefaults::default(),
			frame: FrameDefaults::default(),
		}
	}
}

impl OrchestratorOptions {
	pub fn with_poll_interval(mut self, interval: Duration) -> Self {
		self.poll_interval_ms = interval.as_millis().max(1) as u64;
		self
	}

	pub fn poll_interval(&self) -> Duration {
		Duration::from_millis(self.poll_interval_ms.max(1))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::cell::RefCell;
	use std::rc::Rc;

	#[test]
	fn credential_debug_is_redacted() {
		let creds = CredentialPair::new("tok_a", "tok_c").with_expiry("2026-10-16T00:00:00Z");
		let printed = format!("{creds:?}");
		assert!(!printed.contains("tok_a"));
		assert!(!printed.contains("tok_c"));
		assert!(!printed.contains("2026"));
	}

	#[test]
	fn credential_validation_names_first_missing_field() {
		assert_eq!(
			CredentialPair::new("", "").validate(),
			Err(Error::MissingCredential(CredentialField::AccessToken))
		);
		assert_eq!(
			CredentialPair::new("tok_a", "").validate(),
			Err(Error::MissingCredential(CredentialField::CsrfToken))
		);
		assert!(CredentialPair::new("tok_a", "tok_c").validate().is_ok());
	}

	#[test]
	fn clear_empties_all_fields() {
		let mut creds = CredentialPair::new("tok_a", "tok_c").with_expiry("soon");
		creds.clear();
		assert!(creds.is_cleared());
	}

	#[test]
	fn options_fill_missing_fields_from_defaults() {
		let opts: OrchestratorOptions = serde_json::from_str(r#"{"poll_interval_ms": 50, "popup": {"width": 420}}"#).unwrap();
		assert_eq!(opts.poll_interval(), Duration::from_millis(50));
		assert_eq!(opts.popup.width, 420);
		assert_eq!(opts.popup.height, 700);
		assert_eq!(opts.frame.allow, "payment");
	}

	#[test]
	fn zero_poll_interval_is_clamped() {
		let opts = OrchestratorOptions {
			poll_interval_ms: 0,
			..Default::default()
		};
		assert_eq!(opts.poll_interval(), Duration::from_millis(1));
	}

	#[test]
	fn dispatch_runs_only_the_matching_callback() {
		let log = Rc::new(RefCell::new(Vec::new()));
		let (a, b, c) = (Rc::clone(&log), Rc::clone(&log), Rc::clone(&log));
		let callbacks = CallbackSet::default()
			.on_success(move |_| a.borrow_mut().push("success"))
			.on_cancel(move || b.borrow_mut().push("cancel"))
			.on_error(move |_| c.borrow_mut().push("error"));

		callbacks.dispatch(&Ok(Outcome::Canceled));
		assert_eq!(*log.borrow(), vec!["cancel"]);
	}
}
