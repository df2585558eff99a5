//! JavaScript-facing start options.

use paybridge::{CredentialPair, Display, FrameOptions, PopupOptions, SessionKind};
use serde::Deserialize;
use web_sys::Element;

/// `checkout.start({...})` argument.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartOptions {
	pub kind: SessionKind,
	pub url: String,
	#[serde(flatten)]
	pub credentials: CredentialPair,
	#[serde(default)]
	pub display: DisplayMode,
	#[serde(default)]
	pub debug: bool,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum DisplayMode {
	Popup(PopupOptions),
	Frame(FrameSpec),
	Redirect,
}

impl Default for DisplayMode {
	fn default() -> Self {
		DisplayMode::Popup(PopupOptions::default())
	}
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FrameSpec {
	pub width: Option<String>,
	pub height: Option<String>,
	pub class_name: Option<String>,
	pub allow: Option<String>,
}

impl DisplayMode {
	/// Resolves to a core [`Display`]. Frame mode needs the host element
	/// passed alongside the options.
	pub fn into_display(self, host: Option<Element>) -> Result<Display<Element>, &'static str> {
		match self {
			DisplayMode::Popup(options) => Ok(Display::Popup(options)),
			DisplayMode::Redirect => Ok(Display::Redirect),
			DisplayMode::Frame(spec) => {
				let host = host.ok_or("frame mode requires a host element")?;
				Ok(Display::Frame(FrameOptions {
					host,
					width: spec.width,
					height: spec.height,
					class_name: spec.class_name,
					allow: spec.allow,
				}))
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn options_default_to_popup() {
		let options: StartOptions = serde_json::from_value(json!({
			"kind": "payment",
			"url": "https://pay.example.com/s/123",
			"accessToken": "tok_a",
			"csrfToken": "tok_c"
		}))
		.unwrap();

		assert_eq!(options.kind, SessionKind::Payment);
		assert_eq!(options.credentials.access_token(), "tok_a");
		assert!(matches!(options.display, DisplayMode::Popup(_)));
		assert!(!options.debug);
	}

	#[test]
	fn frame_options_read_camel_case() {
		let options: StartOptions = serde_json::from_value(json!({
			"kind": "setup",
			"url": "https://pay.example.com/s/123",
			"accessToken": "tok_a",
			"csrfToken": "tok_c",
			"display": {"mode": "frame", "height": "640px", "className": "checkout"}
		}))
		.unwrap();

		let DisplayMode::Frame(spec) = options.display else {
			panic!("expected frame mode");
		};
		assert_eq!(spec.height.as_deref(), Some("640px"));
		assert_eq!(spec.class_name.as_deref(), Some("checkout"));
	}

	#[test]
	fn frame_mode_without_host_is_rejected() {
		let mode = DisplayMode::Frame(FrameSpec::default());
		assert!(mode.into_display(None).is_err());
	}
}
