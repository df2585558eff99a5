//! Popup display strategy.

use url::Url;

use crate::config::{PopupDefaults, PopupOptions};
use crate::error::{Error, Result};
use crate::platform::{Platform, ScreenArea};

/// Chrome flags appended to every popup feature string.
pub const POPUP_CHROME: &str = "toolbar=no,menubar=no,status=no,scrollbars=yes,resizable=yes";

/// Size and position of a popup, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopupGeometry {
	pub width: u32,
	pub height: u32,
	pub left: u32,
	pub top: u32,
}

impl PopupGeometry {
	/// Centers a `width` x `height` popup on `screen`. A popup larger than
	/// the screen is pinned to the top-left corner.
	pub fn centered(width: u32, height: u32, screen: ScreenArea) -> Self {
		Self {
			width,
			height,
			left: screen.width.saturating_sub(width) / 2,
			top: screen.height.saturating_sub(height) / 2,
		}
	}

	/// Feature string passed to the window-opening primitive.
	pub fn features(&self) -> String {
		format!(
			"width={},height={},left={},top={},{POPUP_CHROME}",
			self.width, self.height, self.left, self.top
		)
	}
}

/// Opens the popup for `url`. A refused open is reported as
/// [`Error::PopupBlocked`].
pub fn open<P: Platform>(
	platform: &P,
	url: &Url,
	options: &PopupOptions,
	defaults: &PopupDefaults,
) -> Result<P::Window> {
	let geometry = PopupGeometry::centered(
		options.width.unwrap_or(defaults.width),
		options.height.unwrap_or(defaults.height),
		platform.available_screen(),
	);
	let name = options.name.as_deref().unwrap_or(&defaults.name);
	let features = geometry.features();

	tracing::debug!(target: "paybridge.display", name, features = %features, "opening popup");
	platform.open_popup(url, name, &features).ok_or(Error::PopupBlocked)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::platform::fake::FakePlatform;

	#[test]
	fn centers_within_screen() {
		let geometry = PopupGeometry::centered(500, 700, ScreenArea { width: 1920, height: 1080 });
		assert_eq!(
			geometry,
			PopupGeometry {
				width: 500,
				height: 700,
				left: 710,
				top: 190
			}
		);
	}

	#[test]
	fn oversized_popup_clamps_to_origin() {
		let geometry = PopupGeometry::centered(800, 900, ScreenArea { width: 640, height: 480 });
		assert_eq!((geometry.left, geometry.top), (0, 0));
		assert_eq!((geometry.width, geometry.height), (800, 900));
	}

	#[test]
	fn feature_string_has_fixed_suffix() {
		let geometry = PopupGeometry::centered(400, 600, ScreenArea { width: 1000, height: 800 });
		assert_eq!(
			geometry.features(),
			"width=400,height=600,left=300,top=100,toolbar=no,menubar=no,status=no,scrollbars=yes,resizable=yes"
		);
	}

	#[test]
	fn options_override_defaults() {
		let platform = FakePlatform::new().with_screen(1000, 1000);
		let url = Url::parse("https://pay.example.com/s/1").unwrap();
		let options = PopupOptions::default().with_size(200, 300).with_name("pay");

		open(&platform, &url, &options, &PopupDefaults::default()).unwrap();

		let popup = platform.latest_popup().unwrap();
		assert_eq!(popup.name, "pay");
		assert!(popup.features.starts_with("width=200,height=300,left=400,top=350,"));
	}

	#[test]
	fn blocked_popup_is_an_error() {
		let platform = FakePlatform::new();
		platform.set_block_popups(true);
		let url = Url::parse("https://pay.example.com/s/1").unwrap();

		let err = open(&platform, &url, &PopupOptions::default(), &PopupDefaults::default()).unwrap_err();
		assert_eq!(err, Error::PopupBlocked);
	}
}
