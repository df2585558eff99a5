//! Embedded-frame display strategy.
//!
//! The host element's existing children are removed before the new frame is
//! appended, so repeated sessions on one host never stack frames. Removal of
//! the frame by the caller is not observed; cancellation for this mode
//! arrives only as a protocol message.

use url::Url;

use crate::config::{FrameDefaults, FrameOptions};
use crate::error::{Error, Result};
use crate::platform::{FrameAttributes, Platform};

/// Applies `defaults` to the unset fields of `options`.
pub fn resolve_attributes<E>(options: &FrameOptions<E>, defaults: &FrameDefaults) -> FrameAttributes {
	FrameAttributes {
		width: options.width.clone().unwrap_or_else(|| defaults.width.clone()),
		height: options.height.clone().unwrap_or_else(|| defaults.height.clone()),
		class_name: options.class_name.clone(),
		allow: options.allow.clone().unwrap_or_else(|| defaults.allow.clone()),
	}
}

pub fn mount<P: Platform>(
	platform: &P,
	url: &Url,
	options: &FrameOptions<P::Element>,
	defaults: &FrameDefaults,
) -> Result<P::Frame> {
	let attrs = resolve_attributes(options, defaults);
	tracing::debug!(target: "paybridge.display", width = %attrs.width, height = %attrs.height, allow = %attrs.allow, "mounting frame");

	platform.clear_host(&options.host);
	platform.mount_frame(&options.host, url, &attrs).map_err(Error::FrameMount)
}
