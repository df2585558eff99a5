//! Resources allocated for the active session.
//!
//! [`Resources`] is replaced as a whole value: teardown takes it out of the
//! session (leaving an empty set behind) and releases every handle it held.
//! A handle can therefore be released at most once, and an empty set
//! releases nothing.

use serde::Serialize;

use crate::platform::{Platform, Surface};

/// Handles owned by one session.
pub struct Resources<P: Platform> {
	pub(crate) surface: Option<Surface<P>>,
	pub(crate) interval: Option<P::Interval>,
	pub(crate) port: Option<P::Port>,
	pub(crate) listener: Option<P::Listener>,
}

impl<P: Platform> Default for Resources<P> {
	fn default() -> Self {
		Self {
			surface: None,
			interval: None,
			port: None,
			listener: None,
		}
	}
}

/// Which handles a [`Resources`] value holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResourceSummary {
	pub surface: bool,
	pub interval: bool,
	pub port: bool,
	pub listener: bool,
}

impl<P: Platform> Resources<P> {
	pub fn summary(&self) -> ResourceSummary {
		ResourceSummary {
			surface: self.surface.is_some(),
			interval: self.interval.is_some(),
			port: self.port.is_some(),
			listener: self.listener.is_some(),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.summary() == ResourceSummary::default()
	}

	pub fn surface(&self) -> Option<&Surface<P>> {
		self.surface.as_ref()
	}

	/// Releases every held handle.
	///
	/// The close poll goes first so it cannot observe a popup this call is
	/// closing; the surface goes last.
	pub fn release(self, platform: &P) {
		let summary = self.summary();
		let Resources {
			surface,
			interval,
			port,
			listener,
		} = self;

		if let Some(interval) = interval {
			platform.clear_interval(interval);
		}
		if let Some(listener) = listener {
			platform.unlisten(listener);
		}
		if let Some(port) = port {
			platform.close_port(port);
		}
		match surface {
			Some(Surface::Popup(window)) => platform.close_popup(&window),
			Some(Surface::Frame(frame)) => platform.remove_frame(&frame),
			None => {}
		}

		tracing::debug!(target: "paybridge.registry", ?summary, "released session resources");
	}
}
