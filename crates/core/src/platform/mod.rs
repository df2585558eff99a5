//! Browser primitives the orchestrator drives.
//!
//! [`Platform`] is the only way the session engine touches windows, frames,
//! message channels, listeners and timers. Handle types are associated types
//! so each backend keeps its native representation:
//!
//! - [`fake::FakePlatform`]: in-memory, records every call; used by tests and
//!   the replay tool
//! - `paybridge-web`: web-sys over the real DOM
//!
//! # Contract
//!
//! - Release operations (`close_popup`, `remove_frame`, `close_port`,
//!   `unlisten`, `clear_interval`) must be no-ops on already-released handles.
//! - Handlers are never invoked synchronously from inside a `Platform` call.
//! - `post_message` takes the transferable channel end by value; the host
//!   side cannot use it afterwards.

pub mod fake;

use std::rc::Rc;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use url::Url;

/// Failure reported by a platform primitive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HostError {
	message: String,
}

impl HostError {
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
		}
	}

	pub fn message(&self) -> &str {
		&self.message
	}
}

/// Inbound window message as delivered to a global listener.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowMessage {
	/// Origin declared by the browser for the sender.
	pub origin: String,
	pub data: Value,
}

impl WindowMessage {
	pub fn new(origin: impl Into<String>, data: Value) -> Self {
		Self {
			origin: origin.into(),
			data,
		}
	}
}

pub type WindowMessageHandler = Rc<dyn Fn(WindowMessage)>;
pub type PortMessageHandler = Rc<dyn Fn(Value)>;
pub type TickHandler = Rc<dyn Fn()>;

/// Available screen area used to center popups, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenArea {
	pub width: u32,
	pub height: u32,
}

impl Default for ScreenArea {
	fn default() -> Self {
		Self {
			width: 1920,
			height: 1080,
		}
	}
}

/// Resolved attributes of a checkout frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameAttributes {
	pub width: String,
	pub height: String,
	pub class_name: Option<String>,
	pub allow: String,
}

/// Target surface a session was presented in.
pub enum Surface<P: Platform> {
	Popup(P::Window),
	Frame(P::Frame),
}

impl<P: Platform> Clone for Surface<P> {
	fn clone(&self) -> Self {
		match self {
			Surface::Popup(window) => Surface::Popup(window.clone()),
			Surface::Frame(frame) => Surface::Frame(frame.clone()),
		}
	}
}

impl<P: Platform> std::fmt::Debug for Surface<P> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Surface::Popup(_) => f.write_str("Surface::Popup"),
			Surface::Frame(_) => f.write_str("Surface::Frame"),
		}
	}
}

/// Browser primitives consumed by the session engine.
pub trait Platform: Sized + 'static {
	/// Caller-owned element a frame is mounted into.
	type Element;
	/// Popup browsing context.
	type Window: Clone;
	/// Mounted frame; also handed back to the caller.
	type Frame: Clone;
	/// Channel end retained by the host.
	type Port;
	/// Channel end transferred to the remote surface.
	type TransferPort;
	/// Registration of a global message listener.
	type Listener;
	/// Registration of a recurring timer.
	type Interval;

	fn available_screen(&self) -> ScreenArea;

	/// Opens a top-level browsing context. `None` means the browser refused
	/// (typically a popup blocker).
	fn open_popup(&self, url: &Url, name: &str, features: &str) -> Option<Self::Window>;

	fn popup_closed(&self, window: &Self::Window) -> bool;

	fn close_popup(&self, window: &Self::Window);

	/// Removes every child of `host`.
	fn clear_host(&self, host: &Self::Element);

	/// Creates a frame pointed at `url` and appends it to `host`.
	fn mount_frame(
		&self,
		host: &Self::Element,
		url: &Url,
		attrs: &FrameAttributes,
	) -> Result<Self::Frame, HostError>;

	fn remove_frame(&self, frame: &Self::Frame);

	/// Replaces the current document.
	fn navigate(&self, url: &Url) -> Result<(), HostError>;

	/// Registers a listener for every window message delivered to the page.
	fn listen(&self, handler: WindowMessageHandler) -> Result<Self::Listener, HostError>;

	fn unlisten(&self, listener: Self::Listener);

	/// Allocates a two-ended private channel.
	fn open_channel(&self) -> Result<(Self::Port, Self::TransferPort), HostError>;

	fn on_port_message(&self, port: &Self::Port, handler: PortMessageHandler);

	fn close_port(&self, port: Self::Port);

	/// Posts `message` to the surface's browsing context, restricted to
	/// `target_origin`, transferring `transfer` along with it.
	fn post_message(
		&self,
		target: &Surface<Self>,
		message: &Value,
		target_origin: &str,
		transfer: Self::TransferPort,
	) -> Result<(), HostError>;

	fn set_interval(&self, period: Duration, tick: TickHandler) -> Result<Self::Interval, HostError>;

	fn clear_interval(&self, interval: Self::Interval);
}
