//! In-memory platform for unit testing the session engine.
//!
//! Records every primitive call and lets a test play the remote surface
//! without a browser. Clones share state, so a test keeps one clone as the
//! controller and hands another to the orchestrator.
//!
//! # Example
//!
//! ```ignore
//! let platform = FakePlatform::new();
//! let orchestrator = Orchestrator::new(platform.clone());
//!
//! let started = orchestrator.start(config)?;
//! platform.deliver_window_message("https://pay.example.com", json!({"type": "READY"}));
//! platform.deliver_port_message(json!({"type": "PAYMENT_COMPLETED", "status": "COMPLETE"}));
//! ```

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use url::Url;

use super::{
	FrameAttributes, HostError, Platform, PortMessageHandler, ScreenArea, Surface, TickHandler, WindowMessage,
	WindowMessageHandler,
};

/// Host element owned by the test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FakeElement(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FakeWindow(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FakeFrame(pub u32);

#[derive(Debug, PartialEq, Eq)]
pub struct FakePort(pub u32);

/// Deliberately not `Clone`: once posted it is gone.
#[derive(Debug, PartialEq, Eq)]
pub struct FakeTransferPort(pub u32);

#[derive(Debug, PartialEq, Eq)]
pub struct FakeListener(pub u32);

#[derive(Debug, PartialEq, Eq)]
pub struct FakeInterval(pub u32);

/// Popup opened through [`Platform::open_popup`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PopupRecord {
	pub id: u32,
	pub url: String,
	pub name: String,
	pub features: String,
	pub closed: bool,
	/// Closed by [`FakePlatform::close_popup_by_user`] rather than the host.
	pub closed_by_user: bool,
}

/// Frame mounted through [`Platform::mount_frame`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameRecord {
	pub id: u32,
	pub host: u32,
	pub url: String,
	pub width: String,
	pub height: String,
	pub class_name: Option<String>,
	pub allow: String,
	pub removed: bool,
}

/// Destination of a posted message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum PostTarget {
	Popup(u32),
	Frame(u32),
}

/// Message captured by [`Platform::post_message`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostedMessage {
	pub target: PostTarget,
	pub message: Value,
	pub target_origin: String,
	pub transferred: Vec<u32>,
}

struct PortRecord {
	handler: Option<PortMessageHandler>,
	closed: bool,
}

struct IntervalRecord {
	period: Duration,
	tick: TickHandler,
}

#[derive(Default)]
struct Failures {
	block_popups: bool,
	mount: bool,
	navigation: bool,
	listen: bool,
	channel: bool,
	post: bool,
	interval: bool,
}

#[derive(Default)]
struct FakeState {
	next_id: u32,
	screen: ScreenArea,
	failures: Failures,
	popups: Vec<PopupRecord>,
	hosts: BTreeMap<u32, Vec<String>>,
	frames: Vec<FrameRecord>,
	navigations: Vec<String>,
	listeners: BTreeMap<u32, WindowMessageHandler>,
	removed_listeners: Vec<WindowMessageHandler>,
	ports: BTreeMap<u32, PortRecord>,
	posted: Vec<PostedMessage>,
	intervals: BTreeMap<u32, IntervalRecord>,
	calls: Vec<String>,
}

impl FakeState {
	fn next_id(&mut self) -> u32 {
		self.next_id += 1;
		self.next_id
	}
}

/// In-memory [`Platform`] with a controller surface for tests.
#[derive(Clone, Default)]
pub struct FakePlatform {
	state: Rc<RefCell<FakeState>>,
}

impl FakePlatform {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_screen(self, width: u32, height: u32) -> Self {
		self.state.borrow_mut().screen = ScreenArea { width, height };
		self
	}

	/// Creates a host element already holding `children` nodes.
	pub fn create_host(&self, children: usize) -> FakeElement {
		let mut state = self.state.borrow_mut();
		let id = state.next_id();
		let nodes = (0..children).map(|i| format!("node#{i}")).collect();
		state.hosts.insert(id, nodes);
		FakeElement(id)
	}

	pub fn set_block_popups(&self, block: bool) {
		self.state.borrow_mut().failures.block_popups = block;
	}

	pub fn set_fail_mount(&self, fail: bool) {
		self.state.borrow_mut().failures.mount = fail;
	}

	pub fn set_fail_navigation(&self, fail: bool) {
		self.state.borrow_mut().failures.navigation = fail;
	}

	pub fn set_fail_listen(&self, fail: bool) {
		self.state.borrow_mut().failures.listen = fail;
	}

	pub fn set_fail_channel(&self, fail: bool) {
		self.state.borrow_mut().failures.channel = fail;
	}

	pub fn set_fail_post(&self, fail: bool) {
		self.state.borrow_mut().failures.post = fail;
	}

	pub fn set_fail_interval(&self, fail: bool) {
		self.state.borrow_mut().failures.interval = fail;
	}

	/// Delivers a window message to every live listener, in registration
	/// order. Returns how many listeners received it.
	pub fn deliver_window_message(&self, origin: &str, data: Value) -> usize {
		let handlers: Vec<_> = self.state.borrow().listeners.values().cloned().collect();
		let message = WindowMessage::new(origin, data);
		for handler in &handlers {
			handler(message.clone());
		}
		handlers.len()
	}

	/// Invokes listeners that were already removed, simulating an event that
	/// was queued before the removal took effect.
	pub fn deliver_to_removed_listeners(&self, origin: &str, data: Value) -> usize {
		let handlers = self.state.borrow().removed_listeners.clone();
		let message = WindowMessage::new(origin, data);
		for handler in &handlers {
			handler(message.clone());
		}
		handlers.len()
	}

	/// Delivers `data` on the most recently opened channel, as if the remote
	/// posted it through the transferred end. Returns `false` when that port
	/// is closed or has no handler.
	pub fn deliver_port_message(&self, data: Value) -> bool {
		let latest = self.state.borrow().ports.keys().next_back().copied();
		match latest {
			Some(id) => self.deliver_port_message_to(id, data),
			None => false,
		}
	}

	pub fn deliver_port_message_to(&self, port: u32, data: Value) -> bool {
		let handler = {
			let state = self.state.borrow();
			match state.ports.get(&port) {
				Some(record) if !record.closed => record.handler.clone(),
				_ => None,
			}
		};
		match handler {
			Some(handler) => {
				handler(data);
				true
			}
			None => false,
		}
	}

	/// Fires every live interval once. Returns how many fired.
	pub fn tick(&self) -> usize {
		let ticks: Vec<_> = self.state.borrow().intervals.values().map(|r| Rc::clone(&r.tick)).collect();
		for tick in &ticks {
			tick();
		}
		ticks.len()
	}

	pub fn close_popup_by_user(&self, id: u32) {
		let mut state = self.state.borrow_mut();
		if let Some(popup) = state.popups.iter_mut().find(|p| p.id == id) {
			popup.closed = true;
			popup.closed_by_user = true;
		}
	}

	pub fn popups(&self) -> Vec<PopupRecord> {
		self.state.borrow().popups.clone()
	}

	pub fn latest_popup(&self) -> Option<PopupRecord> {
		self.state.borrow().popups.last().cloned()
	}

	pub fn frames(&self) -> Vec<FrameRecord> {
		self.state.borrow().frames.clone()
	}

	pub fn host_children(&self, host: &FakeElement) -> Vec<String> {
		self.state.borrow().hosts.get(&host.0).cloned().unwrap_or_default()
	}

	pub fn navigations(&self) -> Vec<String> {
		self.state.borrow().navigations.clone()
	}

	pub fn posted(&self) -> Vec<PostedMessage> {
		self.state.borrow().posted.clone()
	}

	pub fn live_listeners(&self) -> usize {
		self.state.borrow().listeners.len()
	}

	pub fn live_intervals(&self) -> usize {
		self.state.borrow().intervals.len()
	}

	pub fn interval_periods(&self) -> Vec<Duration> {
		self.state.borrow().intervals.values().map(|r| r.period).collect()
	}

	pub fn open_ports(&self) -> usize {
		self.state.borrow().ports.values().filter(|p| !p.closed).count()
	}

	pub fn channels_opened(&self) -> usize {
		self.state.borrow().ports.len()
	}

	/// Ordered log of primitive calls, e.g. `open_popup:3`, `close_popup:3`.
	pub fn calls(&self) -> Vec<String> {
		self.state.borrow().calls.clone()
	}

	/// Position of the first call equal to `call`.
	pub fn call_index(&self, call: &str) -> Option<usize> {
		self.state.borrow().calls.iter().position(|c| c == call)
	}

	/// `true` when no listener, interval, open port, open popup or mounted
	/// frame remains.
	pub fn is_quiescent(&self) -> bool {
		let state = self.state.borrow();
		state.listeners.is_empty()
			&& state.intervals.is_empty()
			&& state.ports.values().all(|p| p.closed)
			&& state.popups.iter().all(|p| p.closed)
			&& state.frames.iter().all(|f| f.removed)
	}
}

impl Platform for FakePlatform {
	type Element = FakeElement;
	type Window = FakeWindow;
	type Frame = FakeFrame;
	type Port = FakePort;
	type TransferPort = FakeTransferPort;
	type Listener = FakeListener;
	type Interval = FakeInterval;

	fn available_screen(&self) -> ScreenArea {
		self.state.borrow().screen
	}

	fn open_popup(&self, url: &Url, name: &str, features: &str) -> Option<FakeWindow> {
		let mut state = self.state.borrow_mut();
		if state.failures.block_popups {
			state.calls.push("open_popup:blocked".to_string());
			return None;
		}
		let id = state.next_id();
		state.popups.push(PopupRecord {
			id,
			url: url.to_string(),
			name: name.to_string(),
			features: features.to_string(),
			closed: false,
			closed_by_user: false,
		});
		state.calls.push(format!("open_popup:{id}"));
		Some(FakeWindow(id))
	}

	fn popup_closed(&self, window: &FakeWindow) -> bool {
		self.state.borrow().popups.iter().find(|p| p.id == window.0).is_none_or(|p| p.closed)
	}

	fn close_popup(&self, window: &FakeWindow) {
		let mut state = self.state.borrow_mut();
		if let Some(popup) = state.popups.iter_mut().find(|p| p.id == window.0) {
			popup.closed = true;
		}
		state.calls.push(format!("close_popup:{}", window.0));
	}

	fn clear_host(&self, host: &FakeElement) {
		let mut state = self.state.borrow_mut();
		let removed: Vec<String> = state.hosts.get_mut(&host.0).map(std::mem::take).unwrap_or_default();
		for frame in state.frames.iter_mut().filter(|f| f.host == host.0) {
			if removed.contains(&format!("frame#{}", frame.id)) {
				frame.removed = true;
			}
		}
		state.calls.push(format!("clear_host:{}", host.0));
	}

	fn mount_frame(&self, host: &FakeElement, url: &Url, attrs: &FrameAttributes) -> Result<FakeFrame, HostError> {
		let mut state = self.state.borrow_mut();
		if state.failures.mount {
			return Err(HostError::new("frame element could not be created"));
		}
		if !state.hosts.contains_key(&host.0) {
			return Err(HostError::new(format!("host element {} does not exist", host.0)));
		}
		let id = state.next_id();
		state.frames.push(FrameRecord {
			id,
			host: host.0,
			url: url.to_string(),
			width: attrs.width.clone(),
			height: attrs.height.clone(),
			class_name: attrs.class_name.clone(),
			allow: attrs.allow.clone(),
			removed: false,
		});
		if let Some(children) = state.hosts.get_mut(&host.0) {
			children.push(format!("frame#{id}"));
		}
		state.calls.push(format!("mount_frame:{id}"));
		Ok(FakeFrame(id))
	}

	fn remove_frame(&self, frame: &FakeFrame) {
		let mut state = self.state.borrow_mut();
		let label = format!("frame#{}", frame.0);
		let mut host_id = None;
		if let Some(record) = state.frames.iter_mut().find(|f| f.id == frame.0) {
			record.removed = true;
			host_id = Some(record.host);
		}
		if let Some(children) = host_id.and_then(|id| state.hosts.get_mut(&id)) {
			children.retain(|child| *child != label);
		}
		state.calls.push(format!("remove_frame:{}", frame.0));
	}

	fn navigate(&self, url: &Url) -> Result<(), HostError> {
		let mut state = self.state.borrow_mut();
		if state.failures.navigation {
			return Err(HostError::new("navigation refused"));
		}
		state.navigations.push(url.to_string());
		state.calls.push("navigate".to_string());
		Ok(())
	}

	fn listen(&self, handler: WindowMessageHandler) -> Result<FakeListener, HostError> {
		let mut state = self.state.borrow_mut();
		if state.failures.listen {
			return Err(HostError::new("listener registration refused"));
		}
		let id = state.next_id();
		state.listeners.insert(id, handler);
		state.calls.push(format!("listen:{id}"));
		Ok(FakeListener(id))
	}

	fn unlisten(&self, listener: FakeListener) {
		let mut state = self.state.borrow_mut();
		if let Some(handler) = state.listeners.remove(&listener.0) {
			state.removed_listeners.push(handler);
		}
		state.calls.push(format!("unlisten:{}", listener.0));
	}

	fn open_channel(&self) -> Result<(FakePort, FakeTransferPort), HostError> {
		let mut state = self.state.borrow_mut();
		if state.failures.channel {
			return Err(HostError::new("MessageChannel unavailable"));
		}
		let retained = state.next_id();
		let transferred = state.next_id();
		state.ports.insert(
			retained,
			PortRecord {
				handler: None,
				closed: false,
			},
		);
		state.calls.push(format!("open_channel:{retained}"));
		Ok((FakePort(retained), FakeTransferPort(transferred)))
	}

	fn on_port_message(&self, port: &FakePort, handler: PortMessageHandler) {
		if let Some(record) = self.state.borrow_mut().ports.get_mut(&port.0) {
			record.handler = Some(handler);
		}
	}

	fn close_port(&self, port: FakePort) {
		let mut state = self.state.borrow_mut();
		if let Some(record) = state.ports.get_mut(&port.0) {
			record.closed = true;
			record.handler = None;
		}
		state.calls.push(format!("close_port:{}", port.0));
	}

	fn post_message(
		&self,
		target: &Surface<Self>,
		message: &Value,
		target_origin: &str,
		transfer: FakeTransferPort,
	) -> Result<(), HostError> {
		let mut state = self.state.borrow_mut();
		if state.failures.post {
			return Err(HostError::new("DataCloneError: port could not be transferred"));
		}
		let target = match target {
			Surface::Popup(window) => PostTarget::Popup(window.0),
			Surface::Frame(frame) => PostTarget::Frame(frame.0),
		};
		state.posted.push(PostedMessage {
			target,
			message: message.clone(),
			target_origin: target_origin.to_string(),
			transferred: vec![transfer.0],
		});
		state.calls.push("post_message".to_string());
		Ok(())
	}

	fn set_interval(&self, period: Duration, tick: TickHandler) -> Result<FakeInterval, HostError> {
		let mut state = self.state.borrow_mut();
		if state.failures.interval {
			return Err(HostError::new("timer quota exceeded"));
		}
		let id = state.next_id();
		state.intervals.insert(id, IntervalRecord { period, tick });
		state.calls.push(format!("set_interval:{id}"));
		Ok(FakeInterval(id))
	}

	fn clear_interval(&self, interval: FakeInterval) {
		let mut state = self.state.borrow_mut();
		state.intervals.remove(&interval.0);
		state.calls.push(format!("clear_interval:{}", interval.0));
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;
	use std::cell::Cell;

	#[test]
	fn clear_host_drops_existing_children() {
		let platform = FakePlatform::new();
		let host = platform.create_host(2);
		assert_eq!(platform.host_children(&host).len(), 2);

		platform.clear_host(&host);
		assert!(platform.host_children(&host).is_empty());
	}

	#[test]
	fn removed_listeners_stop_receiving() {
		let platform = FakePlatform::new();
		let hits = Rc::new(Cell::new(0));
		let counter = Rc::clone(&hits);
		let listener = platform.listen(Rc::new(move |_| counter.set(counter.get() + 1))).unwrap();

		assert_eq!(platform.deliver_window_message("https://a.test", json!({})), 1);
		platform.unlisten(listener);
		assert_eq!(platform.deliver_window_message("https://a.test", json!({})), 0);
		assert_eq!(hits.get(), 1);
	}

	#[test]
	fn closed_ports_do_not_deliver() {
		let platform = FakePlatform::new();
		let (port, _transfer) = platform.open_channel().unwrap();
		platform.on_port_message(&port, Rc::new(|_| {}));
		assert!(platform.deliver_port_message(json!({})));

		platform.close_port(port);
		assert!(!platform.deliver_port_message(json!({})));
		assert_eq!(platform.open_ports(), 0);
	}

	#[test]
	fn blocked_popups_return_none() {
		let platform = FakePlatform::new();
		platform.set_block_popups(true);
		let url = Url::parse("https://pay.example.com/s/1").unwrap();
		assert!(platform.open_popup(&url, "x", "").is_none());
		assert!(platform.popups().is_empty());
	}
}
