#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use paybridge::platform::fake::{FakeElement, FakePlatform};
use paybridge::{CallbackSet, CredentialPair, Display, Error, FrameOptions, PopupOptions, SessionConfig, Success};

pub const URL: &str = "https://pay.example.com/s/123";
pub const ORIGIN: &str = "https://pay.example.com";

/// Callback invocation captured by [`Recorder`].
#[derive(Debug, Clone, PartialEq)]
pub enum Fired {
	Success(Success),
	Cancel,
	Error(Error),
}

/// Collects every callback fired for the sessions it is attached to.
#[derive(Clone, Default)]
pub struct Recorder {
	fired: Rc<RefCell<Vec<Fired>>>,
}

impl Recorder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn callbacks(&self) -> CallbackSet {
		let (s, c, e) = (self.clone(), self.clone(), self.clone());
		CallbackSet::default()
			.on_success(move |success| s.push(Fired::Success(success)))
			.on_cancel(move || c.push(Fired::Cancel))
			.on_error(move |err| e.push(Fired::Error(err.clone())))
	}

	pub fn fired(&self) -> Vec<Fired> {
		self.fired.borrow().clone()
	}

	fn push(&self, fired: Fired) {
		self.fired.borrow_mut().push(fired);
	}
}

pub fn credentials() -> CredentialPair {
	CredentialPair::new("tok_a", "tok_c")
}

pub fn popup_payment(recorder: &Recorder) -> SessionConfig<FakeElement> {
	SessionConfig::payment(URL, credentials(), Display::Popup(PopupOptions::default())).with_callbacks(recorder.callbacks())
}

pub fn frame_setup(recorder: &Recorder, host: FakeElement) -> SessionConfig<FakeElement> {
	SessionConfig::setup(URL, credentials(), Display::Frame(FrameOptions::new(host))).with_callbacks(recorder.callbacks())
}

pub fn init_tracing() {
	let _ = tracing_subscriber::fmt().with_test_writer().with_max_level(tracing::Level::DEBUG).try_init();
}

pub fn ready() -> serde_json::Value {
	serde_json::json!({"type": "READY"})
}

/// Convenience for tests that only need the platform handle.
pub fn platform() -> FakePlatform {
	init_tracing();
	FakePlatform::new()
}
