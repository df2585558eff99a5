use std::cell::RefCell;
use std::rc::Rc;

use paybridge_protocol::{HostMessage, InitPayload};
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use url::Url;

use super::outcome::{Completion, Outcome, SessionId, SessionState, Started};
use crate::config::{
	CallbackSet, CredentialPair, Display, FrameOptions, OrchestratorOptions, PopupOptions, SessionConfig, SessionKind,
};
use crate::display::{frame, popup, redirect};
use crate::error::{Error, Result};
use crate::handshake::{Handshake, Step, Via};
use crate::origin::ExpectedOrigin;
use crate::platform::{HostError, Platform, Surface, TickHandler, WindowMessage, WindowMessageHandler};
use crate::registry::Resources;

/// Drives one credential-handshake session at a time.
///
/// Cheap to clone; clones share the same session. Single-threaded: every
/// entry point, including re-entrant calls from inside a terminal callback,
/// runs on the thread that owns the platform.
///
/// # Lifecycle
///
/// 1. [`start`](Self::start) validates the config, tears down any previous
///    session, installs the origin-gated window listener and acquires the
///    surface.
/// 2. `READY` from the expected origin opens the private channel and posts
///    `INIT` with the credentials and one transferred channel end.
/// 3. The first outcome (channel or window listener), or the user closing
///    the popup, releases every resource and then fires exactly one
///    callback.
///
/// # Example
///
/// ```ignore
/// let orchestrator = Orchestrator::new(platform);
/// let started = orchestrator.start(
///     SessionConfig::payment(url, CredentialPair::new(access, csrf), Display::Popup(Default::default()))
///         .on_success(|success| println!("paid: {success:?}"))
///         .on_cancel(|| println!("canceled")),
/// )?;
/// let outcome = started.into_completion().unwrap().await?;
/// ```
pub struct Orchestrator<P: Platform> {
	inner: Rc<Inner<P>>,
}

impl<P: Platform> Clone for Orchestrator<P> {
	fn clone(&self) -> Self {
		Self {
			inner: Rc::clone(&self.inner),
		}
	}
}

struct Inner<P: Platform> {
	platform: P,
	options: OrchestratorOptions,
	core: RefCell<Core<P>>,
}

struct Core<P: Platform> {
	disposed: bool,
	last_id: u64,
	state: SessionState,
	session: Option<ActiveSession<P>>,
}

impl<P: Platform> Core<P> {
	fn current(&self, id: SessionId) -> Option<&ActiveSession<P>> {
		self.session.as_ref().filter(|session| session.id == id)
	}

	fn current_mut(&mut self, id: SessionId) -> Option<&mut ActiveSession<P>> {
		self.session.as_mut().filter(|session| session.id == id)
	}
}

struct ActiveSession<P: Platform> {
	id: SessionId,
	kind: SessionKind,
	debug: bool,
	handshake: Handshake,
	credentials: CredentialPair,
	callbacks: CallbackSet,
	completion: oneshot::Sender<Result<Outcome>>,
	resources: Resources<P>,
}

impl<P: Platform> ActiveSession<P> {
	/// Releases every resource and clears the credentials. Shared by every
	/// teardown path; a second call finds nothing left to release.
	fn release(&mut self, platform: &P) {
		self.handshake.abort();
		std::mem::take(&mut self.resources).release(platform);
		self.credentials.clear();
	}
}

/// Display modes that keep a live surface.
enum Interactive<E> {
	Popup(PopupOptions),
	Frame(FrameOptions<E>),
}

impl<P: Platform> Orchestrator<P> {
	pub fn new(platform: P) -> Self {
		Self::with_options(platform, OrchestratorOptions::default())
	}

	pub fn with_options(platform: P, options: OrchestratorOptions) -> Self {
		Self {
			inner: Rc::new(Inner {
				platform,
				options,
				core: RefCell::new(Core {
					disposed: false,
					last_id: 0,
					state: SessionState::Idle,
					session: None,
				}),
			}),
		}
	}

	pub fn platform(&self) -> &P {
		&self.inner.platform
	}

	pub fn options(&self) -> &OrchestratorOptions {
		&self.inner.options
	}

	/// `true` while an interactive session holds resources.
	pub fn is_active(&self) -> bool {
		let core = self.inner.core.borrow();
		!core.disposed && core.session.is_some()
	}

	pub fn state(&self) -> SessionState {
		self.inner.core.borrow().state
	}

	/// Id of the active session, if any.
	pub fn session_id(&self) -> Option<SessionId> {
		self.inner.core.borrow().session.as_ref().map(|session| session.id)
	}

	pub fn is_disposed(&self) -> bool {
		self.inner.core.borrow().disposed
	}

	/// Starts a session, superseding any session still in flight.
	///
	/// Configuration errors are returned before anything is allocated and
	/// are also passed to `on_error`. Acquisition errors (popup blocked,
	/// frame mount failure) release whatever was allocated, call `on_error`
	/// and are returned. Redirect sessions return once the navigation is
	/// issued and never invoke a callback.
	pub fn start(&self, config: SessionConfig<P::Element>) -> Result<Started<P>> {
		if self.is_disposed() {
			return Err(Error::Disposed);
		}

		let SessionConfig {
			kind,
			url,
			mut credentials,
			display,
			callbacks,
			debug,
		} = config;

		let mode = display.label();
		let (url, origin) = match validate(&url, &credentials) {
			Ok(resolved) => resolved,
			Err(err) => {
				warn!(target: "paybridge.session", %kind, mode, error = %err, "session config rejected");
				credentials.clear();
				callbacks.fire_error(&err);
				return Err(err);
			}
		};

		self.inner.abandon("superseded");

		let id = {
			let mut core = self.inner.core.borrow_mut();
			core.last_id += 1;
			core.state = SessionState::Initiating;
			SessionId(core.last_id)
		};
		if debug {
			info!(target: "paybridge.session", session = %id, %kind, mode, origin = %origin, "starting session");
		} else {
			debug!(target: "paybridge.session", session = %id, %kind, mode, origin = %origin, "starting session");
		}

		let interactive = match display {
			Display::Redirect => {
				credentials.clear();
				let navigated = redirect::navigate(&self.inner.platform, &url);
				self.inner.core.borrow_mut().state = SessionState::Idle;
				return navigated.map(|()| Started::Redirected);
			}
			Display::Popup(options) => Interactive::Popup(options),
			Display::Frame(options) => Interactive::Frame(options),
		};

		let mut resources = Resources::default();
		let frame = match self.acquire(id, &url, interactive, &mut resources) {
			Ok(frame) => frame,
			Err(err) => {
				resources.release(&self.inner.platform);
				credentials.clear();
				self.inner.core.borrow_mut().state = SessionState::Idle;
				warn!(target: "paybridge.session", session = %id, mode, error = %err, "surface acquisition failed");
				callbacks.fire_error(&err);
				return Err(err);
			}
		};

		let (completion_tx, completion) = Completion::channel();
		{
			let mut core = self.inner.core.borrow_mut();
			core.session = Some(ActiveSession {
				id,
				kind,
				debug,
				handshake: Handshake::new(kind, origin),
				credentials,
				callbacks,
				completion: completion_tx,
				resources,
			});
			core.state = SessionState::AwaitingReady;
		}

		Ok(match frame {
			Some(frame) => Started::Frame { id, frame, completion },
			None => Started::Popup { id, completion },
		})
	}

	/// Releases the active session's resources without invoking callbacks.
	/// Idempotent.
	pub fn cleanup(&self) -> Result<()> {
		if self.is_disposed() {
			return Err(Error::Disposed);
		}
		self.inner.abandon("cleanup");
		Ok(())
	}

	/// Cleans up and permanently disables this orchestrator.
	pub fn destroy(&self) -> Result<()> {
		if self.is_disposed() {
			return Err(Error::Disposed);
		}
		self.inner.abandon("destroy");
		self.inner.core.borrow_mut().disposed = true;
		debug!(target: "paybridge.session", "orchestrator destroyed");
		Ok(())
	}

	/// Installs the window listener, then acquires the surface. Everything
	/// allocated is recorded in `resources` as it is allocated, so the
	/// caller can release a partial set on failure.
	fn acquire(
		&self,
		id: SessionId,
		url: &Url,
		mode: Interactive<P::Element>,
		resources: &mut Resources<P>,
	) -> Result<Option<P::Frame>> {
		let inner = &self.inner;
		let platform = &inner.platform;

		let weak = Rc::downgrade(inner);
		let handler: WindowMessageHandler = Rc::new(move |message| {
			if let Some(inner) = weak.upgrade() {
				inner.on_window_message(id, message);
			}
		});
		resources.listener = Some(platform.listen(handler).map_err(Error::ListenerInstall)?);

		match mode {
			Interactive::Popup(options) => {
				let window = popup::open(platform, url, &options, &inner.options.popup)?;
				resources.surface = Some(Surface::Popup(window));

				let weak = Rc::downgrade(inner);
				let tick: TickHandler = Rc::new(move || {
					if let Some(inner) = weak.upgrade() {
						inner.poll_popup(id);
					}
				});
				let interval = platform.set_interval(inner.options.poll_interval(), tick).map_err(Error::WatcherInstall)?;
				resources.interval = Some(interval);
				Ok(None)
			}
			Interactive::Frame(options) => {
				let frame = frame::mount(platform, url, &options, &inner.options.frame)?;
				resources.surface = Some(Surface::Frame(frame.clone()));
				Ok(Some(frame))
			}
		}
	}
}

impl<P: Platform> Inner<P> {
	fn on_window_message(self: &Rc<Self>, id: SessionId, message: WindowMessage) {
		let step = {
			let mut core = self.core.borrow_mut();
			let Some(session) = core.current_mut(id) else {
				debug!(target: "paybridge.handshake", session = %id, "window message for inactive session dropped");
				return;
			};
			log_inbound(session.debug, id, Via::Window, &message.origin, &message.data);
			session.handshake.on_window_message(&message)
		};
		self.apply(id, step, Via::Window);
	}

	fn on_channel_message(self: &Rc<Self>, id: SessionId, data: Value) {
		let step = {
			let mut core = self.core.borrow_mut();
			let Some(session) = core.current_mut(id) else {
				debug!(target: "paybridge.handshake", session = %id, "channel message for inactive session dropped");
				return;
			};
			log_inbound(session.debug, id, Via::Channel, "channel", &data);
			session.handshake.on_channel_message(&data)
		};
		self.apply(id, step, Via::Channel);
	}

	fn apply(self: &Rc<Self>, id: SessionId, step: Step, via: Via) {
		match step {
			Step::Ignore(reason) => {
				debug!(target: "paybridge.handshake", session = %id, ?via, ?reason, "message ignored");
			}
			Step::DeliverCredentials => self.deliver_credentials(id),
			Step::Finish(outcome) => self.finish(id, Ok(outcome)),
		}
	}

	/// Opens the private channel and posts `INIT` to the surface.
	fn deliver_credentials(self: &Rc<Self>, id: SessionId) {
		self.core.borrow_mut().state = SessionState::Handshaking;

		let (port, transfer) = match self.platform.open_channel() {
			Ok(pair) => pair,
			Err(err) => return self.finish(id, Err(Error::ChannelOpen(err))),
		};

		let weak = Rc::downgrade(self);
		self.platform.on_port_message(
			&port,
			Rc::new(move |data| {
				if let Some(inner) = weak.upgrade() {
					inner.on_channel_message(id, data);
				}
			}),
		);

		let mut port = Some(port);
		let prepared = {
			let mut core = self.core.borrow_mut();
			core.current_mut(id).map(|session| {
				session.resources.port = port.take();
				(
					session.resources.surface().cloned(),
					init_message(&session.credentials),
					session.handshake.origin().as_str().to_owned(),
				)
			})
		};

		let Some((surface, message, target_origin)) = prepared else {
			if let Some(port) = port {
				self.platform.close_port(port);
			}
			return;
		};
		let mut message = match message {
			Ok(message) => message,
			Err(err) => return self.finish(id, Err(Error::InitDelivery(HostError::new(err.to_string())))),
		};
		let posted = match surface {
			Some(surface) => self.platform.post_message(&surface, &message, &target_origin, transfer),
			None => Err(HostError::new("session has no target surface")),
		};
		scrub_init(&mut message);

		match posted {
			Ok(()) => debug!(target: "paybridge.handshake", session = %id, origin = %target_origin, "credentials delivered"),
			Err(err) => self.finish(id, Err(Error::InitDelivery(err))),
		}
	}

	fn poll_popup(self: &Rc<Self>, id: SessionId) {
		let window = {
			let core = self.core.borrow();
			match core.current(id).and_then(|session| session.resources.surface()) {
				Some(Surface::Popup(window)) => window.clone(),
				_ => return,
			}
		};
		if self.platform.popup_closed(&window) {
			debug!(target: "paybridge.session", session = %id, "popup closed by user");
			self.finish(id, Ok(Outcome::Canceled));
		}
	}

	/// Ends session `id`: releases its resources, then fires its single
	/// callback and resolves its completion. A no-op unless `id` is still the
	/// active session, which makes this the terminal guard for both delivery
	/// paths and the close poll.
	fn finish(&self, id: SessionId, termination: Result<Outcome>) {
		let session = {
			let mut core = self.core.borrow_mut();
			if core.current(id).is_none() {
				debug!(target: "paybridge.session", session = %id, "terminal dispatch for inactive session dropped");
				return;
			}
			core.state = match &termination {
				Ok(outcome) => outcome.state(),
				Err(_) => SessionState::Errored,
			};
			core.session.take()
		};
		let Some(mut session) = session else {
			return;
		};
		session.release(&self.platform);
		let ActiveSession {
			kind,
			callbacks,
			completion,
			..
		} = session;

		match &termination {
			Ok(outcome) => info!(target: "paybridge.session", session = %id, %kind, outcome = outcome_label(outcome), "session finished"),
			Err(err) => warn!(target: "paybridge.session", session = %id, %kind, error = %err, "session failed"),
		}

		callbacks.dispatch(&termination);
		let _ = completion.send(termination);

		let mut core = self.core.borrow_mut();
		if core.session.is_none() && core.state.is_terminal() && core.last_id == id.0 {
			core.state = SessionState::Idle;
		}
	}

	/// Tears down the active session without a terminal dispatch. Its
	/// completion resolves to [`Error::Ended`].
	fn abandon(&self, reason: &'static str) {
		let session = {
			let mut core = self.core.borrow_mut();
			core.state = SessionState::Idle;
			core.session.take()
		};
		if let Some(mut session) = session {
			session.release(&self.platform);
			debug!(target: "paybridge.session", session = %session.id, reason, "session torn down");
		}
	}
}

impl<P: Platform> Drop for Inner<P> {
	fn drop(&mut self) {
		if let Some(mut session) = self.core.get_mut().session.take() {
			session.release(&self.platform);
		}
	}
}

fn validate(raw_url: &str, credentials: &CredentialPair) -> Result<(Url, ExpectedOrigin)> {
	let resolved = ExpectedOrigin::parse(raw_url)?;
	credentials.validate()?;
	Ok(resolved)
}

/// Serializes `INIT`. The intermediate payload copy is cleared before it
/// is dropped.
fn init_message(credentials: &CredentialPair) -> serde_json::Result<Value> {
	let message = HostMessage::Init(InitPayload {
		access_token: credentials.access_token().to_owned(),
		csrf_token: credentials.csrf_token().to_owned(),
	});
	let value = serde_json::to_value(&message);
	let HostMessage::Init(mut payload) = message;
	payload.access_token.clear();
	payload.csrf_token.clear();
	value
}

/// Empties the token strings of a serialized `INIT` once it is posted.
fn scrub_init(message: &mut Value) {
	for field in ["accessToken", "csrfToken"] {
		if let Some(Value::String(token)) = message.get_mut(field) {
			token.clear();
		}
	}
}

fn outcome_label(outcome: &Outcome) -> &'static str {
	match outcome {
		Outcome::Completed(_) => "completed",
		Outcome::MethodAdded(_) => "method_added",
		Outcome::Canceled => "canceled",
	}
}

fn log_inbound(debug: bool, id: SessionId, via: Via, origin: &str, data: &Value) {
	let message_type = data.get("type").and_then(Value::as_str).unwrap_or("<none>");
	if debug {
		info!(target: "paybridge.handshake", session = %id, ?via, origin, message_type, "inbound message");
	} else {
		debug!(target: "paybridge.handshake", session = %id, ?via, origin, message_type, "inbound message");
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::platform::fake::FakePlatform;
	use serde_json::json;

	const URL: &str = "https://pay.example.com/s/123";
	const ORIGIN: &str = "https://pay.example.com";

	fn popup_config() -> SessionConfig<<FakePlatform as Platform>::Element> {
		SessionConfig::payment(URL, CredentialPair::new("tok_a", "tok_c"), Display::Popup(PopupOptions::default()))
	}

	#[test]
	fn state_walks_through_handshake() {
		let platform = FakePlatform::new();
		let orchestrator = Orchestrator::new(platform.clone());
		assert_eq!(orchestrator.state(), SessionState::Idle);

		let _started = orchestrator.start(popup_config()).unwrap();
		assert_eq!(orchestrator.state(), SessionState::AwaitingReady);

		platform.deliver_window_message(ORIGIN, json!({"type": "READY"}));
		assert_eq!(orchestrator.state(), SessionState::Handshaking);

		platform.deliver_port_message(json!({"type": "PAYMENT_COMPLETED", "status": "COMPLETE"}));
		assert_eq!(orchestrator.state(), SessionState::Idle);
		assert!(!orchestrator.is_active());
	}

	#[test]
	fn terminal_state_is_visible_inside_callback() {
		let platform = FakePlatform::new();
		let orchestrator = Orchestrator::new(platform.clone());
		let seen = Rc::new(RefCell::new(None));

		let probe = orchestrator.clone();
		let slot = Rc::clone(&seen);
		orchestrator
			.start(popup_config().on_cancel(move || {
				*slot.borrow_mut() = Some((probe.state(), probe.is_active()));
			}))
			.unwrap();

		let popup = platform.latest_popup().unwrap();
		platform.close_popup_by_user(popup.id);
		platform.tick();

		assert_eq!(*seen.borrow(), Some((SessionState::Canceled, false)));
		assert_eq!(orchestrator.state(), SessionState::Idle);
	}

	#[test]
	fn dropping_orchestrator_releases_resources() {
		let platform = FakePlatform::new();
		{
			let orchestrator = Orchestrator::new(platform.clone());
			let _started = orchestrator.start(popup_config()).unwrap();
			assert_eq!(platform.live_listeners(), 1);
		}
		assert!(platform.is_quiescent());
	}

	#[test]
	fn poll_uses_configured_interval() {
		let platform = FakePlatform::new();
		let options = OrchestratorOptions::default().with_poll_interval(std::time::Duration::from_millis(250));
		let orchestrator = Orchestrator::with_options(platform.clone(), options);

		let _started = orchestrator.start(popup_config()).unwrap();
		assert_eq!(platform.interval_periods(), vec![std::time::Duration::from_millis(250)]);
	}

	#[test]
	fn session_ids_are_not_reused() {
		let orchestrator = Orchestrator::new(FakePlatform::new());
		let first = orchestrator.start(popup_config()).unwrap().id().unwrap();
		orchestrator.cleanup().unwrap();
		let second = orchestrator.start(popup_config()).unwrap().id().unwrap();
		assert!(second > first);
	}

	#[test]
	fn session_release_clears_credentials_and_resources() {
		let platform = FakePlatform::new();
		let orchestrator = Orchestrator::new(platform.clone());
		let _started = orchestrator.start(popup_config()).unwrap();
		platform.deliver_window_message(ORIGIN, json!({"type": "READY"}));

		let mut session = orchestrator.inner.core.borrow_mut().session.take().unwrap();
		assert_eq!(session.credentials.access_token(), "tok_a");

		session.release(&platform);
		assert!(session.credentials.is_cleared());
		assert_eq!(session.handshake.phase(), crate::handshake::HandshakePhase::Finished);
		assert!(session.resources.is_empty());
		assert!(platform.is_quiescent());

		session.release(&platform);
		assert!(platform.is_quiescent());
	}

	#[test]
	fn init_message_is_scrubbed_after_posting() {
		let mut message = init_message(&CredentialPair::new("tok_a", "tok_c")).unwrap();
		assert_eq!(message, json!({"type": "INIT", "accessToken": "tok_a", "csrfToken": "tok_c"}));

		scrub_init(&mut message);
		assert_eq!(message, json!({"type": "INIT", "accessToken": "", "csrfToken": ""}));
	}
}
