//! Scripted replays of a remote checkout surface.
//!
//! A [`Scenario`] drives one [`Orchestrator`] over a [`FakePlatform`]: each
//! [`Step`] either starts a session, plays a message the remote would send,
//! advances the popup watcher, or toggles a host failure. The resulting
//! [`Report`] captures callbacks, posted messages and what is left allocated.

use std::cell::{Cell, RefCell};
use std::path::Path;
use std::rc::Rc;

use futures::FutureExt;
use paybridge::platform::fake::{FakeElement, FrameRecord, PopupRecord, PostedMessage};
use paybridge::{
	CredentialPair, Display, Error, ErrorKind, FakePlatform, FrameOptions, Orchestrator, OrchestratorOptions, Outcome,
	PopupOptions, SessionConfig, SessionId, SessionKind, SessionState,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::error::{CliError, Result};

const REDACTED: &str = "<redacted>";

/// Full replay input.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
	#[serde(default)]
	pub options: Option<OrchestratorOptions>,
	#[serde(default)]
	pub screen: Option<ScreenSpec>,
	pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ScreenSpec {
	pub width: u32,
	pub height: u32,
}

/// Session to start, in file form.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSpec {
	pub kind: SessionKind,
	pub url: String,
	pub credentials: CredentialPair,
	pub display: DisplaySpec,
	#[serde(default)]
	pub debug: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DisplaySpec {
	Popup(PopupOptions),
	Frame {
		/// Children already present in the host element.
		#[serde(default)]
		host_children: usize,
		#[serde(default)]
		width: Option<String>,
		#[serde(default)]
		height: Option<String>,
		#[serde(default)]
		class_name: Option<String>,
		#[serde(default)]
		allow: Option<String>,
	},
	Redirect,
}

/// One scripted action.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
	Start(SessionSpec),
	/// Message on the page-wide channel, as if posted by `origin`.
	WindowMessage { origin: String, data: Value },
	/// Message on the private channel opened by the latest session.
	ChannelMessage { data: Value },
	Tick {
		#[serde(default = "one")]
		count: usize,
	},
	/// User closes the latest popup.
	ClosePopup,
	Cleanup,
	Destroy,
	BlockPopups,
	FailChannel,
	FailPost,
}

fn one() -> usize {
	1
}

impl Scenario {
	pub fn load(path: &Path) -> Result<Self> {
		let raw = std::fs::read_to_string(path).map_err(|source| CliError::Read {
			path: path.to_path_buf(),
			source,
		})?;
		serde_json::from_str(&raw).map_err(|source| CliError::Parse {
			path: path.to_path_buf(),
			source,
		})
	}
}

/// Loads orchestrator options from a standalone JSON file.
pub fn load_options(path: &Path) -> Result<OrchestratorOptions> {
	let raw = std::fs::read_to_string(path).map_err(|source| CliError::Read {
		path: path.to_path_buf(),
		source,
	})?;
	serde_json::from_str(&raw).map_err(|source| CliError::Parse {
		path: path.to_path_buf(),
		source,
	})
}

/// Something observable that happened while a step ran.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
	Started {
		step: usize,
		session: Option<SessionId>,
		mode: &'static str,
	},
	/// Returned error from `start`, `cleanup` or `destroy`.
	Rejected {
		step: usize,
		kind: &'static str,
		message: String,
	},
	Success {
		step: usize,
		payload: Value,
	},
	Cancel {
		step: usize,
	},
	Error {
		step: usize,
		kind: &'static str,
		message: String,
	},
	Delivered {
		step: usize,
		receivers: usize,
	},
}

/// Resolution of a session's completion future at the end of the replay.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct CompletionRecord {
	pub session: SessionId,
	/// `pending`, `outcome` or `error`.
	pub status: &'static str,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub outcome: Option<Outcome>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
	pub events: Vec<Event>,
	pub posted: Vec<PostedMessage>,
	pub popups: Vec<PopupRecord>,
	pub frames: Vec<FrameRecord>,
	pub navigations: Vec<String>,
	pub completions: Vec<CompletionRecord>,
	pub final_state: SessionState,
	pub active: bool,
	pub disposed: bool,
	pub quiescent: bool,
	pub live_listeners: usize,
	pub live_intervals: usize,
	pub open_ports: usize,
}

pub fn kind_label(kind: ErrorKind) -> &'static str {
	match kind {
		ErrorKind::Configuration => "configuration",
		ErrorKind::Environment => "environment",
		ErrorKind::Protocol => "protocol",
		ErrorKind::Disposed => "disposed",
		ErrorKind::Ended => "ended",
	}
}

/// Replays a scenario from scratch and reports what the host observed.
pub struct Runner {
	platform: FakePlatform,
	orchestrator: Orchestrator<FakePlatform>,
	events: Rc<RefCell<Vec<Event>>>,
	/// Step being applied; callbacks attribute their events to it.
	current_step: Rc<Cell<usize>>,
	completions: Vec<(SessionId, paybridge::Completion)>,
}

impl Runner {
	pub fn new(scenario: &Scenario) -> Self {
		let mut platform = FakePlatform::new();
		if let Some(screen) = scenario.screen {
			platform = platform.with_screen(screen.width, screen.height);
		}
		let options = scenario.options.clone().unwrap_or_default();
		let orchestrator = Orchestrator::with_options(platform.clone(), options);
		Self {
			platform,
			orchestrator,
			events: Rc::default(),
			current_step: Rc::default(),
			completions: Vec::new(),
		}
	}

	pub fn run(mut self, steps: &[Step]) -> Result<Report> {
		for (index, step) in steps.iter().enumerate() {
			let step_no = index + 1;
			debug!(target: "paybridge.replay", step = step_no, ?step, "running step");
			self.current_step.set(step_no);
			self.apply(step_no, step)?;
		}
		Ok(self.finish())
	}

	fn apply(&mut self, step: usize, action: &Step) -> Result<()> {
		match action {
			Step::Start(spec) => self.start(step, spec)?,
			Step::WindowMessage { origin, data } => {
				let receivers = self.platform.deliver_window_message(origin, data.clone());
				self.push(Event::Delivered { step, receivers });
			}
			Step::ChannelMessage { data } => {
				let delivered = self.platform.deliver_port_message(data.clone());
				self.push(Event::Delivered {
					step,
					receivers: usize::from(delivered),
				});
			}
			Step::Tick { count } => {
				for _ in 0..*count {
					self.platform.tick();
				}
			}
			Step::ClosePopup => {
				let popup = self.platform.latest_popup().ok_or_else(|| CliError::InvalidStep {
					step,
					reason: "no popup has been opened".to_string(),
				})?;
				self.platform.close_popup_by_user(popup.id);
			}
			Step::Cleanup => {
				let result = self.orchestrator.cleanup();
				self.record_returned(step, result);
			}
			Step::Destroy => {
				let result = self.orchestrator.destroy();
				self.record_returned(step, result);
			}
			Step::BlockPopups => self.platform.set_block_popups(true),
			Step::FailChannel => self.platform.set_fail_channel(true),
			Step::FailPost => self.platform.set_fail_post(true),
		}
		Ok(())
	}

	fn start(&mut self, step: usize, spec: &SessionSpec) -> Result<()> {
		let display = match &spec.display {
			DisplaySpec::Popup(options) => Display::Popup(options.clone()),
			DisplaySpec::Frame {
				host_children,
				width,
				height,
				class_name,
				allow,
			} => Display::Frame(FrameOptions {
				host: self.platform.create_host(*host_children),
				width: width.clone(),
				height: height.clone(),
				class_name: class_name.clone(),
				allow: allow.clone(),
			}),
			DisplaySpec::Redirect => Display::Redirect,
		};
		let mode = display.label();
		let config = self.session_config(spec, display);

		match self.orchestrator.start(config) {
			Ok(started) => {
				let session = started.id();
				self.push(Event::Started { step, session, mode });
				if let (Some(id), Some(completion)) = (session, started.into_completion()) {
					self.completions.push((id, completion));
				}
			}
			Err(err) => self.record_returned(step, Err::<(), _>(err)),
		}
		Ok(())
	}

	fn session_config(&self, spec: &SessionSpec, display: Display<FakeElement>) -> SessionConfig<FakeElement> {
		let (on_success, success_step) = (Rc::clone(&self.events), Rc::clone(&self.current_step));
		let (on_cancel, cancel_step) = (Rc::clone(&self.events), Rc::clone(&self.current_step));
		let (on_error, error_step) = (Rc::clone(&self.events), Rc::clone(&self.current_step));
		SessionConfig::new(spec.kind, spec.url.clone(), spec.credentials.clone(), display)
			.with_debug(spec.debug)
			.on_success(move |success| {
				let payload = serde_json::to_value(&success).unwrap_or(Value::Null);
				on_success.borrow_mut().push(Event::Success {
					step: success_step.get(),
					payload,
				});
			})
			.on_cancel(move || {
				on_cancel.borrow_mut().push(Event::Cancel {
					step: cancel_step.get(),
				})
			})
			.on_error(move |err| {
				on_error.borrow_mut().push(Event::Error {
					step: error_step.get(),
					kind: kind_label(err.kind()),
					message: err.to_string(),
				});
			})
	}

	fn record_returned(&self, step: usize, result: std::result::Result<(), Error>) {
		if let Err(err) = result {
			self.push(Event::Rejected {
				step,
				kind: kind_label(err.kind()),
				message: err.to_string(),
			});
		}
	}

	fn push(&self, event: Event) {
		self.events.borrow_mut().push(event);
	}

	fn finish(self) -> Report {
		let completions = self
			.completions
			.into_iter()
			.map(|(session, completion)| match completion.now_or_never() {
				None => CompletionRecord {
					session,
					status: "pending",
					outcome: None,
					error: None,
				},
				Some(Ok(outcome)) => CompletionRecord {
					session,
					status: "outcome",
					outcome: Some(outcome),
					error: None,
				},
				Some(Err(err)) => CompletionRecord {
					session,
					status: "error",
					outcome: None,
					error: Some(err.to_string()),
				},
			})
			.collect();

		let report = Report {
			events: self.events.borrow().clone(),
			posted: self.platform.posted().into_iter().map(redact).collect(),
			popups: self.platform.popups(),
			frames: self.platform.frames(),
			navigations: self.platform.navigations(),
			completions,
			final_state: self.orchestrator.state(),
			active: self.orchestrator.is_active(),
			disposed: self.orchestrator.is_disposed(),
			quiescent: self.platform.is_quiescent(),
			live_listeners: self.platform.live_listeners(),
			live_intervals: self.platform.live_intervals(),
			open_ports: self.platform.open_ports(),
		};
		info!(
			target: "paybridge.replay",
			events = report.events.len(),
			posted = report.posted.len(),
			quiescent = report.quiescent,
			"replay finished"
		);
		report
	}
}

/// Masks credential values in a captured INIT message.
fn redact(mut posted: PostedMessage) -> PostedMessage {
	if let Some(message) = posted.message.as_object_mut() {
		for field in ["accessToken", "csrfToken"] {
			if let Some(value) = message.get_mut(field) {
				*value = json!(REDACTED);
			}
		}
	}
	posted
}
