//! Handshake protocol engine.
//!
//! A pure state machine over inbound messages. It decides what a message
//! means for the session; the orchestrator performs the resulting effects
//! (opening the private channel, posting `INIT`, dispatching the outcome).
//!
//! ```text
//! AwaitingReady --READY (exact origin)--> Handshaking --outcome--> Finished
//!       \______________ outcome via window listener _____________/
//! ```
//!
//! Outcomes are accepted on both paths: on the private channel once it
//! exists, and on the origin-gated window listener as a fallback. The first
//! classified outcome moves the engine to `Finished`; every later message is
//! ignored, whichever path it arrives on.

use paybridge_protocol::{PaymentStatus, RemoteMessage};
use serde_json::Value;

use crate::config::SessionKind;
use crate::origin::ExpectedOrigin;
use crate::platform::WindowMessage;
use crate::session::Outcome;

/// Position of the engine in the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakePhase {
	AwaitingReady,
	Handshaking,
	Finished,
}

/// Path a message arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Via {
	Window,
	Channel,
}

/// Why a message was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ignored {
	OriginMismatch,
	/// No recognized `type`, or malformed fields.
	Unrecognized,
	/// `READY` after credentials were already sent, or on the channel.
	RedundantReady,
	/// Recognized outcome that does not apply to this session kind.
	WrongKind,
	/// `PAYMENT_COMPLETED` with a status this host does not act on.
	UnknownStatus,
	AlreadyFinished,
}

/// What the orchestrator should do with a message.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
	Ignore(Ignored),
	/// Open the private channel and post `INIT` with the credentials.
	DeliverCredentials,
	/// Session reached a terminal outcome.
	Finish(Outcome),
}

/// Per-session handshake state.
#[derive(Debug, Clone)]
pub struct Handshake {
	kind: SessionKind,
	origin: ExpectedOrigin,
	phase: HandshakePhase,
}

impl Handshake {
	pub fn new(kind: SessionKind, origin: ExpectedOrigin) -> Self {
		Self {
			kind,
			origin,
			phase: HandshakePhase::AwaitingReady,
		}
	}

	pub fn phase(&self) -> HandshakePhase {
		self.phase
	}

	pub fn origin(&self) -> &ExpectedOrigin {
		&self.origin
	}

	/// Handles a message from the global window listener.
	pub fn on_window_message(&mut self, message: &WindowMessage) -> Step {
		if self.phase == HandshakePhase::Finished {
			return Step::Ignore(Ignored::AlreadyFinished);
		}
		if !self.origin.matches(&message.origin) {
			return Step::Ignore(Ignored::OriginMismatch);
		}
		self.on_message(&message.data, Via::Window)
	}

	/// Handles a message from the retained private channel end. The channel
	/// is only reachable by the surface it was transferred to, so no origin
	/// check applies.
	pub fn on_channel_message(&mut self, data: &Value) -> Step {
		if self.phase == HandshakePhase::Finished {
			return Step::Ignore(Ignored::AlreadyFinished);
		}
		self.on_message(data, Via::Channel)
	}

	/// Marks the session terminal without an outcome (protocol error).
	pub fn abort(&mut self) {
		self.phase = HandshakePhase::Finished;
	}

	fn on_message(&mut self, data: &Value, via: Via) -> Step {
		let Some(message) = RemoteMessage::parse(data) else {
			return Step::Ignore(Ignored::Unrecognized);
		};

		match message {
			RemoteMessage::Ready if via == Via::Window && self.phase == HandshakePhase::AwaitingReady => {
				self.phase = HandshakePhase::Handshaking;
				Step::DeliverCredentials
			}
			RemoteMessage::Ready => Step::Ignore(Ignored::RedundantReady),
			other => match classify(self.kind, other) {
				Ok(outcome) => {
					self.phase = HandshakePhase::Finished;
					Step::Finish(outcome)
				}
				Err(reason) => Step::Ignore(reason),
			},
		}
	}
}

/// Maps an outcome message to the session's [`Outcome`].
///
/// | kind    | message                          | outcome            |
/// |---------|----------------------------------|--------------------|
/// | payment | `PAYMENT_COMPLETED` `COMPLETE`   | `Completed`        |
/// | payment | `PAYMENT_COMPLETED` `CANCELED`   | `Canceled`         |
/// | setup   | `PAYMENT_METHOD_ADDED`           | `MethodAdded`      |
/// | setup   | `PAYMENT_COMPLETED` `CANCELED`   | `Canceled`         |
pub fn classify(kind: SessionKind, message: RemoteMessage) -> Result<Outcome, Ignored> {
	match (kind, message) {
		(_, RemoteMessage::Ready) => Err(Ignored::RedundantReady),
		(SessionKind::Payment, RemoteMessage::PaymentCompleted(done)) => match done.status() {
			PaymentStatus::Complete => Ok(Outcome::Completed(done.into())),
			PaymentStatus::Canceled => Ok(Outcome::Canceled),
			PaymentStatus::Unrecognized => Err(Ignored::UnknownStatus),
		},
		(SessionKind::Setup, RemoteMessage::PaymentCompleted(done)) => match done.status() {
			PaymentStatus::Canceled => Ok(Outcome::Canceled),
			PaymentStatus::Complete => Err(Ignored::WrongKind),
			PaymentStatus::Unrecognized => Err(Ignored::UnknownStatus),
		},
		(SessionKind::Setup, RemoteMessage::PaymentMethodAdded(added)) => Ok(Outcome::MethodAdded(added.into())),
		(SessionKind::Payment, RemoteMessage::PaymentMethodAdded(_)) => Err(Ignored::WrongKind),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	const ORIGIN: &str = "https://pay.example.com";

	fn engine(kind: SessionKind) -> Handshake {
		let (_, origin) = ExpectedOrigin::parse("https://pay.example.com/s/123").unwrap();
		Handshake::new(kind, origin)
	}

	fn window(origin: &str, data: Value) -> WindowMessage {
		WindowMessage::new(origin, data)
	}

	#[test]
	fn ready_from_expected_origin_starts_handshake() {
		let mut hs = engine(SessionKind::Payment);
		assert_eq!(hs.on_window_message(&window(ORIGIN, json!({"type": "READY"}))), Step::DeliverCredentials);
		assert_eq!(hs.phase(), HandshakePhase::Handshaking);
	}

	#[test]
	fn near_miss_origins_never_transition() {
		let mut hs = engine(SessionKind::Payment);
		for origin in [
			"http://pay.example.com",
			"https://pay.example.com:8443",
			"https://pay.example.co",
			"https://sub.pay.example.com",
			"null",
			"",
		] {
			assert_eq!(
				hs.on_window_message(&window(origin, json!({"type": "READY"}))),
				Step::Ignore(Ignored::OriginMismatch),
				"origin {origin:?}"
			);
			assert_eq!(
				hs.on_window_message(&window(
					origin,
					json!({"type": "PAYMENT_COMPLETED", "status": "COMPLETE"})
				)),
				Step::Ignore(Ignored::OriginMismatch)
			);
		}
		assert_eq!(hs.phase(), HandshakePhase::AwaitingReady);
	}

	#[test]
	fn second_ready_does_not_resend_credentials() {
		let mut hs = engine(SessionKind::Payment);
		hs.on_window_message(&window(ORIGIN, json!({"type": "READY"})));
		assert_eq!(
			hs.on_window_message(&window(ORIGIN, json!({"type": "READY"}))),
			Step::Ignore(Ignored::RedundantReady)
		);
		assert_eq!(hs.on_channel_message(&json!({"type": "READY"})), Step::Ignore(Ignored::RedundantReady));
	}

	#[test]
	fn ready_on_channel_before_handshake_is_ignored() {
		let mut hs = engine(SessionKind::Payment);
		assert_eq!(hs.on_channel_message(&json!({"type": "READY"})), Step::Ignore(Ignored::RedundantReady));
		assert_eq!(hs.phase(), HandshakePhase::AwaitingReady);
	}

	#[test]
	fn unknown_messages_do_not_change_phase() {
		let mut hs = engine(SessionKind::Payment);
		hs.on_window_message(&window(ORIGIN, json!({"type": "READY"})));
		assert_eq!(hs.on_channel_message(&json!({"type": "RESIZE"})), Step::Ignore(Ignored::Unrecognized));
		assert_eq!(hs.on_channel_message(&json!({"hello": 1})), Step::Ignore(Ignored::Unrecognized));
		assert_eq!(hs.phase(), HandshakePhase::Handshaking);
	}

	#[test]
	fn payment_complete_on_channel_finishes() {
		let mut hs = engine(SessionKind::Payment);
		hs.on_window_message(&window(ORIGIN, json!({"type": "READY"})));

		let step = hs.on_channel_message(&json!({
			"type": "PAYMENT_COMPLETED",
			"status": "COMPLETE",
			"paymentSessionId": "ps_1"
		}));
		let Step::Finish(Outcome::Completed(result)) = step else {
			panic!("expected completion, got {step:?}");
		};
		assert_eq!(result.payment_session_id.as_deref(), Some("ps_1"));
		assert_eq!(hs.phase(), HandshakePhase::Finished);
	}

	#[test]
	fn window_fallback_accepts_outcome_before_ready() {
		let mut hs = engine(SessionKind::Payment);
		assert_eq!(
			hs.on_window_message(&window(ORIGIN, json!({"type": "PAYMENT_COMPLETED", "status": "CANCELED"}))),
			Step::Finish(Outcome::Canceled)
		);
	}

	#[test]
	fn finished_engine_ignores_both_paths() {
		let mut hs = engine(SessionKind::Payment);
		hs.on_window_message(&window(ORIGIN, json!({"type": "READY"})));
		hs.on_channel_message(&json!({"type": "PAYMENT_COMPLETED", "status": "COMPLETE"}));

		let again = json!({"type": "PAYMENT_COMPLETED", "status": "COMPLETE"});
		assert_eq!(hs.on_channel_message(&again), Step::Ignore(Ignored::AlreadyFinished));
		assert_eq!(hs.on_window_message(&window(ORIGIN, again)), Step::Ignore(Ignored::AlreadyFinished));
	}

	#[test]
	fn setup_sessions_classify_method_added() {
		let mut hs = engine(SessionKind::Setup);
		let step = hs.on_window_message(&window(
			ORIGIN,
			json!({"type": "PAYMENT_METHOD_ADDED", "paymentMethod": {"id": "pm_1"}}),
		));
		let Step::Finish(Outcome::MethodAdded(method)) = step else {
			panic!("expected method added, got {step:?}");
		};
		assert_eq!(method.payment_method, json!({"id": "pm_1"}));
	}

	#[test]
	fn kind_mismatches_are_ignored() {
		let mut payment = engine(SessionKind::Payment);
		assert_eq!(
			payment.on_window_message(&window(ORIGIN, json!({"type": "PAYMENT_METHOD_ADDED", "paymentMethod": {}}))),
			Step::Ignore(Ignored::WrongKind)
		);

		let mut setup = engine(SessionKind::Setup);
		assert_eq!(
			setup.on_window_message(&window(ORIGIN, json!({"type": "PAYMENT_COMPLETED", "status": "COMPLETE"}))),
			Step::Ignore(Ignored::WrongKind)
		);
		assert_eq!(
			setup.on_window_message(&window(ORIGIN, json!({"type": "PAYMENT_COMPLETED", "status": "CANCELED"}))),
			Step::Finish(Outcome::Canceled)
		);
	}

	#[test]
	fn unknown_status_is_ignored() {
		let mut hs = engine(SessionKind::Payment);
		assert_eq!(
			hs.on_window_message(&window(ORIGIN, json!({"type": "PAYMENT_COMPLETED", "status": "PENDING"}))),
			Step::Ignore(Ignored::UnknownStatus)
		);
		assert_eq!(hs.phase(), HandshakePhase::AwaitingReady);
	}
}
