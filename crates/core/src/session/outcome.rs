use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use paybridge_protocol::{PaymentResult, SavedPaymentMethod};
use serde::Serialize;
use tokio::sync::oneshot;

use crate::error::{Error, Result};
use crate::platform::Platform;

/// Identifier of one session on one orchestrator. Monotonic, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "s{}", self.0)
	}
}

/// Lifecycle of the orchestrator's current session.
///
/// `Idle → Initiating → AwaitingReady → Handshaking → {Completed | Canceled |
/// Errored} → Idle`. Terminal states are observable while the terminal
/// callback runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
	Idle,
	Initiating,
	AwaitingReady,
	Handshaking,
	Completed,
	Canceled,
	Errored,
}

impl SessionState {
	pub fn is_terminal(&self) -> bool {
		matches!(self, SessionState::Completed | SessionState::Canceled | SessionState::Errored)
	}
}

/// Terminal outcome of a session that did not fail.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
	/// Payment session finished with status `COMPLETE`.
	Completed(PaymentResult),
	/// Setup session saved a payment method.
	MethodAdded(SavedPaymentMethod),
	Canceled,
}

impl Outcome {
	/// Payload for `on_success`, or `None` for a cancellation.
	pub fn success(&self) -> Option<Success> {
		match self {
			Outcome::Completed(result) => Some(Success::Payment(result.clone())),
			Outcome::MethodAdded(method) => Some(Success::PaymentMethod(method.clone())),
			Outcome::Canceled => None,
		}
	}

	pub(crate) fn state(&self) -> SessionState {
		match self {
			Outcome::Canceled => SessionState::Canceled,
			_ => SessionState::Completed,
		}
	}
}

/// Argument of the `on_success` callback; shape depends on session kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Success {
	Payment(PaymentResult),
	PaymentMethod(SavedPaymentMethod),
}

/// Resolves once the session ends.
///
/// Yields the terminal outcome, the protocol error that ended the session,
/// or [`Error::Ended`] if the session was cleaned up, destroyed or
/// superseded first.
#[must_use = "a Completion does nothing unless awaited"]
#[derive(Debug)]
pub struct Completion {
	rx: oneshot::Receiver<Result<Outcome>>,
}

impl Completion {
	pub(crate) fn channel() -> (oneshot::Sender<Result<Outcome>>, Self) {
		let (tx, rx) = oneshot::channel();
		(tx, Self { rx })
	}
}

impl Future for Completion {
	type Output = Result<Outcome>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		match Pin::new(&mut self.rx).poll(cx) {
			Poll::Ready(Ok(result)) => Poll::Ready(result),
			Poll::Ready(Err(_)) => Poll::Ready(Err(Error::Ended)),
			Poll::Pending => Poll::Pending,
		}
	}
}

/// Successful return of [`crate::Orchestrator::start`].
pub enum Started<P: Platform> {
	Popup {
		id: SessionId,
		completion: Completion,
	},
	Frame {
		id: SessionId,
		/// Mounted frame, for the caller's own layout.
		frame: P::Frame,
		completion: Completion,
	},
	/// Navigation issued; the current document is being replaced.
	Redirected,
}

impl<P: Platform> Started<P> {
	pub fn id(&self) -> Option<SessionId> {
		match self {
			Started::Popup { id, .. } | Started::Frame { id, .. } => Some(*id),
			Started::Redirected => None,
		}
	}

	/// Splits off the completion future of an interactive session.
	pub fn into_completion(self) -> Option<Completion> {
		match self {
			Started::Popup { completion, .. } | Started::Frame { completion, .. } => Some(completion),
			Started::Redirected => None,
		}
	}
}

impl<P: Platform> fmt::Debug for Started<P> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Started::Popup { id, .. } => f.debug_struct("Popup").field("id", id).finish(),
			Started::Frame { id, .. } => f.debug_struct("Frame").field("id", id).finish(),
			Started::Redirected => f.write_str("Redirected"),
		}
	}
}
