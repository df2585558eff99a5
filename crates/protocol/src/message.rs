//! Message vocabulary exchanged with the remote surface.
//!
//! | type                   | direction     | payload                          |
//! |------------------------|---------------|----------------------------------|
//! | `READY`                | remote → host | none                             |
//! | `INIT`                 | host → remote | credentials + transferred port   |
//! | `PAYMENT_COMPLETED`    | remote → host | `status`, `paymentSessionId?`    |
//! | `PAYMENT_METHOD_ADDED` | remote → host | `paymentMethod` descriptor       |

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Message posted by the remote surface to the host.
///
/// Anything that does not carry one of the recognized `type` tags is not a
/// `RemoteMessage`; see [`RemoteMessage::parse`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemoteMessage {
	/// Remote surface loaded and is waiting for credentials.
	Ready,
	/// Outcome of a payment session.
	PaymentCompleted(PaymentCompleted),
	/// Outcome of a setup session.
	PaymentMethodAdded(PaymentMethodAdded),
}

impl RemoteMessage {
	/// Parses an inbound message payload.
	///
	/// Returns `None` for non-objects, objects without a `type` field, unknown
	/// types, and recognized types whose required fields are malformed.
	pub fn parse(data: &Value) -> Option<Self> {
		if !data.get("type").is_some_and(Value::is_string) {
			return None;
		}
		Self::deserialize(data).ok()
	}
}

/// Payload of a `PAYMENT_COMPLETED` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCompleted {
	/// Raw status string; see [`PaymentCompleted::status`].
	#[serde(rename = "status")]
	pub raw_status: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub payment_session_id: Option<String>,
	/// Every other field the remote attached, preserved verbatim.
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

impl PaymentCompleted {
	pub fn status(&self) -> PaymentStatus {
		PaymentStatus::from_wire(&self.raw_status)
	}
}

/// Classified `status` of a `PAYMENT_COMPLETED` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
	Complete,
	Canceled,
	/// Any status string this host does not act on.
	Unrecognized,
}

impl PaymentStatus {
	/// Maps the wire string. Matching is exact and case-sensitive.
	pub fn from_wire(raw: &str) -> Self {
		match raw {
			"COMPLETE" => PaymentStatus::Complete,
			"CANCELED" => PaymentStatus::Canceled,
			_ => PaymentStatus::Unrecognized,
		}
	}
}

/// Payload of a `PAYMENT_METHOD_ADDED` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodAdded {
	/// Opaque descriptor of the saved payment method.
	pub payment_method: Value,
}

/// Message posted by the host to the remote surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HostMessage {
	/// Credential delivery. Always posted together with one transferred
	/// channel endpoint.
	Init(InitPayload),
}

/// Credential fields of an `INIT` message.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitPayload {
	pub access_token: String,
	pub csrf_token: String,
}

impl std::fmt::Debug for InitPayload {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("InitPayload")
			.field("access_token", &"<redacted>")
			.field("csrf_token", &"<redacted>")
			.finish()
	}
}
