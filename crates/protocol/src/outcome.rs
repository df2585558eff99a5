//! Success payloads handed to the host once a session completes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::message::{PaymentCompleted, PaymentMethodAdded};

/// Result of a completed payment session.
///
/// Serializes as `{status, paymentSessionId, ...fields}`, i.e. the remote's
/// message with the `type` tag removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResult {
	pub status: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub payment_session_id: Option<String>,
	#[serde(flatten)]
	pub fields: Map<String, Value>,
}

impl From<PaymentCompleted> for PaymentResult {
	fn from(msg: PaymentCompleted) -> Self {
		Self {
			status: msg.raw_status,
			payment_session_id: msg.payment_session_id,
			fields: msg.extra,
		}
	}
}

/// Payment method saved by a setup session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedPaymentMethod {
	pub payment_method: Value,
}

impl From<PaymentMethodAdded> for SavedPaymentMethod {
	fn from(msg: PaymentMethodAdded) -> Self {
		Self {
			payment_method: msg.payment_method,
		}
	}
}
