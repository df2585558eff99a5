// paybridge: credential handshake between a host page and an embedded or
// popped-out checkout surface.
//
// The browser is reached only through the `Platform` trait; `FakePlatform`
// implements it in memory and the `paybridge-web` crate implements it over
// web-sys.

pub mod config;
pub mod display;
pub mod error;
pub mod handshake;
pub mod origin;
pub mod platform;
pub mod registry;
pub mod session;

/// Default interval between popup-closed checks, in milliseconds.
///
/// Closure of another browsing context cannot be observed as an event, so a
/// user closing the popup is noticed at most one interval late.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

pub use config::{
	CallbackSet, CredentialPair, Display, FrameOptions, OrchestratorOptions, PopupOptions, SessionConfig, SessionKind,
};
pub use error::{CredentialField, Error, ErrorKind, Result};
pub use handshake::{Handshake, HandshakePhase};
pub use origin::ExpectedOrigin;
pub use paybridge_protocol::{PaymentResult, SavedPaymentMethod};
pub use platform::fake::FakePlatform;
pub use platform::{FrameAttributes, HostError, Platform, ScreenArea, Surface, WindowMessage};
pub use registry::Resources;
pub use session::{Completion, Orchestrator, Outcome, SessionId, SessionState, Started, Success};
