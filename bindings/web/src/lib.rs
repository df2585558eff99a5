//! Browser bindings for the paybridge orchestrator.
//!
//! Exposes [`Checkout`] to JavaScript. One instance owns one orchestrator
//! over the page's `window`; `start` returns a `Promise` settled by the
//! session's terminal outcome (or `undefined` for redirects). Engine logs go
//! to the browser console; sessions started with `debug: true` log every
//! inbound message.

mod logging;
mod options;
mod platform;

use js_sys::Function;
use paybridge::{Error, Orchestrator, OrchestratorOptions, SessionConfig};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::Element;

pub use options::{DisplayMode, FrameSpec, StartOptions};
pub use platform::{WebInterval, WebListener, WebPlatform, WebPort};

#[wasm_bindgen(start)]
pub fn init() {
	console_error_panic_hook::set_once();
	logging::init_logging(tracing::Level::INFO);
}

fn js_error(err: &Error) -> JsValue {
	js_sys::Error::new(&err.to_string()).into()
}

fn call(callback: &Option<Function>, arg: &JsValue) {
	if let Some(f) = callback {
		let _ = f.call1(&JsValue::NULL, arg);
	}
}

#[wasm_bindgen]
pub struct Checkout {
	orchestrator: Orchestrator<WebPlatform>,
}

#[wasm_bindgen]
impl Checkout {
	/// `options` is an optional `OrchestratorOptions` object
	/// (`pollIntervalMs` is spelled `poll_interval_ms`).
	#[wasm_bindgen(constructor)]
	pub fn new(options: JsValue) -> Result<Checkout, JsValue> {
		let options: OrchestratorOptions = if options.is_undefined() || options.is_null() {
			OrchestratorOptions::default()
		} else {
			serde_wasm_bindgen::from_value(options)?
		};
		let platform = WebPlatform::new().map_err(|e| JsValue::from_str(e.message()))?;
		Ok(Checkout {
			orchestrator: Orchestrator::with_options(platform, options),
		})
	}

	/// Starts a session, superseding any active one.
	///
	/// Errors are thrown and also passed to `on_error`.
	pub fn start(
		&self,
		options: JsValue,
		host: Option<Element>,
		on_success: Option<Function>,
		on_cancel: Option<Function>,
		on_error: Option<Function>,
	) -> Result<JsValue, JsValue> {
		let options: StartOptions = serde_wasm_bindgen::from_value(options)?;
		let debug = options.debug;
		let display = options.display.into_display(host).map_err(JsValue::from_str)?;

		let config = SessionConfig::new(options.kind, options.url, options.credentials, display)
			.with_debug(debug)
			.on_success(move |success| {
				let payload = platform::to_js(&success).unwrap_or(JsValue::UNDEFINED);
				call(&on_success, &payload);
			})
			.on_cancel(move || call(&on_cancel, &JsValue::UNDEFINED))
			.on_error(move |err| call(&on_error, &js_error(err)));

		let started = self.orchestrator.start(config).map_err(|e| js_error(&e))?;
		let Some(completion) = started.into_completion() else {
			return Ok(JsValue::UNDEFINED);
		};
		let promise = future_to_promise(async move {
			let outcome = completion.await.map_err(|e| js_error(&e))?;
			platform::to_js(&outcome).map_err(JsValue::from)
		});
		Ok(promise.into())
	}

	/// Tears down the active session without callbacks.
	pub fn cleanup(&self) -> Result<(), JsValue> {
		self.orchestrator.cleanup().map_err(|e| js_error(&e))
	}

	/// Cleans up and disables this instance.
	pub fn destroy(&self) -> Result<(), JsValue> {
		self.orchestrator.destroy().map_err(|e| js_error(&e))
	}

	#[wasm_bindgen(js_name = isActive)]
	pub fn is_active(&self) -> bool {
		self.orchestrator.is_active()
	}

	/// Current session state, e.g. `"awaiting_ready"`.
	pub fn state(&self) -> String {
		serde_json::to_value(self.orchestrator.state())
			.ok()
			.and_then(|v| v.as_str().map(str::to_owned))
			.unwrap_or_default()
	}
}
