//! [`Platform`] over the live DOM.

use std::cell::RefCell;
use std::time::Duration;

use paybridge::platform::{PortMessageHandler, TickHandler, WindowMessageHandler};
use paybridge::{FrameAttributes, HostError, Platform, ScreenArea, Surface, WindowMessage};
use serde::Serialize;
use serde_json::Value;
use url::Url;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Element, HtmlIFrameElement, MessageChannel, MessageEvent, MessagePort, Window};

/// Host end of a private channel. Owns the `onmessage` closure so it lives
/// exactly as long as the port is open.
pub struct WebPort {
	port: MessagePort,
	handler: RefCell<Option<Closure<dyn FnMut(MessageEvent)>>>,
}

pub struct WebListener {
	callback: Closure<dyn FnMut(MessageEvent)>,
}

pub struct WebInterval {
	handle: i32,
	_tick: Closure<dyn FnMut()>,
}

/// Browser backend bound to one `window`.
#[derive(Clone)]
pub struct WebPlatform {
	window: Window,
}

impl WebPlatform {
	pub fn new() -> Result<Self, HostError> {
		let window = web_sys::window().ok_or_else(|| HostError::new("no global window"))?;
		Ok(Self { window })
	}

	pub fn window(&self) -> &Window {
		&self.window
	}
}

fn host_error(context: &str, err: JsValue) -> HostError {
	let detail = err.as_string().unwrap_or_else(|| format!("{err:?}"));
	HostError::new(format!("{context}: {detail}"))
}

/// Converts inbound message data. Anything that is not plain JSON becomes
/// `null`, which the handshake ignores.
fn to_json(data: JsValue) -> Value {
	serde_wasm_bindgen::from_value(data).unwrap_or(Value::Null)
}

pub(crate) fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, serde_wasm_bindgen::Error> {
	value.serialize(&serde_wasm_bindgen::Serializer::json_compatible())
}

impl Platform for WebPlatform {
	type Element = Element;
	type Window = Window;
	type Frame = HtmlIFrameElement;
	type Port = WebPort;
	type TransferPort = MessagePort;
	type Listener = WebListener;
	type Interval = WebInterval;

	fn available_screen(&self) -> ScreenArea {
		let Ok(screen) = self.window.screen() else {
			return ScreenArea::default();
		};
		match (screen.avail_width(), screen.avail_height()) {
			(Ok(width), Ok(height)) => ScreenArea {
				width: width.max(0) as u32,
				height: height.max(0) as u32,
			},
			_ => ScreenArea::default(),
		}
	}

	fn open_popup(&self, url: &Url, name: &str, features: &str) -> Option<Window> {
		self.window
			.open_with_url_and_target_and_features(url.as_str(), name, features)
			.ok()
			.flatten()
	}

	fn popup_closed(&self, window: &Window) -> bool {
		window.closed().unwrap_or(true)
	}

	fn close_popup(&self, window: &Window) {
		if !self.popup_closed(window) {
			let _ = window.close();
		}
	}

	fn clear_host(&self, host: &Element) {
		while let Some(child) = host.first_child() {
			if host.remove_child(&child).is_err() {
				break;
			}
		}
	}

	fn mount_frame(&self, host: &Element, url: &Url, attrs: &FrameAttributes) -> Result<HtmlIFrameElement, HostError> {
		let document = self
			.window
			.document()
			.ok_or_else(|| HostError::new("window has no document"))?;
		let frame = document
			.create_element("iframe")
			.map_err(|e| host_error("create iframe", e))?
			.dyn_into::<HtmlIFrameElement>()
			.map_err(|_| HostError::new("created element is not an iframe"))?;

		frame.set_src(url.as_str());
		frame.set_width(&attrs.width);
		frame.set_height(&attrs.height);
		frame
			.set_attribute("allow", &attrs.allow)
			.map_err(|e| host_error("set allow", e))?;
		frame
			.set_attribute("style", "border: 0")
			.map_err(|e| host_error("set style", e))?;
		if let Some(class_name) = &attrs.class_name {
			frame.set_class_name(class_name);
		}

		host.append_child(&frame).map_err(|e| host_error("append iframe", e))?;
		Ok(frame)
	}

	fn remove_frame(&self, frame: &HtmlIFrameElement) {
		frame.remove();
	}

	fn navigate(&self, url: &Url) -> Result<(), HostError> {
		self.window
			.location()
			.set_href(url.as_str())
			.map_err(|e| host_error("navigate", e))
	}

	fn listen(&self, handler: WindowMessageHandler) -> Result<WebListener, HostError> {
		let callback = Closure::<dyn FnMut(MessageEvent)>::new(move |event: MessageEvent| {
			handler(WindowMessage::new(event.origin(), to_json(event.data())));
		});
		self.window
			.add_event_listener_with_callback("message", callback.as_ref().unchecked_ref())
			.map_err(|e| host_error("add message listener", e))?;
		Ok(WebListener { callback })
	}

	fn unlisten(&self, listener: WebListener) {
		let _ = self
			.window
			.remove_event_listener_with_callback("message", listener.callback.as_ref().unchecked_ref());
	}

	fn open_channel(&self) -> Result<(WebPort, MessagePort), HostError> {
		let channel = MessageChannel::new().map_err(|e| host_error("open message channel", e))?;
		let port = WebPort {
			port: channel.port1(),
			handler: RefCell::new(None),
		};
		Ok((port, channel.port2()))
	}

	fn on_port_message(&self, port: &WebPort, handler: PortMessageHandler) {
		let callback = Closure::<dyn FnMut(MessageEvent)>::new(move |event: MessageEvent| {
			handler(to_json(event.data()));
		});
		port.port.set_onmessage(Some(callback.as_ref().unchecked_ref()));
		*port.handler.borrow_mut() = Some(callback);
	}

	fn close_port(&self, port: WebPort) {
		port.port.set_onmessage(None);
		port.port.close();
	}

	fn post_message(
		&self,
		target: &Surface<Self>,
		message: &Value,
		target_origin: &str,
		transfer: MessagePort,
	) -> Result<(), HostError> {
		let window = match target {
			Surface::Popup(window) => window.clone(),
			Surface::Frame(frame) => frame
				.content_window()
				.ok_or_else(|| HostError::new("frame has no browsing context"))?,
		};
		let message = to_js(message).map_err(|e| HostError::new(format!("serialize message: {e}")))?;
		let transfer = js_sys::Array::of1(&transfer);
		window
			.post_message_with_transfer(&message, target_origin, &transfer)
			.map_err(|e| host_error("post message", e))
	}

	fn set_interval(&self, period: Duration, tick: TickHandler) -> Result<WebInterval, HostError> {
		let callback = Closure::<dyn FnMut()>::new(move || tick());
		let millis = i32::try_from(period.as_millis()).unwrap_or(i32::MAX);
		let handle = self
			.window
			.set_interval_with_callback_and_timeout_and_arguments_0(callback.as_ref().unchecked_ref(), millis)
			.map_err(|e| host_error("set interval", e))?;
		Ok(WebInterval { handle, _tick: callback })
	}

	fn clear_interval(&self, interval: WebInterval) {
		self.window.clear_interval_with_handle(interval.handle);
	}
}
