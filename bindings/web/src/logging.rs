//! Routes `tracing` events to the browser console.
//!
//! The orchestrator logs lifecycle steps at `debug` and, for sessions
//! started with `debug: true`, every inbound message at `info`. Installing
//! the subscriber at `info` therefore surfaces exactly the per-session debug
//! lines plus warnings.

use std::io;

use tracing::{Level, Metadata};
use tracing_subscriber::fmt::MakeWriter;

/// One formatted event, flushed to the console method matching its level.
pub struct ConsoleWriter {
	level: Level,
	buf: Vec<u8>,
}

impl io::Write for ConsoleWriter {
	fn write(&mut self, data: &[u8]) -> io::Result<usize> {
		self.buf.extend_from_slice(data);
		Ok(data.len())
	}

	fn flush(&mut self) -> io::Result<()> {
		if self.buf.is_empty() {
			return Ok(());
		}
		let line = String::from_utf8_lossy(&self.buf);
		let line: wasm_bindgen::JsValue = line.trim_end().into();
		match self.level {
			Level::ERROR => web_sys::console::error_1(&line),
			Level::WARN => web_sys::console::warn_1(&line),
			Level::INFO => web_sys::console::info_1(&line),
			_ => web_sys::console::debug_1(&line),
		}
		self.buf.clear();
		Ok(())
	}
}

impl Drop for ConsoleWriter {
	fn drop(&mut self) {
		let _ = io::Write::flush(self);
	}
}

#[derive(Clone, Copy, Default)]
pub struct MakeConsoleWriter;

impl<'a> MakeWriter<'a> for MakeConsoleWriter {
	type Writer = ConsoleWriter;

	fn make_writer(&'a self) -> ConsoleWriter {
		ConsoleWriter {
			level: Level::INFO,
			buf: Vec::new(),
		}
	}

	fn make_writer_for(&'a self, meta: &Metadata<'_>) -> ConsoleWriter {
		ConsoleWriter {
			level: *meta.level(),
			buf: Vec::new(),
		}
	}
}

/// Installs the console subscriber once; later calls are no-ops.
pub fn init_logging(max_level: Level) {
	let _ = tracing_subscriber::fmt()
		.with_writer(MakeConsoleWriter)
		.with_max_level(max_level)
		.with_ansi(false)
		// No wall clock on wasm32-unknown-unknown.
		.without_time()
		.with_target(true)
		.try_init();
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[test]
	fn writer_buffers_until_flush() {
		let mut writer = MakeConsoleWriter.make_writer();
		assert_eq!(writer.level, Level::INFO);

		writer.write_all(b"paybridge.handshake: inbound message").unwrap();
		writer.write_all(b"\n").unwrap();
		assert_eq!(writer.buf, b"paybridge.handshake: inbound message\n");
		// Console calls only exist on wasm32; leave nothing to flush on drop.
		writer.buf.clear();
	}
}
