//! Structured output envelope and printing.

mod format;
mod model;

pub use format::OutputFormat;
pub use model::*;

use serde::Serialize;

/// Prints `result` to stdout in `format`. `text` renders the payload with
/// `render_text` when the command succeeded.
pub fn print_result<T: Serialize>(
	result: &CommandResult<T>,
	format: OutputFormat,
	render_text: impl FnOnce(&T) -> String,
) -> anyhow::Result<()> {
	match format {
		OutputFormat::Json => println!("{}", serde_json::to_string_pretty(result)?),
		OutputFormat::Text => match (&result.data, &result.error) {
			(Some(data), _) => println!("{}", render_text(data)),
			(None, Some(err)) => println!("error [{}]: {}", err.code, err.message),
			(None, None) => println!("{}", result.command),
		},
	}
	Ok(())
}
