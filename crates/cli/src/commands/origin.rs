use paybridge::ExpectedOrigin;
use serde::Serialize;
use url::Url;

use crate::output::{self, CommandResult, ErrorCode, OutputFormat};
use crate::scenario::kind_label;

#[derive(Debug, Serialize)]
struct OriginData {
	url: String,
	origin: String,
}

pub fn run(raw: &str, format: OutputFormat) -> anyhow::Result<()> {
	let result = match ExpectedOrigin::parse(raw) {
		Ok((url, origin)) => CommandResult::success("origin", describe(&url, &origin)),
		Err(err) => CommandResult::failure(
			"origin",
			ErrorCode::ConfigurationError,
			format!("{} ({})", err, kind_label(err.kind())),
		),
	};
	let failed = !result.ok;
	output::print_result(&result, format, |data| data.origin.clone())?;
	if failed {
		anyhow::bail!("invalid session url");
	}
	Ok(())
}

fn describe(url: &Url, origin: &ExpectedOrigin) -> OriginData {
	OriginData {
		url: url.to_string(),
		origin: origin.as_str().to_string(),
	}
}
