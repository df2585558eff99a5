use std::path::Path;

use tracing::info;

use crate::output::{self, CommandResult, ErrorCode, OutputFormat};
use crate::scenario::{self, Report, Runner, Scenario};

pub fn run(scenario_path: &Path, options_path: Option<&Path>, format: OutputFormat) -> anyhow::Result<()> {
	let mut scenario = Scenario::load(scenario_path)?;
	if let Some(path) = options_path {
		scenario.options = Some(scenario::load_options(path)?);
	}
	info!(target: "paybridge.replay", path = %scenario_path.display(), steps = scenario.steps.len(), "replaying scenario");

	let result = match Runner::new(&scenario).run(&scenario.steps) {
		Ok(report) => CommandResult::success("replay", report),
		Err(err) => CommandResult::failure("replay", ErrorCode::InvalidInput, err.to_string()),
	};
	let failed = !result.ok;
	output::print_result(&result, format, render)?;
	if failed {
		anyhow::bail!("replay aborted");
	}
	Ok(())
}

fn render(report: &Report) -> String {
	let mut lines = Vec::new();
	for event in &report.events {
		lines.push(serde_json::to_string(event).unwrap_or_default());
	}
	lines.push(format!(
		"posted={} popups={} frames={} navigations={}",
		report.posted.len(),
		report.popups.len(),
		report.frames.len(),
		report.navigations.len()
	));
	lines.push(format!(
		"state={:?} active={} disposed={} quiescent={}",
		report.final_state, report.active, report.disposed, report.quiescent
	));
	lines.join("\n")
}
