use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "paybridge")]
#[command(about = "Replay and inspect paybridge checkout handshakes")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug, -vvv trace)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Output format
	#[arg(short, long, global = true, value_enum, default_value = "json")]
	pub format: OutputFormat,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Run a scripted remote-surface transcript against the in-memory platform
	Replay {
		/// Scenario file (JSON)
		scenario: PathBuf,
		/// Orchestrator options file (JSON); overrides the scenario's own options
		#[arg(long, value_name = "FILE")]
		options: Option<PathBuf>,
	},

	/// Print the origin inbound messages must declare for a session URL
	Origin { url: String },

	/// Print the feature string used to open a centered popup
	PopupFeatures {
		#[arg(long, default_value_t = 500)]
		width: u32,
		#[arg(long, default_value_t = 700)]
		height: u32,
		#[arg(long, default_value_t = 1920)]
		screen_width: u32,
		#[arg(long, default_value_t = 1080)]
		screen_height: u32,
	},
}
