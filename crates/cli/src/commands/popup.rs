use paybridge::ScreenArea;
use paybridge::display::PopupGeometry;
use serde::Serialize;

use crate::output::{self, CommandResult, OutputFormat};

#[derive(Debug, Serialize)]
struct PopupData {
	left: u32,
	top: u32,
	width: u32,
	height: u32,
	features: String,
}

pub fn run(width: u32, height: u32, screen_width: u32, screen_height: u32, format: OutputFormat) -> anyhow::Result<()> {
	let screen = ScreenArea {
		width: screen_width,
		height: screen_height,
	};
	let geometry = PopupGeometry::centered(width, height, screen);
	let data = PopupData {
		left: geometry.left,
		top: geometry.top,
		width: geometry.width,
		height: geometry.height,
		features: geometry.features(),
	};
	output::print_result(&CommandResult::success("popup-features", data), format, |d| d.features.clone())
}
