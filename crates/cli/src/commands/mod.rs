mod origin;
mod popup;
mod replay;

use crate::cli::{Cli, Commands};

pub fn dispatch(cli: Cli) -> anyhow::Result<()> {
	match cli.command {
		Commands::Replay { scenario, options } => replay::run(&scenario, options.as_deref(), cli.format)?,
		Commands::Origin { url } => origin::run(&url, cli.format)?,
		Commands::PopupFeatures {
			width,
			height,
			screen_width,
			screen_height,
		} => popup::run(width, height, screen_width, screen_height, cli.format)?,
	}

	Ok(())
}
