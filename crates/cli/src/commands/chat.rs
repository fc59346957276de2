use std::io::BufRead;

use anyhow::{Context, Result};
use colored::Colorize;
use wslane::Client;

use super::printing_callbacks;
use crate::cli::ChatArgs;

pub fn run(client: &Client, args: ChatArgs) -> Result<()> {
	let handle = client.try_connect(&args.url, printing_callbacks())?;
	eprintln!("{} {handle}; type lines to send, EOF to quit", "connected".bold());

	for line in std::io::stdin().lock().lines() {
		let line = line.context("Failed to read stdin")?;
		if line.is_empty() {
			continue;
		}
		if !client.send(handle, &line) {
			eprintln!("{}", "session is gone".red());
			return Ok(());
		}
	}

	client.disconnect(handle);
	Ok(())
}
