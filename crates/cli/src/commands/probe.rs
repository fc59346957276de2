use std::time::Duration;

use anyhow::{Result, bail};
use colored::Colorize;
use wslane::{Client, Handle};

use super::printing_callbacks;
use crate::cli::ProbeArgs;

pub fn run(client: &Client, args: ProbeArgs) -> Result<()> {
	println!("connected before connect: {}", client.is_connected(Handle::NONE));

	let handle = client.try_connect(&args.url, printing_callbacks())?;
	println!("{} {handle} → {}", "connected".bold(), args.url);

	let mut rejected = 0;
	for message in &args.messages {
		if !client.send(handle, message) {
			println!("{} {message}", "send rejected:".red());
			rejected += 1;
		}
	}

	std::thread::sleep(Duration::from_millis(args.hold_ms));

	let closed = client.disconnect(handle);
	println!("disconnect returned {closed}");
	println!("connected after disconnect: {}", client.is_connected(handle));

	if rejected > 0 {
		bail!("{rejected} of {} messages were rejected", args.messages.len());
	}
	Ok(())
}
