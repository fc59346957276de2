mod chat;
pub mod echo;
mod probe;

use anyhow::{Context, Result};
use colored::Colorize;
use wslane::{Callbacks, Client, ClientConfig, Handle};

use crate::cli::{Cli, Commands};
use crate::settings;

pub async fn dispatch(cli: Cli) -> Result<()> {
	// The echo server never builds a client.
	if let Commands::EchoServer(ref args) = cli.command {
		return echo::run(&args.host, args.port).await;
	}

	let config = settings::resolve(&cli)?;
	let runtime = tokio::runtime::Handle::current();

	// The client API blocks its caller, so it runs on the blocking pool while
	// session lanes share this runtime's workers.
	tokio::task::spawn_blocking(move || {
		let client = build_client(config, runtime)?;
		match cli.command {
			Commands::Probe(args) => probe::run(&client, args),
			Commands::Chat(args) => chat::run(&client, args),
			Commands::EchoServer(_) => Ok(()),
		}
	})
	.await
	.context("Client task panicked")?
}

/// An explicit worker count gets the client its own pool; otherwise lanes
/// share the main runtime.
fn build_client(config: ClientConfig, runtime: tokio::runtime::Handle) -> Result<Client> {
	let mut builder = Client::builder();
	if config.worker_threads.is_none() {
		builder = builder.runtime_handle(runtime);
	}
	builder.config(config).build().context("Failed to start client")
}

/// Callbacks that print tagged lines to stdout.
fn printing_callbacks() -> Callbacks {
	Callbacks::new()
		.on_fail(|handle, message| println!("{} {message}", tag("fail", handle).red()))
		.on_disconnect(|handle| println!("{}", tag("disconnect", handle).yellow()))
		.on_data(|handle, payload| println!("{} {payload}", tag("data", handle).green()))
}

fn tag(kind: &str, handle: Handle) -> String {
	format!("[{kind} {handle}]")
}
