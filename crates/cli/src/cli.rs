use std::path::PathBuf;

use clap::builder::Styles;
use clap::builder::styling::AnsiColor;
use clap::{Args, Parser, Subcommand};

/// Cargo-like help colors.
fn cli_styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Green.on_default().bold())
		.usage(AnsiColor::Green.on_default().bold())
		.literal(AnsiColor::Cyan.on_default())
		.placeholder(AnsiColor::Cyan.on_default())
		.valid(AnsiColor::Cyan.on_default())
}

#[derive(Parser, Debug)]
#[command(name = "wslane")]
#[command(about = "WebSocket client sessions from the command line")]
#[command(version)]
#[command(styles = cli_styles())]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Client settings file (JSON, camelCase keys)
	#[arg(long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// Log session lifecycle events (connects, state changes, frames)
	#[arg(long, global = true)]
	pub verbose_engine: bool,

	/// Bound on the TCP connect phase, in milliseconds
	#[arg(long, global = true, value_name = "MS")]
	pub connect_timeout: Option<u64>,

	/// Worker threads for session lanes
	#[arg(long, global = true, value_name = "N")]
	pub workers: Option<usize>,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Connect, send a few messages, wait, then disconnect
	Probe(ProbeArgs),

	/// Interactive session: stdin lines are sent, received text is printed
	Chat(ChatArgs),

	/// Run a local WebSocket echo server (`bye` closes the connection)
	#[command(name = "echo-server")]
	EchoServer(EchoServerArgs),
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
	/// Target URL (ws://host:port/path or wss://host:port/path)
	pub url: String,

	/// Message to send once connected (repeatable, sent in order)
	#[arg(short, long = "message", value_name = "TEXT")]
	pub messages: Vec<String>,

	/// How long to wait for replies before disconnecting
	#[arg(long, default_value_t = 1000, value_name = "MS")]
	pub hold_ms: u64,
}

#[derive(Args, Debug)]
pub struct ChatArgs {
	/// Target URL (ws://host:port/path or wss://host:port/path)
	pub url: String,
}

#[derive(Args, Debug)]
pub struct EchoServerArgs {
	/// Interface to bind
	#[arg(long, default_value = "127.0.0.1")]
	pub host: String,

	/// Port to listen on
	#[arg(short, long, default_value_t = 8080)]
	pub port: u16,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parse_probe_with_messages() {
		let args = vec!["wslane", "probe", "ws://localhost:8080/x", "-m", "ping", "--message", "pong"];
		let cli = Cli::try_parse_from(args).unwrap();

		match cli.command {
			Commands::Probe(args) => {
				assert_eq!(args.url, "ws://localhost:8080/x");
				assert_eq!(args.messages, ["ping", "pong"]);
				assert_eq!(args.hold_ms, 1000);
			}
			_ => panic!("Expected Probe command"),
		}
	}

	#[test]
	fn parse_global_flags_after_subcommand() {
		let args = vec![
			"wslane",
			"chat",
			"wss://example.com:443/",
			"-vv",
			"--verbose-engine",
			"--config",
			"client.json",
			"--connect-timeout",
			"500",
		];
		let cli = Cli::try_parse_from(args).unwrap();

		assert_eq!(cli.verbose, 2);
		assert!(cli.verbose_engine);
		assert_eq!(cli.config, Some(PathBuf::from("client.json")));
		assert_eq!(cli.connect_timeout, Some(500));
		assert!(matches!(cli.command, Commands::Chat(ChatArgs { ref url }) if url == "wss://example.com:443/"));
	}

	#[test]
	fn parse_echo_server_defaults() {
		let cli = Cli::try_parse_from(["wslane", "echo-server"]).unwrap();
		match cli.command {
			Commands::EchoServer(args) => {
				assert_eq!(args.host, "127.0.0.1");
				assert_eq!(args.port, 8080);
			}
			_ => panic!("Expected EchoServer command"),
		}
	}

	#[test]
	fn probe_requires_url() {
		assert!(Cli::try_parse_from(["wslane", "probe"]).is_err());
	}
}
