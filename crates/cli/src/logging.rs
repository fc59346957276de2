use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Default filter when `RUST_LOG` is unset.
///
/// `engine` (`--verbose-engine`) lifts the session engine to `info` so its
/// lifecycle chatter shows up without `-v`.
fn default_filter(verbosity: u8, engine: bool) -> String {
	// 0 = warnings only (session failures are warned about)
	// 1 (-v) = info for everything but tungstenite
	// 2+ (-vv) = debug for everything, including tungstenite
	let base = match verbosity {
		0 => "warn,tungstenite=off,tokio_tungstenite=off",
		1 => "info,tungstenite=warn,tokio_tungstenite=warn",
		_ => "debug",
	};
	if engine && verbosity == 0 {
		format!("{base},wslane=info")
	} else {
		base.to_string()
	}
}

pub fn init_logging(verbosity: u8, engine: bool) {
	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity, engine)));

	let stderr = std::io::stderr.with_max_level(tracing::Level::TRACE);

	tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_writer(stderr)
		.with_target(verbosity > 1)
		.with_level(true)
		.compact()
		.init();
}
