//! Client settings: optional JSON file, then command-line overrides.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use wslane::ClientConfig;

use crate::cli::Cli;

pub fn load(path: Option<&Path>) -> Result<ClientConfig> {
	let Some(path) = path else {
		return Ok(ClientConfig::default());
	};

	let raw = std::fs::read_to_string(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
	serde_json::from_str(&raw).with_context(|| format!("Invalid config file {}", path.display()))
}

/// Flags win over the file.
pub fn apply_overrides(mut config: ClientConfig, cli: &Cli) -> ClientConfig {
	if cli.verbose_engine {
		config.verbose = true;
	}
	if let Some(ms) = cli.connect_timeout {
		config = config.with_connect_timeout(Duration::from_millis(ms));
	}
	if let Some(threads) = cli.workers {
		config = config.with_worker_threads(threads);
	}
	config
}

pub fn resolve(cli: &Cli) -> Result<ClientConfig> {
	let config = load(cli.config.as_deref())?;
	Ok(apply_overrides(config, cli))
}
