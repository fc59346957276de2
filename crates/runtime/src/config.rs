//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default bound on the transport connect phase.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 30_000;

/// Default bound on the WebSocket upgrade.
pub const DEFAULT_HANDSHAKE_TIMEOUT_MS: u64 = 30_000;

/// Settings passed to [`ClientBuilder`](crate::ClientBuilder).
///
/// Deserializes from partial documents; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientConfig {
	/// Worker threads for an owned pool. `None` uses tokio's default.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub worker_threads: Option<usize>,
	/// Bound on the TCP connect phase only.
	pub connect_timeout_ms: u64,
	/// Bound on the upgrade request/response exchange.
	pub handshake_timeout_ms: u64,
	/// Optional bound on the close handshake. Unbounded by default.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub close_timeout_ms: Option<u64>,
	/// `User-Agent` header sent with the upgrade request.
	pub user_agent: String,
	/// Initial state of the diagnostic toggle.
	pub verbose: bool,
}

impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			worker_threads: None,
			connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
			handshake_timeout_ms: DEFAULT_HANDSHAKE_TIMEOUT_MS,
			close_timeout_ms: None,
			user_agent: concat!("wslane/", env!("CARGO_PKG_VERSION")).to_string(),
			verbose: false,
		}
	}
}

impl ClientConfig {
	pub fn connect_timeout(&self) -> Duration {
		Duration::from_millis(self.connect_timeout_ms)
	}

	pub fn handshake_timeout(&self) -> Duration {
		Duration::from_millis(self.handshake_timeout_ms)
	}

	pub fn close_timeout(&self) -> Option<Duration> {
		self.close_timeout_ms.map(Duration::from_millis)
	}

	pub fn with_worker_threads(mut self, threads: usize) -> Self {
		self.worker_threads = Some(threads.max(1));
		self
	}

	pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
		self.connect_timeout_ms = timeout.as_millis() as u64;
		self
	}

	pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
		self.handshake_timeout_ms = timeout.as_millis() as u64;
		self
	}

	pub fn with_close_timeout(mut self, timeout: Option<Duration>) -> Self {
		self.close_timeout_ms = timeout.map(|t| t.as_millis() as u64);
		self
	}

	pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
		self.user_agent = user_agent.into();
		self
	}

	pub fn with_verbose(mut self, verbose: bool) -> Self {
		self.verbose = verbose;
		self
	}
}
