//! Error types for the session engine.

use std::time::Duration;

use thiserror::Error;

use crate::registry::Handle;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving a session.
///
/// The `Display` form of the network variants is `"<phase>: <detail>"`, which
/// is the message handed to `on_fail`.
#[derive(Debug, Error)]
pub enum Error {
	/// URL did not match `ws[s]://host:port[/path]`.
	#[error("invalid url '{0}'. Correct example: ws://localhost:8080/")]
	InvalidUrl(String),

	/// Handle is unknown, expired or already retired.
	#[error("session {0} is not active")]
	SessionNotFound(Handle),

	/// Name resolution failed or produced no addresses.
	#[error("resolve: {0}")]
	Resolve(String),

	/// Transport-level connect failed.
	#[error("connect: {0}")]
	Connect(String),

	/// Transport-level connect did not finish in time.
	#[error("connect: timed out after {}ms", .0.as_millis())]
	ConnectTimeout(Duration),

	/// WebSocket upgrade was rejected or broke off.
	#[error("handshake: {0}")]
	Handshake(String),

	/// Read failed after the session was open.
	#[error("read: {0}")]
	Read(String),

	/// Write failed after the session was open.
	#[error("write: {0}")]
	Write(String),

	/// Close handshake failed or timed out.
	#[error("close: {0}")]
	Close(String),

	/// The operation was aborted because its session is being torn down.
	#[error("operation cancelled")]
	Cancelled,

	/// A blocking API call was made from a runtime that cannot block.
	#[error("blocking call from a current-thread runtime; use a multi-thread runtime")]
	BlockingContext,

	/// The worker pool could not be created.
	#[error("runtime error: {0}")]
	Runtime(#[from] std::io::Error),
}

impl Error {
	/// Returns true for aborts caused by intentional teardown.
	///
	/// These are diagnostic-only and never reach `on_fail`.
	pub fn is_cancelled(&self) -> bool {
		matches!(self, Error::Cancelled)
	}

	/// Returns true for failures of the resolve/connect/handshake pipeline.
	pub fn is_connect_phase(&self) -> bool {
		matches!(
			self,
			Error::Resolve(_) | Error::Connect(_) | Error::ConnectTimeout(_) | Error::Handshake(_)
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn network_errors_are_prefixed_with_their_phase() {
		assert_eq!(Error::Resolve("no such host".into()).to_string(), "resolve: no such host");
		assert_eq!(Error::Write("broken pipe".into()).to_string(), "write: broken pipe");
		assert_eq!(
			Error::ConnectTimeout(Duration::from_secs(30)).to_string(),
			"connect: timed out after 30000ms"
		);
	}

	#[test]
	fn classification() {
		assert!(Error::Cancelled.is_cancelled());
		assert!(!Error::Read("eof".into()).is_cancelled());
		assert!(Error::Handshake("404".into()).is_connect_phase());
		assert!(!Error::Close("reset".into()).is_connect_phase());
		assert!(Error::ConnectTimeout(Duration::from_secs(1)).is_connect_phase());
	}
}
