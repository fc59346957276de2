//! Synchronous host-facing API.
//!
//! Every call resolves the handle, submits one command to the session's lane
//! and blocks only until the lane has finished that command. Sessions run on
//! the client's worker pool; the calling thread is never used for I/O.

use std::sync::Arc;

use tokio::runtime::Handle as RuntimeHandle;
use tokio::sync::{oneshot, watch};

use crate::bridge;
use crate::config::ClientConfig;
use crate::diag::{Diagnostics, verbose};
use crate::dispatch::Callbacks;
use crate::error::{Error, Result};
use crate::executor::Executor;
use crate::lane::{self, Command, Lane};
use crate::registry::{Handle, Registry};
use crate::session::{Session, SessionParts};
use crate::state::SessionState;
use crate::target::Target;

/// WebSocket client managing any number of concurrent sessions.
///
/// ```ignore
/// let client = Client::new()?;
/// let handle = client.connect("ws://localhost:8080/chat", Callbacks::new().on_data(|h, text| {
///     println!("{h}: {text}");
/// }));
/// client.send(handle, "ping");
/// client.disconnect(handle);
/// ```
pub struct Client {
	config: Arc<ClientConfig>,
	registry: Arc<Registry<Lane>>,
	diag: Diagnostics,
	teardown: watch::Sender<bool>,
	executor: Executor,
}

impl Client {
	/// Client with default settings and its own worker pool.
	pub fn new() -> Result<Self> {
		ClientBuilder::new().build()
	}

	pub fn builder() -> ClientBuilder {
		ClientBuilder::new()
	}

	/// Opens a session and blocks until the connect phase finishes.
	///
	/// Returns [`Handle::NONE`] for a malformed URL (no callback fires) or a
	/// failed connect (`on_fail` has already fired).
	pub fn connect(&self, url: &str, callbacks: Callbacks) -> Handle {
		match self.try_connect(url, callbacks) {
			Ok(handle) => handle,
			Err(err) => {
				tracing::debug!(url, error = %err, "connect returned no handle");
				Handle::NONE
			}
		}
	}

	/// Like [`Client::connect`], but tells the caller why no handle was issued.
	pub fn try_connect(&self, url: &str, callbacks: Callbacks) -> Result<Handle> {
		let target = Target::parse(url)?;
		bridge::ensure_can_block()?;

		let (lane, inbox) = Lane::new();
		let lane = Arc::new(lane);
		let handle = self.registry.register(&lane);
		verbose!(self.diag, handle = %handle, target = %target, "connecting");

		let session = Session::new(SessionParts {
			handle,
			target,
			config: Arc::clone(&self.config),
			callbacks,
			diag: self.diag.clone(),
			registry: Arc::clone(&self.registry),
			lane,
			inbox,
			teardown: self.teardown.subscribe(),
		});

		let (connected_tx, connected_rx) = oneshot::channel();
		self.executor.spawn(session.run(connected_tx));

		bridge::wait(connected_rx)??;
		verbose!(self.diag, handle = %handle, "connected");
		Ok(handle)
	}

	/// Queues a text message. `true` means the session accepted it, not that
	/// it reached the peer.
	pub fn send(&self, handle: Handle, message: &str) -> bool {
		self.submit(handle, "send", |ack| Command::Send {
			payload: message.to_owned(),
			ack,
		})
	}

	/// Closes the session and blocks until it is torn down. `false` if the
	/// handle was unknown, expired, or not open.
	pub fn disconnect(&self, handle: Handle) -> bool {
		self.submit(handle, "disconnect", |ack| Command::Disconnect { ack })
	}

	/// Best-effort liveness check; may race with a concurrent teardown.
	pub fn is_connected(&self, handle: Handle) -> bool {
		self.state(handle).is_some_and(|state| !state.is_terminal())
	}

	/// Last state published by a live session.
	pub fn state(&self, handle: Handle) -> Option<SessionState> {
		self.registry.resolve(handle).map(|lane| lane.state())
	}

	/// Handles that currently resolve to a session.
	pub fn active_sessions(&self) -> Vec<Handle> {
		self.registry.live_handles()
	}

	pub fn set_verbose(&self, enabled: bool) {
		self.diag.set_verbose(enabled);
	}

	pub fn is_verbose(&self) -> bool {
		self.diag.is_verbose()
	}

	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// True when sessions run on a pool this client built and will stop.
	pub fn owns_worker_pool(&self) -> bool {
		self.executor.is_owned()
	}

	/// Tears down every session and stops an owned worker pool.
	///
	/// Sessions that reached `Open` get `on_disconnect`; in-flight I/O is
	/// cancelled without `on_fail`. Idempotent; also runs on drop.
	pub fn shutdown(&self) {
		if self.teardown.send_replace(true) {
			return;
		}
		tracing::debug!(sessions = self.registry.len(), "shutting down client");
		self.executor.shutdown();
	}

	fn submit(&self, handle: Handle, op: &'static str, command: impl FnOnce(Option<oneshot::Sender<bool>>) -> Command) -> bool {
		match self.try_submit(handle, command) {
			Ok(accepted) => accepted,
			Err(err) => {
				verbose!(self.diag, handle = %handle, op, error = %err, "call ignored");
				false
			}
		}
	}

	fn try_submit(&self, handle: Handle, command: impl FnOnce(Option<oneshot::Sender<bool>>) -> Command) -> Result<bool> {
		let lane = self.registry.resolve(handle).ok_or(Error::SessionNotFound(handle))?;

		// Called from one of this session's own callbacks: the lane is busy
		// running us, so queue behind the current event instead of waiting.
		if lane::current() == Some(handle) {
			return Ok(lane.submit(command(None)));
		}

		let (ack_tx, ack_rx) = oneshot::channel();
		if !lane.submit(command(Some(ack_tx))) {
			return Err(Error::SessionNotFound(handle));
		}
		drop(lane);

		// A lane torn down before answering reports `Cancelled`.
		bridge::wait(ack_rx)
	}
}

impl Drop for Client {
	fn drop(&mut self) {
		self.shutdown();
	}
}

/// Configures a [`Client`] before it starts.
#[derive(Debug, Default)]
pub struct ClientBuilder {
	config: ClientConfig,
	runtime: Option<RuntimeHandle>,
}

impl ClientBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn config(mut self, config: ClientConfig) -> Self {
		self.config = config;
		self
	}

	/// Runs sessions on an existing multi-thread runtime instead of an owned
	/// pool. `worker_threads` is ignored in that case.
	pub fn runtime_handle(mut self, handle: RuntimeHandle) -> Self {
		self.runtime = Some(handle);
		self
	}

	pub fn build(self) -> Result<Client> {
		let executor = match self.runtime {
			Some(handle) => Executor::shared(handle),
			None => Executor::owned(self.config.worker_threads)?,
		};
		let diag = Diagnostics::new(self.config.verbose);
		let (teardown, _) = watch::channel(false);

		tracing::debug!(owned_pool = executor.is_owned(), "client started");
		Ok(Client {
			config: Arc::new(self.config),
			registry: Arc::new(Registry::new()),
			diag,
			teardown,
			executor,
		})
	}
}
