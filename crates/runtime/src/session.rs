//! Session task: the connection state machine running on its lane.
//!
//! # Lifecycle
//!
//! 1. `establish()` runs resolve → connect → handshake as one linear async
//!    sequence. Only the connect step carries a timeout.
//! 2. The caller blocked in `connect` is released with the outcome.
//! 3. `drive()` multiplexes the lane's command queue, the single in-flight
//!    read, the single in-flight write, the optional close deadline and the
//!    client's teardown signal until the session reaches a terminal state.
//! 4. `finish()` retires the handle, fires `on_disconnect` and releases any
//!    callers waiting on `disconnect`.
//!
//! Dropping the task at any point (pool shutdown) cancels in-flight I/O
//! without reporting it and fires `on_disconnect` from the dispatcher's drop.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use crate::config::ClientConfig;
use crate::diag::{Diagnostics, verbose};
use crate::dispatch::{Callbacks, Dispatcher};
use crate::error::{Error, Result};
use crate::lane::{Command, Lane, LaneInbox};
use crate::outbound::OutboundQueue;
use crate::registry::{Handle, Registry};
use crate::state::SessionState;
use crate::target::Target;
use crate::transport::{self, ReadFuture, WriteFuture, WsSink, WsSource, WsStream};

/// Everything a session task needs from the client that spawned it.
pub(crate) struct SessionParts {
	pub(crate) handle: Handle,
	pub(crate) target: Target,
	pub(crate) config: Arc<ClientConfig>,
	pub(crate) callbacks: Callbacks,
	pub(crate) diag: Diagnostics,
	pub(crate) registry: Arc<Registry<Lane>>,
	pub(crate) lane: Arc<Lane>,
	pub(crate) inbox: LaneInbox,
	pub(crate) teardown: watch::Receiver<bool>,
}

// Field order is drop order: transport first, then the lane reference (the
// registry entry expires), then the dispatcher's teardown callback.
pub(crate) struct Session {
	reading: Option<ReadFuture>,
	writing: Option<WriteFuture>,
	sink: Option<WsSink>,
	_lane: Arc<Lane>,
	dispatcher: Dispatcher,

	handle: Handle,
	target: Target,
	config: Arc<ClientConfig>,
	diag: Diagnostics,
	registry: Arc<Registry<Lane>>,
	commands: mpsc::UnboundedReceiver<Command>,
	state_tx: watch::Sender<SessionState>,
	teardown: watch::Receiver<bool>,

	state: SessionState,
	queue: OutboundQueue,
	close_requested: bool,
	close_sent: bool,
	peer_closed: bool,
	close_deadline: Option<Instant>,
	waiters: Vec<oneshot::Sender<bool>>,
}

impl Session {
	pub(crate) fn new(parts: SessionParts) -> Self {
		let SessionParts {
			handle,
			target,
			config,
			callbacks,
			diag,
			registry,
			lane,
			inbox,
			teardown,
		} = parts;

		Self {
			reading: None,
			writing: None,
			sink: None,
			_lane: lane,
			dispatcher: Dispatcher::new(handle, callbacks, diag.clone()),
			handle,
			target,
			config,
			diag,
			registry,
			commands: inbox.commands,
			state_tx: inbox.state,
			teardown,
			state: SessionState::Idle,
			queue: OutboundQueue::new(),
			close_requested: false,
			close_sent: false,
			peer_closed: false,
			close_deadline: None,
			waiters: Vec::new(),
		}
	}

	/// Runs the session to completion. `connected` receives the outcome of
	/// the connect phase.
	pub(crate) async fn run(mut self, connected: oneshot::Sender<Result<()>>) {
		let mut teardown = self.teardown.clone();
		let established = tokio::select! {
			result = self.establish() => result,
			() = torn_down(&mut teardown) => Err(Error::Cancelled),
		};

		match established {
			Ok(ws) => {
				let (sink, source) = ws.split();
				self.sink = Some(sink);
				self.reading = Some(transport::read_next(source));
				self.transition(SessionState::Open);
				self.dispatcher.arm_disconnect();
				let _ = connected.send(Ok(()));
			}
			Err(err) => {
				self.transition(SessionState::Failed);
				self.dispatcher.fail(&err);
				self.registry.forget(self.handle);
				let _ = connected.send(Err(err));
				return;
			}
		}

		self.drive().await;
		verbose!(self.diag, handle = %self.handle, state = %self.state, "lane finished");
	}

	async fn establish(&mut self) -> Result<WsStream> {
		self.transition(SessionState::Resolving);
		let addrs = transport::resolve(&self.target).await?;
		verbose!(self.diag, handle = %self.handle, addresses = addrs.len(), "resolved {}", self.target.host);

		self.transition(SessionState::Connecting);
		let stream = transport::connect(&addrs, self.config.connect_timeout()).await?;

		self.transition(SessionState::Handshaking);
		transport::handshake(&self.target, stream, &self.config.user_agent, self.config.handshake_timeout()).await
	}

	async fn drive(&mut self) {
		while !self.state.is_terminal() {
			let close_deadline = self.close_deadline;
			tokio::select! {
				command = self.commands.recv() => match command {
					Some(command) => self.on_command(command),
					None => break,
				},
				(source, frame) = next_read(&mut self.reading) => {
					self.reading = None;
					self.on_read(source, frame);
				}
				(sink, result) = next_write(&mut self.writing) => {
					self.writing = None;
					self.on_write_complete(sink, result);
				}
				() = sleep_until(close_deadline) => {
					self.close_deadline = None;
					let millis = self.config.close_timeout_ms.unwrap_or_default();
					self.close_failed(Error::Close(format!("timed out after {millis}ms")));
				}
				() = torn_down(&mut self.teardown) => {
					self.dispatcher.fail(&Error::Cancelled);
					self.finish(SessionState::Closed);
				}
			}
		}
	}

	fn on_command(&mut self, command: Command) {
		match command {
			Command::Send { payload, ack } => {
				let accepted = self.state == SessionState::Open;
				if accepted {
					self.enqueue(payload);
				} else {
					verbose!(self.diag, handle = %self.handle, state = %self.state, "send rejected");
				}
				if let Some(ack) = ack {
					let _ = ack.send(accepted);
				}
			}
			Command::Disconnect { ack } => match self.state {
				SessionState::Open => {
					verbose!(self.diag, handle = %self.handle, "disconnecting");
					self.transition(SessionState::Closing);
					self.close_requested = true;
					self.close_deadline = self.config.close_timeout().map(|t| Instant::now() + t);
					self.waiters.extend(ack);
					if self.writing.is_none() && self.queue.is_empty() {
						self.send_close();
					}
				}
				SessionState::Closing => self.waiters.extend(ack),
				_ => {
					if let Some(ack) = ack {
						let _ = ack.send(false);
					}
				}
			},
		}
	}

	fn enqueue(&mut self, payload: String) {
		verbose!(self.diag, handle = %self.handle, pending = self.queue.len(), "queueing {payload:?}");
		if self.queue.enqueue(payload) {
			self.start_write();
		}
	}

	/// Starts writing the queue head. Callers guarantee nothing is in flight.
	fn start_write(&mut self) {
		let Some(sink) = self.sink.take() else {
			tracing::warn!(handle = %self.handle, "write requested while sink is busy");
			return;
		};
		let Some(head) = self.queue.head() else {
			self.sink = Some(sink);
			return;
		};
		let frame = Message::Text(head.to_owned());
		self.writing = Some(transport::write_frame(sink, frame));
	}

	fn send_close(&mut self) {
		let Some(sink) = self.sink.take() else {
			tracing::warn!(handle = %self.handle, "close requested while sink is busy");
			return;
		};
		self.close_sent = true;
		self.writing = Some(transport::write_frame(sink, transport::normal_close()));
	}

	fn on_write_complete(&mut self, sink: WsSink, result: std::result::Result<(), WsError>) {
		self.sink = Some(sink);

		if let Err(err) = result {
			if self.peer_closed {
				tracing::debug!(handle = %self.handle, error = %err, "write after peer close dropped");
			} else if self.close_sent {
				self.close_failed(Error::Close(err.to_string()));
			} else {
				self.fail(Error::Write(err.to_string()));
			}
			return;
		}

		if self.close_sent {
			verbose!(self.diag, handle = %self.handle, "close frame sent");
			return;
		}

		if self.queue.complete().is_some() {
			self.start_write();
		} else if self.close_requested {
			self.send_close();
		}
	}

	fn on_read(&mut self, source: WsSource, frame: Option<std::result::Result<Message, WsError>>) {
		match frame {
			Some(Ok(Message::Text(text))) => {
				// The frame is fully consumed before the host sees it.
				self.dispatcher.data(&text);
				self.reading = Some(transport::read_next(source));
			}
			Some(Ok(Message::Close(frame))) => {
				verbose!(self.diag, handle = %self.handle, frame = ?frame, "close frame received");
				if self.state == SessionState::Open {
					self.peer_closed = true;
					self.transition(SessionState::Closing);
					let dropped = self.queue.discard();
					if dropped > 0 {
						tracing::debug!(handle = %self.handle, dropped, "peer closed; pending messages dropped");
					}
				}
				// Keep reading so the close reply is flushed and the stream ends.
				self.reading = Some(transport::read_next(source));
			}
			Some(Ok(other)) => {
				tracing::trace!(handle = %self.handle, len = other.len(), "skipping non-text frame");
				self.reading = Some(transport::read_next(source));
			}
			Some(Err(err)) if transport::is_clean_end(&err) => self.finish(SessionState::Closed),
			Some(Err(err)) if self.peer_closed => {
				tracing::debug!(handle = %self.handle, error = %err, "stream ended after peer close");
				self.finish(SessionState::Closed);
			}
			None => self.finish(SessionState::Closed),
			Some(Err(err)) => {
				if self.state == SessionState::Closing {
					self.close_failed(Error::Close(err.to_string()));
				} else {
					self.fail(Error::Read(err.to_string()));
				}
			}
		}
	}

	fn fail(&mut self, err: Error) {
		self.dispatcher.fail(&err);
		self.finish(SessionState::Failed);
	}

	/// Disconnect-phase errors are reported but still end in `Closed`.
	fn close_failed(&mut self, err: Error) {
		self.dispatcher.fail(&err);
		self.finish(SessionState::Closed);
	}

	fn finish(&mut self, terminal: SessionState) {
		self.transition(terminal);

		let dropped = self.queue.discard();
		if dropped > 0 {
			tracing::debug!(handle = %self.handle, dropped, "pending messages discarded");
		}
		self.reading = None;
		self.writing = None;
		self.sink = None;
		self.close_deadline = None;

		self.registry.forget(self.handle);
		self.dispatcher.disconnect();
		for waiter in self.waiters.drain(..) {
			let _ = waiter.send(true);
		}
	}

	fn transition(&mut self, next: SessionState) {
		if !self.state.can_transition_to(next) {
			tracing::warn!(handle = %self.handle, from = %self.state, to = %next, "illegal transition ignored");
			return;
		}
		verbose!(self.diag, handle = %self.handle, from = %self.state, to = %next, "state changed");
		self.state = next;
		self.state_tx.send_replace(next);
	}

	#[cfg(test)]
	pub(crate) fn lane(&self) -> &Arc<Lane> {
		&self._lane
	}
}

async fn next_read(slot: &mut Option<ReadFuture>) -> (WsSource, Option<std::result::Result<Message, WsError>>) {
	match slot {
		Some(read) => read.await,
		None => std::future::pending().await,
	}
}

async fn next_write(slot: &mut Option<WriteFuture>) -> (WsSink, std::result::Result<(), WsError>) {
	match slot {
		Some(write) => write.await,
		None => std::future::pending().await,
	}
}

async fn sleep_until(deadline: Option<Instant>) {
	match deadline {
		Some(deadline) => tokio::time::sleep_until(deadline).await,
		None => std::future::pending().await,
	}
}

/// Resolves once the client signals teardown or goes away.
async fn torn_down(signal: &mut watch::Receiver<bool>) {
	while !*signal.borrow_and_update() {
		if signal.changed().await.is_err() {
			return;
		}
	}
}
