//! Serialized execution lane of a session.
//!
//! Each session runs as one task on the worker pool. That task is the lane:
//! it owns all session state and drains a FIFO of [`Command`]s, so a session's
//! operations and callbacks execute one at a time while other sessions run
//! in parallel on other workers. Callers reach a session only through
//! [`Lane::submit`], never by touching its fields.

use std::cell::Cell;

use tokio::sync::{mpsc, oneshot, watch};

use crate::registry::Handle;
use crate::state::SessionState;

/// Work submitted to a lane from a caller thread.
///
/// `ack` is `None` for re-entrant calls made from inside one of the lane's own
/// callbacks; those cannot wait for the lane they are running on.
#[derive(Debug)]
pub(crate) enum Command {
	Send {
		payload: String,
		ack: Option<oneshot::Sender<bool>>,
	},
	Disconnect {
		ack: Option<oneshot::Sender<bool>>,
	},
}

/// Caller-side endpoint of a session lane; this is what the registry points to.
///
/// The lane task holds the only long-lived strong reference, so the registry
/// entry expires exactly when the task finishes.
#[derive(Debug)]
pub(crate) struct Lane {
	commands: mpsc::UnboundedSender<Command>,
	state: watch::Receiver<SessionState>,
}

/// Task-side ends created together with a [`Lane`].
pub(crate) struct LaneInbox {
	pub(crate) commands: mpsc::UnboundedReceiver<Command>,
	pub(crate) state: watch::Sender<SessionState>,
}

impl Lane {
	pub(crate) fn new() -> (Self, LaneInbox) {
		let (commands_tx, commands_rx) = mpsc::unbounded_channel();
		let (state_tx, state_rx) = watch::channel(SessionState::Idle);
		(
			Self {
				commands: commands_tx,
				state: state_rx,
			},
			LaneInbox {
				commands: commands_rx,
				state: state_tx,
			},
		)
	}

	/// Queues a command. Returns false once the lane task has finished.
	pub(crate) fn submit(&self, command: Command) -> bool {
		self.commands.send(command).is_ok()
	}

	/// Last state published by the lane.
	pub(crate) fn state(&self) -> SessionState {
		*self.state.borrow()
	}
}

thread_local! {
	static CURRENT: Cell<Option<Handle>> = const { Cell::new(None) };
}

/// Handle whose callback is running on this thread, if any.
pub(crate) fn current() -> Option<Handle> {
	CURRENT.with(Cell::get)
}

/// Marks the current thread as executing a callback of `handle`.
pub(crate) fn enter(handle: Handle) -> LaneScope {
	let prev = CURRENT.with(|c| c.replace(Some(handle)));
	LaneScope { prev }
}

pub(crate) struct LaneScope {
	prev: Option<Handle>,
}

impl Drop for LaneScope {
	fn drop(&mut self) {
		CURRENT.with(|c| c.set(self.prev));
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn scope_nests_and_restores() {
		assert_eq!(current(), None);
		{
			let _outer = enter(Handle::from_raw(1));
			{
				let _inner = enter(Handle::from_raw(2));
				assert_eq!(current(), Some(Handle::from_raw(2)));
			}
			assert_eq!(current(), Some(Handle::from_raw(1)));
		}
		assert_eq!(current(), None);
	}

	#[test]
	fn submit_fails_after_inbox_dropped() {
		let (lane, inbox) = Lane::new();
		assert!(lane.submit(Command::Disconnect { ack: None }));
		drop(inbox);
		assert!(!lane.submit(Command::Disconnect { ack: None }));
	}

	#[test]
	fn state_snapshot_follows_the_lane() {
		let (lane, inbox) = Lane::new();
		assert_eq!(lane.state(), SessionState::Idle);
		inbox.state.send_replace(SessionState::Open);
		assert_eq!(lane.state(), SessionState::Open);
	}
}
