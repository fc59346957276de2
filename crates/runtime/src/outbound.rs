//! Per-session FIFO of pending text messages.
//!
//! The head of the queue is the message currently being written. A write is
//! started only when the queue goes from empty to one element; afterwards the
//! write-completion path advances the queue, so at most one write is ever in
//! flight and messages leave in submission order.

use std::collections::VecDeque;

#[derive(Debug, Default)]
pub struct OutboundQueue {
	pending: VecDeque<String>,
}

impl OutboundQueue {
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a payload. Returns true when the caller must start a write of
	/// the head (nothing was in flight before this call).
	pub fn enqueue(&mut self, payload: String) -> bool {
		self.pending.push_back(payload);
		self.pending.len() == 1
	}

	/// The message in flight, if any.
	pub fn head(&self) -> Option<&str> {
		self.pending.front().map(String::as_str)
	}

	/// Drops the head that was just written and returns the next one to write.
	pub fn complete(&mut self) -> Option<&str> {
		self.pending.pop_front();
		self.head()
	}

	/// Drops every pending message, returning how many were discarded.
	pub fn discard(&mut self) -> usize {
		let dropped = self.pending.len();
		self.pending.clear();
		dropped
	}

	pub fn len(&self) -> usize {
		self.pending.len()
	}

	pub fn is_empty(&self) -> bool {
		self.pending.is_empty()
	}
}
