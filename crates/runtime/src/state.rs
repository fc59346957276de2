//! Connection state machine states and the legal transition table.

use std::fmt;

/// Lifecycle state of a session.
///
/// Progression is linear: `Idle → Resolving → Connecting → Handshaking →
/// Open → Closing → Closed`. Any non-terminal state may fall into `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
	#[default]
	Idle,
	Resolving,
	Connecting,
	Handshaking,
	Open,
	Closing,
	Closed,
	Failed,
}

impl SessionState {
	/// `Closed` and `Failed` admit no further transitions.
	pub fn is_terminal(self) -> bool {
		matches!(self, SessionState::Closed | SessionState::Failed)
	}

	/// Whether `self → next` is an edge of the state machine.
	pub fn can_transition_to(self, next: SessionState) -> bool {
		use SessionState::*;
		match (self, next) {
			(Idle, Resolving)
			| (Resolving, Connecting)
			| (Connecting, Handshaking)
			| (Handshaking, Open)
			| (Open, Closing)
			| (Open, Closed)
			| (Closing, Closed) => true,
			(from, Failed) => !from.is_terminal(),
			_ => false,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			SessionState::Idle => "idle",
			SessionState::Resolving => "resolving",
			SessionState::Connecting => "connecting",
			SessionState::Handshaking => "handshaking",
			SessionState::Open => "open",
			SessionState::Closing => "closing",
			SessionState::Closed => "closed",
			SessionState::Failed => "failed",
		}
	}
}

impl fmt::Display for SessionState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
