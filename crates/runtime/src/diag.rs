//! Diagnostic verbosity toggle.
//!
//! Lifecycle chatter goes through [`verbose!`]: `info` while the toggle is on,
//! `trace` otherwise, so a subscriber at the default level stays quiet.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared verbosity flag, cloned into every session lane.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
	verbose: Arc<AtomicBool>,
}

impl Diagnostics {
	pub fn new(verbose: bool) -> Self {
		Self {
			verbose: Arc::new(AtomicBool::new(verbose)),
		}
	}

	pub fn is_verbose(&self) -> bool {
		self.verbose.load(Ordering::Relaxed)
	}

	/// Flips the toggle for every session sharing this handle.
	pub fn set_verbose(&self, enabled: bool) {
		self.verbose.store(enabled, Ordering::Relaxed);
	}
}

macro_rules! verbose {
	($diag:expr, $($arg:tt)+) => {
		if $diag.is_verbose() {
			tracing::info!($($arg)+)
		} else {
			tracing::trace!($($arg)+)
		}
	};
}

pub(crate) use verbose;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn toggle_is_shared_between_clones() {
		let diag = Diagnostics::new(false);
		let lane_copy = diag.clone();
		diag.set_verbose(true);
		assert!(lane_copy.is_verbose());
		verbose!(lane_copy, handle = 1, "macro expands with fields");
	}
}
