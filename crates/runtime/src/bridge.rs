//! Blocking bridge between the synchronous API and session lanes.
//!
//! The caller submits work with a `oneshot` sender and parks on the receiver
//! until the lane finishes that one operation. A dropped sender means the
//! lane was torn down before answering, which surfaces as
//! [`Error::Cancelled`].

use tokio::runtime::{Handle as RuntimeHandle, RuntimeFlavor};
use tokio::sync::oneshot;

use crate::error::{Error, Result};

/// Blocks the current thread until `rx` resolves.
///
/// Works from plain threads and from multi-thread runtime workers (via
/// `block_in_place`). Current-thread runtimes cannot block and get
/// [`Error::BlockingContext`].
pub(crate) fn wait<T>(rx: oneshot::Receiver<T>) -> Result<T> {
	let recv = move || rx.blocking_recv().map_err(|_| Error::Cancelled);

	match RuntimeHandle::try_current() {
		Err(_) => recv(),
		Ok(rt) if rt.runtime_flavor() == RuntimeFlavor::MultiThread => tokio::task::block_in_place(recv),
		Ok(_) => Err(Error::BlockingContext),
	}
}

/// Fails fast when [`wait`] would be rejected on this thread, so callers can
/// bail out before submitting work they could never wait for.
pub(crate) fn ensure_can_block() -> Result<()> {
	match RuntimeHandle::try_current() {
		Ok(rt) if rt.runtime_flavor() != RuntimeFlavor::MultiThread => Err(Error::BlockingContext),
		_ => Ok(()),
	}
}
