//! Delivery of session events to host callbacks.
//!
//! Every callback runs on the session's lane, so callbacks of one session
//! never overlap. A panicking callback is caught and logged here and cannot
//! unwind into the engine.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use crate::diag::{Diagnostics, verbose};
use crate::error::Error;
use crate::lane;
use crate::registry::Handle;

pub type FailCallback = Arc<dyn Fn(Handle, &str) + Send + Sync>;
pub type DisconnectCallback = Arc<dyn Fn(Handle) + Send + Sync>;
pub type DataCallback = Arc<dyn Fn(Handle, &str) + Send + Sync>;

/// Host callbacks registered with a session. All of them are optional.
///
/// ```ignore
/// let callbacks = Callbacks::new()
///     .on_data(|h, text| println!("{h}: {text}"))
///     .on_disconnect(|h| println!("{h} closed"));
/// ```
#[derive(Clone, Default)]
pub struct Callbacks {
	on_fail: Option<FailCallback>,
	on_disconnect: Option<DisconnectCallback>,
	on_data: Option<DataCallback>,
}

impl Callbacks {
	pub fn new() -> Self {
		Self::default()
	}

	/// Called with a `"<phase>: <detail>"` message when the session fails.
	pub fn on_fail(mut self, f: impl Fn(Handle, &str) + Send + Sync + 'static) -> Self {
		self.on_fail = Some(Arc::new(f));
		self
	}

	/// Called at most once, when an open session is torn down.
	pub fn on_disconnect(mut self, f: impl Fn(Handle) + Send + Sync + 'static) -> Self {
		self.on_disconnect = Some(Arc::new(f));
		self
	}

	/// Called for every received text message, in arrival order.
	pub fn on_data(mut self, f: impl Fn(Handle, &str) + Send + Sync + 'static) -> Self {
		self.on_data = Some(Arc::new(f));
		self
	}
}

impl fmt::Debug for Callbacks {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Callbacks")
			.field("on_fail", &self.on_fail.is_some())
			.field("on_disconnect", &self.on_disconnect.is_some())
			.field("on_data", &self.on_data.is_some())
			.finish()
	}
}

/// Lane-owned dispatcher for one session.
///
/// `on_disconnect` sits behind a take-once slot that is armed when the
/// session reaches `Open`. Whichever of explicit close, failure teardown or
/// drop gets there first consumes it.
pub(crate) struct Dispatcher {
	handle: Handle,
	on_fail: Option<FailCallback>,
	on_data: Option<DataCallback>,
	on_disconnect: Option<DisconnectCallback>,
	armed: bool,
	diag: Diagnostics,
}

impl Dispatcher {
	pub(crate) fn new(handle: Handle, callbacks: Callbacks, diag: Diagnostics) -> Self {
		Self {
			handle,
			on_fail: callbacks.on_fail,
			on_data: callbacks.on_data,
			on_disconnect: callbacks.on_disconnect,
			armed: false,
			diag,
		}
	}

	pub(crate) fn arm_disconnect(&mut self) {
		self.armed = true;
	}

	/// Reports a failure to the host unless it is a teardown cancellation.
	pub(crate) fn fail(&self, err: &Error) {
		if err.is_cancelled() {
			tracing::debug!(handle = %self.handle, error = %err, "operation cancelled during teardown");
			return;
		}

		tracing::warn!(handle = %self.handle, error = %err, "session failure");
		if let Some(cb) = &self.on_fail {
			let message = err.to_string();
			invoke(self.handle, "on_fail", || cb(self.handle, &message));
		}
	}

	pub(crate) fn data(&self, payload: &str) {
		verbose!(self.diag, handle = %self.handle, bytes = payload.len(), "received {payload:?}");
		if let Some(cb) = &self.on_data {
			invoke(self.handle, "on_data", || cb(self.handle, payload));
		}
	}

	/// Fires `on_disconnect` if armed and not yet fired. Returns whether it fired.
	pub(crate) fn disconnect(&mut self) -> bool {
		if !self.armed {
			return false;
		}
		let Some(cb) = self.on_disconnect.take() else {
			return false;
		};
		self.armed = false;

		verbose!(self.diag, handle = %self.handle, "dispatching on_disconnect");
		invoke(self.handle, "on_disconnect", || cb(self.handle));
		true
	}
}

impl Drop for Dispatcher {
	fn drop(&mut self) {
		self.disconnect();
	}
}

fn invoke(handle: Handle, callback: &'static str, f: impl FnOnce()) {
	let _lane = lane::enter(handle);
	if catch_unwind(AssertUnwindSafe(f)).is_err() {
		tracing::error!(handle = %handle, callback, "host callback panicked; suppressed");
	}
}
