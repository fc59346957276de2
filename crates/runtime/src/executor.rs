//! Worker pool shared by every session of a client.

use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::{Builder, Handle as RuntimeHandle, Runtime};

use crate::error::Result;

/// How long an owned pool gets to stop its workers on shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Either a pool owned by the client or a handle to the host's runtime.
pub(crate) struct Executor {
	handle: RuntimeHandle,
	owned: Mutex<Option<Runtime>>,
}

impl Executor {
	/// Builds a multi-thread pool with `wslane-worker` threads.
	pub(crate) fn owned(worker_threads: Option<usize>) -> Result<Self> {
		let mut builder = Builder::new_multi_thread();
		builder.enable_all().thread_name("wslane-worker");
		if let Some(threads) = worker_threads {
			builder.worker_threads(threads);
		}
		let runtime = builder.build()?;

		Ok(Self {
			handle: runtime.handle().clone(),
			owned: Mutex::new(Some(runtime)),
		})
	}

	/// Runs sessions on a runtime owned by the host.
	pub(crate) fn shared(handle: RuntimeHandle) -> Self {
		Self {
			handle,
			owned: Mutex::new(None),
		}
	}

	pub(crate) fn spawn<F>(&self, future: F)
	where
		F: Future<Output = ()> + Send + 'static,
	{
		drop(self.handle.spawn(future));
	}

	pub(crate) fn is_owned(&self) -> bool {
		self.owned.lock().is_some()
	}

	/// Stops an owned pool, dropping every task still on it. No-op for a
	/// shared runtime.
	pub(crate) fn shutdown(&self) {
		// Take the runtime out first: dropping tasks may run host callbacks
		// that end up back here.
		let runtime = self.owned.lock().take();
		let Some(runtime) = runtime else {
			return;
		};

		if RuntimeHandle::try_current().is_ok() {
			runtime.shutdown_background();
		} else {
			runtime.shutdown_timeout(SHUTDOWN_GRACE);
		}
		tracing::debug!("worker pool stopped");
	}
}

impl Drop for Executor {
	fn drop(&mut self) {
		self.shutdown();
	}
}
