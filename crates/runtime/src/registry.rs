//! Handle-indexed registry of live sessions.
//!
//! The registry maps [`Handle`]s to *non-owning* references. A session stays
//! alive only while its lane task (or an API call that resolved it) holds a
//! strong reference; once the last one drops, the entry reports expired and
//! is purged the next time the map is mutated.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

/// Opaque session identifier handed to the host.
///
/// Handles are issued in strictly increasing order starting at 1. The value
/// `0` ([`Handle::NONE`]) means "no session / operation failed".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Handle(u64);

impl Handle {
	/// The reserved "no session" handle.
	pub const NONE: Handle = Handle(0);

	/// Wraps a raw value received from the host.
	pub const fn from_raw(raw: u64) -> Self {
		Self(raw)
	}

	/// Returns the raw integer value.
	pub const fn get(self) -> u64 {
		self.0
	}

	/// Returns true for [`Handle::NONE`].
	pub const fn is_none(self) -> bool {
		self.0 == 0
	}
}

impl fmt::Display for Handle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

impl From<Handle> for u64 {
	fn from(handle: Handle) -> Self {
		handle.0
	}
}

struct Inner<T> {
	next: u64,
	entries: BTreeMap<Handle, Weak<T>>,
}

impl<T> Inner<T> {
	// O(n) over current entries; bounded by the active connection count.
	fn collect_expired(&mut self) -> usize {
		let before = self.entries.len();
		self.entries.retain(|_, weak| weak.strong_count() > 0);
		before - self.entries.len()
	}
}

/// Thread-safe handle → session lookup with lazy expiry.
///
/// One mutex guards the whole map. It is held only for bookkeeping and never
/// across an await point.
pub struct Registry<T> {
	inner: Mutex<Inner<T>>,
}

impl<T> Default for Registry<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T> Registry<T> {
	pub fn new() -> Self {
		Self {
			inner: Mutex::new(Inner {
				next: 1,
				entries: BTreeMap::new(),
			}),
		}
	}

	/// Stores a non-owning reference and returns its new handle.
	///
	/// Expired entries are collected first.
	pub fn register(&self, session: &Arc<T>) -> Handle {
		let mut inner = self.inner.lock();
		let purged = inner.collect_expired();
		if purged > 0 {
			tracing::trace!(purged, "registry collected expired sessions");
		}

		let handle = Handle(inner.next);
		inner.next += 1;
		inner.entries.insert(handle, Arc::downgrade(session));
		handle
	}

	/// Removes the mapping; returns whether an entry existed.
	pub fn forget(&self, handle: Handle) -> bool {
		let mut inner = self.inner.lock();
		inner.collect_expired();
		inner.entries.remove(&handle).is_some()
	}

	/// Returns a strong reference if the session is still alive.
	pub fn resolve(&self, handle: Handle) -> Option<Arc<T>> {
		if handle.is_none() {
			return None;
		}
		self.inner.lock().entries.get(&handle).and_then(Weak::upgrade)
	}

	/// Number of entries currently in the map, expired ones included.
	pub fn len(&self) -> usize {
		self.inner.lock().entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Handles that currently resolve to a live session, in ascending order.
	pub fn live_handles(&self) -> Vec<Handle> {
		self.inner
			.lock()
			.entries
			.iter()
			.filter(|(_, weak)| weak.strong_count() > 0)
			.map(|(handle, _)| *handle)
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn handles_are_strictly_increasing() {
		let registry = Registry::new();
		let sessions: Vec<_> = (0..5).map(Arc::new).collect();
		let handles: Vec<_> = sessions.iter().map(|s| registry.register(s)).collect();

		assert_eq!(handles[0], Handle::from_raw(1));
		assert!(handles.windows(2).all(|w| w[0] < w[1]));
	}

	#[test]
	fn handles_are_not_reused_after_collection() {
		let registry = Registry::new();
		let first = Arc::new("a");
		let h1 = registry.register(&first);
		drop(first);

		let second = Arc::new("b");
		let h2 = registry.register(&second);
		assert!(h2 > h1);
		assert_eq!(registry.len(), 1, "expired entry collected on register");
	}

	#[test]
	fn resolve_returns_live_session() {
		let registry = Registry::new();
		let session = Arc::new(42);
		let handle = registry.register(&session);

		let resolved = registry.resolve(handle).unwrap();
		assert_eq!(*resolved, 42);
		assert!(Arc::ptr_eq(&resolved, &session));
	}

	#[test]
	fn resolve_after_forget_is_not_found() {
		let registry = Registry::new();
		let session = Arc::new(());
		let handle = registry.register(&session);

		assert!(registry.forget(handle));
		assert!(registry.resolve(handle).is_none());
		assert!(!registry.forget(handle), "second forget finds nothing");
	}

	#[test]
	fn resolve_after_expiry_is_not_found() {
		let registry = Registry::new();
		let session = Arc::new(());
		let handle = registry.register(&session);
		drop(session);

		assert!(registry.resolve(handle).is_none());
		assert!(registry.live_handles().is_empty());
	}

	#[test]
	fn registry_does_not_keep_sessions_alive() {
		let registry = Registry::new();
		let session = Arc::new(String::from("s"));
		registry.register(&session);
		assert_eq!(Arc::strong_count(&session), 1);
	}

	#[test]
	fn none_handle_never_resolves() {
		let registry: Registry<()> = Registry::new();
		assert!(registry.resolve(Handle::NONE).is_none());
		assert!(Handle::NONE.is_none());
	}

	#[test]
	fn forget_collects_expired_entries() {
		let registry = Registry::new();
		let kept = Arc::new(1);
		let dropped = Arc::new(2);
		let h_kept = registry.register(&kept);
		registry.register(&dropped);
		drop(dropped);

		assert!(!registry.forget(Handle::from_raw(99)));
		assert_eq!(registry.live_handles(), vec![h_kept]);
		assert_eq!(registry.len(), 1);
	}

	#[test]
	fn concurrent_registration_yields_unique_handles() {
		let registry = Arc::new(Registry::new());
		let threads: Vec<_> = (0..8)
			.map(|_| {
				let registry = Arc::clone(&registry);
				std::thread::spawn(move || {
					let sessions: Vec<_> = (0..50).map(Arc::new).collect();
					let handles: Vec<_> = sessions.iter().map(|s| registry.register(s)).collect();
					(sessions, handles)
				})
			})
			.collect();

		let mut all = Vec::new();
		let mut keep = Vec::new();
		for t in threads {
			let (sessions, handles) = t.join().unwrap();
			keep.push(sessions);
			all.extend(handles);
		}
		all.sort();
		all.dedup();
		assert_eq!(all.len(), 400);
	}
}
