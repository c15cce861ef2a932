//! Keyed serialization locks.
//!
//! One registry serializes per-order work: every lifecycle transition,
//! and every read that must observe a consistent order+dispute pair,
//! acquires the order's mutex for the duration of its read-check-write.
//! A second registry does the same for executor profiles, whose
//! read-modify-writes span orders. Locks are allocated lazily, one per
//! key, and kept for the life of the process.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Registry of keyed async mutexes.
#[derive(Default)]
pub(crate) struct LockRegistry {
	locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl LockRegistry {
	pub(crate) fn new() -> Self {
		Self::default()
	}

	/// Acquires the lock for the given key, creating it on first use.
	///
	/// The returned guard owns the lock; holding it serializes all
	/// read-check-writes for that key.
	pub(crate) async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
		let lock = {
			// The map guard is synchronous and must not be held across
			// the await below.
			let mut locks = self.locks.lock().expect("lock registry poisoned");
			locks
				.entry(key.to_string())
				.or_insert_with(|| Arc::new(AsyncMutex::new(())))
				.clone()
		};
		lock.lock_owned().await
	}
}
