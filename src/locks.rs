use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::{AvatarError, Result};

/// Registry of named mutexes created on demand.
///
/// Each name gets its own lock, so callers working on different names
/// never contend. Entries nobody holds anymore are dropped on the next
/// acquisition, keeping the map bounded by the number of names in use.
#[derive(Debug)]
pub struct LockManager {
    label: String,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl LockManager {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn handle(&self, name: &str) -> Result<Arc<Mutex<()>>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| AvatarError::Lock(self.label.clone()))?;
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        let lock = locks
            .entry(name.to_owned())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        Ok(lock)
    }

    /// Run `f` while holding the lock named `name`.
    ///
    /// The lock is released when `f` returns, whether it succeeded,
    /// failed or panicked.
    pub fn with_lock<T>(
        &self,
        name: &str,
        f: impl FnOnce() -> Result<T>,
    ) -> Result<T> {
        let lock = self.handle(name)?;
        log::debug!("{}: acquiring lock {}", self.label, name);
        // The mutex guards no data, a panic inside a previous holder
        // leaves nothing to repair.
        let _guard = lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f()
    }

    /// Number of names currently tracked.
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .map(|locks| locks.len())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
