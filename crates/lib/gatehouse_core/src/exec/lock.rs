//! Execution lock registry.
//!
//! Membership of a session id means an execution is in flight for it.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Set of session ids with an execution in flight.
#[derive(Debug, Default)]
pub struct ExecLockRegistry {
    held: Mutex<HashSet<String>>,
}

impl ExecLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the set cannot leave it half-updated.
    fn held(&self) -> MutexGuard<'_, HashSet<String>> {
        self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_locked(&self, session_id: &str) -> bool {
        self.held().contains(session_id)
    }

    pub fn lock(&self, session_id: &str) {
        self.held().insert(session_id.to_string());
    }

    /// Release a session id. No-op when it is not held.
    pub fn unlock(&self, session_id: &str) {
        self.held().remove(session_id);
    }

    /// Test-and-set in one critical section. Returns `None` when the id is
    /// already held; otherwise the returned guard releases it on drop.
    pub fn acquire(self: &Arc<Self>, session_id: &str) -> Option<ExecLockGuard> {
        if !self.held().insert(session_id.to_string()) {
            return None;
        }
        Some(ExecLockGuard {
            registry: Arc::clone(self),
            session_id: session_id.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.held().len()
    }

    pub fn is_empty(&self) -> bool {
        self.held().is_empty()
    }
}

/// Holds a session id in the registry until dropped.
#[derive(Debug)]
pub struct ExecLockGuard {
    registry: Arc<ExecLockRegistry>,
    session_id: String,
}

impl ExecLockGuard {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

impl Drop for ExecLockGuard {
    fn drop(&mut self) {
        self.registry.unlock(&self.session_id);
    }
}
