use std::sync::{Mutex, MutexGuard, PoisonError};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Exclusive access to the process environment for one test. Variables
/// changed through it are put back when it drops, before the lock is
/// released.
pub(super) struct ScopedEnv {
    saved: Vec<(&'static str, Option<String>)>,
    _lock: MutexGuard<'static, ()>,
}

impl ScopedEnv {
    pub(super) fn new() -> Self {
        Self {
            saved: Vec::new(),
            _lock: ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }

    pub(super) fn set(mut self, key: &'static str, value: &str) -> Self {
        self.remember(key);
        // SAFETY: ENV_LOCK is held for the lifetime of `self`.
        unsafe { std::env::set_var(key, value) };
        self
    }

    pub(super) fn unset(mut self, key: &'static str) -> Self {
        self.remember(key);
        // SAFETY: ENV_LOCK is held for the lifetime of `self`.
        unsafe { std::env::remove_var(key) };
        self
    }

    fn remember(&mut self, key: &'static str) {
        if !self.saved.iter().any(|(saved, _)| *saved == key) {
            self.saved.push((key, std::env::var(key).ok()));
        }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (key, previous) in self.saved.drain(..).rev() {
            // SAFETY: `_lock` is dropped after this body runs.
            unsafe {
                match previous {
                    Some(value) => std::env::set_var(key, value),
                    None => std::env::remove_var(key),
                }
            }
        }
    }
}
