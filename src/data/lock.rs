//! Update Lock
//!
//! Single-writer gate for structural changes of a database. Writers
//! try-acquire the lock and get a guard; the lock is released when the guard
//! is dropped, on every exit path.

use std::sync::atomic::{AtomicBool, Ordering};

/// Single-writer mutation lock
#[derive(Debug, Default)]
pub struct UpdateLock {
    held: AtomicBool,
}

impl UpdateLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock without blocking; `None` if another writer holds it
    #[must_use = "the lock is released as soon as the guard is dropped"]
    pub fn try_acquire(&self) -> Option<UpdateGuard<'_>> {
        self.held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| UpdateGuard { lock: self })
    }

    /// Check whether a writer currently holds the lock
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }
}

/// Proof of holding the update lock
#[derive(Debug)]
pub struct UpdateGuard<'a> {
    lock: &'a UpdateLock,
}

impl UpdateGuard<'_> {
    /// Release the lock explicitly
    pub fn release(self) {}
}

impl Drop for UpdateGuard<'_> {
    fn drop(&mut self) {
        self.lock.held.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_writer() {
        let lock = UpdateLock::new();
        let guard = lock.try_acquire().unwrap();
        assert!(lock.is_held());
        assert!(lock.try_acquire().is_none());
        guard.release();
        assert!(!lock.is_held());
        assert!(lock.try_acquire().is_some());
    }

    #[test]
    fn test_released_on_drop() {
        let lock = UpdateLock::new();
        {
            let _guard = lock.try_acquire().unwrap();
        }
        assert!(!lock.is_held());
    }
}
