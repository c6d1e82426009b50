//! Rundown protection: a shutdown-safe completion counter.
//!
//! Every acquisition bumps a shared counter and hands back a guard that
//! releases on drop. Once [`RundownRef::wait_for_rundown`] begins, new
//! acquisitions fail, and the call returns only after every outstanding
//! guard has been dropped.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Interval between checks while waiting for the count to drain.
const CHECK_INTERVAL: Duration = Duration::from_micros(100);

#[derive(Debug, Default)]
struct RundownInner {
    count: AtomicUsize,
    shutting_down: AtomicBool,
}

/// Shared rundown reference. Clones observe the same counter.
#[derive(Debug, Clone, Default)]
pub struct RundownRef {
    inner: Arc<RundownInner>,
}

impl RundownRef {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a reference, or `None` if shutdown has begun.
    pub fn acquire(&self) -> Option<RundownGuard> {
        if self.inner.shutting_down.load(Ordering::SeqCst) {
            return None;
        }
        self.inner.count.fetch_add(1, Ordering::SeqCst);
        // A shutdown that started between the check and the increment
        // must not see this reference.
        if self.inner.shutting_down.load(Ordering::SeqCst) {
            self.inner.count.fetch_sub(1, Ordering::SeqCst);
            return None;
        }
        Some(RundownGuard {
            inner: self.inner.clone(),
        })
    }

    /// Outstanding references.
    #[inline]
    pub fn active(&self) -> usize {
        self.inner.count.load(Ordering::SeqCst)
    }

    #[inline]
    pub fn is_shutting_down(&self) -> bool {
        self.inner.shutting_down.load(Ordering::SeqCst)
    }

    /// Block new acquisitions and wait until every guard is released.
    pub fn wait_for_rundown(&self) {
        self.inner.shutting_down.store(true, Ordering::SeqCst);
        tracing::debug!(active = self.active(), "waiting for rundown");
        while self.inner.count.load(Ordering::SeqCst) != 0 {
            std::thread::sleep(CHECK_INTERVAL);
        }
        tracing::debug!("rundown complete");
    }
}

/// One acquired rundown reference, released on drop.
#[derive(Debug)]
pub struct RundownGuard {
    inner: Arc<RundownInner>,
}

impl Drop for RundownGuard {
    fn drop(&mut self) {
        self.inner.count.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_and_release() {
        let rundown = RundownRef::new();
        let a = rundown.acquire().unwrap();
        let b = rundown.acquire().unwrap();
        assert_eq!(rundown.active(), 2);
        drop(a);
        assert_eq!(rundown.active(), 1);
        drop(b);
        assert_eq!(rundown.active(), 0);
    }

    #[test]
    fn wait_with_nothing_outstanding_returns() {
        let rundown = RundownRef::new();
        rundown.wait_for_rundown();
        assert!(rundown.is_shutting_down());
        assert!(rundown.acquire().is_none());
    }

    #[test]
    fn wait_blocks_until_last_guard_drops() {
        let rundown = RundownRef::new();
        let guard = rundown.acquire().unwrap();

        let waiter = {
            let rundown = rundown.clone();
            std::thread::spawn(move || rundown.wait_for_rundown())
        };

        while !rundown.is_shutting_down() {
            std::thread::yield_now();
        }
        assert!(rundown.acquire().is_none());
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.join().unwrap();
        assert_eq!(rundown.active(), 0);
    }
}
