// ── Activity flags ──
//
// Non-blocking mutual exclusion for the engine's recurring activities.
// A caller that loses the race skips its turn instead of waiting.

use std::sync::atomic::{AtomicBool, Ordering};

/// An "in progress" marker acquired with compare-and-swap.
#[derive(Debug, Default)]
pub struct ActivityFlag(AtomicBool);

impl ActivityFlag {
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Set the flag if it is clear. The returned guard clears it on drop,
    /// including during unwinding.
    pub fn try_acquire(&self) -> Option<FlagGuard<'_>> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlagGuard(self))
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Holds an [`ActivityFlag`] set for its lifetime.
#[derive(Debug)]
#[must_use = "the flag is released as soon as the guard is dropped"]
pub struct FlagGuard<'a>(&'a ActivityFlag);

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.0.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_until_release() {
        let flag = ActivityFlag::new();
        let guard = flag.try_acquire();
        assert!(guard.is_some());
        assert!(flag.is_set());
        assert!(flag.try_acquire().is_none());

        drop(guard);
        assert!(!flag.is_set());
        assert!(flag.try_acquire().is_some());
    }

    #[test]
    fn released_on_panic() {
        let flag = ActivityFlag::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = flag.try_acquire();
            panic!("boom");
        }));
        assert!(result.is_err());
        assert!(!flag.is_set());
    }
}
