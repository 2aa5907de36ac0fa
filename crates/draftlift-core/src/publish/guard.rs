use std::sync::atomic::{AtomicBool, Ordering};

/// Non-blocking single-holder lock around a scan. Contended callers are
/// turned away, never queued.
#[derive(Debug, Default)]
pub struct ScanLock {
    held: AtomicBool,
}

impl ScanLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self) -> Option<ScanGuard<'_>> {
        self.held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ScanGuard { lock: self })
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
pub struct ScanGuard<'a> {
    lock: &'a ScanLock,
}

impl Drop for ScanGuard<'_> {
    fn drop(&mut self) {
        self.lock.held.store(false, Ordering::Release);
    }
}
