use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

/// Loading counters for UI feedback.
///
/// Updated outside the store lock, so they can briefly disagree with the
/// store contents. Use them for display, not for control flow.
#[derive(Debug, Default)]
pub struct LoadingProgress {
    total: AtomicI64,
    loaded: AtomicI64,
    failed: AtomicI64,
}

/// Point-in-time copy of the counters
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    pub total: usize,
    pub loaded: usize,
    pub failed: usize,
}

impl ProgressSnapshot {
    pub fn percent(&self) -> f32 {
        (self.loaded as f32 / self.total.max(1) as f32).clamp(0.0, 1.0)
    }

    pub fn is_finished(&self) -> bool {
        self.total > 0 && self.loaded + self.failed == self.total
    }

    pub fn is_failed(&self) -> bool {
        self.failed > 0
    }
}

impl fmt::Display for ProgressSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} loaded, {} failed ({:.0}%)",
            self.loaded,
            self.total,
            self.failed,
            self.percent() * 100.0
        )
    }
}

// Removal can race ahead of the matching increment; reads clamp at zero.
fn read(counter: &AtomicI64) -> usize {
    counter.load(Ordering::Acquire).max(0) as usize
}

impl LoadingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assets scheduled or added
    pub fn total(&self) -> usize {
        read(&self.total)
    }

    /// Assets that finished loading successfully
    pub fn loaded(&self) -> usize {
        read(&self.loaded)
    }

    /// Assets whose loading failed
    pub fn failed(&self) -> usize {
        read(&self.failed)
    }

    /// `loaded / max(total, 1)` clamped to `[0, 1]`
    pub fn percent(&self) -> f32 {
        self.snapshot().percent()
    }

    pub fn is_finished(&self) -> bool {
        self.snapshot().is_finished()
    }

    /// Whether any asset failed to load
    pub fn is_failed(&self) -> bool {
        self.failed() > 0
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            total: self.total(),
            loaded: self.loaded(),
            failed: self.failed(),
        }
    }

    pub(crate) fn register_scheduled(&self) {
        self.total.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn register_loaded(&self) {
        self.loaded.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn register_failed(&self) {
        self.failed.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn register_added(&self) {
        self.total.fetch_add(1, Ordering::AcqRel);
        self.loaded.fetch_add(1, Ordering::AcqRel);
    }

    /// Removal of a record that never completed
    pub(crate) fn remove_pending(&self) {
        self.total.fetch_sub(1, Ordering::AcqRel);
    }

    pub(crate) fn remove_loaded(&self) {
        self.total.fetch_sub(1, Ordering::AcqRel);
        self.loaded.fetch_sub(1, Ordering::AcqRel);
    }

    pub(crate) fn remove_failed(&self) {
        self.total.fetch_sub(1, Ordering::AcqRel);
        self.failed.fetch_sub(1, Ordering::AcqRel);
    }

    pub(crate) fn reset(&self) {
        self.total.store(0, Ordering::Release);
        self.loaded.store(0, Ordering::Release);
        self.failed.store(0, Ordering::Release);
    }
}
