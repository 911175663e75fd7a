//! Cooperative cancellation flag shared between a run and its caller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One-way cancellation flag.
///
/// Cloning shares the underlying flag. Setting it is lock-free and safe from
/// any thread; once set it never clears. The worker only observes it at
/// well-defined points (before each entry and before each transfer chunk).
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancelFlag {
    /// Create a new, unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
