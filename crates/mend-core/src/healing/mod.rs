//! The healing session: one bounded classify→heal→rerun loop per failing
//! test, driven concurrently across tests.

mod orchestrator;
pub mod state;

pub use orchestrator::HealingOrchestrator;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag for a healing session.
///
/// Cloned into every per-test loop; once set, each loop seals its case
/// conservatively at the next step boundary.
#[derive(Clone, Debug, Default)]
pub struct SessionCancel(Arc<AtomicBool>);

impl SessionCancel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_flag_is_shared_across_clones() {
        let cancel = SessionCancel::new();
        let clone = cancel.clone();
        assert!(!clone.is_cancelled());
        cancel.cancel();
        assert!(clone.is_cancelled());
    }
}
