//! Single-flight guard for inspection triggers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Rejects a trigger while another one is still running.
///
/// A disabled guard admits every trigger, so overlapping runs proceed
/// independently.
#[derive(Debug, Clone, Default)]
pub struct TriggerGuard {
    enabled: bool,
    running: Arc<AtomicBool>,
}

impl TriggerGuard {
    /// Guard that serializes triggers when `enabled`.
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether overlapping triggers are rejected.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Claim the guard. `None` means a run is already in progress.
    #[must_use]
    pub fn try_acquire(&self) -> Option<TriggerPermit> {
        if !self.enabled {
            return Some(TriggerPermit { running: None });
        }
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| TriggerPermit {
                running: Some(Arc::clone(&self.running)),
            })
    }
}

/// Held for the duration of a run; releases the guard on drop.
#[derive(Debug)]
pub struct TriggerPermit {
    running: Option<Arc<AtomicBool>>,
}

impl Drop for TriggerPermit {
    fn drop(&mut self) {
        if let Some(running) = &self.running {
            running.store(false, Ordering::Release);
        }
    }
}
