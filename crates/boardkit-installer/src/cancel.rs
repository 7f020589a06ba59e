use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::warn;

use crate::error::InstallError;
use crate::types::InstallPhase;

/// Shared flag polled at phase boundaries and between download chunks.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn check(&self, phase: InstallPhase) -> Result<(), InstallError> {
        if self.is_cancelled() {
            warn!(%phase, "cancellation requested");
            return Err(InstallError::Cancelled { phase });
        }
        Ok(())
    }
}
