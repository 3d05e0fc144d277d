//! Debug logging gated by the manifest's debug flag.

use std::fmt::Display;

/// Logger handed to each engine component.
///
/// Progress messages are emitted only when debugging is enabled. Warnings
/// are always emitted, at `warn` level when enabled and `debug` otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct DebugLog {
    enabled: bool,
}

impl DebugLog {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Progress message about one URL.
    pub fn log(&self, phase: &'static str, url: &str, message: &str) {
        if self.enabled {
            tracing::info!(phase, url, "{message}");
        }
    }

    /// Failure of one unit of work.
    pub fn warn(&self, phase: &'static str, url: &str, error: &dyn Display) {
        if self.enabled {
            tracing::warn!(phase, url, error = %error, "operation failed");
        } else {
            tracing::debug!(phase, url, error = %error, "operation failed");
        }
    }
}
