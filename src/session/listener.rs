use tracing::{info, warn};

/// Receiver of progress and completion notifications for test
/// operations
///
/// The engine never calls a listener directly: it posts events onto the
/// session's channel and the session's drain task forwards them to the
/// currently registered listener. Callbacks therefore arrive on a
/// runtime worker, asynchronously with respect to the operation call
/// site; implementations must marshal to their own context if needed.
pub trait TestListener: Send + Sync {
    /// Operation progress, 0..=100, non-decreasing within one operation
    fn on_progress(&self, percent: u8);

    /// Final outcome; delivered exactly once per operation
    fn on_complete(&self, success: bool, message: &str);
}

/// Listener that reports events through the tracing pipeline; used by
/// the CLI harness
pub struct LogListener;

impl TestListener for LogListener {
    fn on_progress(&self, percent: u8) {
        info!("Progress: {}%", percent);
    }

    fn on_complete(&self, success: bool, message: &str) {
        if success {
            info!("Test complete: {}", message);
        } else {
            warn!("Test failed: {}", message);
        }
    }
}
