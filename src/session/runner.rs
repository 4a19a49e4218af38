use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::debug;

use super::params::Operation;
use super::session::{AudioTestSession, CODE_UNKNOWN_FAILURE};

/// Default cap on concurrently in-flight operations
pub const DEFAULT_MAX_IN_FLIGHT: usize = 4;

/// Bounded task submission on top of a shared session
///
/// Each submitted operation runs on its own tokio task, gated by a
/// semaphore so at most `max_in_flight` operations touch the engine at
/// once. The returned handle resolves to the operation's result code,
/// letting callers await completion instead of watching side effects.
pub struct OperationRunner {
    session: Arc<AudioTestSession>,
    permits: Arc<Semaphore>,
    max_in_flight: usize,
}

impl OperationRunner {
    pub fn new(session: Arc<AudioTestSession>, max_in_flight: usize) -> Self {
        Self {
            session,
            permits: Arc::new(Semaphore::new(max_in_flight)),
            max_in_flight,
        }
    }

    /// Submit `op` for execution; resolves to its result code
    pub fn submit(&self, op: Operation) -> JoinHandle<i32> {
        let session = Arc::clone(&self.session);
        let permits = Arc::clone(&self.permits);

        tokio::spawn(async move {
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                // Only possible if the semaphore is closed, which this
                // runner never does
                Err(_) => return CODE_UNKNOWN_FAILURE,
            };

            debug!("Dispatching {} on {}", op.kind, op.file_path.display());
            session.run(op).await
        })
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    /// Permits currently free; equals `max_in_flight` when idle
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }
}
