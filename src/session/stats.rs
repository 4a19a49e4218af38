use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of a session's activity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Unique session identifier
    pub session_id: String,

    /// When the session was created
    pub started_at: DateTime<Utc>,

    /// Total operations dispatched to the engine
    pub operations_run: usize,

    /// Operations that returned a non-zero code
    pub failures: usize,

    /// Most recent failure description (empty before any failure)
    pub last_error: String,
}
