use serde::{Deserialize, Serialize};

/// State of the slave's sync controller, mirrored into [`SyncStatus`] for any
/// external front-end that wants to read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncState {
    Idle,
    Syncing,
    Synced,
    LargeOffset,
    Error,
    MasterOffline,
}

/// Sync status shared between the controller thread and anything reading a
/// snapshot of it (status-printing, a future front-end). Guarded by a `RwLock`
/// at the point of sharing, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncStatus {
    pub state: SyncState,
    pub offset: f64,
    pub delay: f64,
    pub rate_adjustment: f64,
    pub consecutive_failures: u32,
    pub last_reply_at: Option<f64>,
}

impl Default for SyncStatus {
    fn default() -> Self {
        SyncStatus {
            state: SyncState::Idle,
            offset: 0.0,
            delay: 0.0,
            rate_adjustment: 0.0,
            consecutive_failures: 0,
            last_reply_at: None,
        }
    }
}
