// Observable dashboard state
//
// Latest-value snapshots published through a tokio watch channel. Observers
// always see the most recent snapshot; last write wins per field.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Counter snapshot returned by the backend.
///
/// No relationship between the three fields is checked; absent fields on the
/// wire decode as zero.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolCounters {
    pub tools_in_field: u64,
    pub tools_in_use: u64,
    pub tools_discarded: u64,
}

/// Lifecycle of the bound video feed
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamState {
    Loading,
    Loaded,
    Failed(String),
}

/// Latest synchronized view of the backend
#[derive(Clone, Debug, Default)]
pub struct DashboardState {
    /// Log tail in server order (newest first), capped by configuration
    pub logs: Vec<String>,
    pub counters: ToolCounters,
    /// RFC 3339 stamp of the last successful log fetch
    pub logs_synced_at: Option<String>,
    /// RFC 3339 stamp of the last successful counter fetch
    pub counters_synced_at: Option<String>,
}

/// Publisher side of the dashboard state
pub struct StateFeed {
    sender: watch::Sender<DashboardState>,
}

impl StateFeed {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(DashboardState::default());
        Self { sender }
    }

    /// Subscribe to snapshots; the receiver starts at the current value
    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.sender.subscribe()
    }

    /// Current snapshot
    pub fn latest(&self) -> DashboardState {
        self.sender.borrow().clone()
    }

    /// Replace the log list wholesale; the previous list is discarded
    pub(crate) fn replace_logs(&self, logs: Vec<String>) {
        let stamp = Utc::now().to_rfc3339();
        self.sender.send_modify(|state| {
            state.logs = logs;
            state.logs_synced_at = Some(stamp);
        });
    }

    /// Replace the counter record wholesale
    pub(crate) fn replace_counters(&self, counters: ToolCounters) {
        let stamp = Utc::now().to_rfc3339();
        self.sender.send_modify(|state| {
            state.counters = counters;
            state.counters_synced_at = Some(stamp);
        });
    }
}

impl Default for StateFeed {
    fn default() -> Self {
        Self::new()
    }
}
