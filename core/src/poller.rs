// Timer-driven backend synchronization
//
// One recurring task fetches the log tail and the counter record each tick
// and republishes them into the state feed. The two fetches are independent;
// a failed fetch leaves the previous value in place.

use crate::client::BackendClient;
use crate::config::BackendConfig;
use crate::state::{DashboardState, StateFeed};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub struct PollingSync {
    client: Arc<BackendClient>,
    cfg: BackendConfig,
    feed: Arc<StateFeed>,
}

/// Handle owning the recurring poll task.
///
/// Dropping the handle does not stop the task; call [`PollerHandle::stop`].
pub struct PollerHandle {
    live: Arc<AtomicBool>,
    task: JoinHandle<()>,
    feed: Arc<StateFeed>,
}

impl PollingSync {
    pub fn new(client: Arc<BackendClient>, cfg: BackendConfig) -> Self {
        Self {
            client,
            cfg,
            feed: Arc::new(StateFeed::new()),
        }
    }

    /// Subscribe to snapshots; valid before or after [`PollingSync::start`]
    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.feed.subscribe()
    }

    /// Spawn the recurring poll task. The first tick runs immediately.
    pub fn start(self) -> PollerHandle {
        let live = Arc::new(AtomicBool::new(true));
        let task_live = Arc::clone(&live);
        let feed = Arc::clone(&self.feed);
        let task_feed = Arc::clone(&self.feed);
        let client = Arc::clone(&self.client);
        let interval_ms = self.cfg.poll_interval_ms.max(1);
        let max_log_lines = self.cfg.max_log_lines;

        debug!(target: "poller", interval_ms, "Starting poll task");
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(interval_ms));
            loop {
                interval.tick().await;
                if !task_live.load(Ordering::SeqCst) {
                    break;
                }

                // The two fetches are independent: either may fail or resolve
                // first without affecting the other.
                let (logs, counters) =
                    tokio::join!(client.fetch_logs(), client.fetch_tool_counts());

                // A response that resolves after stop() must not touch state.
                if !task_live.load(Ordering::SeqCst) {
                    break;
                }

                match logs {
                    Ok(mut lines) => {
                        lines.truncate(max_log_lines);
                        task_feed.replace_logs(lines);
                    }
                    Err(e) => {
                        warn!(target: "poller", error = %e, "Log fetch failed; keeping previous lines");
                    }
                }

                match counters {
                    Ok(record) => task_feed.replace_counters(record),
                    Err(e) => {
                        warn!(target: "poller", error = %e, "Counter fetch failed; keeping previous record");
                    }
                }
            }
            debug!(target: "poller", "Poll task stopped");
        });

        PollerHandle { live, task, feed }
    }
}

impl PollerHandle {
    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.feed.subscribe()
    }

    /// Current snapshot
    pub fn latest(&self) -> DashboardState {
        self.feed.latest()
    }

    /// Cancel the recurring poll.
    ///
    /// In-flight requests are not aborted; the task checks liveness before
    /// every state application, so a response that resolves after this call
    /// is dropped instead of applied, and the task exits on its own.
    pub fn stop(self) {
        self.live.store(false, Ordering::SeqCst);
        drop(self.task);
    }
}
