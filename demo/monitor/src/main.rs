use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use toolwatch_core::{
    BackendClient, BackendConfig, DashboardState, PollingSync, StreamObserver, StreamViewer,
};
use tracing::{debug, error, info};

/// Stream signals rendered as console lines. A failure replaces the feed
/// line until the monitor is restarted.
struct ConsoleObserver;

#[async_trait]
impl StreamObserver for ConsoleObserver {
    async fn on_ready(&self) {
        info!(target: "monitor", "Video stream loaded successfully");
    }

    async fn on_failed(&self, message: &str) {
        println!("[video] {message}");
    }
}

fn render(state: &DashboardState) {
    println!(
        "tools in field: {}  in use: {}  discarded: {}",
        state.counters.tools_in_field, state.counters.tools_in_use, state.counters.tools_discarded
    );
    for line in state.logs.iter().take(10) {
        println!("  | {line}");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logging / tracing
    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info,toolwatch_core=info,tool_monitor=info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let cfg = BackendConfig::from_env();
    info!(
        target: "monitor",
        base_url = %cfg.base_url,
        poll_interval_ms = cfg.poll_interval_ms,
        "Starting tool monitor"
    );

    let client = Arc::new(BackendClient::new(cfg.clone())?);

    // Live state: log tail + counters
    let poller = PollingSync::new(Arc::clone(&client), cfg.clone());
    let mut snapshots = poller.subscribe();
    let poll_handle = poller.start();

    // Video feed: the latest frame size doubles as a liveness signal
    let viewer = StreamViewer::new(Arc::clone(&client));
    let stream_handle = viewer.start(Arc::new(ConsoleObserver));
    let mut frames = stream_handle.frames();

    let snapshot_task = tokio::spawn(async move {
        while snapshots.changed().await.is_ok() {
            let state = snapshots.borrow_and_update().clone();
            render(&state);
        }
    });

    let frame_task = tokio::spawn(async move {
        while frames.changed().await.is_ok() {
            let len = frames.borrow_and_update().len();
            debug!(target: "monitor", bytes = len, "Frame received");
        }
    });

    println!("Commands: r = reinitialize tool counts, d = download latest log, q = quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = signal::ctrl_c() => break,
            line = lines.next_line() => {
                match line {
                    Ok(Some(cmd)) => match cmd.trim() {
                        "r" => match client.reinitialize_tool_counts().await {
                            Ok(status) => println!("{status}"),
                            Err(e) => {
                                error!(target: "monitor", error = %e, "Reinitialize failed");
                                println!("Failed to reinitialize tool counts");
                            }
                        },
                        "d" => match client.save_latest_log(Path::new(".")).await {
                            Ok(path) => println!("Saved {}", path.display()),
                            Err(e) => {
                                error!(target: "monitor", error = %e, "Log download failed");
                                println!("Failed to download the latest log");
                            }
                        },
                        "q" => break,
                        "" => {}
                        other => println!("Unknown command: {other}"),
                    },
                    Ok(None) | Err(_) => break,
                }
            }
        }
    }

    info!(target: "monitor", "Shutting down");
    poll_handle.stop();
    stream_handle.stop();
    snapshot_task.abort();
    frame_task.abort();
    Ok(())
}
