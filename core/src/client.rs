// HTTP access to the tool-tracking backend
//
// One client instance owns every endpoint call. The continuous video feed
// goes through a dedicated connection with no total request timeout; the
// finite calls are bounded by the configured timeout.

use crate::config::BackendConfig;
use crate::state::ToolCounters;
use crate::{Result, ToolwatchError};
use bytes::Bytes;
use reqwest::Client;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// File name the downloaded log is materialized under
pub const LATEST_LOG_FILE: &str = "latest_log.txt";

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: String,
}

pub struct BackendClient {
    cfg: BackendConfig,
    http: Client,
    streaming: Client,
}

impl BackendClient {
    pub fn new(cfg: BackendConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(cfg.request_timeout_ms))
            .build()
            .map_err(|e| {
                ToolwatchError::ConfigError(format!("Failed to build HTTP client: {e}"))
            })?;
        // The feed is open-ended; only the connect phase is bounded.
        let streaming = Client::builder()
            .connect_timeout(Duration::from_millis(cfg.request_timeout_ms))
            .build()
            .map_err(|e| {
                ToolwatchError::ConfigError(format!("Failed to build stream client: {e}"))
            })?;
        Ok(Self {
            cfg,
            http,
            streaming,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(BackendConfig::from_env())
    }

    pub fn config(&self) -> &BackendConfig {
        &self.cfg
    }

    /// URL of the continuous video feed
    pub fn video_feed_url(&self) -> String {
        self.cfg.endpoint("video_feed")
    }

    /// GET /logs: the current log tail, server order
    pub async fn fetch_logs(&self) -> Result<Vec<String>> {
        let url = self.cfg.endpoint("logs");
        let resp = self.http.get(&url).send().await.map_err(|e| {
            warn!(target: "backend", error = %e, "Log request failed");
            ToolwatchError::BackendError(format!("Log request failed: {e}"))
        })?;

        if !resp.status().is_success() {
            let status = resp.status();
            warn!(target: "backend", status = %status, "Log endpoint returned error");
            return Err(ToolwatchError::BackendError(format!(
                "Log endpoint returned status: {status}"
            )));
        }

        resp.json().await.map_err(|e| {
            warn!(target: "backend", error = %e, "Failed to parse log response");
            ToolwatchError::BackendError(format!("Failed to parse log response: {e}"))
        })
    }

    /// GET /tool_counts: the current counter record
    pub async fn fetch_tool_counts(&self) -> Result<ToolCounters> {
        let url = self.cfg.endpoint("tool_counts");
        let resp = self.http.get(&url).send().await.map_err(|e| {
            warn!(target: "backend", error = %e, "Counter request failed");
            ToolwatchError::BackendError(format!("Counter request failed: {e}"))
        })?;

        if !resp.status().is_success() {
            let status = resp.status();
            warn!(target: "backend", status = %status, "Counter endpoint returned error");
            return Err(ToolwatchError::BackendError(format!(
                "Counter endpoint returned status: {status}"
            )));
        }

        resp.json().await.map_err(|e| {
            warn!(target: "backend", error = %e, "Failed to parse counter response");
            ToolwatchError::BackendError(format!("Failed to parse counter response: {e}"))
        })
    }

    /// POST /reinitialize_tool_counts: ask the backend to re-seed its
    /// counters from the current camera view.
    ///
    /// Returns the server's status message for synchronous display. Local
    /// state is never updated optimistically; the next poll tick reflects
    /// the change.
    pub async fn reinitialize_tool_counts(&self) -> Result<String> {
        let url = self.cfg.endpoint("reinitialize_tool_counts");
        let resp = self.http.post(&url).send().await.map_err(|e| {
            warn!(target: "backend", error = %e, "Reinitialize request failed");
            ToolwatchError::BackendError(format!("Reinitialize request failed: {e}"))
        })?;

        if !resp.status().is_success() {
            let status = resp.status();
            warn!(target: "backend", status = %status, "Reinitialize returned error");
            return Err(ToolwatchError::BackendError(format!(
                "Reinitialize returned status: {status}"
            )));
        }

        let body: StatusResponse = resp.json().await.map_err(|e| {
            warn!(target: "backend", error = %e, "Failed to parse reinitialize response");
            ToolwatchError::BackendError(format!("Failed to parse reinitialize response: {e}"))
        })?;
        Ok(body.status)
    }

    /// GET /latest_log: the raw body of the most recent log file
    pub async fn fetch_latest_log(&self) -> Result<Bytes> {
        let url = self.cfg.endpoint("latest_log");
        let resp = self.http.get(&url).send().await.map_err(|e| {
            warn!(target: "backend", error = %e, "Log download request failed");
            ToolwatchError::BackendError(format!("Log download request failed: {e}"))
        })?;

        if !resp.status().is_success() {
            let status = resp.status();
            warn!(target: "backend", status = %status, "Log download returned error");
            return Err(ToolwatchError::BackendError(format!(
                "Log download returned status: {status}"
            )));
        }

        resp.bytes().await.map_err(|e| {
            warn!(target: "backend", error = %e, "Failed to read log download body");
            ToolwatchError::BackendError(format!("Failed to read log download body: {e}"))
        })
    }

    /// Fetch the latest log and write it to `dir` as [`LATEST_LOG_FILE`]
    pub async fn save_latest_log(&self, dir: &Path) -> Result<PathBuf> {
        let body = self.fetch_latest_log().await?;
        let path = dir.join(LATEST_LOG_FILE);
        tokio::fs::write(&path, &body).await?;
        debug!(target: "backend", path = %path.display(), bytes = body.len(), "Saved latest log");
        Ok(path)
    }

    /// GET /video_feed as an open-ended response
    pub async fn open_video_feed(&self) -> Result<reqwest::Response> {
        let url = self.video_feed_url();
        let resp = self.streaming.get(&url).send().await.map_err(|e| {
            warn!(target: "backend", error = %e, "Video feed request failed");
            ToolwatchError::StreamError(format!("Video feed request failed: {e}"))
        })?;

        if !resp.status().is_success() {
            let status = resp.status();
            warn!(target: "backend", status = %status, "Video feed returned error");
            return Err(ToolwatchError::StreamError(format!(
                "Video feed returned status: {status}"
            )));
        }
        Ok(resp)
    }
}
