// Toolwatch Core Library
// Client-side live-state synchronization for the tool-tracking backend

pub mod client;
pub mod config;
pub mod poller;
pub mod state;
pub mod stream;

// Export core types
pub use client::{BackendClient, LATEST_LOG_FILE};
pub use config::BackendConfig;
pub use poller::{PollerHandle, PollingSync};
pub use state::{DashboardState, StateFeed, StreamState, ToolCounters};
pub use stream::{FrameSplitter, StreamHandle, StreamObserver, StreamViewer};

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolwatchError {
    #[error("Backend error: {0}")]
    BackendError(String),

    #[error("Stream error: {0}")]
    StreamError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
pub type Result<T> = std::result::Result<T, ToolwatchError>;
