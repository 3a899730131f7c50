// Continuous video feed viewer
//
// Binds the backend's multipart JPEG feed to a frame channel once per
// activation. Load and failure are reported through a single observer; a
// failure is terminal until the viewer is started again. There is no
// reconnect or backoff.

use crate::client::BackendClient;
use crate::state::StreamState;
use crate::{Result, ToolwatchError};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Load/error signals of the bound feed.
///
/// Registered on activation and released on every exit path, including
/// deactivation during an in-flight load.
#[async_trait]
pub trait StreamObserver: Send + Sync {
    /// First complete frame decoded. Diagnostic only; fires once.
    async fn on_ready(&self);
    /// The feed failed to load or died; `message` names the URL. Fires once.
    async fn on_failed(&self, message: &str);
}

pub struct StreamViewer {
    client: Arc<BackendClient>,
}

/// Handle owning the transfer task and the renderable frame channel.
pub struct StreamHandle {
    task: JoinHandle<()>,
    state: watch::Receiver<StreamState>,
    frames: watch::Receiver<Bytes>,
}

impl StreamViewer {
    pub fn new(client: Arc<BackendClient>) -> Self {
        Self { client }
    }

    /// Bind the video feed and spawn the transfer task.
    ///
    /// The URL is bound exactly once per activation; starting a new viewer
    /// re-binds. A single failure is terminal for the handle's lifetime.
    pub fn start(self, observer: Arc<dyn StreamObserver>) -> StreamHandle {
        let (state_tx, state_rx) = watch::channel(StreamState::Loading);
        let (frames_tx, frames_rx) = watch::channel(Bytes::new());
        let client = Arc::clone(&self.client);
        let url = client.video_feed_url();

        info!(target: "stream", url = %url, "Binding video feed");
        let task = tokio::spawn(async move {
            if let Err(e) = transfer(&client, &url, &state_tx, &frames_tx, &observer).await {
                let message = format!("Failed to load video stream from {url}");
                warn!(target: "stream", url = %url, error = %e, "Video feed failed");
                let _ = state_tx.send(StreamState::Failed(message.clone()));
                observer.on_failed(&message).await;
            }
        });

        StreamHandle {
            task,
            state: state_rx,
            frames: frames_rx,
        }
    }
}

/// Run the feed transfer until it dies or the surface goes away.
///
/// A finite body is a dead feed: the resource is continuous by contract, so
/// a clean end of stream is reported as an error too.
async fn transfer(
    client: &BackendClient,
    url: &str,
    state: &watch::Sender<StreamState>,
    frames: &watch::Sender<Bytes>,
    observer: &Arc<dyn StreamObserver>,
) -> Result<()> {
    let mut resp = client.open_video_feed().await?;

    let boundary = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(boundary_from_content_type)
        .ok_or_else(|| {
            ToolwatchError::StreamError("Video feed response has no multipart boundary".to_string())
        })?;

    let mut splitter = FrameSplitter::new(&boundary);
    let mut loaded = false;

    while let Some(chunk) = resp.chunk().await.map_err(|e| {
        ToolwatchError::StreamError(format!("Video feed read failed: {e}"))
    })? {
        for frame in splitter.push(&chunk) {
            if !loaded {
                loaded = true;
                debug!(target: "stream", url = %url, "Video stream loaded successfully");
                let _ = state.send(StreamState::Loaded);
                observer.on_ready().await;
            }
            if frames.send(frame).is_err() {
                // Surface gone; nothing left to render to.
                debug!(target: "stream", "Frame receiver dropped; stopping transfer");
                return Ok(());
            }
        }
    }

    Err(ToolwatchError::StreamError("Video feed ended".to_string()))
}

/// Extract the boundary parameter from a `multipart/x-mixed-replace` content type
fn boundary_from_content_type(value: &str) -> Option<String> {
    value.split(';').skip(1).find_map(|param| {
        param
            .trim()
            .strip_prefix("boundary=")
            .map(|b| b.trim_matches('"').to_string())
    })
}

impl StreamHandle {
    /// Latest decoded frame; empty until the first frame arrives
    pub fn frames(&self) -> watch::Receiver<Bytes> {
        self.frames.clone()
    }

    pub fn state(&self) -> watch::Receiver<StreamState> {
        self.state.clone()
    }

    /// Current lifecycle state
    pub fn current_state(&self) -> StreamState {
        self.state.borrow().clone()
    }

    /// Unbind the feed.
    ///
    /// Cancels the transfer task and releases the observer registration.
    /// Deactivation is not a failure: `on_failed` does not fire.
    pub fn stop(self) {
        self.task.abort();
    }
}

/// Incremental splitter for `multipart/x-mixed-replace` payloads.
///
/// Feed it raw chunks; it yields complete part bodies (JPEG frames). A part
/// is `--<boundary>`, part headers, a blank line, then the body, terminated
/// by the next delimiter. Parts may span any number of chunks.
pub struct FrameSplitter {
    delimiter: Vec<u8>,
    buf: BytesMut,
}

impl FrameSplitter {
    pub fn new(boundary: &str) -> Self {
        Self {
            delimiter: format!("--{boundary}").into_bytes(),
            buf: BytesMut::new(),
        }
    }

    /// Push a chunk, collecting every frame it completes
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Bytes> {
        self.buf.extend_from_slice(chunk);
        let mut out = Vec::new();
        while let Some(frame) = self.next_frame() {
            out.push(frame);
        }
        out
    }

    fn next_frame(&mut self) -> Option<Bytes> {
        let start = find(&self.buf, &self.delimiter)?;
        let after = start + self.delimiter.len();
        let headers = find(&self.buf[after..], b"\r\n\r\n")?;
        let body_start = after + headers + 4;
        let body_len = find(&self.buf[body_start..], &self.delimiter)?;

        // Trim the CRLF separating the body from the next delimiter
        let mut body_end = body_start + body_len;
        while body_end > body_start && matches!(self.buf[body_end - 1], b'\r' | b'\n') {
            body_end -= 1;
        }

        let frame = Bytes::copy_from_slice(&self.buf[body_start..body_end]);
        // Keep the next delimiter in the buffer for the following part
        let _ = self.buf.split_to(body_start + body_len);
        Some(frame)
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
