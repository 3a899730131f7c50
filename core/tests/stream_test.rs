// Video feed binding: first-frame signal, terminal failure with the URL in
// the message, no automatic reload, and clean release on stop.

use async_trait::async_trait;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::timeout;
use toolwatch_core::{BackendClient, BackendConfig, StreamObserver, StreamState, StreamViewer};

#[derive(Default)]
struct RecordingObserver {
    events: Mutex<Vec<String>>,
}

impl RecordingObserver {
    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl StreamObserver for RecordingObserver {
    async fn on_ready(&self) {
        self.events.lock().unwrap().push("ready".to_string());
    }

    async fn on_failed(&self, message: &str) {
        self.events.lock().unwrap().push(format!("failed: {message}"));
    }
}

mockall::mock! {
    Observer {}

    #[async_trait]
    impl StreamObserver for Observer {
        async fn on_ready(&self);
        async fn on_failed(&self, message: &str);
    }
}

fn client_for(server: &mockito::ServerGuard) -> Arc<BackendClient> {
    let cfg = BackendConfig {
        base_url: server.url(),
        ..Default::default()
    };
    Arc::new(BackendClient::new(cfg).unwrap())
}

fn feed_body() -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(b"--frame\r\nContent-Type: image/jpeg\r\n\r\n");
    body.extend_from_slice(b"AAAA");
    body.extend_from_slice(b"\r\n--frame\r\nContent-Type: image/jpeg\r\n\r\n");
    body.extend_from_slice(b"BBBBBB");
    body.extend_from_slice(b"\r\n--frame\r\n");
    body
}

async fn wait_for_failed(handle: &toolwatch_core::StreamHandle) -> String {
    let mut state = handle.state();
    let result = timeout(
        Duration::from_secs(3),
        state.wait_for(|s| matches!(s, StreamState::Failed(_))),
    )
    .await
    .expect("timed out waiting for stream failure")
    .expect("stream state channel closed");
    match &*result {
        StreamState::Failed(message) => message.clone(),
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn frames_flow_and_ready_fires_once() {
    let mut server = mockito::Server::new_async().await;
    let _feed = server
        .mock("GET", "/video_feed")
        .with_header("content-type", "multipart/x-mixed-replace; boundary=frame")
        .with_body(feed_body())
        .create_async()
        .await;

    let observer = Arc::new(RecordingObserver::default());
    let viewer = StreamViewer::new(client_for(&server));
    let handle = viewer.start(observer.clone());

    // The finite test body ends, which a continuous feed treats as death;
    // the first frame must still have produced a single ready signal.
    wait_for_failed(&handle).await;
    let events = observer.events();
    assert_eq!(events.iter().filter(|e| *e == "ready").count(), 1);
    assert_eq!(&handle.frames().borrow()[..], b"BBBBBB");
    handle.stop();
}

#[tokio::test]
async fn failure_message_embeds_url_and_feed_is_not_retried() {
    let mut server = mockito::Server::new_async().await;
    let feed = server
        .mock("GET", "/video_feed")
        .with_status(404)
        .expect(1)
        .create_async()
        .await;

    let observer = Arc::new(RecordingObserver::default());
    let viewer = StreamViewer::new(client_for(&server));
    let handle = viewer.start(observer.clone());

    let message = wait_for_failed(&handle).await;
    let url = format!("{}/video_feed", server.url());
    assert_eq!(message, format!("Failed to load video stream from {url}"));
    assert_eq!(observer.events(), vec![format!("failed: {message}")]);

    // Terminal: no reconnect attempt follows.
    tokio::time::sleep(Duration::from_millis(300)).await;
    feed.assert_async().await;
    handle.stop();
}

#[tokio::test]
async fn missing_multipart_boundary_is_a_failure() {
    let mut server = mockito::Server::new_async().await;
    let _feed = server
        .mock("GET", "/video_feed")
        .with_header("content-type", "image/jpeg")
        .with_body("AAAA")
        .create_async()
        .await;

    let observer = Arc::new(RecordingObserver::default());
    let viewer = StreamViewer::new(client_for(&server));
    let handle = viewer.start(observer.clone());

    wait_for_failed(&handle).await;
    assert!(observer.events().iter().all(|e| e != "ready"));
    handle.stop();
}

#[tokio::test]
async fn stop_releases_feed_without_failure() {
    let mut server = mockito::Server::new_async().await;
    let _feed = server
        .mock("GET", "/video_feed")
        .with_header("content-type", "multipart/x-mixed-replace; boundary=frame")
        .with_chunked_body(|w| {
            w.write_all(b"--frame\r\nContent-Type: image/jpeg\r\n\r\nAAAA\r\n--frame\r\n")?;
            // Keep the connection open past the point where the viewer stops.
            std::thread::sleep(Duration::from_millis(500));
            w.write_all(b"Content-Type: image/jpeg\r\n\r\nBBBB\r\n--frame\r\n")
        })
        .create_async()
        .await;

    let mut observer = MockObserver::new();
    observer.expect_on_ready().times(1).return_const(());
    observer.expect_on_failed().never();

    let viewer = StreamViewer::new(client_for(&server));
    let handle = viewer.start(Arc::new(observer));
    let mut state = handle.state();

    timeout(
        Duration::from_secs(3),
        state.wait_for(|s| *s == StreamState::Loaded),
    )
    .await
    .expect("timed out waiting for first frame")
    .expect("stream state channel closed");

    handle.stop();
    tokio::time::sleep(Duration::from_millis(300)).await;

    // Deactivation is not a failure; the last observed state stands.
    assert_eq!(*state.borrow(), StreamState::Loaded);
}
