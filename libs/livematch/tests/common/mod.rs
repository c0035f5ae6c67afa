//! Shared fixtures for livematch integration tests
//!
//! A scripted feed server that records handshake URIs and client frames,
//! plus an in-memory reference source that counts calls.

#![allow(dead_code)]

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use livematch::infrastructure::client::reference_api::Result as ApiResult;
use livematch::{FeedConfig, ReferenceSource, SponsorSet};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

/// Feed server replaying the same frames to every connection
pub struct MockFeedServer {
    pub addr: SocketAddr,
    shutdown: Arc<Notify>,
    connections: Arc<AtomicUsize>,
    uris: Arc<Mutex<Vec<String>>>,
    received: Arc<Mutex<Vec<String>>>,
}

impl MockFeedServer {
    pub async fn start(script: Vec<String>, close_after_script: bool) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = Self {
            addr,
            shutdown: Arc::new(Notify::new()),
            connections: Arc::new(AtomicUsize::new(0)),
            uris: Arc::new(Mutex::new(Vec::new())),
            received: Arc::new(Mutex::new(Vec::new())),
        };

        let script = Arc::new(script);
        let shutdown = Arc::clone(&server.shutdown);
        let connections = Arc::clone(&server.connections);
        let uris = Arc::clone(&server.uris);
        let received = Arc::clone(&server.received);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        let Ok((stream, _)) = result else { break };
                        connections.fetch_add(1, Ordering::SeqCst);
                        tokio::spawn(serve(
                            stream,
                            Arc::clone(&script),
                            close_after_script,
                            Arc::clone(&uris),
                            Arc::clone(&received),
                            Arc::clone(&shutdown),
                        ));
                    }
                    _ = shutdown.notified() => break,
                }
            }
        });

        server
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Request URIs (path and query) of every handshake
    pub fn uris(&self) -> Vec<String> {
        self.uris.lock().clone()
    }

    pub fn received(&self) -> Vec<String> {
        self.received.lock().clone()
    }
}

impl Drop for MockFeedServer {
    fn drop(&mut self) {
        self.shutdown.notify_waiters();
    }
}

async fn serve(
    stream: tokio::net::TcpStream,
    script: Arc<Vec<String>>,
    close_after_script: bool,
    uris: Arc<Mutex<Vec<String>>>,
    received: Arc<Mutex<Vec<String>>>,
    shutdown: Arc<Notify>,
) {
    let record_uri = move |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        uris.lock().push(request.uri().to_string());
        Ok(response)
    };
    let Ok(ws_stream) = tokio_tungstenite::accept_hdr_async(stream, record_uri).await else {
        return;
    };
    let (mut write, mut read) = ws_stream.split();

    for frame in script.iter() {
        if write.send(Message::Text(frame.clone())).await.is_err() {
            return;
        }
    }

    if close_after_script {
        let _ = write.close().await;
        return;
    }

    loop {
        tokio::select! {
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => received.lock().push(text),
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            _ = shutdown.notified() => break,
        }
    }
}

/// Reference source returning fixed data
#[derive(Default)]
pub struct FakeSource {
    pub rankings_calls: AtomicUsize,
    pub results_calls: AtomicUsize,
    pub sponsor_calls: AtomicUsize,
    /// Ids reported as recently finished
    pub finished_ids: Mutex<Vec<String>>,
}

impl FakeSource {
    pub fn total_calls(&self) -> usize {
        self.rankings_calls.load(Ordering::SeqCst)
            + self.results_calls.load(Ordering::SeqCst)
            + self.sponsor_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReferenceSource for FakeSource {
    async fn rankings(&self, limit: u32) -> ApiResult<Vec<Value>> {
        self.rankings_calls.fetch_add(1, Ordering::SeqCst);
        Ok((1..=limit).map(|pos| json!({"posicion": pos})).collect())
    }

    async fn recent_results(&self, _limit: u32) -> ApiResult<Vec<Value>> {
        self.results_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .finished_ids
            .lock()
            .iter()
            .map(|id| json!({"id": id}))
            .collect())
    }

    async fn sponsors(&self) -> ApiResult<Vec<SponsorSet>> {
        self.sponsor_calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![SponsorSet {
            slot: "main".to_string(),
            rotation_secs: Some(1),
            entries: vec![json!("a"), json!("b")],
        }])
    }
}

/// Config pointing at `ws_url` with short reconnect delays
pub fn test_config(ws_url: String) -> FeedConfig {
    let mut config = FeedConfig::new(ws_url, "http://127.0.0.1:9");
    config.reconnect.base_delay_ms = 20;
    config.reconnect.max_delay_ms = 100;
    config
}

/// Poll `condition` every 10ms until it holds or `timeout` passes
pub async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
