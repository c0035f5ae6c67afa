//! Common test utilities for HyperSockets integration tests
//!
//! A scripted mock WebSocket server plus a collecting router/handler pair.

#![allow(dead_code)]

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use hypersockets::{
    ClientEvent, HyperSocketError, MessageHandler, MessageRouter, WebSocketClient, WsMessage,
};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Notify;
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

/// Mock server that plays the same script to every connection.
///
/// With `close_after_script` the server closes each connection once the
/// script is sent, which makes the client reconnect.
pub struct MockWsServer {
    pub addr: SocketAddr,
    shutdown: Arc<Notify>,
    connections: Arc<AtomicUsize>,
    received: Arc<Mutex<Vec<String>>>,
}

impl MockWsServer {
    pub async fn start(script: Vec<String>, close_after_script: bool) -> Self {
        Self::start_on("127.0.0.1:0".parse().unwrap(), script, close_after_script).await
    }

    /// Same as [`MockWsServer::start`] on a fixed address
    pub async fn start_on(addr: SocketAddr, script: Vec<String>, close_after_script: bool) -> Self {
        let listener = TcpListener::bind(addr).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());
        let connections = Arc::new(AtomicUsize::new(0));
        let received = Arc::new(Mutex::new(Vec::new()));

        let script = Arc::new(script);
        let accept_shutdown = Arc::clone(&shutdown);
        let accept_connections = Arc::clone(&connections);
        let accept_received = Arc::clone(&received);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        let Ok((stream, _)) = result else { break };
                        accept_connections.fetch_add(1, Ordering::SeqCst);
                        let script = Arc::clone(&script);
                        let shutdown = Arc::clone(&accept_shutdown);
                        let received = Arc::clone(&accept_received);
                        tokio::spawn(async move {
                            Self::handle_connection(stream, script, close_after_script, received, shutdown).await;
                        });
                    }
                    _ = accept_shutdown.notified() => break,
                }
            }
        });

        Self {
            addr,
            shutdown,
            connections,
            received,
        }
    }

    async fn handle_connection(
        stream: tokio::net::TcpStream,
        script: Arc<Vec<String>>,
        close_after_script: bool,
        received: Arc<Mutex<Vec<String>>>,
        shutdown: Arc<Notify>,
    ) {
        let Ok(ws_stream) = tokio_tungstenite::accept_async(stream).await else {
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

    /// Get the WebSocket URL for this server
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Number of TCP connections accepted so far
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Text frames received from clients
    pub fn received(&self) -> Vec<String> {
        self.received.lock().clone()
    }

    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }
}

impl Drop for MockWsServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// An address nothing is listening on
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Next client event, polling without blocking the runtime
pub async fn next_event(client: &WebSocketClient, timeout: Duration) -> Option<ClientEvent> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if let Some(event) = client.try_recv_event() {
            return Some(event);
        }
        if tokio::time::Instant::now() >= deadline {
            return None;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
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

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TestRoute {
    All,
}

/// Passes text frames through unchanged
pub struct TextRouter;

#[async_trait]
impl MessageRouter for TextRouter {
    type Message = String;
    type RouteKey = TestRoute;

    async fn parse(&self, message: WsMessage) -> hypersockets::Result<Self::Message> {
        message
            .as_text()
            .map(str::to_string)
            .ok_or_else(|| HyperSocketError::ParseError("binary frame".into()))
    }

    fn route_key(&self, _message: &Self::Message) -> Self::RouteKey {
        TestRoute::All
    }
}

/// Records every message it handles
pub struct Collector {
    pub seen: Arc<Mutex<Vec<String>>>,
}

impl Collector {
    pub fn new() -> (Self, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                seen: Arc::clone(&seen),
            },
            seen,
        )
    }
}

impl MessageHandler<String> for Collector {
    fn handle(&mut self, message: String) -> hypersockets::Result<()> {
        self.seen.lock().push(message);
        Ok(())
    }
}
