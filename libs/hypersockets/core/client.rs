use crate::config::ClientConfig;
use crate::connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState};
use crate::traits::*;
use crossbeam_channel::{unbounded, Receiver, Sender};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

/// Upper bound on how long an externally cleared run flag goes unnoticed
/// while the task sleeps between reconnects.
const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

/// Internal command messages for client control
#[derive(Debug)]
enum ClientCommand {
    /// Send a message to the WebSocket
    Send(WsMessage),
    /// Close the socket and stop the task
    Shutdown,
}

/// Lifecycle notifications from the client task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Connected to the server
    Connected,
    /// Disconnected from the server
    Disconnected,
    /// About to reconnect (consecutive failed attempts so far)
    Reconnecting(usize),
    /// Transport error (informational, the client keeps retrying)
    Error(String),
}

/// Client metrics snapshot
#[derive(Debug, Clone)]
pub struct Metrics {
    pub messages_sent: u64,
    pub messages_received: u64,
    pub reconnect_count: u64,
    pub reconnect_attempts: usize,
    pub connection_state: ConnectionState,
}

/// Reconnecting WebSocket client.
///
/// A single tokio task owns the socket, the router and the handlers. It
/// reconnects on every close using the configured [`ReconnectionStrategy`]
/// until [`WebSocketClient::shutdown`] is called, the run flag is cleared,
/// or the client is dropped.
pub struct WebSocketClient {
    state: Arc<AtomicConnectionState>,
    metrics: Arc<AtomicMetrics>,
    command_tx: mpsc::UnboundedSender<ClientCommand>,
    event_rx: Receiver<ClientEvent>,
    task_handle: Option<JoinHandle<()>>,
    shutdown_flag: Arc<AtomicBool>,
    shutdown_notify: Arc<Notify>,
}

impl WebSocketClient {
    /// Spawn the client task. Use `hypersockets::builder()` to get here.
    pub(crate) fn spawn<R>(config: ClientConfig<R>) -> Self
    where
        R: MessageRouter,
    {
        let state = Arc::new(AtomicConnectionState::new(ConnectionState::Connecting));
        let metrics = Arc::new(AtomicMetrics::new());
        let shutdown_flag = Arc::clone(&config.shutdown_flag);
        let shutdown_notify = Arc::clone(&config.shutdown_notify);

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = unbounded();

        let task_handle = tokio::spawn(run_client(
            config,
            Arc::clone(&state),
            Arc::clone(&metrics),
            command_rx,
            event_tx,
        ));

        Self {
            state,
            metrics,
            command_tx,
            event_rx,
            task_handle: Some(task_handle),
            shutdown_flag,
            shutdown_notify,
        }
    }

    /// Queue a message for the socket.
    ///
    /// Messages queued while disconnected are written after the next
    /// successful connect.
    pub fn send(&self, message: WsMessage) -> Result<()> {
        self.command_tx
            .send(ClientCommand::Send(message))
            .map_err(|e| HyperSocketError::ChannelSend(e.to_string()))
    }

    /// Get current connection state
    #[inline]
    pub fn connection_state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Check if connected
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.state.is_open()
    }

    /// Consecutive failed attempts since the last successful open
    #[inline]
    pub fn reconnect_attempts(&self) -> usize {
        self.state.reconnect_attempts()
    }

    /// Get current metrics
    pub fn metrics(&self) -> Metrics {
        Metrics {
            messages_sent: self.metrics.messages_sent(),
            messages_received: self.metrics.messages_received(),
            reconnect_count: self.metrics.reconnect_count(),
            reconnect_attempts: self.state.reconnect_attempts(),
            connection_state: self.state.get(),
        }
    }

    /// Try to receive an event (non-blocking)
    pub fn try_recv_event(&self) -> Option<ClientEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Receive an event, waiting at most `timeout` (blocking)
    pub fn recv_event_timeout(&self, timeout: Duration) -> Option<ClientEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    /// Get a reference to the run flag
    pub fn shutdown_flag(&self) -> &Arc<AtomicBool> {
        &self.shutdown_flag
    }

    fn request_shutdown(&self) {
        self.shutdown_flag.store(false, Ordering::Release);
        self.shutdown_notify.notify_one();
        let _ = self.command_tx.send(ClientCommand::Shutdown);
    }

    /// Close the socket, cancel any pending reconnect and wait for the task.
    pub async fn shutdown(mut self) -> Result<()> {
        info!("Shutting down WebSocket client");
        self.request_shutdown();

        if let Some(handle) = self.task_handle.take() {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    warn!("Client task ended abnormally: {}", e);
                }
            }
        }

        self.state.set(ConnectionState::ShutDown);
        info!("WebSocket client shut down");
        Ok(())
    }
}

impl Drop for WebSocketClient {
    fn drop(&mut self) {
        if let Some(handle) = self.task_handle.take() {
            self.request_shutdown();
            handle.abort();
            self.state.set(ConnectionState::ShutDown);
        }
    }
}

#[inline]
fn is_running(flag: &AtomicBool) -> bool {
    flag.load(Ordering::Acquire)
}

/// Sleep for `delay` unless shutdown is requested first.
///
/// Returns `false` if the client should stop.
async fn wait_or_shutdown(delay: Duration, flag: &AtomicBool, notify: &Notify) -> bool {
    let deadline = Instant::now() + delay;
    loop {
        if !is_running(flag) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        let step = SHUTDOWN_POLL.min(deadline - now);
        tokio::select! {
            biased;
            _ = notify.notified() => {}
            _ = tokio::time::sleep(step) => {}
        }
    }
}

/// Main client task loop
async fn run_client<R>(
    mut config: ClientConfig<R>,
    state: Arc<AtomicConnectionState>,
    metrics: Arc<AtomicMetrics>,
    mut command_rx: mpsc::UnboundedReceiver<ClientCommand>,
    event_tx: Sender<ClientEvent>,
) where
    R: MessageRouter,
{
    let notify = Arc::clone(&config.shutdown_notify);
    let flag = Arc::clone(&config.shutdown_flag);

    loop {
        if !is_running(&flag) {
            debug!("Run flag cleared, exiting main loop");
            break;
        }

        state.set(ConnectionState::Connecting);
        let attempts = config.reconnect.attempts();
        if attempts > 0 {
            let _ = event_tx.send(ClientEvent::Reconnecting(attempts));
        }

        let connection = tokio::select! {
            biased;
            _ = notify.notified() => continue,
            result = connect_async(config.url.as_str()) => result,
        };

        match connection {
            Ok((ws_stream, _)) => {
                info!("Connected to {}", config.url);
                config.reconnect.on_open();
                state.record_open();
                let _ = event_tx.send(ClientEvent::Connected);

                match handle_connection(ws_stream, &mut config, &metrics, &mut command_rx, &notify)
                    .await
                {
                    Ok(()) => debug!("Connection closed locally"),
                    Err(e) => {
                        warn!("Connection lost: {}", e);
                        let _ = event_tx.send(ClientEvent::Error(e.to_string()));
                    }
                }

                state.set(ConnectionState::Closed);
                let _ = event_tx.send(ClientEvent::Disconnected);
            }
            Err(e) => {
                warn!("Failed to connect to {}: {}", config.url, e);
                let _ = event_tx.send(ClientEvent::Error(e.to_string()));
                state.set(ConnectionState::Closed);
            }
        }

        if !is_running(&flag) {
            debug!("Run flag cleared during connection, not reconnecting");
            break;
        }

        let Some(delay) = config.reconnect.on_close() else {
            warn!("Reconnection strategy exhausted, stopping");
            return;
        };
        state.set_reconnect_attempts(config.reconnect.attempts());
        metrics.increment_reconnects();
        info!(
            "Reconnecting in {:?} (attempt {})",
            delay,
            config.reconnect.attempts()
        );

        if !wait_or_shutdown(delay, &flag, &notify).await {
            debug!("Shutdown requested during reconnection delay");
            break;
        }
    }

    state.set(ConnectionState::ShutDown);
    info!("Client task exiting");
}

/// Drive one open connection until it closes or shutdown is requested.
///
/// `Ok(())` means the close was local; errors mean the peer or the network
/// ended it.
async fn handle_connection<R>(
    ws_stream: WsStream,
    config: &mut ClientConfig<R>,
    metrics: &AtomicMetrics,
    command_rx: &mut mpsc::UnboundedReceiver<ClientCommand>,
    notify: &Notify,
) -> Result<()>
where
    R: MessageRouter,
{
    let (mut write, mut read) = ws_stream.split();

    loop {
        if !is_running(&config.shutdown_flag) {
            debug!("Run flag cleared, closing connection");
            let _ = write.close().await;
            return Ok(());
        }

        tokio::select! {
            biased;
            _ = notify.notified() => {}
            cmd = command_rx.recv() => match cmd {
                Some(ClientCommand::Send(msg)) => {
                    write
                        .send(ws_message_to_tungstenite(&msg))
                        .await
                        .map_err(|e| HyperSocketError::WebSocket(e.to_string()))?;
                    metrics.increment_sent();
                }
                Some(ClientCommand::Shutdown) | None => {
                    info!("Received shutdown command");
                    let _ = write.close().await;
                    return Ok(());
                }
            },
            frame = read.next() => match frame {
                Some(Ok(Message::Close(frame))) => {
                    debug!("Server sent close frame: {:?}", frame);
                }
                Some(Ok(msg)) => {
                    if let Some(ws_msg) = tungstenite_to_ws_message(msg) {
                        metrics.increment_received();
                        dispatch(ws_msg, config, &mut write, metrics).await?;
                    }
                }
                Some(Err(e)) => {
                    return Err(HyperSocketError::WebSocket(e.to_string()));
                }
                None => {
                    return Err(HyperSocketError::ConnectionClosed("stream ended".into()));
                }
            },
        }
    }
}

/// Answer keepalives, otherwise parse and hand the message to its handler.
async fn dispatch<R>(
    message: WsMessage,
    config: &mut ClientConfig<R>,
    write: &mut WsSink,
    metrics: &AtomicMetrics,
) -> Result<()>
where
    R: MessageRouter,
{
    if let Some(detector) = &config.passive_ping {
        if detector.is_ping(&message) {
            let pong = ws_message_to_tungstenite(&detector.get_pong_response());
            write.send(pong).await.map_err(|e| {
                HyperSocketError::WebSocket(format!("Failed to send passive pong: {}", e))
            })?;
            metrics.increment_sent();
            debug!("Passive ping answered");
            return Ok(());
        }
    }

    let parsed = match config.router.parse(message).await {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Dropping message: {}", e);
            return Ok(());
        }
    };

    let route_key = config.router.route_key(&parsed);
    match config.routes.get_mut(&route_key) {
        Some(handler) => {
            if let Err(e) = handler.handle(parsed) {
                error!("Handler error for route {:?}: {}", route_key, e);
            }
        }
        None => warn!("No handler configured for route key: {:?}", route_key),
    }
    Ok(())
}

/// Convert WsMessage to tungstenite Message
fn ws_message_to_tungstenite(msg: &WsMessage) -> Message {
    match msg {
        WsMessage::Text(text) => Message::Text(text.clone()),
        WsMessage::Binary(data) => Message::Binary(data.clone()),
    }
}

/// Convert tungstenite Message to WsMessage
fn tungstenite_to_ws_message(msg: Message) -> Option<WsMessage> {
    match msg {
        Message::Text(text) => Some(WsMessage::Text(text)),
        Message::Binary(data) => Some(WsMessage::Binary(data)),
        Message::Ping(_) | Message::Pong(_) | Message::Close(_) | Message::Frame(_) => None,
    }
}
