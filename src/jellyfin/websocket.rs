use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tokio::time::Duration;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, instrument, trace, warn};
use url::Url;

use super::api::JellyfinError;
use super::ws_incoming_handler::{handle_text_message, Handled, IncomingEvent};

const WS_LOG_TARGET: &str = "r_jellytrack::jellyfin::websocket";

/// Initial delay and update interval (ms) requested with `SessionsStart`
pub const SESSIONS_START_ARGS: &str = "0,1500";
/// Upper bound for the reconnect delay, in seconds
pub const MAX_RECONNECT_DELAY_SECS: u64 = 100;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Serialize, Clone)]
pub struct OutgoingWsMessage<T> {
    #[serde(rename = "MessageType")]
    pub message_type: String,
    #[serde(rename = "Data", skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// Exponential backoff: 1, 2, 4, ... seconds, capped at `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
    exponent: u32,
    max: u64,
}

impl Backoff {
    pub fn new(max: u64) -> Self {
        Backoff { exponent: 0, max }
    }
}

impl Iterator for Backoff {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        let delay = 2u64.checked_pow(self.exponent).unwrap_or(u64::MAX);
        if delay < self.max {
            self.exponent += 1;
            Some(delay)
        } else {
            Some(self.max)
        }
    }
}

/// Builds `{ws|wss}://host:port{path}/socket?api_key=..&deviceId=..` from the
/// normalized server URL.
pub fn build_socket_url(server_url: &str, api_key: &str, device_id: &str) -> Result<Url, JellyfinError> {
    let parsed = Url::parse(server_url)
        .map_err(|e| JellyfinError::WebSocketError(format!("Invalid server URL '{}': {}", server_url, e)))?;
    let scheme = if parsed.scheme() == "https" { "wss" } else { "ws" };
    let host = parsed
        .host_str()
        .ok_or_else(|| JellyfinError::WebSocketError("Server URL has no host".to_string()))?;
    let port = parsed.port_or_known_default().unwrap_or(80);
    let path = parsed.path().trim_end_matches('/');

    let mut url = Url::parse(&format!("{}://{}:{}{}/socket", scheme, host, port, path))
        .map_err(|e| JellyfinError::WebSocketError(format!("Invalid socket URL: {}", e)))?;
    url.query_pairs_mut()
        .append_pair("api_key", api_key)
        .append_pair("deviceId", device_id);
    Ok(url)
}

/// How a single connection's listen loop ended
#[derive(Debug, PartialEq)]
enum ListenOutcome {
    Shutdown,
    Disconnected,
}

/// Keeps a push connection to the Jellyfin server alive and forwards decoded
/// events to `event_tx`, reconnecting with exponential backoff.
pub struct WebSocketHandler {
    socket_url: Url,
    event_tx: mpsc::Sender<IncomingEvent>,
    shutdown_rx: broadcast::Receiver<()>,
    keep_alive: Duration,
}

impl WebSocketHandler {
    pub fn new(
        server_url: &str,
        api_key: &str,
        device_id: &str,
        event_tx: mpsc::Sender<IncomingEvent>,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<Self, JellyfinError> {
        Ok(WebSocketHandler {
            socket_url: build_socket_url(server_url, api_key, device_id)?,
            event_tx,
            shutdown_rx,
            keep_alive: Duration::from_secs(30),
        })
    }

    /// Opens the socket and subscribes to session updates.
    async fn connect(&self) -> Result<WsStream, JellyfinError> {
        debug!(target: WS_LOG_TARGET, "Connecting to WebSocket at {}{}", self.socket_url.host_str().unwrap_or_default(), self.socket_url.path());
        let (mut ws_stream, _) = connect_async(self.socket_url.clone())
            .await
            .map_err(|e| JellyfinError::WebSocketError(format!("WebSocket connection failed: {}", e)))?;
        info!(target: WS_LOG_TARGET, "WebSocket connected");

        let start = OutgoingWsMessage {
            message_type: "SessionsStart".to_string(),
            data: Some(SESSIONS_START_ARGS),
        };
        Self::send_json(&mut ws_stream, &start).await?;
        debug!(target: WS_LOG_TARGET, "SessionsStart sent with {}", SESSIONS_START_ARGS);
        Ok(ws_stream)
    }

    async fn send_json<T: Serialize>(ws_stream: &mut WsStream, message: &T) -> Result<(), JellyfinError> {
        let payload = serde_json::to_string(message)
            .map_err(|e| JellyfinError::Other(format!("Failed to encode WebSocket message: {}", e)))?;
        ws_stream
            .send(Message::Text(payload))
            .await
            .map_err(|e| JellyfinError::WebSocketError(format!("Failed to send message: {}", e)))
    }

    async fn send_keep_alive(ws_stream: &mut WsStream) -> Result<(), JellyfinError> {
        let keep_alive: OutgoingWsMessage<()> = OutgoingWsMessage {
            message_type: "KeepAlive".to_string(),
            data: None,
        };
        Self::send_json(ws_stream, &keep_alive).await
    }

    async fn forward(&self, event: IncomingEvent) {
        if let Err(e) = self.event_tx.send(event).await {
            warn!(target: WS_LOG_TARGET, "Event receiver dropped: {}", e);
        }
    }

    /// Reads messages until the socket closes or shutdown is requested.
    async fn listen(&mut self, mut ws_stream: WsStream) -> ListenOutcome {
        let mut keep_alive_interval = tokio::time::interval(self.keep_alive);
        loop {
            tokio::select! {
                biased;

                _ = self.shutdown_rx.recv() => {
                    debug!(target: WS_LOG_TARGET, "Shutdown requested, closing WebSocket");
                    if let Err(e) = ws_stream.close(None).await {
                        warn!(target: WS_LOG_TARGET, "Error during WebSocket close: {}", e);
                    }
                    return ListenOutcome::Shutdown;
                }

                maybe_message = ws_stream.next() => {
                    match maybe_message {
                        Some(Ok(Message::Text(text))) => {
                            trace!(target: WS_LOG_TARGET, "Received WebSocket message text: {}", text);
                            match handle_text_message(&text) {
                                Handled::KeepAlive => {
                                    if let Err(e) = Self::send_keep_alive(&mut ws_stream).await {
                                        error!(target: WS_LOG_TARGET, "Failed to answer keep-alive: {}", e);
                                        return ListenOutcome::Disconnected;
                                    }
                                }
                                Handled::Forward(event) => self.forward(event).await,
                                Handled::Ignore => {}
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            if let Err(e) = ws_stream.send(Message::Pong(data)).await {
                                error!(target: WS_LOG_TARGET, "Failed to send pong: {}", e);
                                return ListenOutcome::Disconnected;
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            debug!(target: WS_LOG_TARGET, "WebSocket closed by server");
                            return ListenOutcome::Disconnected;
                        }
                        Some(Ok(other)) => {
                            trace!(target: WS_LOG_TARGET, "Ignoring WebSocket frame: {:?}", other);
                        }
                        Some(Err(e)) => {
                            error!(target: WS_LOG_TARGET, "WebSocket read error: {}", e);
                            return ListenOutcome::Disconnected;
                        }
                    }
                }

                _ = keep_alive_interval.tick() => {
                    if let Err(e) = Self::send_keep_alive(&mut ws_stream).await {
                        error!(target: WS_LOG_TARGET, "Failed to send keep-alive: {}", e);
                        return ListenOutcome::Disconnected;
                    }
                }
            }
        }
    }

    /// Runs until shutdown, reconnecting after every disconnect.
    #[instrument(skip(self))]
    pub async fn run(mut self) {
        let mut backoff = Backoff::new(MAX_RECONNECT_DELAY_SECS);
        loop {
            match self.connect().await {
                Ok(ws_stream) => {
                    backoff = Backoff::new(MAX_RECONNECT_DELAY_SECS);
                    self.forward(IncomingEvent::Connected).await;
                    if self.listen(ws_stream).await == ListenOutcome::Shutdown {
                        break;
                    }
                    self.forward(IncomingEvent::Disconnected).await;
                }
                Err(e) => error!(target: WS_LOG_TARGET, "{}", e),
            }

            let delay = backoff.next().unwrap_or(MAX_RECONNECT_DELAY_SECS);
            warn!(target: WS_LOG_TARGET, "No connection to server. Next try in {} second(s)", delay);
            tokio::select! {
                _ = self.shutdown_rx.recv() => break,
                _ = tokio::time::sleep(Duration::from_secs(delay)) => {}
            }
        }
        info!(target: WS_LOG_TARGET, "WebSocket handler stopped");
    }
}
