use crate::parser::WsMessage;

/// Detects application-level keepalive probes and supplies the reply.
///
/// Some servers send their keepalive as an ordinary data frame (for example
/// `{"type":"ping"}`) and close the socket if the matching reply does not
/// arrive in time. When `is_ping` returns true the client writes
/// `get_pong_response()` back on the same socket before reading the next
/// frame, and the probe is not handed to the router.
///
/// ```text
/// Server ──{"type":"ping"}──> Client ── is_ping() ─┐
/// Server <──{"type":"pong"}── Client <─────────────┘
/// ```
pub trait PassivePingDetector: Send + Sync {
    /// Check if an inbound message is a keepalive probe
    fn is_ping(&self, message: &WsMessage) -> bool;

    /// The reply to send for a detected probe
    fn get_pong_response(&self) -> WsMessage;
}

/// Detects pings by exact text match.
///
/// ```ignore
/// let detector = TextPassivePing::new("ping", WsMessage::text("pong"));
/// ```
pub struct TextPassivePing {
    ping_text: String,
    pong_response: WsMessage,
}

impl TextPassivePing {
    pub fn new(ping_text: impl Into<String>, pong_response: WsMessage) -> Self {
        Self {
            ping_text: ping_text.into(),
            pong_response,
        }
    }
}

impl PassivePingDetector for TextPassivePing {
    fn is_ping(&self, message: &WsMessage) -> bool {
        message
            .as_text()
            .map(|text| text == self.ping_text)
            .unwrap_or(false)
    }

    fn get_pong_response(&self) -> WsMessage {
        self.pong_response.clone()
    }
}

/// Detects JSON messages whose `field_name` equals `ping_value`.
///
/// ```ignore
/// // {"type":"ping"} -> {"type":"pong"}
/// let detector = JsonPassivePing::new("type", "ping", WsMessage::text(r#"{"type":"pong"}"#));
/// ```
pub struct JsonPassivePing {
    field_name: String,
    ping_value: String,
    pong_response: WsMessage,
}

impl JsonPassivePing {
    pub fn new(
        field_name: impl Into<String>,
        ping_value: impl Into<String>,
        pong_response: WsMessage,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            ping_value: ping_value.into(),
            pong_response,
        }
    }
}

impl PassivePingDetector for JsonPassivePing {
    fn is_ping(&self, message: &WsMessage) -> bool {
        let Some(text) = message.as_text() else {
            return false;
        };
        // Cheap pre-check so regular traffic is not parsed twice
        if !text.contains(self.ping_value.as_str()) {
            return false;
        }
        serde_json::from_str::<serde_json::Value>(text)
            .ok()
            .and_then(|json| {
                json.get(&self.field_name)
                    .and_then(|value| value.as_str().map(|s| s == self.ping_value))
            })
            .unwrap_or(false)
    }

    fn get_pong_response(&self) -> WsMessage {
        self.pong_response.clone()
    }
}
