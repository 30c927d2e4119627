//! WebSocket layer — wire messages, session events, configuration.
//!
//! The transport itself sits behind the [`transport::Transport`] seam so
//! the session logic can be exercised against a scripted mock. This
//! module defines the shared message and event types.

pub mod registry;
pub mod session;
pub mod transport;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::alert::AlertConfig;
use crate::domain::notification::{AppNotification, MarketUpdateNotification};
use crate::error::WsError;
use crate::shared::{AlertId, UserId};

pub use registry::{EventRegistry, ListenerHandle};
pub use session::{Session, SessionState};

// ─── Outbound messages ───────────────────────────────────────────────────────

/// Messages sent from client to server.
///
/// Wire format is `{"event": <name>, "data": <payload>}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum MessageOut {
    SubscribeAlerts {
        user_id: UserId,
        alert_config: AlertConfig,
    },
    UnsubscribeAlert {
        user_id: UserId,
        alert_id: AlertId,
    },
    Ping,
}

// ─── Inbound messages ────────────────────────────────────────────────────────

/// A parsed inbound message from the server.
#[derive(Debug, Clone)]
pub enum Kind {
    Notification(AppNotification),
    MarketUpdate(MarketUpdateNotification),
    AlertSubscribed(AlertAck),
    AlertUnsubscribed(AlertAck),
    Error(ErrorPayload),
    Pong(PongPayload),
}

/// Ack payload on `alert_subscribed` / `alert_unsubscribed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertAck {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_id: Option<AlertId>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Payload of the server's `error` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Payload of the server's `pong` event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PongPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Parse one inbound text frame.
///
/// `Ok(None)` means the frame carried an event name this client does not
/// know — those are ignored, never fatal. `Err` means the frame or its
/// payload was malformed.
pub(crate) fn parse_inbound(text: &str) -> Result<Option<Kind>, WsError> {
    let mut value: Value =
        serde_json::from_str(text).map_err(|e| WsError::Deserialization(e.to_string()))?;

    let Some(event) = value.get("event").and_then(Value::as_str).map(str::to_owned) else {
        return Err(WsError::Deserialization("missing event field".into()));
    };

    let data = value
        .get_mut("data")
        .map(Value::take)
        .unwrap_or(Value::Null);

    let kind = match event.as_str() {
        "notification" => Kind::Notification(payload(data)?),
        "market_update" => Kind::MarketUpdate(payload(data)?),
        "alert_subscribed" => Kind::AlertSubscribed(payload(data)?),
        "alert_unsubscribed" => Kind::AlertUnsubscribed(payload(data)?),
        "error" => Kind::Error(payload(data)?),
        "pong" => Kind::Pong(if data.is_null() {
            PongPayload::default()
        } else {
            payload(data)?
        }),
        other => {
            tracing::trace!("Ignoring unrecognized event: {}", other);
            return Ok(None);
        }
    };

    Ok(Some(kind))
}

fn payload<T: serde::de::DeserializeOwned>(data: Value) -> Result<T, WsError> {
    serde_json::from_value(data).map_err(|e| WsError::Deserialization(e.to_string()))
}

// ─── Session events ──────────────────────────────────────────────────────────

/// Events delivered to registered listeners.
///
/// One variant per channel — adding a variant forces every exhaustive
/// consumer to handle it.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Notification(AppNotification),
    MarketUpdate(MarketUpdateNotification),
    AlertSubscribed(AlertAck),
    AlertUnsubscribed(AlertAck),
    /// Synthesized locally on transport lifecycle transitions.
    ConnectionStatus(ConnectionStatus),
    Error(ErrorPayload),
    Pong(PongPayload),
}

/// The last known connection state, with the reason on loss.
#[derive(Debug, Clone)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub reason: Option<String>,
}

/// Discriminator for [`SessionEvent`], used as the registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Notification,
    MarketUpdate,
    AlertSubscribed,
    AlertUnsubscribed,
    ConnectionStatus,
    Error,
    Pong,
}

impl SessionEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            SessionEvent::Notification(_) => EventKind::Notification,
            SessionEvent::MarketUpdate(_) => EventKind::MarketUpdate,
            SessionEvent::AlertSubscribed(_) => EventKind::AlertSubscribed,
            SessionEvent::AlertUnsubscribed(_) => EventKind::AlertUnsubscribed,
            SessionEvent::ConnectionStatus(_) => EventKind::ConnectionStatus,
            SessionEvent::Error(_) => EventKind::Error,
            SessionEvent::Pong(_) => EventKind::Pong,
        }
    }
}

impl From<Kind> for SessionEvent {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Notification(n) => SessionEvent::Notification(n),
            Kind::MarketUpdate(m) => SessionEvent::MarketUpdate(m),
            Kind::AlertSubscribed(a) => SessionEvent::AlertSubscribed(a),
            Kind::AlertUnsubscribed(a) => SessionEvent::AlertUnsubscribed(a),
            Kind::Error(e) => SessionEvent::Error(e),
            Kind::Pong(p) => SessionEvent::Pong(p),
        }
    }
}

// ─── Configuration ───────────────────────────────────────────────────────────

/// Configuration for the realtime session.
#[derive(Debug, Clone)]
pub struct WsConfig {
    pub url: String,
    /// Deadline for the initial `connect()` to reach `Connected`.
    pub connect_timeout: Duration,
    /// Total connection attempts before giving up on an outage.
    pub max_connect_attempts: u32,
    /// Fixed delay between attempts. The reconnect policy is deliberately
    /// not exponential.
    pub reconnect_delay: Duration,
    /// Application-level ping cadence; `None` disables the health check.
    pub ping_interval: Option<Duration>,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            url: crate::network::DEFAULT_WS_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
            max_connect_attempts: 5,
            reconnect_delay: Duration::from_secs(1),
            ping_interval: Some(Duration::from_secs(30)),
        }
    }
}
