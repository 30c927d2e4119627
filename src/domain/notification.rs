//! Notification wire types.
//!
//! Shapes match what the backend's notification service emits on the
//! `notification` and `market_update` events. Notifications are immutable
//! once received; the SDK forwards them to listeners as-is and leaves
//! presentation (including dedup of already-triggered alerts) to the
//! caller.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::alert::AlertCondition;
use crate::shared::{AlertId, Symbol};

/// Discriminator for the `notification` event payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    PriceAlert,
    PortfolioUpdate,
    System,
    MarketUpdate,
}

/// Severity level on `system` notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
    Success,
}

/// A notification as delivered on the `notification` event.
///
/// Specialized notification kinds (price alerts) carry their extra fields
/// at the top level of the payload; those land in `extra` so the payload
/// passes through verbatim and can be recovered with [`as_price_alert`].
///
/// [`as_price_alert`]: AppNotification::as_price_alert
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppNotification {
    #[serde(rename = "type")]
    pub kind: NotificationType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<NotificationLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Opaque payload on `portfolio_update` notifications.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// ISO-8601 timestamp string, produced by the server. Kept as a string
    /// because the backend emits naive local timestamps.
    pub timestamp: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl AppNotification {
    /// Recover the price-alert specialization, if this is one.
    ///
    /// Returns `None` when `kind` differs or any alert field is missing
    /// or malformed.
    pub fn as_price_alert(&self) -> Option<PriceAlertNotification> {
        if self.kind != NotificationType::PriceAlert {
            return None;
        }
        let fields = serde_json::from_value(Value::Object(self.extra.clone())).ok()?;
        Some(fields)
    }
}

/// A triggered price alert, as embedded in a `price_alert` notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceAlertNotification {
    pub alert_id: AlertId,
    pub symbol: Symbol,
    pub condition: AlertCondition,
    pub target_price: f64,
    pub current_price: f64,
}

/// Payload of the `market_update` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketUpdateNotification {
    pub data: MarketData,
    pub timestamp: String,
}

/// Market snapshot inside a market update. All fields optional — the
/// server sends whichever it has (single-symbol tick or index roll-up).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<Symbol>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change: Option<f64>,
    #[serde(rename = "changePercent", skip_serializing_if = "Option::is_none")]
    pub change_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indices: Option<Value>,
}
