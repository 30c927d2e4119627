//! Price alerts: persistent record, creation config, sub-clients.
//!
//! An alert lives in two places: the persistent record behind the REST
//! API ([`PriceAlert`]) and the server's live evaluation subscription,
//! driven over the realtime channel ([`live::AlertSubscriptions`]). The
//! two are only loosely synchronized — see `live` for the policy.

pub mod client;
pub mod live;

use serde::{Deserialize, Serialize};

use crate::shared::{AlertId, Symbol, UserId};

/// Trigger direction for a price alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertCondition {
    Above,
    Below,
}

/// The user-supplied part of an alert — also the payload of the live
/// `subscribe_alerts` message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    pub symbol: Symbol,
    pub condition: AlertCondition,
    pub target_price: f64,
}

/// Persistent alert record, owned by the REST collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceAlert {
    pub id: AlertId,
    pub user_id: UserId,
    pub symbol: Symbol,
    pub condition: AlertCondition,
    pub target_price: f64,
    pub enabled: bool,
    pub triggered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub triggered_at: Option<String>,
    pub created_at: String,
}

impl PriceAlert {
    /// The live-subscription payload for this record.
    pub fn config(&self) -> AlertConfig {
        AlertConfig {
            symbol: self.symbol.clone(),
            condition: self.condition,
            target_price: self.target_price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&AlertCondition::Above).unwrap(), "\"above\"");
        assert_eq!(serde_json::to_string(&AlertCondition::Below).unwrap(), "\"below\"");
    }

    #[test]
    fn test_price_alert_parses_backend_record() {
        let json = r#"{
            "id": "u1_AAPL_1700000000",
            "user_id": "u1",
            "symbol": "AAPL",
            "condition": "below",
            "target_price": 140.5,
            "enabled": true,
            "triggered": false,
            "created_at": "2024-01-01T00:00:00"
        }"#;
        let alert: PriceAlert = serde_json::from_str(json).unwrap();
        assert_eq!(alert.condition, AlertCondition::Below);
        assert!(alert.triggered_at.is_none());

        let config = alert.config();
        assert_eq!(config.symbol.as_str(), "AAPL");
        assert_eq!(config.target_price, 140.5);
    }
}
