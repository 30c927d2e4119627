//! Live alert subscriptions over the realtime channel.
//!
//! Subscription messages are best-effort: if the session is not currently
//! connected they are dropped, not queued. The server rebuilds its picture
//! from whatever subscribe messages arrive after a reconnect, so there is
//! no replay on this side either.

use crate::domain::alert::AlertConfig;
use crate::shared::{AlertId, UserId};
use crate::ws::{MessageOut, Session};

/// Manages server-side alert subscriptions for one realtime session.
#[derive(Clone)]
pub struct AlertSubscriptions {
    session: Session,
}

impl AlertSubscriptions {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    /// Ask the server to start monitoring `config` for `user_id`.
    ///
    /// Infallible: when the channel is down the message is silently
    /// dropped. Confirmation arrives asynchronously at `on_alert_subscribed`
    /// listeners.
    pub fn subscribe(&self, user_id: &UserId, config: &AlertConfig) {
        let msg = MessageOut::SubscribeAlerts {
            user_id: user_id.clone(),
            alert_config: config.clone(),
        };
        if let Err(e) = self.session.send(msg) {
            tracing::debug!(
                symbol = %config.symbol,
                "Dropping alert subscription while disconnected: {}",
                e
            );
        }
    }

    /// Ask the server to stop monitoring `alert_id` for `user_id`.
    ///
    /// Same delivery contract as [`subscribe`](Self::subscribe).
    pub fn unsubscribe(&self, user_id: &UserId, alert_id: &AlertId) {
        let msg = MessageOut::UnsubscribeAlert {
            user_id: user_id.clone(),
            alert_id: alert_id.clone(),
        };
        if let Err(e) = self.session.send(msg) {
            tracing::debug!(
                alert_id = %alert_id,
                "Dropping alert unsubscription while disconnected: {}",
                e
            );
        }
    }

    /// The session this manager writes to.
    pub fn session(&self) -> &Session {
        &self.session
    }
}
