//! High-level alerts API — REST persistence plus live subscription.
//!
//! Creating an alert is a dual write: persist it over REST, then tell the
//! realtime channel to start monitoring it. The second half is best-effort;
//! a down channel never fails the REST call that already succeeded.

use crate::client::AlphaClient;
use crate::domain::alert::{AlertConfig, PriceAlert};
use crate::error::SdkError;
use crate::shared::AlertId;

/// Alerts sub-client, obtained from [`AlphaClient::alerts`].
pub struct Alerts<'a> {
    client: &'a AlphaClient,
}

impl<'a> Alerts<'a> {
    pub(crate) fn new(client: &'a AlphaClient) -> Self {
        Self { client }
    }

    /// Fetch all of the authenticated user's alerts.
    pub async fn list(&self) -> Result<Vec<PriceAlert>, SdkError> {
        self.client.require_user_id().await?;
        Ok(self.client.http().get_alerts().await?)
    }

    /// Create an alert and start live monitoring for it.
    pub async fn create(&self, config: &AlertConfig) -> Result<PriceAlert, SdkError> {
        let user_id = self.client.require_user_id().await?;
        let alert = self.client.http().create_alert(config).await?;
        self.client.live_alerts().subscribe(&user_id, config);
        Ok(alert)
    }

    /// Delete an alert and stop live monitoring for it.
    pub async fn delete(&self, alert_id: &AlertId) -> Result<(), SdkError> {
        let user_id = self.client.require_user_id().await?;
        self.client.http().delete_alert(alert_id).await?;
        self.client.live_alerts().unsubscribe(&user_id, alert_id);
        Ok(())
    }
}
