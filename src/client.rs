//! High-level client tying the REST and realtime layers together.

use std::sync::Arc;

use async_lock::RwLock;

use crate::auth::{decode_token, Claims};
use crate::domain::alert::client::Alerts;
use crate::domain::alert::live::AlertSubscriptions;
use crate::error::SdkError;
use crate::http::AlphaHttp;
use crate::network::{DEFAULT_API_URL, DEFAULT_WS_URL};
use crate::shared::UserId;
use crate::ws::transport::Transport;
use crate::ws::{Session, WsConfig};

/// Builder for [`AlphaClient`].
///
/// ```no_run
/// # use alpha_realtime_sdk::client::AlphaClient;
/// let client = AlphaClient::builder()
///     .api_url("https://staging.alphainsights.app")
///     .build();
/// ```
#[derive(Default)]
pub struct AlphaClientBuilder {
    api_url: Option<String>,
    ws_config: Option<WsConfig>,
    transport: Option<Arc<dyn Transport>>,
}

impl AlphaClientBuilder {
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = Some(url.into());
        self
    }

    pub fn ws_url(mut self, url: impl Into<String>) -> Self {
        let mut config = self.ws_config.take().unwrap_or_default();
        config.url = url.into();
        self.ws_config = Some(config);
        self
    }

    /// Replace the whole realtime configuration (timeouts, attempt budget,
    /// ping cadence).
    pub fn ws_config(mut self, config: WsConfig) -> Self {
        self.ws_config = Some(config);
        self
    }

    /// Swap the realtime transport; tests plug in the scripted mock here.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> AlphaClient {
        let api_url = self.api_url.unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let ws_config = self.ws_config.unwrap_or_else(|| WsConfig {
            url: DEFAULT_WS_URL.to_string(),
            ..WsConfig::default()
        });

        let session = match self.transport {
            Some(transport) => Session::with_transport(ws_config, transport),
            None => Session::new(ws_config),
        };

        AlphaClient {
            http: AlphaHttp::new(&api_url),
            session,
            credentials: Arc::new(RwLock::new(None)),
        }
    }
}

/// The Alpha Insights client.
///
/// Cheap to clone; clones share the HTTP connection pool, the realtime
/// session, and the login state.
#[derive(Clone)]
pub struct AlphaClient {
    http: AlphaHttp,
    session: Session,
    credentials: Arc<RwLock<Option<Claims>>>,
}

impl AlphaClient {
    pub fn builder() -> AlphaClientBuilder {
        AlphaClientBuilder::default()
    }

    /// Client against the production endpoints.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Adopt a bearer token for REST calls and the realtime handshake.
    ///
    /// Fails closed: a token whose claims cannot be read is rejected and
    /// the previous login state is left untouched.
    pub async fn login(&self, token: &str) -> Result<Claims, SdkError> {
        let claims = decode_token(token).ok_or(SdkError::NotAuthenticated)?;

        self.http.set_auth_token(Some(token.to_string())).await;
        *self.credentials.write().await = Some(claims.clone());
        tracing::info!(user_id = %claims.user_id, "Logged in");
        Ok(claims)
    }

    /// Drop credentials and tear down the realtime session.
    pub async fn logout(&self) {
        self.http.clear_auth_token().await;
        *self.credentials.write().await = None;
        self.session.disconnect();
        tracing::info!("Logged out");
    }

    /// The claims of the current login, if any.
    pub async fn claims(&self) -> Option<Claims> {
        self.credentials.read().await.clone()
    }

    /// Open the realtime channel, presenting the logged-in identity.
    ///
    /// Works without a login too — the server then treats the connection
    /// as anonymous and delivers only broadcast events.
    pub async fn connect(&self) -> Result<(), SdkError> {
        let identity = self
            .credentials
            .read()
            .await
            .as_ref()
            .map(|claims| claims.user_id.clone());
        Ok(self.session.connect(identity).await?)
    }

    /// Close the realtime channel. REST calls keep working.
    pub fn disconnect(&self) {
        self.session.disconnect();
    }

    /// The realtime session handle, for listener registration and state.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The alerts API.
    pub fn alerts(&self) -> Alerts<'_> {
        Alerts::new(self)
    }

    /// Live subscription manager over this client's session.
    pub fn live_alerts(&self) -> AlertSubscriptions {
        AlertSubscriptions::new(self.session.clone())
    }

    pub(crate) fn http(&self) -> &AlphaHttp {
        &self.http
    }

    pub(crate) async fn require_user_id(&self) -> Result<UserId, SdkError> {
        self.credentials
            .read()
            .await
            .as_ref()
            .map(|claims| claims.user_id.clone())
            .ok_or(SdkError::NotAuthenticated)
    }
}

impl Default for AlphaClient {
    fn default() -> Self {
        Self::new()
    }
}
