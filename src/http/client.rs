//! Low-level HTTP client — `AlphaHttp`.
//!
//! One method per REST endpoint this SDK consumes. The backend wraps
//! every response in a `{success, data?, error?}` envelope; methods here
//! unwrap it and return the inner payload.

use async_lock::RwLock;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::domain::alert::{AlertConfig, PriceAlert};
use crate::error::HttpError;
use crate::http::retry::{is_retryable_status, RetryConfig, RetryPolicy};
use crate::shared::AlertId;

/// The envelope every backend response arrives in.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Unwrap the envelope into the payload or the backend's error string.
    pub fn into_result(self) -> Result<T, HttpError> {
        if !self.success {
            return Err(HttpError::Api(
                self.error.unwrap_or_else(|| "unspecified error".to_string()),
            ));
        }
        self.data
            .ok_or_else(|| HttpError::Api("success response with no data".to_string()))
    }
}

/// Low-level client for the Alpha Insights REST API.
#[derive(Clone)]
pub struct AlphaHttp {
    base_url: String,
    client: Client,
    /// Bearer token for authenticated endpoints. Never exposed publicly.
    auth_token: Arc<RwLock<Option<String>>>,
}

impl AlphaHttp {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            auth_token: Arc::new(RwLock::new(None)),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) async fn set_auth_token(&self, token: Option<String>) {
        *self.auth_token.write().await = token;
    }

    pub(crate) async fn clear_auth_token(&self) {
        *self.auth_token.write().await = None;
    }

    // ── Alerts ───────────────────────────────────────────────────────────

    pub async fn get_alerts(&self) -> Result<Vec<PriceAlert>, HttpError> {
        let url = format!("{}/api/alerts", self.base_url);
        self.get(&url, RetryPolicy::Idempotent).await
    }

    pub async fn create_alert(&self, config: &AlertConfig) -> Result<PriceAlert, HttpError> {
        let url = format!("{}/api/alerts", self.base_url);
        self.post(&url, config, RetryPolicy::None).await
    }

    pub async fn delete_alert(&self, alert_id: &AlertId) -> Result<(), HttpError> {
        let url = format!("{}/api/alerts/{}", self.base_url, alert_id);
        // The delete payload is just an ack; discard it.
        let _: serde_json::Value = self.delete(&url, RetryPolicy::None).await?;
        Ok(())
    }

    // ── Internal HTTP methods ────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, url: &str, retry: RetryPolicy) -> Result<T, HttpError> {
        self.request_with_retry(reqwest::Method::GET, url, None::<&()>, retry)
            .await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        body: &B,
        retry: RetryPolicy,
    ) -> Result<T, HttpError> {
        self.request_with_retry(reqwest::Method::POST, url, Some(body), retry)
            .await
    }

    async fn delete<T: DeserializeOwned>(
        &self,
        url: &str,
        retry: RetryPolicy,
    ) -> Result<T, HttpError> {
        self.request_with_retry(reqwest::Method::DELETE, url, None::<&()>, retry)
            .await
    }

    async fn request_with_retry<T: DeserializeOwned, B: Serialize>(
        &self,
        method: reqwest::Method,
        url: &str,
        body: Option<&B>,
        retry: RetryPolicy,
    ) -> Result<T, HttpError> {
        let config = match retry {
            RetryPolicy::None => return self.do_request(&method, url, body).await,
            RetryPolicy::Idempotent => RetryConfig::default(),
            RetryPolicy::Custom(config) => config,
        };

        let mut last_error = None;

        for attempt in 0..=config.max_retries {
            match self.do_request::<T, B>(&method, url, body).await {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    let should_retry = match &e {
                        HttpError::ServerError { status, .. } => is_retryable_status(*status),
                        HttpError::Timeout => true,
                        HttpError::Reqwest(re) => {
                            re.is_connect() || re.is_timeout() || re.is_request()
                        }
                        _ => false,
                    };

                    if should_retry && attempt < config.max_retries {
                        let delay = config.delay_for_attempt(attempt);
                        tracing::debug!(
                            attempt = attempt + 1,
                            max = config.max_retries,
                            delay_ms = delay.as_millis() as u64,
                            "Retrying request to {}",
                            url
                        );
                        tokio::time::sleep(delay).await;
                        last_error = Some(e);
                    } else {
                        return Err(e);
                    }
                }
            }
        }

        Err(HttpError::MaxRetriesExceeded {
            attempts: config.max_retries + 1,
            last_error: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
        })
    }

    async fn do_request<T: DeserializeOwned, B: Serialize>(
        &self,
        method: &reqwest::Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<T, HttpError> {
        let mut req = self.client.request(method.clone(), url);

        if let Some(token) = self.auth_token.read().await.as_ref() {
            req = req.header("Authorization", format!("Bearer {token}"));
        }
        if let Some(b) = body {
            req = req.json(b);
        }

        let resp = req.send().await?;
        let status = resp.status();

        match status.as_u16() {
            200..=299 => {
                let envelope: ApiResponse<T> = resp.json().await?;
                envelope.into_result()
            }
            401 => Err(HttpError::Unauthorized),
            404 => Err(HttpError::NotFound(url.to_string())),
            code if (400..500).contains(&code) => {
                // Client errors still carry the envelope with the reason.
                match resp.json::<ApiResponse<serde_json::Value>>().await {
                    Ok(envelope) => Err(HttpError::Api(
                        envelope.error.unwrap_or_else(|| format!("HTTP {code}")),
                    )),
                    Err(_) => Err(HttpError::ServerError {
                        status: code,
                        body: String::new(),
                    }),
                }
            }
            code => {
                let body = resp.text().await.unwrap_or_default();
                Err(HttpError::ServerError { status: code, body })
            }
        }
    }
}
