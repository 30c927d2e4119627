//! Client SDK for the Alpha Insights realtime notification service.
//!
//! Layered bottom-up:
//!
//! - **Layer 1 — core**: [`network`] endpoints, [`error`] types, [`shared`]
//!   identifier newtypes.
//! - **Layer 2 — auth**: [`auth`] bearer-token claims extraction.
//! - **Layer 3 — protocol**: [`domain`] payload types and the [`ws`] wire
//!   messages.
//! - **Layer 4 — channels**: the [`ws::Session`] state machine with its
//!   listener registry, and the [`http::AlphaHttp`] REST client.
//! - **Layer 5 — client**: [`client::AlphaClient`] composing the layers
//!   behind one handle.
//!
//! # Quick start
//!
//! ```no_run
//! use alpha_realtime_sdk::prelude::*;
//!
//! # async fn run(token: &str) -> Result<(), SdkError> {
//! let client = AlphaClient::new();
//! client.login(token).await?;
//!
//! client.session().events().on_price_alert(|alert| {
//!     println!("{} crossed {}", alert.symbol, alert.target_price);
//! });
//!
//! client.connect().await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod domain;
pub mod error;
pub mod http;
pub mod network;
pub mod shared;
pub mod testing;
pub mod ws;

/// The types most consumers need.
pub mod prelude {
    pub use crate::auth::Claims;
    pub use crate::client::{AlphaClient, AlphaClientBuilder};
    pub use crate::domain::alert::{AlertCondition, AlertConfig, PriceAlert};
    pub use crate::domain::notification::{
        AppNotification, MarketUpdateNotification, NotificationLevel, NotificationType,
        PriceAlertNotification,
    };
    pub use crate::error::{HttpError, SdkError, WsError};
    pub use crate::shared::{AlertId, Symbol, UserId};
    pub use crate::ws::{
        ConnectionStatus, EventKind, EventRegistry, ListenerHandle, Session, SessionEvent,
        SessionState, WsConfig,
    };
}
