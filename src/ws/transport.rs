//! Transport boundary for the realtime channel.
//!
//! The session owns state, policy, and dispatch; the transport only moves
//! JSON text frames. Keeping the seam this thin lets the session logic run
//! unchanged against `tokio-tungstenite` in production and against the
//! scripted mock in `crate::testing`.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use futures_util::future;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::error::WsError;
use crate::shared::UserId;

/// Outbound half: serialized frames toward the server.
pub type OutboundSink = Pin<Box<dyn Sink<String, Error = WsError> + Send>>;

/// Inbound half: text frames from the server. An `Err` item or the end of
/// the stream both mean the connection is gone.
pub type InboundStream = Pin<Box<dyn Stream<Item = Result<String, WsError>> + Send>>;

/// One established channel.
pub struct Connection {
    pub outbound: OutboundSink,
    pub inbound: InboundStream,
}

/// A way to open the realtime channel.
///
/// `identity` is the handshake auth — the user id extracted from the
/// bearer token. Implementations decide how it rides the connection
/// request.
pub trait Transport: Send + Sync + 'static {
    fn connect(
        &self,
        url: String,
        identity: Option<UserId>,
    ) -> Pin<Box<dyn Future<Output = Result<Connection, WsError>> + Send>>;
}

// ─── Production transport ────────────────────────────────────────────────────

/// Per-attempt cap on the TCP+TLS+upgrade handshake. Connection policy
/// (initial deadline, attempt budget) lives in the session, not here.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

/// `tokio-tungstenite` transport. The handshake identity travels as a
/// `user_id` query parameter on the upgrade request.
pub struct TungsteniteTransport;

impl Transport for TungsteniteTransport {
    fn connect(
        &self,
        url: String,
        identity: Option<UserId>,
    ) -> Pin<Box<dyn Future<Output = Result<Connection, WsError>> + Send>> {
        Box::pin(async move {
            let url = match identity {
                Some(user_id) => with_identity(&url, &user_id),
                None => url,
            };

            let (ws_stream, _) = tokio::time::timeout(HANDSHAKE_TIMEOUT, connect_async(&url))
                .await
                .map_err(|_| WsError::ConnectTimeout)?
                .map_err(|e| WsError::ConnectionFailed(e.to_string()))?;

            let (sink, stream) = ws_stream.split();

            let outbound = sink
                .sink_map_err(|e| WsError::SendFailed(e.to_string()))
                .with(|text: String| future::ready(Ok(Message::Text(text.into()))));

            // Transport-level ping/pong is answered by tungstenite itself;
            // only text frames and terminal conditions surface here.
            let inbound = stream.filter_map(|item| {
                future::ready(match item {
                    Ok(Message::Text(text)) => Some(Ok(text.to_string())),
                    Ok(Message::Close(frame)) => {
                        let (code, reason) = match frame {
                            Some(f) => (Some(u16::from(f.code)), f.reason.to_string()),
                            None => (None, "no close frame".to_string()),
                        };
                        Some(Err(WsError::Closed { code, reason }))
                    }
                    Ok(_) => None,
                    Err(e) => Some(Err(WsError::Closed {
                        code: None,
                        reason: e.to_string(),
                    })),
                })
            });

            Ok(Connection {
                outbound: Box::pin(outbound),
                inbound: Box::pin(inbound),
            })
        })
    }
}

fn with_identity(url: &str, user_id: &UserId) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}user_id={user_id}")
}
