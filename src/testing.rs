//! Test utilities — a scripted in-memory realtime transport.
//!
//! [`MockTransport`] plugs into [`Session::with_transport`] and plays the
//! server's side of the channel: each `connect` attempt consumes the next
//! scripted [`ConnectOutcome`], outbound frames land in a spy buffer, and
//! tests inject inbound frames with [`MockTransport::send_from_server`].
//!
//! Public so downstream crates can drive the session in their own tests.
//!
//! [`Session::with_transport`]: crate::ws::Session::with_transport

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use futures_util::Sink;
use tokio::sync::mpsc;

use crate::error::WsError;
use crate::shared::UserId;
use crate::ws::transport::{Connection, Transport};

/// What the fake server does with one connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// Accept and hand back a live channel.
    Accept,
    /// Fail the attempt immediately.
    Refuse,
    /// Never answer. Pairs with paused-clock tests of the connect timeout.
    Hang,
}

struct MockInner {
    script: Mutex<VecDeque<ConnectOutcome>>,
    sent: Arc<Mutex<Vec<String>>>,
    server: Mutex<Option<mpsc::UnboundedSender<Result<String, WsError>>>>,
    connect_count: AtomicUsize,
    last_identity: Mutex<Option<UserId>>,
}

/// Scripted transport for session tests.
#[derive(Clone)]
pub struct MockTransport {
    inner: Arc<MockInner>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// A transport that accepts every connection attempt.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MockInner {
                script: Mutex::new(VecDeque::new()),
                sent: Arc::new(Mutex::new(Vec::new())),
                server: Mutex::new(None),
                connect_count: AtomicUsize::new(0),
                last_identity: Mutex::new(None),
            }),
        }
    }

    /// A transport that plays `outcomes` in order, then accepts.
    pub fn script(outcomes: impl IntoIterator<Item = ConnectOutcome>) -> Self {
        let transport = Self::new();
        for outcome in outcomes {
            transport.push_outcome(outcome);
        }
        transport
    }

    /// Queue one more scripted outcome.
    pub fn push_outcome(&self, outcome: ConnectOutcome) {
        self.inner.script.lock().unwrap().push_back(outcome);
    }

    /// How many connection attempts have been made.
    pub fn connect_count(&self) -> usize {
        self.inner.connect_count.load(Ordering::SeqCst)
    }

    /// The identity presented on the most recent attempt.
    pub fn last_identity(&self) -> Option<UserId> {
        self.inner.last_identity.lock().unwrap().clone()
    }

    /// Every frame the client has sent, across all connections.
    pub fn sent_frames(&self) -> Vec<String> {
        self.inner.sent.lock().unwrap().clone()
    }

    /// Whether a connection is currently attached.
    pub fn is_attached(&self) -> bool {
        self.inner
            .server
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|tx| !tx.is_closed())
    }

    /// Deliver a `{"event": .., "data": ..}` frame to the client.
    ///
    /// Panics if no connection is attached — a test bug, not a runtime
    /// condition.
    pub fn send_from_server(&self, event: &str, data: serde_json::Value) {
        self.send_raw(serde_json::json!({ "event": event, "data": data }).to_string());
    }

    /// Deliver a raw text frame to the client.
    pub fn send_raw(&self, text: String) {
        let server = self.inner.server.lock().unwrap();
        let tx = server.as_ref().expect("no connection attached");
        tx.send(Ok(text)).expect("client inbound stream gone");
    }

    /// Kill the current connection, as a network drop would.
    pub fn drop_connection(&self) {
        self.inner.server.lock().unwrap().take();
    }
}

impl Transport for MockTransport {
    fn connect(
        &self,
        _url: String,
        identity: Option<UserId>,
    ) -> Pin<Box<dyn Future<Output = Result<Connection, WsError>> + Send>> {
        let inner = Arc::clone(&self.inner);
        Box::pin(async move {
            inner.connect_count.fetch_add(1, Ordering::SeqCst);
            *inner.last_identity.lock().unwrap() = identity;

            let outcome = inner
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(ConnectOutcome::Accept);

            match outcome {
                ConnectOutcome::Refuse => {
                    return Err(WsError::ConnectionFailed("connection refused".into()))
                }
                ConnectOutcome::Hang => std::future::pending::<()>().await,
                ConnectOutcome::Accept => {}
            }

            let (tx, rx) = mpsc::unbounded_channel();
            *inner.server.lock().unwrap() = Some(tx);

            let inbound = futures_util::stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|item| (item, rx))
            });
            let outbound = SpySink {
                sent: Arc::clone(&inner.sent),
            };

            Ok(Connection {
                outbound: Box::pin(outbound),
                inbound: Box::pin(inbound),
            })
        })
    }
}

/// Outbound sink that records every frame.
struct SpySink {
    sent: Arc<Mutex<Vec<String>>>,
}

impl Sink<String> for SpySink {
    type Error = WsError;

    fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), WsError>> {
        Poll::Ready(Ok(()))
    }

    fn start_send(self: Pin<&mut Self>, item: String) -> Result<(), WsError> {
        self.sent.lock().unwrap().push(item);
        Ok(())
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), WsError>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), WsError>> {
        Poll::Ready(Ok(()))
    }
}
