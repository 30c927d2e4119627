//! Realtime session — connection state machine, event dispatch, lifecycle.
//!
//! A background tokio task owns the channel; the public [`Session`] handle
//! communicates with it over an mpsc command channel. `Session` is cheap
//! to clone and every clone shares the same channel, state, and listener
//! registry — the process has one realtime session, passed to consumers by
//! handle instead of through a global.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::WsError;
use crate::shared::UserId;
use crate::ws::registry::EventRegistry;
use crate::ws::transport::{Connection, Transport, TungsteniteTransport};
use crate::ws::{parse_inbound, ConnectionStatus, ErrorPayload, MessageOut, SessionEvent, WsConfig};

// ─── State machine ───────────────────────────────────────────────────────────

/// Connection lifecycle state.
///
/// `Idle →(connect)→ Connecting →(open)→ Connected`;
/// `Connected →(network loss)→ Disconnected →(auto-retry)→ Connecting`;
/// `Connecting →(budget exhausted)→ Failed`;
/// any state `→(disconnect)→ Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    Idle = 0,
    Connecting = 1,
    Connected = 2,
    Disconnected = 3,
    Failed = 4,
}

impl From<u8> for SessionState {
    fn from(value: u8) -> Self {
        match value {
            1 => SessionState::Connecting,
            2 => SessionState::Connected,
            3 => SessionState::Disconnected,
            4 => SessionState::Failed,
            _ => SessionState::Idle,
        }
    }
}

// ─── Commands from the public API to the background task ─────────────────────

enum Command {
    Send(MessageOut),
    Disconnect,
}

/// Why the connected loop ended.
enum LoopExit {
    /// `disconnect()` was called or every handle was dropped. The task
    /// must not touch shared state afterwards.
    UserRequested,
    /// The channel dropped out from under us; reconnection policy applies.
    Dropped(String),
}

// ─── Shared state between handles and the task ───────────────────────────────

struct SharedState {
    state: AtomicU8,
    registry: EventRegistry,
}

impl SharedState {
    fn set_state(&self, state: SessionState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    fn state(&self) -> SessionState {
        SessionState::from(self.state.load(Ordering::SeqCst))
    }

    fn emit_status(&self, connected: bool, reason: Option<String>) {
        self.registry.emit(&SessionEvent::ConnectionStatus(ConnectionStatus {
            connected,
            reason,
        }));
    }

    fn emit_error(&self, message: String) {
        self.registry
            .emit(&SessionEvent::Error(ErrorPayload { message, code: None }));
    }
}

struct ConnSlot {
    cmd_tx: Option<mpsc::Sender<Command>>,
    task: Option<JoinHandle<()>>,
}

struct SessionInner {
    config: WsConfig,
    transport: Arc<dyn Transport>,
    shared: Arc<SharedState>,
    conn: Mutex<ConnSlot>,
}

// ─── Public Session handle ───────────────────────────────────────────────────

/// Handle to the process's realtime session.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// Create a session over the production WebSocket transport.
    /// Does not connect yet.
    pub fn new(config: WsConfig) -> Self {
        Self::with_transport(config, Arc::new(TungsteniteTransport))
    }

    /// Create a session over a custom transport (tests use the mock from
    /// `crate::testing`).
    pub fn with_transport(config: WsConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                config,
                transport,
                shared: Arc::new(SharedState {
                    state: AtomicU8::new(SessionState::Idle as u8),
                    registry: EventRegistry::new(),
                }),
                conn: Mutex::new(ConnSlot {
                    cmd_tx: None,
                    task: None,
                }),
            }),
        }
    }

    /// The shared listener registry.
    pub fn events(&self) -> &EventRegistry {
        &self.inner.shared.registry
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.inner.shared.state()
    }

    /// Last known connection status.
    pub fn is_connected(&self) -> bool {
        self.state() == SessionState::Connected
    }

    /// Open the channel, presenting `identity` as handshake auth.
    ///
    /// Settles exactly once:
    /// - `Ok(())` on the first `Connected` transition;
    /// - `Err(ConnectTimeout)` if that transition is not reached within
    ///   `connect_timeout` (initial attempt only);
    /// - `Err(ReconnectExhausted)` once the attempt budget runs out
    ///   without ever connecting.
    ///
    /// Later disconnect/reconnect cycles are reported through
    /// `on_connection_status` listeners, never through this result.
    /// Calling `connect` while the session task is already running is a
    /// no-op returning `Ok(())`.
    pub async fn connect(&self, identity: Option<UserId>) -> Result<(), WsError> {
        let settle_rx = {
            let mut conn = self.inner.conn.lock().expect("session lock poisoned");

            let task_alive = conn.task.as_ref().is_some_and(|t| !t.is_finished());
            if conn.cmd_tx.is_some() && task_alive {
                return Ok(());
            }

            let (cmd_tx, cmd_rx) = mpsc::channel(64);
            let (settle_tx, settle_rx) = oneshot::channel();

            let ctx = TaskContext {
                config: self.inner.config.clone(),
                transport: Arc::clone(&self.inner.transport),
                shared: Arc::clone(&self.inner.shared),
                identity,
            };
            conn.cmd_tx = Some(cmd_tx);
            conn.task = Some(tokio::spawn(run_task(ctx, cmd_rx, settle_tx)));
            settle_rx
        };

        match tokio::time::timeout(self.inner.config.connect_timeout, settle_rx).await {
            Ok(Ok(result)) => result,
            // Task ended without settling — disconnect() during the attempt.
            Ok(Err(_)) => Err(WsError::ConnectionFailed("session closed".into())),
            Err(_) => Err(WsError::ConnectTimeout),
        }
    }

    /// Tear the session down. Idempotent.
    ///
    /// Takes effect immediately from the caller's perspective: the state
    /// is forced to `Idle` and the listener registry is cleared before
    /// this returns, so consumers must re-register listeners after any
    /// manual disconnect. The channel itself is closed by the background
    /// task.
    pub fn disconnect(&self) {
        let (cmd_tx, task) = {
            let mut conn = self.inner.conn.lock().expect("session lock poisoned");
            (conn.cmd_tx.take(), conn.task.take())
        };

        if let Some(tx) = cmd_tx {
            let _ = tx.try_send(Command::Disconnect);
        }
        if let Some(handle) = task {
            handle.abort();
        }

        self.inner.shared.set_state(SessionState::Idle);
        self.inner.shared.registry.clear();
        tracing::info!("Session disconnected");
    }

    /// Send one message over the channel.
    ///
    /// Best-effort by design: unless the session is currently `Connected`
    /// this returns `Err(NotConnected)` without queueing or retrying.
    pub fn send(&self, msg: MessageOut) -> Result<(), WsError> {
        if !self.is_connected() {
            return Err(WsError::NotConnected);
        }

        let cmd_tx = {
            let conn = self.inner.conn.lock().expect("session lock poisoned");
            conn.cmd_tx.clone()
        };

        match cmd_tx {
            Some(tx) => tx.try_send(Command::Send(msg)).map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => {
                    WsError::SendFailed("command channel full".into())
                }
                mpsc::error::TrySendError::Closed(_) => WsError::NotConnected,
            }),
            None => Err(WsError::NotConnected),
        }
    }

    /// One-shot liveness probe; the reply arrives at `on_pong` listeners.
    pub fn ping(&self) -> Result<(), WsError> {
        self.send(MessageOut::Ping)
    }
}

// ─── Background task ─────────────────────────────────────────────────────────

struct TaskContext {
    config: WsConfig,
    transport: Arc<dyn Transport>,
    shared: Arc<SharedState>,
    identity: Option<UserId>,
}

async fn run_task(
    ctx: TaskContext,
    mut cmd_rx: mpsc::Receiver<Command>,
    settle_tx: oneshot::Sender<Result<(), WsError>>,
) {
    let mut settle = Some(settle_tx);
    let mut attempts: u32 = 0;

    loop {
        ctx.shared.set_state(SessionState::Connecting);
        attempts += 1;

        match ctx
            .transport
            .connect(ctx.config.url.clone(), ctx.identity.clone())
            .await
        {
            Ok(conn) => {
                attempts = 0;
                ctx.shared.set_state(SessionState::Connected);
                tracing::info!("Realtime session connected");
                if let Some(tx) = settle.take() {
                    let _ = tx.send(Ok(()));
                }
                ctx.shared.emit_status(true, None);

                match run_connected(&ctx, conn, &mut cmd_rx).await {
                    LoopExit::UserRequested => return,
                    LoopExit::Dropped(reason) => {
                        tracing::warn!("Connection lost: {}", reason);
                        ctx.shared.set_state(SessionState::Disconnected);
                        ctx.shared.emit_status(false, Some(reason));
                    }
                }
            }
            Err(e) => {
                tracing::warn!(
                    attempt = attempts,
                    max = ctx.config.max_connect_attempts,
                    "Connection attempt failed: {}",
                    e
                );
                ctx.shared.emit_error(format!("Connection failed: {e}"));
            }
        }

        if attempts >= ctx.config.max_connect_attempts {
            ctx.shared.set_state(SessionState::Failed);
            if let Some(tx) = settle.take() {
                let _ = tx.send(Err(WsError::ReconnectExhausted { attempts }));
            }
            tracing::error!("Reconnect budget exhausted after {} attempts", attempts);
            return;
        }

        // Fixed inter-attempt delay — deliberately not exponential.
        tokio::time::sleep(ctx.config.reconnect_delay).await;
    }
}

/// The connected loop — runs until the channel breaks or the user
/// disconnects.
async fn run_connected(
    ctx: &TaskContext,
    conn: Connection,
    cmd_rx: &mut mpsc::Receiver<Command>,
) -> LoopExit {
    let Connection {
        mut outbound,
        mut inbound,
    } = conn;

    let mut ping_interval = ctx.config.ping_interval.map(|period| {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        interval.reset(); // skip the immediate first tick
        interval
    });
    let ping_enabled = ping_interval.is_some();

    loop {
        tokio::select! {
            frame = inbound.next() => {
                match frame {
                    Some(Ok(text)) => dispatch_frame(&ctx.shared, &text),
                    Some(Err(e)) => return LoopExit::Dropped(e.to_string()),
                    None => return LoopExit::Dropped("stream ended".into()),
                }
            }

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(Command::Send(msg)) => {
                        send_frame(&mut outbound, &msg).await;
                    }
                    Some(Command::Disconnect) => {
                        let _ = outbound.close().await;
                        return LoopExit::UserRequested;
                    }
                    // Every Session handle dropped — clean exit.
                    None => {
                        let _ = outbound.close().await;
                        return LoopExit::UserRequested;
                    }
                }
            }

            _ = tick(&mut ping_interval), if ping_enabled => {
                tracing::trace!("Health-check ping");
                send_frame(&mut outbound, &MessageOut::Ping).await;
            }
        }
    }
}

async fn tick(interval: &mut Option<tokio::time::Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        // Guarded out by the select precondition.
        None => std::future::pending::<()>().await,
    }
}

/// Route one inbound frame to the registry.
///
/// Unknown event names are dropped silently; malformed frames surface to
/// `on_error` listeners. Nothing on this path returns an error — delivery
/// problems must never tear the session down.
fn dispatch_frame(shared: &SharedState, text: &str) {
    match parse_inbound(text) {
        Ok(Some(kind)) => shared.registry.emit(&SessionEvent::from(kind)),
        Ok(None) => {}
        Err(e) => {
            tracing::warn!("Malformed inbound frame: {} — raw: {}", e, text);
            shared.emit_error(e.to_string());
        }
    }
}

async fn send_frame(outbound: &mut crate::ws::transport::OutboundSink, msg: &MessageOut) {
    let json = match serde_json::to_string(msg) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!("Failed to serialize outbound message: {}", e);
            return;
        }
    };
    if let Err(e) = outbound.send(json).await {
        tracing::warn!("Send failed: {}", e);
    }
}
