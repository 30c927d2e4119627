//! Session lifecycle tests over the scripted in-memory transport.
//!
//! All tests run on a paused clock, so the 10s connect deadline and the
//! 1s inter-attempt delay elapse instantly.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;

use alpha_realtime_sdk::domain::alert::live::AlertSubscriptions;
use alpha_realtime_sdk::domain::alert::{AlertCondition, AlertConfig};
use alpha_realtime_sdk::error::WsError;
use alpha_realtime_sdk::shared::{AlertId, Symbol, UserId};
use alpha_realtime_sdk::testing::{ConnectOutcome, MockTransport};
use alpha_realtime_sdk::ws::{Session, SessionState, WsConfig};

fn test_config() -> WsConfig {
    WsConfig {
        url: "wss://rt.test/ws".to_string(),
        connect_timeout: Duration::from_secs(10),
        max_connect_attempts: 5,
        reconnect_delay: Duration::from_secs(1),
        // Most tests want a quiet outbound channel.
        ping_interval: None,
    }
}

fn session_over(transport: &MockTransport) -> Session {
    Session::with_transport(test_config(), Arc::new(transport.clone()))
}

/// Let the background task drain its queues.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

#[tokio::test(start_paused = true)]
async fn connect_succeeds_and_presents_identity() {
    let transport = MockTransport::new();
    let session = session_over(&transport);

    session.connect(Some(UserId::new("u1"))).await.unwrap();

    assert_eq!(session.state(), SessionState::Connected);
    assert_eq!(transport.connect_count(), 1);
    assert_eq!(transport.last_identity().unwrap().as_str(), "u1");
}

#[tokio::test(start_paused = true)]
async fn connect_while_running_is_a_noop() {
    let transport = MockTransport::new();
    let session = session_over(&transport);

    session.connect(None).await.unwrap();
    session.connect(None).await.unwrap();

    assert_eq!(transport.connect_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn connect_succeeds_on_third_attempt() {
    let transport = MockTransport::script([ConnectOutcome::Refuse, ConnectOutcome::Refuse]);
    let session = session_over(&transport);

    session.connect(None).await.unwrap();

    assert_eq!(session.state(), SessionState::Connected);
    assert_eq!(transport.connect_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn connect_fails_once_the_attempt_budget_is_spent() {
    let transport = MockTransport::script([ConnectOutcome::Refuse; 5]);
    let session = session_over(&transport);

    let result = session.connect(None).await;

    assert!(matches!(
        result,
        Err(WsError::ReconnectExhausted { attempts: 5 })
    ));
    assert_eq!(session.state(), SessionState::Failed);
    assert_eq!(transport.connect_count(), 5);
}

#[tokio::test(start_paused = true)]
async fn connect_times_out_when_the_server_never_answers() {
    let transport = MockTransport::script([ConnectOutcome::Hang]);
    let session = session_over(&transport);

    let result = session.connect(None).await;

    assert!(matches!(result, Err(WsError::ConnectTimeout)));
    session.disconnect();
}

#[tokio::test(start_paused = true)]
async fn reconnect_emits_status_transitions_in_order() {
    let transport = MockTransport::new();
    let session = session_over(&transport);

    let statuses = Arc::new(Mutex::new(Vec::new()));
    {
        let statuses = Arc::clone(&statuses);
        session.events().on_connection_status(move |status| {
            statuses.lock().unwrap().push(status.connected);
        });
    }

    session.connect(None).await.unwrap();
    transport.drop_connection();
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(*statuses.lock().unwrap(), vec![true, false, true]);
    assert_eq!(session.state(), SessionState::Connected);
    assert_eq!(transport.connect_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn reconnect_keeps_registered_listeners() {
    let transport = MockTransport::new();
    let session = session_over(&transport);

    let count = Arc::new(AtomicUsize::new(0));
    {
        let count = Arc::clone(&count);
        session.events().on_notification(move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        });
    }

    session.connect(None).await.unwrap();
    transport.drop_connection();
    tokio::time::sleep(Duration::from_secs(2)).await;

    transport.send_from_server(
        "notification",
        json!({"type": "system", "message": "back", "timestamp": "2024-01-01T00:00:00"}),
    );
    settle().await;

    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn disconnect_clears_the_listener_registry() {
    let transport = MockTransport::new();
    let session = session_over(&transport);

    let count = Arc::new(AtomicUsize::new(0));
    {
        let count = Arc::clone(&count);
        session.events().on_notification(move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        });
    }

    session.connect(None).await.unwrap();
    session.disconnect();
    assert_eq!(session.state(), SessionState::Idle);
    assert!(session.events().is_empty());

    // A fresh connection delivers nothing to the old listener.
    session.connect(None).await.unwrap();
    transport.send_from_server(
        "notification",
        json!({"type": "system", "message": "hi", "timestamp": "2024-01-01T00:00:00"}),
    );
    settle().await;

    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn price_alert_notifications_reach_both_listener_shapes() {
    let transport = MockTransport::new();
    let session = session_over(&transport);

    let notifications = Arc::new(AtomicUsize::new(0));
    let market_updates = Arc::new(AtomicUsize::new(0));
    let seen_alert = Arc::new(Mutex::new(None));
    {
        let notifications = Arc::clone(&notifications);
        session.events().on_notification(move |_| {
            notifications.fetch_add(1, Ordering::SeqCst);
        });
    }
    {
        let market_updates = Arc::clone(&market_updates);
        session.events().on_market_update(move |_| {
            market_updates.fetch_add(1, Ordering::SeqCst);
        });
    }
    {
        let seen_alert = Arc::clone(&seen_alert);
        session.events().on_price_alert(move |alert| {
            *seen_alert.lock().unwrap() = Some(alert.clone());
        });
    }

    session.connect(None).await.unwrap();
    transport.send_from_server(
        "notification",
        json!({
            "type": "price_alert",
            "alert_id": "u1_AAPL_1700000000",
            "symbol": "AAPL",
            "condition": "above",
            "target_price": 150.0,
            "current_price": 151.25,
            "message": "AAPL is above $150.00",
            "timestamp": "2024-01-01T00:00:00"
        }),
    );
    settle().await;

    assert_eq!(notifications.load(Ordering::SeqCst), 1);
    assert_eq!(market_updates.load(Ordering::SeqCst), 0);

    let alert = seen_alert.lock().unwrap().clone().unwrap();
    assert_eq!(alert.symbol.as_str(), "AAPL");
    assert_eq!(alert.target_price, 150.0);
    assert_eq!(alert.current_price, 151.25);
}

#[tokio::test(start_paused = true)]
async fn unknown_events_and_malformed_frames_never_kill_the_session() {
    let transport = MockTransport::new();
    let session = session_over(&transport);

    let errors = Arc::new(AtomicUsize::new(0));
    {
        let errors = Arc::clone(&errors);
        session.events().on_error(move |_| {
            errors.fetch_add(1, Ordering::SeqCst);
        });
    }

    session.connect(None).await.unwrap();
    transport.send_from_server("current_price", json!({"symbol": "AAPL", "price": 1.0}));
    transport.send_raw("{not json".to_string());
    settle().await;

    // Unknown event: silent. Malformed frame: surfaced to on_error.
    assert_eq!(errors.load(Ordering::SeqCst), 1);
    assert_eq!(session.state(), SessionState::Connected);
}

#[tokio::test(start_paused = true)]
async fn clones_share_one_listener_registry() {
    let transport = MockTransport::new();
    let session = session_over(&transport);
    let clone = session.clone();

    let count = Arc::new(AtomicUsize::new(0));
    {
        let count = Arc::clone(&count);
        clone.events().on_pong(move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        });
    }

    session.connect(None).await.unwrap();
    transport.send_from_server("pong", json!({"timestamp": "2024-01-01T00:00:00"}));
    settle().await;

    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn live_subscribe_sends_the_wire_message_when_connected() {
    let transport = MockTransport::new();
    let session = session_over(&transport);
    session.connect(None).await.unwrap();

    let subs = AlertSubscriptions::new(session.clone());
    subs.subscribe(
        &UserId::new("u1"),
        &AlertConfig {
            symbol: Symbol::new("AAPL"),
            condition: AlertCondition::Above,
            target_price: 150.0,
        },
    );
    settle().await;

    let frames = transport.sent_frames();
    assert_eq!(frames.len(), 1);
    let parsed: serde_json::Value = serde_json::from_str(&frames[0]).unwrap();
    assert_eq!(parsed["event"], "subscribe_alerts");
    assert_eq!(parsed["data"]["user_id"], "u1");
    assert_eq!(parsed["data"]["alert_config"]["symbol"], "AAPL");
}

#[tokio::test(start_paused = true)]
async fn live_messages_are_dropped_while_disconnected() {
    let transport = MockTransport::new();
    let session = session_over(&transport);

    let subs = AlertSubscriptions::new(session.clone());
    subs.subscribe(
        &UserId::new("u1"),
        &AlertConfig {
            symbol: Symbol::new("AAPL"),
            condition: AlertCondition::Below,
            target_price: 100.0,
        },
    );
    subs.unsubscribe(&UserId::new("u1"), &AlertId::new("a1"));
    settle().await;

    assert!(transport.sent_frames().is_empty());
}

#[tokio::test(start_paused = true)]
async fn periodic_ping_rides_the_configured_cadence() {
    let transport = MockTransport::new();
    let config = WsConfig {
        ping_interval: Some(Duration::from_secs(30)),
        ..test_config()
    };
    let session = Session::with_transport(config, Arc::new(transport.clone()));

    session.connect(None).await.unwrap();
    tokio::time::sleep(Duration::from_secs(65)).await;

    let pings = transport
        .sent_frames()
        .iter()
        .filter(|f| f.contains("\"ping\""))
        .count();
    assert_eq!(pings, 2);
}

#[tokio::test(start_paused = true)]
async fn manual_ping_gets_a_pong_back() {
    let transport = MockTransport::new();
    let session = session_over(&transport);

    let pongs = Arc::new(AtomicUsize::new(0));
    {
        let pongs = Arc::clone(&pongs);
        session.events().on_pong(move |_| {
            pongs.fetch_add(1, Ordering::SeqCst);
        });
    }

    session.connect(None).await.unwrap();
    session.ping().unwrap();
    settle().await;

    assert!(transport
        .sent_frames()
        .iter()
        .any(|f| f.contains("\"ping\"")));

    transport.send_from_server("pong", json!({"timestamp": "2024-01-01T00:00:01"}));
    settle().await;
    assert_eq!(pongs.load(Ordering::SeqCst), 1);
}
