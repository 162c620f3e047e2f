//! DXLink Streaming Integration Tests
//!
//! Exercises the streaming client against a scripted in-process websocket
//! server: the SETUP/AUTH handshake, channel lifecycle, subscription
//! ordering, feed dispatch, keepalives, and terminal faults.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, accept_async};

use tasty_data_collector::{
    ChannelPhase, DxLinkClient, DxLinkConfig, EventType, SessionState, StreamError, TerminalFault,
};

type Ws = WebSocketStream<TcpStream>;
type FrameLog = Arc<Mutex<Vec<Value>>>;

// =============================================================================
// Test Server
// =============================================================================

/// Bind a local websocket server and run `script` on the first connection.
async fn spawn_server<F, Fut>(script: F) -> (String, tokio::task::JoinHandle<()>)
where
    F: FnOnce(Ws) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = accept_async(stream).await.unwrap();
        script(ws).await;
    });
    (format!("ws://{addr}"), handle)
}

async fn send(ws: &mut Ws, value: &Value) {
    let _ = ws.send(Message::Text(value.to_string().into())).await;
}

fn setup_ack() -> Value {
    json!({
        "type": "SETUP",
        "channel": 0,
        "keepaliveTimeout": 60,
        "acceptKeepaliveTimeout": 60,
        "version": "1.0-1.2.1",
    })
}

fn authorized() -> Value {
    json!({"type": "AUTH_STATE", "channel": 0, "state": "AUTHORIZED", "userId": "U1"})
}

/// A well-behaved DXLink server: acknowledges SETUP, authorizes any AUTH,
/// opens every requested channel, and answers the first subscription add
/// with the given feed frames. Everything received is appended to `log`.
async fn run_feed_server(mut ws: Ws, log: FrameLog, feed_frames: Vec<Value>) {
    let mut feed_frames = Some(feed_frames);
    while let Some(frame) = ws.next().await {
        let Ok(Message::Text(text)) = frame else {
            break;
        };
        let value: Value = serde_json::from_str(text.as_str()).unwrap();
        log.lock().unwrap().push(value.clone());

        match value["type"].as_str() {
            Some("SETUP") => send(&mut ws, &setup_ack()).await,
            Some("AUTH") => send(&mut ws, &authorized()).await,
            Some("CHANNEL_REQUEST") => {
                let channel = value["channel"].clone();
                send(
                    &mut ws,
                    &json!({"type": "CHANNEL_OPENED", "channel": channel, "service": "FEED"}),
                )
                .await;
            }
            Some("FEED_SUBSCRIPTION") if value.get("add").is_some() => {
                if let Some(frames) = feed_frames.take() {
                    for frame in &frames {
                        send(&mut ws, frame).await;
                    }
                }
            }
            _ => {}
        }
    }
}

/// Spawn `run_feed_server` and return its url, frame log, and handle.
async fn spawn_feed_server(feed_frames: Vec<Value>) -> (String, FrameLog, tokio::task::JoinHandle<()>) {
    let log: FrameLog = Arc::new(Mutex::new(Vec::new()));
    let server_log = Arc::clone(&log);
    let (url, handle) = spawn_server(move |ws| run_feed_server(ws, server_log, feed_frames)).await;
    (url, log, handle)
}

fn test_config(url: &str) -> DxLinkConfig {
    let mut config = DxLinkConfig::new(url, "tok-1");
    config.auth_timeout = Duration::from_millis(500);
    config.channel_open_timeout = Duration::from_millis(500);
    config
}

/// Poll `check` until it passes or the deadline elapses.
async fn wait_until(deadline: Duration, mut check: impl FnMut() -> bool) -> bool {
    let start = tokio::time::Instant::now();
    while start.elapsed() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

fn frames_of_type(log: &FrameLog, msg_type: &str) -> Vec<Value> {
    log.lock()
        .unwrap()
        .iter()
        .filter(|frame| frame["type"] == msg_type)
        .cloned()
        .collect()
}

fn quote_item(symbol: &str, sequence: i64) -> Value {
    json!({
        "eventType": "Quote",
        "eventSymbol": symbol,
        "eventTime": 0,
        "sequence": sequence,
        "timeNanoPart": 0,
        "bidTime": 0,
        "bidExchangeCode": "Q",
        "bidPrice": 100.5,
        "bidSize": 10.0,
        "askTime": 0,
        "askExchangeCode": "Q",
        "askPrice": 100.52,
        "askSize": 12.0,
    })
}

fn feed_data(channel: u32, items: Vec<Value>) -> Value {
    json!({"type": "FEED_DATA", "channel": channel, "data": items})
}

// =============================================================================
// Handshake Tests
// =============================================================================

#[tokio::test]
async fn test_connect_completes_auth_handshake() {
    let (url, log, server) = spawn_feed_server(vec![]).await;

    let client = DxLinkClient::connect(test_config(&url)).await.unwrap();
    assert_eq!(client.session_state(), SessionState::Authenticated);

    let setups = frames_of_type(&log, "SETUP");
    assert_eq!(setups.len(), 1);
    assert_eq!(setups[0]["version"], "0.1-js/1.0.0");

    let auths = frames_of_type(&log, "AUTH");
    assert_eq!(auths.len(), 1);
    assert_eq!(auths[0]["token"], "tok-1");

    client.close().await;
    server.abort();
}

#[tokio::test]
async fn test_connect_times_out_without_auth_ack() {
    let log: FrameLog = Arc::new(Mutex::new(Vec::new()));
    let server_log = Arc::clone(&log);
    // Acknowledge SETUP but never answer the AUTH request.
    let (url, server) = spawn_server(move |mut ws| async move {
        while let Some(Ok(Message::Text(text))) = ws.next().await {
            let value: Value = serde_json::from_str(text.as_str()).unwrap();
            server_log.lock().unwrap().push(value.clone());
            if value["type"] == "SETUP" {
                send(&mut ws, &setup_ack()).await;
            }
        }
    })
    .await;

    let mut config = test_config(&url);
    config.auth_timeout = Duration::from_millis(200);
    let err = DxLinkClient::connect(config).await.unwrap_err();
    assert!(matches!(err, StreamError::AuthTimeout(_)));

    // The heartbeat only starts once authenticated, so no keepalive may
    // ever have reached the server.
    assert!(frames_of_type(&log, "KEEPALIVE").is_empty());
    server.abort();
}

#[tokio::test]
async fn test_close_marks_session_closed() {
    let (url, _log, server) = spawn_feed_server(vec![]).await;

    let client = DxLinkClient::connect(test_config(&url)).await.unwrap();
    client.close().await;

    assert!(
        wait_until(Duration::from_secs(2), || {
            client.session_state() == SessionState::Closed
        })
        .await
    );
    server.abort();
}

// =============================================================================
// Channel Lifecycle Tests
// =============================================================================

#[tokio::test]
async fn test_subscribe_opens_channel_before_subscription() {
    let (url, log, server) = spawn_feed_server(vec![]).await;

    let client = DxLinkClient::connect(test_config(&url)).await.unwrap();
    assert_eq!(client.channel_phase(EventType::Quote), ChannelPhase::Closed);

    client
        .subscribe_quotes(&["AAPL".to_string()])
        .await
        .unwrap();
    assert_eq!(client.channel_phase(EventType::Quote), ChannelPhase::Opened);

    assert!(
        wait_until(Duration::from_secs(2), || {
            !frames_of_type(&log, "FEED_SUBSCRIPTION").is_empty()
        })
        .await
    );

    // The channel request must reach the server before the subscription.
    let order: Vec<String> = log
        .lock()
        .unwrap()
        .iter()
        .filter_map(|frame| frame["type"].as_str().map(str::to_string))
        .filter(|t| t == "CHANNEL_REQUEST" || t == "FEED_SUBSCRIPTION")
        .collect();
    assert_eq!(order, vec!["CHANNEL_REQUEST", "FEED_SUBSCRIPTION"]);

    let requests = frames_of_type(&log, "CHANNEL_REQUEST");
    assert_eq!(requests[0]["channel"], 7);
    assert_eq!(requests[0]["service"], "FEED");

    client.close().await;
    server.abort();
}

#[tokio::test]
async fn test_second_subscribe_reuses_open_channel() {
    let (url, log, server) = spawn_feed_server(vec![]).await;

    let client = DxLinkClient::connect(test_config(&url)).await.unwrap();
    client
        .subscribe_quotes(&["AAPL".to_string()])
        .await
        .unwrap();
    client
        .subscribe_quotes(&["MSFT".to_string()])
        .await
        .unwrap();

    assert!(
        wait_until(Duration::from_secs(2), || {
            frames_of_type(&log, "FEED_SUBSCRIPTION").len() == 2
        })
        .await
    );
    assert_eq!(frames_of_type(&log, "CHANNEL_REQUEST").len(), 1);

    client.close().await;
    server.abort();
}

#[tokio::test]
async fn test_subscribe_times_out_when_channel_never_opens() {
    // Handshake works but CHANNEL_REQUEST is ignored.
    let (url, server) = spawn_server(move |mut ws| async move {
        while let Some(Ok(Message::Text(text))) = ws.next().await {
            let value: Value = serde_json::from_str(text.as_str()).unwrap();
            match value["type"].as_str() {
                Some("SETUP") => send(&mut ws, &setup_ack()).await,
                Some("AUTH") => send(&mut ws, &authorized()).await,
                _ => {}
            }
        }
    })
    .await;

    let mut config = test_config(&url);
    config.channel_open_timeout = Duration::from_millis(200);
    let client = DxLinkClient::connect(config).await.unwrap();

    let err = client
        .subscribe_quotes(&["AAPL".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StreamError::ChannelOpenTimeout {
            event_type: EventType::Quote,
            ..
        }
    ));

    client.close().await;
    server.abort();
}

#[tokio::test]
async fn test_unsubscribe_requires_authentication() {
    // A server that accepts the socket but never says anything.
    let (url, server) = spawn_server(|mut ws| async move {
        while ws.next().await.is_some() {}
    })
    .await;

    let client = DxLinkClient::open(test_config(&url)).await.unwrap();
    let err = client
        .unsubscribe_quotes(&["AAPL".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, StreamError::NotAuthenticated));

    client.close().await;
    server.abort();
}

#[tokio::test]
async fn test_candle_subscription_carries_from_time() {
    let (url, log, server) = spawn_feed_server(vec![]).await;

    let client = DxLinkClient::connect(test_config(&url)).await.unwrap();
    let start = Utc.with_ymd_and_hms(2023, 4, 3, 0, 0, 0).unwrap();
    client
        .subscribe_candles("ABC", "5m", true, start)
        .await
        .unwrap();

    assert!(
        wait_until(Duration::from_secs(2), || {
            !frames_of_type(&log, "FEED_SUBSCRIPTION").is_empty()
        })
        .await
    );

    let subs = frames_of_type(&log, "FEED_SUBSCRIPTION");
    assert_eq!(subs[0]["channel"], 1);
    assert_eq!(
        subs[0]["add"],
        json!([{
            "symbol": "ABC{=5m,tho=true}",
            "type": "Candle",
            "fromTime": 1_680_480_000_000_i64,
        }])
    );

    client.close().await;
    server.abort();
}

// =============================================================================
// Feed Dispatch Tests
// =============================================================================

#[tokio::test]
async fn test_feed_data_dispatches_in_order() {
    let frames = vec![feed_data(
        7,
        vec![
            quote_item("AAPL", 1),
            quote_item("MSFT", 2),
            quote_item("SPY", 3),
        ],
    )];
    let (url, _log, server) = spawn_feed_server(frames).await;

    let client = DxLinkClient::connect(test_config(&url)).await.unwrap();
    client
        .subscribe_quotes(&["AAPL".to_string(), "MSFT".to_string(), "SPY".to_string()])
        .await
        .unwrap();

    let queue = client.quotes();
    let mut symbols = Vec::new();
    for _ in 0..3 {
        let quote = timeout(Duration::from_secs(2), queue.next())
            .await
            .unwrap()
            .unwrap();
        symbols.push(quote.event_symbol);
    }
    assert_eq!(symbols, vec!["AAPL", "MSFT", "SPY"]);

    client.close().await;
    server.abort();
}

#[tokio::test]
async fn test_competing_consumers_receive_each_event_once() {
    let frames = vec![feed_data(
        7,
        vec![
            quote_item("A", 1),
            quote_item("B", 2),
            quote_item("C", 3),
            quote_item("D", 4),
        ],
    )];
    let (url, _log, server) = spawn_feed_server(frames).await;

    let client = DxLinkClient::connect(test_config(&url)).await.unwrap();
    client
        .subscribe_quotes(&["A".to_string(), "B".to_string()])
        .await
        .unwrap();

    let first = client.quotes();
    let second = client.quotes();

    // Alternate pulls across the two handles; each event is delivered to
    // exactly one of them, in arrival order.
    let mut symbols = Vec::new();
    for queue in [&first, &second, &first, &second] {
        let quote = timeout(Duration::from_secs(2), queue.next())
            .await
            .unwrap()
            .unwrap();
        symbols.push(quote.event_symbol);
    }
    assert_eq!(symbols, vec!["A", "B", "C", "D"]);

    client.close().await;
    server.abort();
}

#[tokio::test]
async fn test_unknown_event_type_faults_blocked_consumer() {
    let frames = vec![feed_data(
        7,
        vec![json!({"eventType": "Greeks", "eventSymbol": "AAPL"})],
    )];
    let (url, _log, server) = spawn_feed_server(frames).await;

    let client = DxLinkClient::connect(test_config(&url)).await.unwrap();
    client
        .subscribe_quotes(&["AAPL".to_string()])
        .await
        .unwrap();

    let queue = client.quotes();
    let err = timeout(Duration::from_secs(2), queue.next())
        .await
        .unwrap()
        .unwrap_err();
    match err {
        StreamError::Terminated(TerminalFault::Protocol(reason)) => {
            assert!(reason.contains("Greeks"), "unexpected reason: {reason}");
        }
        other => panic!("expected protocol fault, got {other:?}"),
    }

    client.close().await;
    server.abort();
}

#[tokio::test]
async fn test_unknown_frame_type_faults_blocked_consumer() {
    let frames = vec![json!({"type": "FEED_SNAPSHOT", "channel": 7, "data": []})];
    let (url, _log, server) = spawn_feed_server(frames).await;

    let client = DxLinkClient::connect(test_config(&url)).await.unwrap();
    client
        .subscribe_quotes(&["AAPL".to_string()])
        .await
        .unwrap();

    let queue = client.quotes();
    let err = timeout(Duration::from_secs(2), queue.next())
        .await
        .unwrap()
        .unwrap_err();
    match err {
        StreamError::Terminated(TerminalFault::Protocol(reason)) => {
            assert!(
                reason.contains("FEED_SNAPSHOT"),
                "unexpected reason: {reason}"
            );
        }
        other => panic!("expected protocol fault, got {other:?}"),
    }

    client.close().await;
    server.abort();
}

#[tokio::test]
async fn test_connection_drop_unblocks_consumers() {
    // Serve the handshake and channel open, then hang up.
    let (url, server) = spawn_server(|mut ws| async move {
        while let Some(Ok(Message::Text(text))) = ws.next().await {
            let value: Value = serde_json::from_str(text.as_str()).unwrap();
            match value["type"].as_str() {
                Some("SETUP") => send(&mut ws, &setup_ack()).await,
                Some("AUTH") => send(&mut ws, &authorized()).await,
                Some("CHANNEL_REQUEST") => {
                    let channel = value["channel"].clone();
                    send(
                        &mut ws,
                        &json!({"type": "CHANNEL_OPENED", "channel": channel, "service": "FEED"}),
                    )
                    .await;
                }
                Some("FEED_SUBSCRIPTION") => return,
                _ => {}
            }
        }
    })
    .await;

    let client = DxLinkClient::connect(test_config(&url)).await.unwrap();
    client
        .subscribe_quotes(&["AAPL".to_string()])
        .await
        .unwrap();

    let queue = client.quotes();
    let err = timeout(Duration::from_secs(2), queue.next())
        .await
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, StreamError::Terminated(_)));

    client.close().await;
    server.abort();
}

#[tokio::test]
async fn test_stream_yields_events_then_ends_on_close() {
    let frames = vec![feed_data(7, vec![quote_item("AAPL", 1)])];
    let (url, _log, server) = spawn_feed_server(frames).await;

    let client = DxLinkClient::connect(test_config(&url)).await.unwrap();
    client
        .subscribe_quotes(&["AAPL".to_string()])
        .await
        .unwrap();

    let queue = client.quotes();
    let mut stream = Box::pin(queue.stream());

    let first = timeout(Duration::from_secs(2), stream.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(first.event_symbol, "AAPL");

    client.close().await;
    let second = timeout(Duration::from_secs(2), stream.next())
        .await
        .unwrap()
        .unwrap();
    assert!(second.is_err());
    let end = timeout(Duration::from_secs(2), stream.next()).await.unwrap();
    assert!(end.is_none());

    server.abort();
}

// =============================================================================
// Keepalive Tests
// =============================================================================

#[tokio::test]
async fn test_keepalives_flow_at_configured_interval() {
    let (url, log, server) = spawn_feed_server(vec![]).await;

    let mut config = test_config(&url);
    config.keepalive_interval = Duration::from_millis(100);
    let client = DxLinkClient::connect(config).await.unwrap();

    assert!(
        wait_until(Duration::from_secs(2), || {
            frames_of_type(&log, "KEEPALIVE").len() >= 3
        })
        .await
    );

    client.close().await;
    server.abort();
}
