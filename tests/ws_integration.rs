//! Integration tests for the WebSocket client against an in-process mock server.
//!
//! Each test binds a local TCP listener, speaks the scanner envelope protocol over
//! tokio-tungstenite, and drives the real client against it.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

use pairstream::shared::{PairIdentity, ScannerFilter, TimeFrame};
use pairstream::websocket::{
    PairUpdate, PairstreamWebSocketClient, WebSocketConfig, WsEvent,
};

const TEST_TIMEOUT: Duration = Duration::from_secs(5);

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    (listener, format!("ws://{}", addr))
}

fn fast_config() -> WebSocketConfig {
    WebSocketConfig {
        reconnect_attempts: 5,
        base_delay_ms: 50,
        max_delay_ms: 200,
        ..Default::default()
    }
}

fn event_tag(frame: &str) -> String {
    let value: serde_json::Value = serde_json::from_str(frame).unwrap();
    value["event"].as_str().unwrap_or_default().to_string()
}

/// Accept one connection and forward every text frame it receives into `frame_tx`.
/// Keeps the connection open until the client closes it.
async fn echo_frames(listener: TcpListener, frame_tx: mpsc::UnboundedSender<String>) {
    let (stream, _) = listener.accept().await.unwrap();
    let mut ws = accept_async(stream).await.unwrap();
    while let Some(Ok(msg)) = ws.next().await {
        if let Message::Text(text) = msg {
            let _ = frame_tx.send(text.to_string());
        }
    }
}

#[tokio::test]
async fn test_shared_pair_subscription_sends_one_frame() {
    let (listener, url) = bind().await;
    let (frame_tx, mut frame_rx) = mpsc::unbounded_channel();
    let server = tokio::spawn(echo_frames(listener, frame_tx));

    let mut client = timeout(TEST_TIMEOUT, PairstreamWebSocketClient::connect(&url))
        .await
        .unwrap()
        .unwrap();
    assert!(client.is_connected());

    let identity = PairIdentity::new("0xP", "0xT", "ETH");
    let first = client.subscribe_pair(&identity, |_| {});
    let second = client.subscribe_pair(&identity, |_| {});
    assert_eq!(client.pair_listener_count(first.key()), 2);

    // Exactly one subscribe frame for two listeners.
    let frame = timeout(TEST_TIMEOUT, frame_rx.recv()).await.unwrap().unwrap();
    assert_eq!(event_tag(&frame), "subscribe-pair");

    // First guard leaving does not put anything on the wire.
    first.unsubscribe();
    // The last guard triggers the unsubscribe frame.
    drop(second);
    let frame = timeout(TEST_TIMEOUT, frame_rx.recv()).await.unwrap().unwrap();
    assert_eq!(event_tag(&frame), "unsubscribe-pair");

    client.disconnect().await.unwrap();
    let _ = timeout(TEST_TIMEOUT, server).await;
}

#[tokio::test]
async fn test_filters_sharing_a_key_send_one_frame() {
    let (listener, url) = bind().await;
    let (frame_tx, mut frame_rx) = mpsc::unbounded_channel();
    let server = tokio::spawn(echo_frames(listener, frame_tx));

    let mut client = timeout(TEST_TIMEOUT, PairstreamWebSocketClient::connect(&url))
        .await
        .unwrap()
        .unwrap();

    // Same view, different volatile fields: one wire subscription.
    let mut a = ScannerFilter::trending_tokens();
    a.time_frame = Some(TimeFrame::FiveMin);
    let mut b = ScannerFilter::trending_tokens();
    b.time_frame = Some(TimeFrame::TwentyFourHour);
    b.user_id = Some("session".to_string());

    let sub_a = client.subscribe_filter(&a, |_| {});
    let sub_b = client.subscribe_filter(&b, |_| {});
    assert_eq!(sub_a.key(), sub_b.key());
    assert_eq!(client.filter_listener_count(sub_a.key()), 2);

    let frame = timeout(TEST_TIMEOUT, frame_rx.recv()).await.unwrap().unwrap();
    assert_eq!(event_tag(&frame), "scanner-filter");

    drop(sub_a);
    drop(sub_b);
    let frame = timeout(TEST_TIMEOUT, frame_rx.recv()).await.unwrap().unwrap();
    assert_eq!(event_tag(&frame), "unsubscribe-scanner-filter");

    client.disconnect().await.unwrap();
    let _ = timeout(TEST_TIMEOUT, server).await;
}

#[tokio::test]
async fn test_tick_reaches_listener_end_to_end() {
    let (listener, url) = bind().await;

    // Server: wait for the subscribe frame, then push one tick for that pair.
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();

        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    if event_tag(&text) == "subscribe-pair" {
                        break;
                    }
                }
                Some(Ok(_)) => {}
                _ => panic!("connection dropped before subscribe"),
            }
        }

        let tick = serde_json::json!({
            "event": "tick",
            "data": {
                "pair": { "pair": "0xP", "token": "0xT", "chain": "ETH" },
                "swaps": [
                    { "tokenInAddress": "0xT", "amountToken1": "10", "priceToken1Usd": "1.2" }
                ]
            }
        });
        ws.send(Message::Text(tick.to_string().into())).await.unwrap();

        // Keep the connection open until the client hangs up.
        while let Some(Ok(_)) = ws.next().await {}
    });

    let mut client = timeout(TEST_TIMEOUT, PairstreamWebSocketClient::connect(&url))
        .await
        .unwrap()
        .unwrap();

    let identity = PairIdentity::new("0xP", "0xT", "ETH");
    let swaps_seen = Arc::new(Mutex::new(Vec::new()));
    let sink = swaps_seen.clone();
    let _sub = client.subscribe_pair(&identity, move |update| {
        if let PairUpdate::Swaps(swaps) = update {
            sink.lock().unwrap().extend(swaps.iter().cloned());
        }
    });

    // Drain events until the pair update lands.
    let key = identity.subscription_key();
    timeout(TEST_TIMEOUT, async {
        while let Some(event) = client.next().await {
            if matches!(&event, WsEvent::PairUpdated { key: k } if *k == key) {
                break;
            }
        }
    })
    .await
    .unwrap();

    let swaps = swaps_seen.lock().unwrap();
    assert_eq!(swaps.len(), 1);
    assert_eq!(swaps[0].amount_token1.as_deref(), Some("10"));
    drop(swaps);

    client.disconnect().await.unwrap();
    server.abort();
}

#[tokio::test]
async fn test_reconnect_replays_live_subscriptions() {
    let (listener, url) = bind().await;
    let (frame_tx, mut frame_rx) = mpsc::unbounded_channel();

    // Server: first connection is closed right after the subscribe arrives; the
    // second connection just records what the client sends.
    let server = tokio::spawn(async move {
        // First connection
        {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            loop {
                match ws.next().await {
                    Some(Ok(Message::Text(text))) => {
                        if event_tag(&text) == "subscribe-pair" {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    _ => return,
                }
            }
            ws.close(None).await.unwrap();
        }

        // Second connection: the replay target
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        while let Some(Ok(msg)) = ws.next().await {
            if let Message::Text(text) = msg {
                let _ = frame_tx.send(text.to_string());
            }
        }
    });

    let mut client = timeout(
        TEST_TIMEOUT,
        PairstreamWebSocketClient::connect_with_config(&url, fast_config()),
    )
    .await
    .unwrap()
    .unwrap();

    let identity = PairIdentity::new("0xP", "0xT", "ETH");
    let _sub = client.subscribe_pair(&identity, |_| {});

    // Expect the close to surface, then a reconnect cycle.
    let mut saw_reconnecting = false;
    let mut reconnected = false;
    timeout(TEST_TIMEOUT, async {
        let mut connections = 0;
        while let Some(event) = client.next().await {
            match event {
                WsEvent::Connected => {
                    connections += 1;
                    if connections == 2 {
                        reconnected = true;
                        break;
                    }
                }
                WsEvent::Reconnecting { .. } => saw_reconnecting = true,
                _ => {}
            }
        }
    })
    .await
    .unwrap();

    assert!(saw_reconnecting);
    assert!(reconnected);
    assert!(client.is_connected());

    // The new connection got the subscription replayed without any client calls.
    let frame = timeout(TEST_TIMEOUT, frame_rx.recv()).await.unwrap().unwrap();
    assert_eq!(event_tag(&frame), "subscribe-pair");
    let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
    assert_eq!(value["data"]["pair"], "0xP");

    client.disconnect().await.unwrap();
    server.abort();
}

#[tokio::test]
async fn test_subscribe_during_reconnect_reaches_new_connection() {
    let (listener, url) = bind().await;
    let (frame_tx, mut frame_rx) = mpsc::unbounded_channel();

    // Server: drop the first connection right after the handshake; the second
    // connection records what arrives.
    let server = tokio::spawn(async move {
        {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            ws.close(None).await.unwrap();
            while let Some(Ok(_)) = ws.next().await {}
        }

        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        while let Some(Ok(msg)) = ws.next().await {
            if let Message::Text(text) = msg {
                let _ = frame_tx.send(text.to_string());
            }
        }
    });

    let mut client = timeout(
        TEST_TIMEOUT,
        PairstreamWebSocketClient::connect_with_config(&url, fast_config()),
    )
    .await
    .unwrap()
    .unwrap();

    // Wait until the drop surfaces, then subscribe mid-reconnect. The frame cannot go
    // out on the dead connection, so only the replay can deliver it.
    timeout(TEST_TIMEOUT, async {
        while let Some(event) = client.next().await {
            if matches!(event, WsEvent::Reconnecting { .. }) {
                break;
            }
        }
    })
    .await
    .unwrap();

    let identity = PairIdentity::new("0xP", "0xT", "ETH");
    let _sub = client.subscribe_pair(&identity, |_| {});

    let frame = timeout(TEST_TIMEOUT, frame_rx.recv()).await.unwrap().unwrap();
    assert_eq!(event_tag(&frame), "subscribe-pair");
    let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
    assert_eq!(value["data"]["pair"], "0xP");

    client.disconnect().await.unwrap();
    server.abort();
}

#[tokio::test]
async fn test_disconnect_stops_the_task() {
    let (listener, url) = bind().await;
    let (frame_tx, _frame_rx) = mpsc::unbounded_channel();
    let server = tokio::spawn(echo_frames(listener, frame_tx));

    let mut client = timeout(TEST_TIMEOUT, PairstreamWebSocketClient::connect(&url))
        .await
        .unwrap()
        .unwrap();
    assert!(client.is_task_running());

    client.disconnect().await.unwrap();
    assert!(!client.is_task_running());
    assert!(!client.is_connected());

    let _ = timeout(TEST_TIMEOUT, server).await;
}
