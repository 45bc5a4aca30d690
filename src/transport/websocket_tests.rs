use std::sync::Arc;
use std::time::Duration;

use crate::broker::{Dispatcher, TopicRegistry};
use crate::client::SessionTable;
use crate::client::remote::{Request, run_client};
use crate::transport::message::{OutboundEvent, OutboundFrame};
use crate::transport::websocket::{bind, serve};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tungstenite::protocol::Message as WsMessage;

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn setup_server() -> (String, Arc<TopicRegistry>, Arc<SessionTable>) {
    let registry = Arc::new(TopicRegistry::new());
    let sessions = Arc::new(SessionTable::new());
    let dispatcher = Arc::new(Dispatcher::new(registry.clone(), sessions.clone()));

    let listener = bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve(listener, dispatcher, sessions.clone()));

    (format!("ws://{addr}"), registry, sessions)
}

async fn send(ws: &mut Ws, event: &str, data: serde_json::Value) {
    let frame = json!({ "event": event, "data": data }).to_string();
    ws.send(WsMessage::Text(frame.into()))
        .await
        .expect("Failed to send frame");
}

async fn next_frame(ws: &mut Ws) -> OutboundFrame {
    let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("timed out waiting for frame")
        .expect("stream ended")
        .unwrap();
    let raw = msg.into_data();
    serde_json::from_slice(&raw).unwrap_or_else(|e| {
        panic!("Failed to deserialize OutboundFrame from '{raw:?}': {e}");
    })
}

async fn wait_until<F: Fn() -> bool>(cond: F) {
    for _ in 0..50 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition not reached");
}

#[tokio::test]
async fn test_subscribe_publish_over_websocket() {
    let (url, registry, _) = setup_server().await;
    let (mut ws_a, _) = connect_async(url.as_str()).await.expect("client A connect");
    let (mut ws_b, _) = connect_async(url.as_str()).await.expect("client B connect");

    send(&mut ws_a, "SUBSCRIBE_TOPIC", json!({"timestamp": 1, "topic": "t"})).await;
    let created = next_frame(&mut ws_a).await;
    assert_eq!(created.event, OutboundEvent::PrintMessage);
    assert_eq!(
        created.data.payload.as_deref(),
        Some("Created t and successfully subscribed.")
    );

    send(&mut ws_b, "PUBLISH_TOPIC", json!({"timestamp": 1000, "topic": "t", "payload": "hello"})).await;
    let ack = next_frame(&mut ws_b).await;
    assert!(ack.is_terminal());
    assert_eq!(
        ack.data.payload.as_deref(),
        Some("Successfully published message to t.")
    );

    let update = next_frame(&mut ws_a).await;
    assert_eq!(update.event, OutboundEvent::PrintMessage);
    let text = update.data.payload.unwrap();
    assert!(text.starts_with("t ("));
    assert!(text.ends_with("): hello"));
    assert!(update.data.topic.is_none());

    assert_eq!(registry.lookup("t").unwrap().content.as_deref(), Some("hello"));
}

#[tokio::test]
async fn test_string_encoded_data_is_accepted() {
    let (url, _, _) = setup_server().await;
    let (mut ws, _) = connect_async(url.as_str()).await.unwrap();

    send(
        &mut ws,
        "GET_TOPIC_STATUS",
        json!(r#"{"timestamp": 1, "topic": "missing", "payload": null}"#),
    )
    .await;
    let reply = next_frame(&mut ws).await;
    assert_eq!(reply.data.payload.as_deref(), Some("missing does not exist."));
}

#[tokio::test]
async fn test_disconnect_cleans_up_session_and_topics() {
    let (url, registry, sessions) = setup_server().await;
    let (mut ws, _) = connect_async(url.as_str()).await.unwrap();

    send(&mut ws, "SUBSCRIBE_TOPIC", json!({"timestamp": 1, "topic": "t"})).await;
    next_frame(&mut ws).await;
    assert!(registry.contains("t"));
    assert_eq!(sessions.len(), 1);

    ws.close(None).await.expect("Failed to close WebSocket");
    drop(ws);

    wait_until(|| sessions.is_empty() && registry.is_empty()).await;
}

#[tokio::test]
async fn test_run_client_commands() {
    let (url, registry, _) = setup_server().await;

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<OutboundFrame>();
    let sub_url = url.clone();
    let subscriber = tokio::spawn(async move {
        let request = Request::Subscribe {
            topic: "news".to_string(),
        };
        run_client(&sub_url, &request, |frame| {
            let _ = tx.send(frame.clone());
        })
        .await
    });

    let created = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        created.data.payload.as_deref(),
        Some("Created news and successfully subscribed.")
    );

    let mut replies = Vec::new();
    let publish = Request::Publish {
        topic: "news".to_string(),
        message: "breaking".to_string(),
    };
    run_client(&url, &publish, |frame| replies.push(frame.clone()))
        .await
        .unwrap();
    assert_eq!(replies.len(), 1);
    assert!(replies[0].is_terminal());

    let update = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(update.data.payload.unwrap().ends_with("): breaking"));
    assert!(!subscriber.is_finished());

    let mut listing = Vec::new();
    run_client(&url, &Request::List, |frame| {
        listing.push(frame.data.payload.clone().unwrap_or_default())
    })
    .await
    .unwrap();
    assert_eq!(listing, vec!["All topics on the server:\nnews".to_string()]);

    subscriber.abort();
    wait_until(|| registry.is_empty()).await;
}
