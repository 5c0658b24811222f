//! End-to-end tests against a local tokio-tungstenite server.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use socket_relay::{ConnectionState, Manager, TransportEvent};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

const WAIT: Duration = Duration::from_secs(5);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Accepts one client and echoes its text frames.
async fn echo_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        while let Some(Ok(message)) = ws.next().await {
            if message.is_text() && ws.send(message).await.is_err() {
                break;
            }
        }
    });

    format!("ws://127.0.0.1:{port}")
}

/// Accepts one client, sends `frames`, then closes.
async fn push_server(frames: Vec<String>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        for frame in frames {
            ws.send(Message::Text(frame.into())).await.unwrap();
        }
        let _ = ws.close(None).await;
        while let Some(Ok(_)) = ws.next().await {}
    });

    format!("ws://127.0.0.1:{port}")
}

#[tokio::test]
async fn send_while_idle_connects_and_round_trips() -> anyhow::Result<()> {
    init_tracing();
    let manager = Manager::new(echo_server().await)?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    manager.subscribe("ping", move |data: &Value| {
        let _ = tx.send(data.clone());
    })?;

    let first = manager.send("ping", &json!({ "n": 1 }))?;
    let second = manager.send("ping", &json!({ "n": 2 }))?;
    assert_eq!(manager.state(), ConnectionState::Connecting);

    assert!(timeout(WAIT, first).await?.status);
    assert!(timeout(WAIT, second).await?.status);
    assert!(manager.is_open());

    assert_eq!(timeout(WAIT, rx.recv()).await?, Some(json!({ "n": 1 })));
    assert_eq!(timeout(WAIT, rx.recv()).await?, Some(json!({ "n": 2 })));

    manager.close();
    Ok(())
}

#[tokio::test]
async fn server_frames_dispatch_and_close_is_reported() -> anyhow::Result<()> {
    init_tracing();
    let url = push_server(vec![
        "not json".to_string(),
        r#"{"type":"other","data":1}"#.to_string(),
        r#"{"type":"news","data":"hello"}"#.to_string(),
    ])
    .await;
    let manager = Manager::new(url)?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let news_tx = tx.clone();
    manager.subscribe("news", move |data: &Value| {
        let _ = news_tx.send(format!("news {data}"));
    })?;
    manager.on_close(move |event: &TransportEvent| {
        if let TransportEvent::Close { code, .. } = event {
            let _ = tx.send(format!("close {code:?}"));
        }
    });

    assert!(timeout(WAIT, manager.open()).await?.status);

    assert_eq!(timeout(WAIT, rx.recv()).await?.as_deref(), Some(r#"news "hello""#));
    assert_eq!(timeout(WAIT, rx.recv()).await?.as_deref(), Some("close None"));
    assert_eq!(manager.state(), ConnectionState::Closed);
    Ok(())
}

#[tokio::test]
async fn unreachable_server_fails_send() -> anyhow::Result<()> {
    init_tracing();
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    drop(listener);

    let manager = Manager::new(format!("ws://127.0.0.1:{port}"))?;
    let resolution = timeout(WAIT, manager.send_empty("hello")?).await?;

    assert!(!resolution.status);
    assert!(matches!(resolution.event, Some(TransportEvent::Error { .. })));
    assert_eq!(manager.state(), ConnectionState::Closed);
    Ok(())
}
