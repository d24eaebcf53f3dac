//! End-to-end relay tests over real WebSockets.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use kurbo::Point;
use sketchsync_core::protocol::{ClientMessage, ServerMessage};
use sketchsync_core::stroke::{Color, Stroke, Tool};
use sketchsync_server::room::{AppState, RelayConfig};
use sketchsync_server::router;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use uuid::Uuid;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn spawn_server() -> SocketAddr {
    let state = Arc::new(AppState::new(RelayConfig::default()));
    let app = router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn connect(addr: SocketAddr) -> Client {
    let (client, _response) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
    client
}

async fn send(client: &mut Client, message: &ClientMessage) {
    let json = serde_json::to_string(message).unwrap();
    client.send(Message::text(json)).await.unwrap();
}

async fn recv(client: &mut Client) -> ServerMessage {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match client.next().await {
                Some(Ok(Message::Text(text))) => {
                    return serde_json::from_str::<ServerMessage>(&text).unwrap();
                }
                Some(Ok(_)) => continue,
                other => panic!("connection ended unexpectedly: {other:?}"),
            }
        }
    })
    .await
    .expect("timed out waiting for server message")
}

fn pencil_stroke() -> Stroke {
    Stroke::pending(
        Uuid::new_v4(),
        Tool::Pencil,
        Color::black(),
        2.0,
        vec![Point::new(0.0, 0.0), Point::new(10.0, 10.0)],
    )
}

async fn join(client: &mut Client, room: &str) -> Vec<Stroke> {
    send(client, &ClientMessage::Join { room: room.to_string() }).await;
    match recv(client).await {
        ServerMessage::Joined { room: joined, strokes, .. } => {
            assert_eq!(joined, room);
            strokes
        }
        other => panic!("expected joined, got {other:?}"),
    }
}

/// Wait for the relay to commit everything this client sent: a resync
/// request is processed after all earlier frames on the connection.
async fn flush(client: &mut Client) -> Vec<Stroke> {
    send(client, &ClientMessage::Resync).await;
    loop {
        if let ServerMessage::Resync { strokes } = recv(client).await {
            return strokes;
        }
    }
}

#[tokio::test]
async fn stroke_fans_out_to_other_peers_with_assigned_seq() {
    let addr = spawn_server().await;

    let mut alice = connect(addr).await;
    assert!(join(&mut alice, "shared").await.is_empty());

    let mut bob = connect(addr).await;
    join(&mut bob, "shared").await;
    assert!(matches!(recv(&mut alice).await, ServerMessage::PeerJoined { .. }));

    send(&mut alice, &ClientMessage::Stroke { stroke: pencil_stroke() }).await;
    send(&mut alice, &ClientMessage::Stroke { stroke: pencil_stroke() }).await;

    match recv(&mut bob).await {
        ServerMessage::Stroke { stroke } => {
            assert_eq!(stroke.seq, 1);
            assert!(stroke.is_committed());
        }
        other => panic!("expected stroke, got {other:?}"),
    }
    match recv(&mut bob).await {
        ServerMessage::Stroke { stroke } => assert_eq!(stroke.seq, 2),
        other => panic!("expected stroke, got {other:?}"),
    }
}

#[tokio::test]
async fn late_joiner_sees_identical_log() {
    let addr = spawn_server().await;

    let mut alice = connect(addr).await;
    join(&mut alice, "history").await;
    for _ in 0..3 {
        send(&mut alice, &ClientMessage::Stroke { stroke: pencil_stroke() }).await;
    }
    let alice_view = flush(&mut alice).await;
    assert_eq!(alice_view.len(), 3);

    let mut carol = connect(addr).await;
    let carol_view = join(&mut carol, "history").await;
    assert_eq!(carol_view, alice_view);
    assert_eq!(
        carol_view.iter().map(|s| s.seq).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
}

#[tokio::test]
async fn resync_is_idempotent() {
    let addr = spawn_server().await;

    let mut alice = connect(addr).await;
    join(&mut alice, "replay").await;
    send(&mut alice, &ClientMessage::Stroke { stroke: pencil_stroke() }).await;

    let first = flush(&mut alice).await;
    let second = flush(&mut alice).await;
    assert_eq!(first, second);
    assert_eq!(first.len(), 1);
}

#[tokio::test]
async fn stroke_before_join_is_rejected() {
    let addr = spawn_server().await;

    let mut client = connect(addr).await;
    send(&mut client, &ClientMessage::Stroke { stroke: pencil_stroke() }).await;
    assert!(matches!(recv(&mut client).await, ServerMessage::Error { .. }));
}

#[tokio::test]
async fn malformed_stroke_is_dropped_not_broadcast() {
    let addr = spawn_server().await;

    let mut alice = connect(addr).await;
    join(&mut alice, "quiet").await;
    let mut bob = connect(addr).await;
    join(&mut bob, "quiet").await;
    assert!(matches!(recv(&mut alice).await, ServerMessage::PeerJoined { .. }));

    let mut bad = pencil_stroke();
    bad.points.clear();
    send(&mut alice, &ClientMessage::Stroke { stroke: bad }).await;
    // A valid stroke afterwards is the first thing Bob sees, with seq 1:
    // the malformed one was never committed.
    send(&mut alice, &ClientMessage::Stroke { stroke: pencil_stroke() }).await;
    match recv(&mut bob).await {
        ServerMessage::Stroke { stroke } => assert_eq!(stroke.seq, 1),
        other => panic!("expected stroke, got {other:?}"),
    }
}

#[tokio::test]
async fn cursor_updates_stream_to_peers() {
    let addr = spawn_server().await;

    let mut alice = connect(addr).await;
    join(&mut alice, "pointer").await;
    let mut bob = connect(addr).await;
    join(&mut bob, "pointer").await;
    assert!(matches!(recv(&mut alice).await, ServerMessage::PeerJoined { .. }));

    send(&mut alice, &ClientMessage::Cursor { x: 40.0, y: 25.0 }).await;
    match recv(&mut bob).await {
        ServerMessage::Cursor { from, x, y } => {
            assert!(!from.is_empty());
            assert_eq!(x, 40.0);
            assert_eq!(y, 25.0);
        }
        other => panic!("expected cursor, got {other:?}"),
    }
}

#[tokio::test]
async fn leaving_peer_is_announced() {
    let addr = spawn_server().await;

    let mut alice = connect(addr).await;
    join(&mut alice, "exit").await;
    let mut bob = connect(addr).await;
    join(&mut bob, "exit").await;
    assert!(matches!(recv(&mut alice).await, ServerMessage::PeerJoined { .. }));

    send(&mut bob, &ClientMessage::Leave).await;
    assert!(matches!(recv(&mut alice).await, ServerMessage::PeerLeft { .. }));
}
