use std::net::SocketAddr;
use std::time::Duration;

use duet::signaling::{ServerConfig, SignalingServer};
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);

async fn start_server() -> SocketAddr {
    start_server_with(ServerConfig::default()).await
}

async fn start_server_with(config: ServerConfig) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let server = SignalingServer::new(config);
        server.serve(listener).await
    });
    addr
}

async fn connect(addr: SocketAddr) -> Ws {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{}", addr))
        .await
        .unwrap();
    ws
}

async fn send_text(ws: &mut Ws, text: &str) {
    ws.send(Message::text(text.to_string())).await.unwrap();
}

async fn send(ws: &mut Ws, msg: Value) {
    send_text(ws, &msg.to_string()).await;
}

async fn recv_text(ws: &mut Ws) -> String {
    loop {
        match timeout(WAIT, ws.next()).await.expect("timed out waiting for frame") {
            Some(Ok(Message::Text(text))) => return text.as_str().to_string(),
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
            other => panic!("expected text frame, got {:?}", other),
        }
    }
}

async fn recv(ws: &mut Ws) -> Value {
    serde_json::from_str(&recv_text(ws).await).unwrap()
}

async fn expect_closed(ws: &mut Ws) {
    loop {
        match timeout(WAIT, ws.next()).await.expect("timed out waiting for close") {
            Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
            Some(Ok(Message::Text(text))) => panic!("unexpected text frame {}", text),
            Some(Ok(_)) => continue,
        }
    }
}

async fn expect_silence(ws: &mut Ws) {
    if let Ok(frame) = timeout(Duration::from_millis(200), ws.next()).await {
        panic!("expected no frame, got {:?}", frame);
    }
}

async fn joined_pair(addr: SocketAddr, room: &str) -> (Ws, Ws) {
    let mut alice = connect(addr).await;
    send(&mut alice, json!({"type": "join", "room": room, "user": "alice"})).await;
    assert_eq!(
        recv(&mut alice).await,
        json!({"type": "room-status", "role": "initiator", "room": room})
    );

    let mut bob = connect(addr).await;
    send(&mut bob, json!({"type": "join", "room": room, "user": "bob"})).await;
    assert_eq!(
        recv(&mut bob).await,
        json!({"type": "room-status", "role": "responder", "room": room})
    );
    assert_eq!(
        recv(&mut alice).await,
        json!({"type": "peer-joined", "user": "bob"})
    );

    (alice, bob)
}

#[tokio::test]
async fn third_joiner_gets_room_full_and_is_closed() {
    let addr = start_server().await;
    let (mut alice, mut bob) = joined_pair(addr, "r1").await;

    let mut carol = connect(addr).await;
    send(&mut carol, json!({"type": "join", "room": "r1", "user": "carol"})).await;
    assert_eq!(recv(&mut carol).await, json!({"type": "room-full", "room": "r1"}));
    expect_closed(&mut carol).await;

    expect_silence(&mut alice).await;
    expect_silence(&mut bob).await;
}

#[tokio::test]
async fn offer_and_answer_are_relayed_unchanged() {
    let addr = start_server().await;
    let (mut alice, mut bob) = joined_pair(addr, "r1").await;

    let offer = r#"{"type":"signal","data":{"sdp":{"type":"offer","sdp":"v=0\r\no=- 1 2 IN IP4 127.0.0.1\r\n"},"b":1.50,"a":[]}}"#;
    send_text(&mut alice, offer).await;
    assert_eq!(recv_text(&mut bob).await, offer);

    let answer = r#"{"type":"signal","data":{"sdp":{"type":"answer","sdp":"v=0\r\n"}}}"#;
    send_text(&mut bob, answer).await;
    assert_eq!(recv_text(&mut alice).await, answer);

    let candidate = r#"{"type":"signal","data":{"candidate":{"candidate":"candidate:1 1 udp 2122260223 10.0.0.1 54400 typ host","sdpMid":"0"}}}"#;
    send_text(&mut alice, candidate).await;
    assert_eq!(recv_text(&mut bob).await, candidate);

    expect_silence(&mut alice).await;
}

#[tokio::test]
async fn abrupt_disconnect_notifies_peer_once() {
    let addr = start_server().await;
    let (mut alice, bob) = joined_pair(addr, "r1").await;

    drop(bob);
    assert_eq!(recv(&mut alice).await, json!({"type": "peer-left"}));
    expect_silence(&mut alice).await;

    let mut dave = connect(addr).await;
    send(&mut dave, json!({"type": "join", "room": "r1", "user": "dave"})).await;
    assert_eq!(recv(&mut dave).await["role"], "responder");
    assert_eq!(
        recv(&mut alice).await,
        json!({"type": "peer-joined", "user": "dave"})
    );
}

#[tokio::test]
async fn goodbye_closes_and_room_is_recreated() {
    let addr = start_server().await;
    let (mut alice, mut bob) = joined_pair(addr, "r1").await;

    send(&mut bob, json!({"type": "goodbye"})).await;
    expect_closed(&mut bob).await;
    assert_eq!(recv(&mut alice).await, json!({"type": "peer-left"}));

    send(&mut alice, json!({"type": "goodbye"})).await;
    expect_closed(&mut alice).await;
    // leave is processed after the close frame is written
    tokio::time::sleep(Duration::from_millis(200)).await;

    let mut erin = connect(addr).await;
    send(&mut erin, json!({"type": "join", "room": "r1", "user": "erin"})).await;
    assert_eq!(
        recv(&mut erin).await,
        json!({"type": "room-status", "role": "initiator", "room": "r1"})
    );
}

#[tokio::test]
async fn garbage_frames_are_ignored() {
    let addr = start_server().await;
    let mut alice = connect(addr).await;

    send_text(&mut alice, "not json").await;
    send(&mut alice, json!({"type": "register", "userId": "alice"})).await;
    send(&mut alice, json!({"type": "signal", "data": {"sdp": {}}})).await;
    alice
        .send(Message::binary(vec![1u8, 2, 3]))
        .await
        .unwrap();
    expect_silence(&mut alice).await;

    send(&mut alice, json!({"type": "join"})).await;
    assert_eq!(
        recv(&mut alice).await,
        json!({"type": "room-status", "role": "initiator", "room": "lobby"})
    );
}

#[tokio::test]
async fn unresponsive_peer_is_dropped_after_pong_timeout() {
    let addr = start_server_with(ServerConfig {
        ping_interval: Duration::from_millis(200),
        pong_timeout: Duration::from_millis(200),
        ..ServerConfig::default()
    })
    .await;

    // alice keeps reading, so her client answers pings; bob stops reading
    // after the handshake and never sends a pong
    let (mut alice, bob) = joined_pair(addr, "r1").await;

    assert_eq!(recv(&mut alice).await, json!({"type": "peer-left"}));
    drop(bob);
}
