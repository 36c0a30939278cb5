//! End-to-end tests: a real relay on an OS-assigned port, real WebSocket
//! clients speaking JSON.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tavern::{
    EntityRef, EntitySnapshot, MemoryGateway, OpenAuthenticator, PlayerId,
    TavernServerBuilder,
};
use tokio_tungstenite::tungstenite::Message;

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Starts a relay with characters for players 1..=5 and returns its address.
async fn start_relay() -> String {
    let gateway = MemoryGateway::new();
    for id in 1..=5 {
        gateway
            .insert(EntitySnapshot::new(
                EntityRef::player(PlayerId(id)),
                format!("Hero {id}"),
            ))
            .await;
    }
    let server = TavernServerBuilder::new()
        .bind("127.0.0.1:0")
        .send_timeout(Duration::from_millis(500))
        .build(gateway, OpenAuthenticator)
        .await
        .expect("relay should bind");
    let addr = server.local_addr().unwrap().to_string();
    tokio::spawn(server.run());
    addr
}

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("client should connect");
    ws
}

async fn send(ws: &mut ClientWs, value: Value) {
    ws.send(Message::text(value.to_string())).await.unwrap();
}

/// Next JSON event, or panics after a second of silence.
async fn recv(ws: &mut ClientWs) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(1), ws.next())
            .await
            .expect("event should arrive")
            .expect("stream open")
            .expect("frame ok");
        if msg.is_text() {
            return serde_json::from_str(msg.to_text().unwrap()).unwrap();
        }
    }
}

/// Asserts nothing arrives for a short while.
async fn assert_silent(ws: &mut ClientWs) {
    let got = tokio::time::timeout(Duration::from_millis(150), ws.next()).await;
    assert!(got.is_err(), "unexpected frame: {got:?}");
}

async fn join_host(addr: &str) -> ClientWs {
    let mut ws = connect(addr).await;
    send(&mut ws, json!({"type": "join_game", "role": "host", "name": "GM"})).await;
    let ack = recv(&mut ws).await;
    assert_eq!(ack["type"], "join_success");
    assert_eq!(ack["rooms"], json!(["host_room"]));
    ws
}

async fn join_player(addr: &str, id: u64) -> ClientWs {
    let mut ws = connect(addr).await;
    send(
        &mut ws,
        json!({"type": "join_game", "role": "player", "player_id": id}),
    )
    .await;
    let ack = recv(&mut ws).await;
    assert_eq!(ack["type"], "join_success");
    assert_eq!(ack["player_id"], id);
    ws
}

#[tokio::test]
async fn test_host_whisper_reaches_only_target() {
    let addr = start_relay().await;
    let mut host = join_host(&addr).await;
    let mut p2 = join_player(&addr, 2).await;
    let mut p3 = join_player(&addr, 3).await;

    send(
        &mut host,
        json!({
            "type": "send_message",
            "message": "A shadow moves behind you.",
            "target_players": [2],
            "voice_mode": "mystery"
        }),
    )
    .await;

    let whisper = recv(&mut p2).await;
    assert_eq!(whisper["type"], "new_message");
    assert_eq!(whisper["message_type"], "mystery");
    assert_eq!(whisper["sender_role"], "host");
    assert!(whisper["timestamp"].as_u64().unwrap() > 0);

    let ack = recv(&mut host).await;
    assert_eq!(ack["type"], "message_sent");
    assert_eq!(ack["target_count"], 1);

    assert_silent(&mut p3).await;
}

#[tokio::test]
async fn test_player_chat_reaches_host_only() {
    let addr = start_relay().await;
    let mut host = join_host(&addr).await;
    let mut p1 = join_player(&addr, 1).await;
    let mut p4 = join_player(&addr, 4).await;

    send(&mut p1, json!({"type": "send_message", "message": "Can I pick the lock?"}))
        .await;

    let msg = recv(&mut host).await;
    assert_eq!(msg["type"], "new_message");
    assert_eq!(msg["sender_player_id"], 1);
    assert_silent(&mut p4).await;
    assert_silent(&mut p1).await;
}

#[tokio::test]
async fn test_player_chat_without_host_comes_back_as_error() {
    let addr = start_relay().await;
    let mut p1 = join_player(&addr, 1).await;

    send(&mut p1, json!({"type": "send_message", "message": "Hello?"})).await;

    let reply = recv(&mut p1).await;
    assert_eq!(reply["type"], "message_error");
    assert_eq!(reply["error"], "the host is not connected");
}

#[tokio::test]
async fn test_dice_roll_reaches_everyone() {
    let addr = start_relay().await;
    let mut host = join_host(&addr).await;
    let mut p1 = join_player(&addr, 1).await;
    let mut p2 = join_player(&addr, 2).await;

    send(&mut p1, json!({"type": "dice_roll_broadcast", "dice_type": "d20"})).await;

    for ws in [&mut host, &mut p1, &mut p2] {
        let roll = recv(ws).await;
        assert_eq!(roll["type"], "dice_roll_result");
        assert_eq!(roll["dice_type"], "d20");
        let result = roll["result"].as_u64().unwrap();
        assert!((1..=20).contains(&result));
    }
}

#[tokio::test]
async fn test_stat_update_dual_delivery() {
    let addr = start_relay().await;
    let mut host = join_host(&addr).await;
    let mut p5 = join_player(&addr, 5).await;
    let mut p3 = join_player(&addr, 3).await;

    send(
        &mut host,
        json!({
            "type": "update_player_stats",
            "player_id": "5",
            "stat_type": "hp",
            "current": 12.5,
            "max": 80
        }),
    )
    .await;

    let host_view = recv(&mut host).await;
    assert_eq!(host_view["type"], "player_stats_updated");
    assert_eq!(host_view["player_id"], 5);

    let own_view = recv(&mut p5).await;
    assert_eq!(own_view["type"], "stats_updated");
    assert_eq!(own_view["current"], 12.5);

    assert_silent(&mut p3).await;
}

#[tokio::test]
async fn test_malformed_frame_answered_and_connection_kept() {
    let addr = start_relay().await;
    let mut ws = connect(&addr).await;

    ws.send(Message::text("{not json")).await.unwrap();
    let err = recv(&mut ws).await;
    assert_eq!(err["type"], "error");
    assert_eq!(err["code"], 400);

    send(&mut ws, json!({"type": "teleport"})).await;
    assert_eq!(recv(&mut ws).await["code"], 400);

    send(&mut ws, json!({"type": "get_connected_clients"})).await;
    let reply = recv(&mut ws).await;
    assert_eq!(reply["type"], "connected_clients_update");
    assert_eq!(reply["host_connected"], false);
}

#[tokio::test]
async fn test_disconnect_drops_player_from_query() {
    let addr = start_relay().await;
    let mut host = join_host(&addr).await;
    let _p2 = join_player(&addr, 2).await;
    let mut p4 = join_player(&addr, 4).await;

    p4.close(None).await.unwrap();

    // Cleanup runs on a spawned task; poll until it lands.
    let mut players = Value::Null;
    for _ in 0..20 {
        send(&mut host, json!({"type": "get_connected_clients"})).await;
        let reply = recv(&mut host).await;
        players = reply["connected_players"].clone();
        if players == json!([2]) {
            assert_eq!(reply["total_players"], 1);
            assert_eq!(reply["host_connected"], true);
            return;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("player 4 still listed: {players}");
}
