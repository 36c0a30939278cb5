//! Fan-out over real WebSocket links.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tavern_protocol::{PlayerId, RoomName};
use tavern_room::{DispatchConfig, Dispatcher, MembershipManager};
use tavern_transport::{
    Connection, Transport, WebSocketConnection, WebSocketTransport,
};
use tokio_tungstenite::tungstenite::Message;

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Accepts `n` clients and returns (server side, client side) pairs.
async fn pairs(n: usize) -> Vec<(Arc<WebSocketConnection>, ClientWs)> {
    let mut transport = WebSocketTransport::bind("127.0.0.1:0").await.unwrap();
    let addr = transport.local_addr().unwrap();

    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        let accept = transport.accept();
        let connect = tokio_tungstenite::connect_async(format!("ws://{addr}"));
        let (server, client) = tokio::join!(accept, connect);
        out.push((Arc::new(server.unwrap()), client.unwrap().0));
    }
    out
}

async fn next_text(client: &mut ClientWs) -> Vec<u8> {
    let msg = tokio::time::timeout(Duration::from_secs(2), client.next())
        .await
        .expect("frame should arrive")
        .unwrap()
        .unwrap();
    msg.into_data().to_vec()
}

#[tokio::test]
async fn test_room_broadcast_skips_closed_client() {
    let mut links = pairs(3).await;
    let dispatcher = Dispatcher::new(DispatchConfig::default());
    let mut rooms = MembershipManager::new();
    for (server, _) in &links {
        dispatcher.attach(Arc::clone(server)).await;
        rooms.join(RoomName::AllPlayers, server.id());
    }

    // The middle link is torn down from the server side before the send.
    links[1].0.close().await.unwrap();
    let _ = links[1].1.close(None).await;

    let mut recipients: Vec<_> =
        rooms.members(RoomName::AllPlayers).into_iter().collect();
    recipients.sort();
    let report = dispatcher
        .deliver(&recipients, br#"{"type":"environmental_change"}"#)
        .await;

    assert_eq!(report.delivered, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(
        next_text(&mut links[0].1).await,
        br#"{"type":"environmental_change"}"#
    );
    assert_eq!(
        next_text(&mut links[2].1).await,
        br#"{"type":"environmental_change"}"#
    );
}

#[tokio::test]
async fn test_private_room_reaches_only_its_player() {
    let mut links = pairs(2).await;
    let dispatcher = Dispatcher::new(DispatchConfig::default());
    let mut rooms = MembershipManager::new();
    for (server, _) in &links {
        dispatcher.attach(Arc::clone(server)).await;
    }
    rooms.join(RoomName::Player(PlayerId(1)), links[0].0.id());
    rooms.join(RoomName::Player(PlayerId(2)), links[1].0.id());

    let recipients: Vec<_> = rooms
        .members(RoomName::Player(PlayerId(2)))
        .into_iter()
        .collect();
    let report = dispatcher.deliver(&recipients, b"whisper").await;
    assert_eq!(report.delivered, 1);

    assert_eq!(next_text(&mut links[1].1).await, b"whisper");
    let silent =
        tokio::time::timeout(Duration::from_millis(100), links[0].1.next()).await;
    assert!(silent.is_err(), "player 1 must not see player 2's whisper");

    links[0].1.send(Message::Close(None)).await.unwrap();
}
