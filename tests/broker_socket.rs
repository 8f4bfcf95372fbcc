//! Rendezvous endpoint driven over real WebSocket connections

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use tank_link::broker::{build_router, BrokerMsg, BrokerState};
use tank_link::config::BrokerConfig;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(2);

async fn serve(relay_rate_limit: Option<&'static str>) -> SocketAddr {
    let config = BrokerConfig::from_lookup(|key| match key {
        "RELAY_RATE_LIMIT" => relay_rate_limit.map(str::to_string),
        _ => None,
    })
    .unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = build_router(BrokerState::new(config));
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

async fn join(addr: SocketAddr, code: &str) -> Client {
    let url = format!("ws://{addr}/socketpeer/?pairCode={code}");
    let (client, _) = connect_async(url).await.unwrap();
    client
}

async fn recv(client: &mut Client) -> BrokerMsg {
    loop {
        let msg = timeout(WAIT, client.next())
            .await
            .expect("no frame from broker")
            .expect("socket ended")
            .unwrap();
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

async fn send(client: &mut Client, frame: serde_json::Value) {
    client.send(Message::Text(frame.to_string())).await.unwrap();
}

async fn paired(addr: SocketAddr, code: &str) -> (Client, Client) {
    let mut a = join(addr, code).await;
    let mut b = join(addr, code).await;
    assert_eq!(recv(&mut a).await, BrokerMsg::Connect);
    assert_eq!(recv(&mut b).await, BrokerMsg::Connect);
    (a, b)
}

#[tokio::test]
async fn test_missing_pair_code_is_rejected() {
    let addr = serve(None).await;
    let err = connect_async(format!("ws://{addr}/socketpeer/")).await.unwrap_err();
    match err {
        tungstenite::Error::Http(response) => assert_eq!(response.status(), 400),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_pair_relay_and_leave() {
    let addr = serve(None).await;
    let (mut a, mut b) = paired(addr, "driver0_gunner0").await;

    let pose = json!({"rotation": {"x": 0.0, "y": 90.0, "z": 0.0}});
    send(&mut a, json!({"type": "data", "payload": pose.clone()})).await;
    assert_eq!(recv(&mut b).await, BrokerMsg::Data { payload: pose });

    let offer = json!({"sdp": "v=0"});
    send(&mut b, json!({"type": "signal", "data": offer.clone()})).await;
    assert_eq!(recv(&mut a).await, BrokerMsg::Signal { data: offer });

    // Garbage is dropped without ending the session.
    a.send(Message::Text("{nope".to_string())).await.unwrap();
    send(&mut a, json!({"type": "data", "payload": 1})).await;
    assert_eq!(recv(&mut b).await, BrokerMsg::Data { payload: json!(1) });

    a.close(None).await.unwrap();
    assert_eq!(recv(&mut b).await, BrokerMsg::Disconnect);
}

#[tokio::test]
async fn test_third_socket_gets_error_and_close() {
    let addr = serve(None).await;
    let (_a, _b) = paired(addr, "driver1_gunner1").await;

    let mut third = join(addr, "driver1_gunner1").await;
    match recv(&mut third).await {
        BrokerMsg::Error { message } => assert!(message.contains("driver1_gunner1"), "{message}"),
        other => panic!("expected error frame, got {other:?}"),
    }

    let next = timeout(WAIT, third.next()).await.expect("socket left open");
    assert!(
        matches!(next, None | Some(Ok(Message::Close(_))) | Some(Err(_))),
        "unexpected frame: {next:?}"
    );
}

#[tokio::test]
async fn test_codes_are_isolated() {
    let addr = serve(None).await;
    let (mut a, mut b) = paired(addr, "driver0_gunner0").await;
    let (mut c, _d) = paired(addr, "driver0_gunner1").await;

    send(&mut c, json!({"type": "data", "payload": "elsewhere"})).await;
    send(&mut a, json!({"type": "data", "payload": "here"})).await;
    assert_eq!(recv(&mut b).await, BrokerMsg::Data { payload: json!("here") });
    assert!(timeout(Duration::from_millis(200), a.next()).await.is_err());
}

#[tokio::test]
async fn test_relay_is_rate_limited() {
    let addr = serve(Some("2")).await;
    let (mut a, mut b) = paired(addr, "driver0_gunner0").await;

    for n in 0..5 {
        send(&mut a, json!({"type": "data", "payload": n})).await;
    }

    assert_eq!(recv(&mut b).await, BrokerMsg::Data { payload: json!(0) });
    assert_eq!(recv(&mut b).await, BrokerMsg::Data { payload: json!(1) });
    assert!(timeout(Duration::from_millis(300), b.next()).await.is_err());
}
