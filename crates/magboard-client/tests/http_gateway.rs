//! HttpGateway against a live magboard server on a loopback port.

use kurbo::Point;
use magboard_client::HttpGateway;
use magboard_core::presence::{PresenceRecord, color_for_user};
use magboard_core::shapes::{Element, ElementKind, HexColor, TextLabel};
use magboard_core::storage::{Gateway, GatewayError, MemoryGateway};
use magboard_server::{AppState, router};
use std::sync::Arc;
use std::time::Duration;

async fn spawn_server() -> String {
    let state = AppState::new(Arc::new(MemoryGateway::new()), Duration::from_secs(10));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(Arc::new(state))).await.unwrap();
    });
    format!("http://{addr}/")
}

#[tokio::test]
async fn elements_round_trip() {
    let gateway = HttpGateway::new(spawn_server().await);
    assert!(gateway.base_url().ends_with(char::is_numeric));
    assert!(gateway.fetch_elements("Lost Mine").await.unwrap().is_empty());

    let label = Element::new(
        ElementKind::Text(TextLabel::new(Point::new(5.0, 40.0), "Goblin ambush", 18.0)),
        HexColor::new(0xff, 0, 0, 255),
        1_234,
    );
    let saved_at = gateway.save_elements("Lost Mine", &[label.clone()]).await.unwrap();
    assert!(saved_at > 0);

    let fetched = gateway.fetch_elements("lost-mine").await.unwrap();
    assert_eq!(fetched, vec![label]);
}

#[tokio::test]
async fn presence_round_trip() {
    let gateway = HttpGateway::new(spawn_server().await);
    let record = PresenceRecord {
        user_id: "dm".into(),
        user_name: "Dungeon Master".into(),
        cursor_x: 12.0,
        cursor_y: 34.0,
        editing_element_id: Some("e1".into()),
        last_seen: magboard_core::clock::Clock::now_millis(&magboard_core::clock::SystemClock),
        color: color_for_user("dm"),
    };
    gateway.publish_presence("c", &record).await.unwrap();
    let users = gateway.fetch_presence("c").await.unwrap();
    assert_eq!(users, vec![record]);
}

#[tokio::test]
async fn blank_campaign_is_http_error() {
    let gateway = HttpGateway::new(spawn_server().await);
    match gateway.fetch_elements("").await {
        Err(GatewayError::Http { status, body }) => {
            assert_eq!(status, 400);
            assert!(body.contains("Campaign required"));
        }
        other => panic!("expected HTTP 400, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_server_is_transport_error() {
    // Bind then drop to get a port nothing listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let gateway = HttpGateway::new(format!("http://{addr}"));
    let err = gateway.fetch_elements("c").await.unwrap_err();
    assert!(matches!(err, GatewayError::Transport(_)));
}
