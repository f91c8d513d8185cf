//! Full-stack socket tests: a real server, real WebSocket clients, and
//! the handshake gate in front of both surfaces.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use futures_util::{SinkExt, StreamExt};
use loro::{ExportMode, LoroDoc};
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite};

use talentflow_live::auth::{AuthGate, JwtVerifier, TokenVerifier};
use talentflow_live::db::{MemoryGateway, PersistenceGateway};
use talentflow_live::hub::{Hub, HubHandle};
use talentflow_live::routes::{create_api_routes, create_socket_routes};
use talentflow_live::AppState;

const SECRET: &str = "test-secret";

async fn start_server() -> (String, HubHandle, Arc<MemoryGateway>) {
    let gateway = Arc::new(MemoryGateway::new());
    let (hub, handle) = Hub::new(
        gateway.clone() as Arc<dyn PersistenceGateway>,
        Duration::from_millis(50),
    );
    tokio::spawn(hub.run());

    let verifier: Arc<dyn TokenVerifier> = Arc::new(JwtVerifier::new(SECRET));
    let state = AppState {
        hub: handle.clone(),
        gate: Arc::new(AuthGate::new(verifier)),
    };
    let app = Router::new()
        .nest("/api", create_api_routes(state.clone()))
        .merge(create_socket_routes(state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("127.0.0.1:{}", addr.port()), handle, gateway)
}

fn mint(sub: &str, role: &str, exp_offset_secs: i64) -> String {
    #[derive(serde::Serialize)]
    struct TestClaims {
        sub: String,
        role: String,
        exp: usize,
    }
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &TestClaims {
            sub: sub.to_string(),
            role: role.to_string(),
            exp: (chrono::Utc::now().timestamp() + exp_offset_secs) as usize,
        },
        &jsonwebtoken::EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

async fn wait_until<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition never became true");
}

#[tokio::test]
async fn expired_credential_never_becomes_a_connection() {
    let (addr, hub, _gateway) = start_server().await;
    let token = mint("u-1", "recruiter", -600);

    let err = connect_async(format!("ws://{}/ws?token={}", addr, token))
        .await
        .expect_err("handshake should be rejected");
    match err {
        tungstenite::Error::Http(response) => {
            assert_eq!(response.status(), 401);
        }
        other => panic!("unexpected error: {:?}", other),
    }

    assert_eq!(hub.count_online().await, 0);
}

#[tokio::test]
async fn missing_credential_is_rejected_at_handshake() {
    let (addr, hub, _gateway) = start_server().await;

    let err = connect_async(format!("ws://{}/ws", addr))
        .await
        .expect_err("handshake should be rejected");
    match err {
        tungstenite::Error::Http(response) => {
            assert_eq!(response.status(), 401);
        }
        other => panic!("unexpected error: {:?}", other),
    }

    assert_eq!(hub.count_online().await, 0);
}

#[tokio::test]
async fn event_sockets_register_survive_garbage_and_chat() {
    let (addr, hub, _gateway) = start_server().await;

    let token_a = mint("u-a", "recruiter", 3600);
    let token_b = mint("u-b", "candidate", 3600);
    let (mut ws_a, _) = connect_async(format!("ws://{}/ws?token={}", addr, token_a))
        .await
        .unwrap();
    let (mut ws_b, _) = connect_async(format!("ws://{}/ws?token={}", addr, token_b))
        .await
        .unwrap();

    wait_until(|| {
        let hub = hub.clone();
        async move { hub.is_online("u-a").await && hub.is_online("u-b").await }
    })
    .await;

    // A malformed frame is logged and ignored, never fatal.
    ws_a.send(tungstenite::Message::Text("not json at all".into()))
        .await
        .unwrap();

    for ws in [&mut ws_a, &mut ws_b] {
        ws.send(tungstenite::Message::Text(
            r#"{"type":"interview:join","interviewId":"int-7"}"#.into(),
        ))
        .await
        .unwrap();
    }
    wait_until(|| {
        let hub = hub.clone();
        async move { hub.members_of("interview:int-7").await.len() == 2 }
    })
    .await;

    ws_a.send(tungstenite::Message::Text(
        r#"{"type":"chat:sendMessage","interviewId":"int-7","message":"hello"}"#.into(),
    ))
    .await
    .unwrap();

    // B gets the chat; skip the interview:userJoined that preceded it.
    loop {
        let message = timeout(Duration::from_secs(2), ws_b.next())
            .await
            .expect("timed out waiting for chat")
            .expect("socket closed")
            .unwrap();
        if let tungstenite::Message::Text(text) = message {
            let value: serde_json::Value = serde_json::from_str(&text).unwrap();
            if value["type"] == "chat:newMessage" {
                assert_eq!(value["message"], "hello");
                assert_eq!(value["userId"], "u-a");
                break;
            }
        }
    }

    // Closing the socket tears presence down exactly once.
    ws_a.close(None).await.unwrap();
    wait_until(|| {
        let hub = hub.clone();
        async move { !hub.is_online("u-a").await }
    })
    .await;
    assert!(hub.is_online("u-b").await);
}

#[tokio::test]
async fn sync_streams_exchange_frames_over_the_wire() {
    let (addr, _hub, gateway) = start_server().await;
    gateway.seed_note("note-9", "wire notes", "Debrief");

    let token_a = mint("u-a", "recruiter", 3600);
    let token_b = mint("u-b", "candidate", 3600);
    let (mut ws_a, _) = connect_async(format!("ws://{}/sync/note-9?token={}", addr, token_a))
        .await
        .unwrap();
    let (mut ws_b, _) = connect_async(format!("ws://{}/sync/note-9?token={}", addr, token_b))
        .await
        .unwrap();

    // First frame on each stream is the merged snapshot.
    let snapshot_a = match timeout(Duration::from_secs(2), ws_a.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap()
    {
        tungstenite::Message::Binary(frame) => frame,
        other => panic!("unexpected message: {:?}", other),
    };
    let doc_a = LoroDoc::new();
    doc_a.import(&snapshot_a).unwrap();
    assert_eq!(doc_a.get_text("content").to_string(), "wire notes");

    let _snapshot_b = timeout(Duration::from_secs(2), ws_b.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    // A edits locally and pushes the update; B receives it verbatim.
    doc_a.get_text("content").insert(0, "shared ").unwrap();
    let frame = doc_a.export(ExportMode::Snapshot).unwrap();
    ws_a.send(tungstenite::Message::Binary(frame.clone().into()))
        .await
        .unwrap();

    let relayed = match timeout(Duration::from_secs(2), ws_b.next())
        .await
        .expect("timed out waiting for relay")
        .expect("socket closed")
        .unwrap()
    {
        tungstenite::Message::Binary(frame) => frame,
        other => panic!("unexpected message: {:?}", other),
    };
    assert_eq!(relayed.as_ref(), frame.as_slice());

    // And the quiet period makes the merged text durable.
    tokio::time::sleep(Duration::from_millis(300)).await;
    let note = gateway.read_note("note-9").await.unwrap().unwrap();
    assert_eq!(note.content, "shared wire notes");
}
