//! Integration tests for `HttpChatApi` and the submit path over real HTTP.
//!
//! Each test starts a minimal HTTP/1.1 responder on a loopback
//! `tokio::net::TcpListener` and routes by method and path.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_test::{assert_err, assert_ok};

use roundtable::api::{ChatApi, ConversationRequest, HttpChatApi};
use roundtable::config::ClientConfig;
use roundtable::coordinator::{RoomCoordinator, RoomPhase, SubmitOutcome};
use roundtable::error::{RoundtableError, DEFAULT_SUBMIT_FAILURE};
use roundtable::processing::ProcessingStore;
use roundtable::roles::RoleSelection;

const ROOM: u64 = 7;

// ---------------------------------------------------------------------------
// Loopback server
// ---------------------------------------------------------------------------

enum Reply {
    Json(u16, String),
    /// Keep the connection open without answering.
    Hang,
}

type Router = Arc<dyn Fn(&str, &str) -> Reply + Send + Sync>;

async fn serve(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let router = Arc::clone(&router);
            tokio::spawn(handle(stream, router));
        }
    });
    addr
}

async fn handle(mut stream: TcpStream, router: Router) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|l| l.split_once(':'))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }

    let mut request_line = head.lines().next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let target = request_line.next().unwrap_or_default().to_string();
    let path = target.split('?').next().unwrap_or_default().to_string();

    match router(&method, &path) {
        Reply::Json(status, body) => {
            let response = format!(
                "HTTP/1.1 {status} Status\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
        Reply::Hang => {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
    }
}

fn room_json(processing: bool) -> String {
    format!(r#"{{"id": {ROOM}, "title": "전략 회의", "isProcessing": {processing}}}"#)
}

/// Rooms report a running round; the question endpoint answers with `question`.
fn router(question: impl Fn() -> Reply + Send + Sync + 'static) -> Router {
    Arc::new(move |method: &str, path: &str| match (method, path) {
        ("POST", "/api/gpt/question") => question(),
        ("GET", "/api/chat-rooms/7") => Reply::Json(200, room_json(true)),
        ("GET", "/api/chat-rooms/7/history") => Reply::Json(200, "[]".to_string()),
        ("GET", "/api/chat-rooms/7/statistics") => {
            Reply::Json(200, r#"{"totalMessages": 0}"#.to_string())
        }
        _ => Reply::Json(404, r#"{"error": "not found"}"#.to_string()),
    })
}

/// Client for the loopback server; a system proxy must not intercept it.
fn client(cfg: &ClientConfig) -> HttpChatApi {
    HttpChatApi::builder(cfg.base_url.clone())
        .connect_timeout(cfg.connect_timeout)
        .request_timeout(cfg.request_timeout)
        .question_timeout(cfg.question_timeout)
        .no_proxy()
        .build()
}

fn config(addr: SocketAddr) -> ClientConfig {
    let mut cfg = ClientConfig::new(format!("http://{addr}/api"));
    cfg.poll_interval = Duration::from_millis(20);
    cfg.connect_timeout = Duration::from_secs(2);
    cfg.request_timeout = Duration::from_secs(2);
    cfg
}

fn coordinator(cfg: &ClientConfig, store: &ProcessingStore) -> RoomCoordinator {
    let api: Arc<dyn ChatApi> = Arc::new(client(cfg));
    RoomCoordinator::new(api, store.clone(), ROOM, cfg.clone())
}

// ---------------------------------------------------------------------------
// Client mapping
// ---------------------------------------------------------------------------

#[tokio::test]
async fn non_2xx_maps_to_api_error_with_body() {
    let addr = serve(router(|| Reply::Json(200, "{}".to_string()))).await;
    let api = client(&config(addr));

    let err = assert_err!(api.get_room(99).await);
    match err {
        RoundtableError::Api { status, url, body } => {
            assert_eq!(status, 404);
            assert!(url.ends_with("/api/chat-rooms/99"), "{url}");
            assert_eq!(body.and_then(|b| b.error).as_deref(), Some("not found"));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn room_parses_from_wire() {
    let addr = serve(router(|| Reply::Json(200, "{}".to_string()))).await;
    let api = client(&config(addr));

    let room = assert_ok!(api.get_room(ROOM).await);
    assert_eq!(room.id, ROOM);
    assert!(room.is_processing);
}

#[tokio::test]
async fn unanswered_question_is_a_timeout_not_a_connect_error() {
    let addr = serve(router(|| Reply::Hang)).await;
    let mut cfg = config(addr);
    cfg.question_timeout = Duration::from_millis(300);
    let api = client(&cfg);

    let request = ConversationRequest {
        chat_room_id: Some(ROOM),
        question: "q".to_string(),
        prompt_keys: vec!["critic".to_string()],
        conversation_rounds: 1,
    };
    let err = assert_err!(api.send_question(&request).await);
    assert!(err.is_timeout(), "{err:?}");
}

// ---------------------------------------------------------------------------
// Submit path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn status_409_keeps_flag_and_polls() {
    let addr = serve(router(|| {
        Reply::Json(409, r#"{"error": "conflict"}"#.to_string())
    }))
    .await;
    let cfg = config(addr);
    let store = ProcessingStore::new();
    let room = coordinator(&cfg, &store);

    let outcome = assert_ok!(room.submit("question", &RoleSelection::default(), 2).await);
    assert_eq!(outcome, SubmitOutcome::AlreadyProcessing);
    assert!(store.get());
    assert_eq!(room.phase(), RoomPhase::Polling);
    room.stop_polling();
}

#[tokio::test]
async fn legacy_phrase_in_500_answer_keeps_flag_and_polls() {
    let addr = serve(router(|| {
        Reply::Json(
            500,
            r#"{"answer": "오류가 발생했습니다: 이미 처리 중"}"#.to_string(),
        )
    }))
    .await;
    let cfg = config(addr);
    let store = ProcessingStore::new();
    let room = coordinator(&cfg, &store);

    let outcome = assert_ok!(room.submit("question", &RoleSelection::default(), 2).await);
    assert_eq!(outcome, SubmitOutcome::AlreadyProcessing);
    assert!(store.get());
    assert_eq!(room.phase(), RoomPhase::Polling);
    room.stop_polling();
}

#[tokio::test]
async fn plain_500_releases_flag() {
    let addr = serve(router(|| {
        Reply::Json(500, r#"{"error": "모델 호출에 실패했습니다."}"#.to_string())
    }))
    .await;
    let cfg = config(addr);
    let store = ProcessingStore::new();
    let room = coordinator(&cfg, &store);

    let err = assert_err!(room.submit("question", &RoleSelection::default(), 2).await);
    assert_eq!(err.status(), Some(500));
    assert_eq!(err.user_message(), "모델 호출에 실패했습니다.");
    assert!(!store.get());
    assert_eq!(room.phase(), RoomPhase::Idle);
}

#[tokio::test]
async fn long_running_question_keeps_flag_and_polls() {
    let addr = serve(router(|| Reply::Hang)).await;
    let mut cfg = config(addr);
    cfg.question_timeout = Duration::from_millis(300);
    let store = ProcessingStore::new();
    let room = coordinator(&cfg, &store);

    let outcome = assert_ok!(room.submit("long question", &RoleSelection::default(), 3).await);
    assert_eq!(outcome, SubmitOutcome::AlreadyProcessing);
    assert!(store.get());
    assert_eq!(room.phase(), RoomPhase::Polling);
    room.stop_polling();
}

#[tokio::test]
async fn refused_connection_releases_flag() {
    // Bind then drop to get a port with nothing listening.
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let cfg = config(addr);
    let store = ProcessingStore::new();
    let room = coordinator(&cfg, &store);

    let err = assert_err!(room.submit("question", &RoleSelection::default(), 1).await);
    assert!(matches!(err, RoundtableError::Connect { .. }), "{err:?}");
    assert_eq!(err.user_message(), DEFAULT_SUBMIT_FAILURE);
    assert!(!store.get());
}
