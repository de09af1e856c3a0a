//! Tests for `PocketBaseStore` against a scripted HTTP server.
//!
//! The fake server speaks just enough HTTP/1.1 to serve the records API
//! and a server-sent-events realtime stream. Every response closes its
//! connection so each request arrives on a fresh socket.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use pinboard_events::RecordAction;
use pinboard_store::{Filter, ListQuery, PocketBaseStore, RecordStore, ReconnectConfig, StoreError};
use serde_json::{json, Map, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, Notify};

// ---------------------------------------------------------------------------
// Fake server
// ---------------------------------------------------------------------------

struct Request {
    method: String,
    target: String,
    head: String,
    body: String,
}

#[derive(Default)]
struct ServerState {
    requests: Mutex<Vec<(String, String, String)>>,
    registered: Notify,
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

async fn read_request(stream: &mut TcpStream) -> Option<Request> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    let header_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();
    let content_length = lines
        .filter_map(|l| l.split_once(':'))
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buf[header_end..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    Some(Request {
        method,
        target,
        head,
        body: String::from_utf8_lossy(&body).to_string(),
    })
}

async fn respond(stream: &mut TcpStream, status: &str, body: &str) {
    let response = if body.is_empty() {
        format!("HTTP/1.1 {status}\r\nConnection: close\r\n\r\n")
    } else {
        format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
    };
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}

async fn write_sse(stream: &mut TcpStream, frame: &str) {
    let _ = stream.write_all(frame.as_bytes()).await;
    let _ = stream.flush().await;
}

async fn serve_realtime(mut stream: TcpStream, state: Arc<ServerState>) {
    write_sse(
        &mut stream,
        "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nCache-Control: no-cache\r\nConnection: close\r\n\r\n",
    )
    .await;
    write_sse(
        &mut stream,
        "id:client-1\nevent:PB_CONNECT\ndata:{\"clientId\":\"client-1\"}\n\n",
    )
    .await;

    state.registered.notified().await;

    let other = json!({"action": "create", "record": {"id": "w-other", "dashboard": "d2"}});
    let unknown = json!({"action": "archive", "record": {"id": "w-arch", "dashboard": "d1"}});
    let mine = json!({"action": "create", "record": {"id": "w1", "dashboard": "d1", "type": "todo"}});

    write_sse(&mut stream, &format!("event:widgets/*\ndata:{other}\n\n")).await;
    write_sse(&mut stream, &format!("event:widgets/*\ndata:{unknown}\n\n")).await;
    write_sse(&mut stream, "event:widgets/*\ndata:not json\n\n").await;

    let frame = format!("event:widgets/*\ndata:{mine}\n\n");
    let (head, tail) = frame.split_at(frame.len() / 2);
    write_sse(&mut stream, head).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    write_sse(&mut stream, tail).await;

    tokio::time::sleep(Duration::from_secs(30)).await;
}

async fn handle(mut stream: TcpStream, state: Arc<ServerState>) {
    let Some(req) = read_request(&mut stream).await else {
        return;
    };
    state
        .requests
        .lock()
        .await
        .push((req.method.clone(), req.target.clone(), req.head.clone()));

    let path = req.target.split('?').next().unwrap_or_default().to_string();
    match (req.method.as_str(), path.as_str()) {
        ("GET", "/api/realtime") => serve_realtime(stream, state).await,
        ("POST", "/api/realtime") => {
            let body: Value = serde_json::from_str(&req.body).unwrap_or(Value::Null);
            state
                .requests
                .lock()
                .await
                .push(("REGISTER".into(), body.to_string(), String::new()));
            respond(&mut stream, "204 No Content", "").await;
            state.registered.notify_one();
        }
        ("GET", "/api/collections/widgets/records") => {
            let body = if req.target.contains("?page=2&") {
                json!({"page": 2, "perPage": 500, "totalItems": 3, "totalPages": 2,
                       "items": [{"id": "c", "dashboard": "d1"}]})
            } else {
                json!({"page": 1, "perPage": 500, "totalItems": 3, "totalPages": 2,
                       "items": [{"id": "a", "dashboard": "d1"}, {"id": "b", "dashboard": "d1"}]})
            };
            respond(&mut stream, "200 OK", &body.to_string()).await;
        }
        ("GET", "/api/collections/widgets/records/missing") => {
            respond(&mut stream, "404 Not Found", r#"{"code":404,"message":"not found"}"#).await;
        }
        ("POST", "/api/collections/widgets/records") => {
            let mut record: Map<String, Value> =
                serde_json::from_str(&req.body).unwrap_or_default();
            record.insert("id".into(), json!("srv000000000001"));
            record.insert("created".into(), json!("2026-10-19 08:30:00.000Z"));
            respond(&mut stream, "200 OK", &Value::Object(record).to_string()).await;
        }
        ("DELETE", _) => respond(&mut stream, "204 No Content", "").await,
        _ => respond(&mut stream, "500 Internal Server Error", "{}").await,
    }
}

async fn start_server() -> (String, Arc<ServerState>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = Arc::new(ServerState::default());

    let accept_state = Arc::clone(&state);
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(handle(stream, Arc::clone(&accept_state)));
        }
    });

    (format!("http://{addr}"), state)
}

fn store(base_url: &str) -> PocketBaseStore {
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    PocketBaseStore::with_client(client, base_url, Some("test-token".into()), Duration::from_secs(5))
        .with_reconnect(ReconnectConfig {
            initial_delay: Duration::from_millis(50),
            ..Default::default()
        })
}

// ---------------------------------------------------------------------------
// Test: list requests follow every page and send filter, sort and auth
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fetch_all_follows_pagination() {
    let (base_url, state) = start_server().await;
    let store = store(&base_url);

    let query = ListQuery::new().filter(Filter::eq("dashboard", "d1")).sort("created");
    let records = store.fetch_all("widgets", &query).await.unwrap();

    let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["a", "b", "c"]);

    let requests = state.requests.lock().await;
    assert_eq!(requests.len(), 2);
    let (_, target, head) = &requests[0];
    assert!(target.contains("perPage=500"), "{target}");
    assert!(target.contains("filter=dashboard"), "{target}");
    assert!(target.contains("sort=created"), "{target}");
    assert!(head.to_ascii_lowercase().contains("authorization: test-token"));
}

// ---------------------------------------------------------------------------
// Test: 404 maps to NotFound with the record coordinates
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_record_is_not_found() {
    let (base_url, _state) = start_server().await;
    let store = store(&base_url);

    let err = store.fetch_one("widgets", "missing").await.unwrap_err();
    assert_matches!(err, StoreError::NotFound { ref collection, ref id }
        if collection == "widgets" && id == "missing");
}

// ---------------------------------------------------------------------------
// Test: create returns the server record, delete accepts 204
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_and_delete() {
    let (base_url, _state) = start_server().await;
    let store = store(&base_url);

    let mut fields = Map::new();
    fields.insert("dashboard".into(), json!("d1"));
    let record = store.create("widgets", fields).await.unwrap();
    assert_eq!(record.id, "srv000000000001");
    assert_eq!(record.str_field("dashboard"), Some("d1"));
    assert!(record.created.is_some());

    store.delete("widgets", &record.id).await.unwrap();
}

// ---------------------------------------------------------------------------
// Test: realtime handshake registers the topic and delivers filtered events
// ---------------------------------------------------------------------------

#[tokio::test]
async fn realtime_delivers_matching_changes() {
    let (base_url, state) = start_server().await;
    let store = store(&base_url);

    let mut sub = store
        .subscribe("widgets", Some(Filter::eq("dashboard", "d1")))
        .await
        .unwrap();

    let event = tokio::time::timeout(Duration::from_secs(5), sub.next())
        .await
        .expect("event before timeout")
        .expect("feed still open");
    assert_eq!(event.action, RecordAction::Create);
    assert_eq!(event.record.id, "w1");

    let requests = state.requests.lock().await;
    let registration = requests
        .iter()
        .find(|(method, _, _)| method == "REGISTER")
        .map(|(_, body, _)| serde_json::from_str::<Value>(body).unwrap())
        .expect("topic registered");
    assert_eq!(registration["clientId"], "client-1");
    assert_eq!(registration["subscriptions"], json!(["widgets/*"]));

    drop(requests);
    sub.unsubscribe();
}
