//! Common test utilities - mock generation and search service
//!
//! Spawns an axum server on a random port that stands in for the image
//! generation API and the place search API.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use viewpoint::fantasy::FantasyMapStorage;
use viewpoint::gallery::Gallery;
use viewpoint::settings::{Database, Preferences, SettingsService, SettingsStore};
use viewpoint::{Config, GeminiClient, MapSession};

/// Canned reply for one generateContent call
#[derive(Debug, Clone)]
pub struct MockReply {
    pub status: u16,
    pub body: String,
    pub delay: Duration,
}

impl MockReply {
    /// 200 with a single inline image part
    pub fn image(bytes: &[u8]) -> Self {
        let body = serde_json::json!({
            "candidates": [{
                "content": {
                    "parts": [
                        {"text": "Here is the view."},
                        {"inlineData": {"mimeType": "image/png", "data": BASE64.encode(bytes)}}
                    ]
                }
            }]
        });
        Self {
            status: 200,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    /// Error status with the service's error envelope
    pub fn error(status: u16, message: &str) -> Self {
        let body = serde_json::json!({
            "error": {"code": status, "message": message, "status": "ERROR"}
        });
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn raw(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// A generateContent request as the mock saw it
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Last path segment, e.g. `model:generateContent`
    pub call: String,
    pub api_key: Option<String>,
    pub body: serde_json::Value,
}

struct MockState {
    replies: Mutex<VecDeque<MockReply>>,
    fallback: MockReply,
    requests: Mutex<Vec<RecordedRequest>>,
    places: Mutex<serde_json::Value>,
    searches: Mutex<Vec<(HashMap<String, String>, Option<String>)>>,
}

/// Mock service on a random local port
pub struct MockService {
    pub addr: SocketAddr,
    state: Arc<MockState>,
    _handle: JoinHandle<()>,
}

impl MockService {
    /// Start a mock that answers every generation with `fallback` unless a
    /// reply has been queued
    pub async fn start(fallback: MockReply) -> Self {
        let state = Arc::new(MockState {
            replies: Mutex::new(VecDeque::new()),
            fallback,
            requests: Mutex::new(Vec::new()),
            places: Mutex::new(serde_json::json!([])),
            searches: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/v1beta/models/{call}", post(generate_content))
            .route("/search", get(search))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock listener");
        let addr = listener.local_addr().expect("No local address");

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Mock server error: {}", e);
            }
        });

        Self {
            addr,
            state,
            _handle: handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Config pointing both services at this mock
    pub fn config(&self) -> Config {
        Config {
            api_base_url: format!("{}/v1beta", self.base_url()),
            model: "test-image-model".to_string(),
            connect_timeout_secs: 5,
            request_timeout_secs: 10,
            geocoder_url: self.base_url(),
            user_agent: "viewpoint-tests".to_string(),
            ..Config::default()
        }
    }

    pub fn client(&self) -> GeminiClient {
        GeminiClient::from_config(&self.config()).expect("Failed to build client")
    }

    pub fn push_reply(&self, reply: MockReply) {
        self.state.replies.lock().push_back(reply);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().clone()
    }

    pub fn set_places(&self, places: serde_json::Value) {
        *self.state.places.lock() = places;
    }

    pub fn searches(&self) -> Vec<(HashMap<String, String>, Option<String>)> {
        self.state.searches.lock().clone()
    }
}

async fn generate_content(
    State(state): State<Arc<MockState>>,
    Path(call): Path<String>,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    let api_key = headers
        .get("x-goog-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = serde_json::from_str(&body).unwrap_or(serde_json::Value::Null);
    state.requests.lock().push(RecordedRequest {
        call,
        api_key,
        body,
    });

    let reply = state
        .replies
        .lock()
        .pop_front()
        .unwrap_or_else(|| state.fallback.clone());

    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }

    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, reply.body)
}

async fn search(
    State(state): State<Arc<MockState>>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Json<serde_json::Value> {
    let user_agent = headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.searches.lock().push((params, user_agent));
    Json(state.places.lock().clone())
}

/// Session wired to the mock, with its own temp directories
pub struct SessionFixture {
    pub dir: tempfile::TempDir,
    pub session: MapSession,
    pub settings: SettingsService,
}

impl SessionFixture {
    pub async fn open(mock: &MockService, api_key: Option<&str>) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db = Database::new(None)
            .await
            .expect("Failed to create test database");
        let prefs = Preferences::new(SettingsStore::new(db.pool().clone()));
        if let Some(key) = api_key {
            prefs.set_api_key(key).await.expect("Failed to store key");
        }

        let storage = FantasyMapStorage::new(dir.path().join("maps"));
        let settings = SettingsService::new(prefs.clone(), storage.clone());
        let session = MapSession::open(
            prefs,
            storage,
            Gallery::new(dir.path().join("gallery")),
            Arc::new(mock.client()),
        )
        .await
        .expect("Failed to open session");

        Self {
            dir,
            session,
            settings,
        }
    }
}

/// Bytes that pass the PNG signature check
pub fn png(tag: &[u8]) -> Vec<u8> {
    let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
    bytes.extend_from_slice(tag);
    bytes
}
