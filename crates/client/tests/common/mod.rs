//! In-process weaving-service stub for integration tests.
//!
//! Serves the three surfaces the client talks to (the multipart upload
//! endpoint, the progress WebSocket, and static demo assets) on an
//! ephemeral port, with behavior scripted per test.

// Each test binary uses a subset of the stub surface.
#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use weft_client::endpoints::ServiceEndpoints;

/// How the stub answers the upload POST.
pub enum UploadBehavior {
    /// 200 with `{jobId, remoteFilename}`.
    Accept,
    /// Non-success status, with an optional `{detail}` body.
    Reject { status: u16, detail: Option<String> },
    /// 200 with a body that is not the expected record.
    MalformedBody,
}

/// What the socket does after the script is exhausted.
pub enum Finale {
    /// Send a close frame and hang up.
    Close,
    /// Keep the connection open until the client goes away.
    Hold,
}

/// Scripted behavior for one stub instance.
pub struct StubConfig {
    pub upload: UploadBehavior,
    /// Artificial delay before the upload responds, for disposal races.
    pub upload_delay: Option<Duration>,
    /// JSON records sent over the socket after the handshake arrives.
    pub script: Vec<serde_json::Value>,
    pub finale: Finale,
    /// Demo assets served under `/default-assets/`, keyed by filename.
    pub assets: HashMap<String, Vec<u8>>,
}

impl Default for StubConfig {
    fn default() -> Self {
        Self {
            upload: UploadBehavior::Accept,
            upload_delay: None,
            script: Vec::new(),
            finale: Finale::Close,
            assets: HashMap::new(),
        }
    }
}

struct StubInner {
    config: StubConfig,
    upload_hits: AtomicUsize,
    /// `(field name, filename)` pairs in multipart arrival order.
    upload_fields: Mutex<Vec<(String, String)>>,
    /// The last handshake record received on the socket.
    handshake: Mutex<Option<serde_json::Value>>,
}

#[derive(Clone)]
struct StubState(Arc<StubInner>);

/// A running stub bound to an ephemeral port.
pub struct StubWeaver {
    addr: SocketAddr,
    state: StubState,
}

impl StubWeaver {
    pub async fn spawn(config: StubConfig) -> Self {
        let state = StubState(Arc::new(StubInner {
            config,
            upload_hits: AtomicUsize::new(0),
            upload_fields: Mutex::new(Vec::new()),
            handshake: Mutex::new(None),
        }));

        let app = Router::new()
            .route("/api/upload", post(upload))
            .route("/ws/process", get(ws_process))
            .route("/default-assets/{*path}", get(asset))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("stub server");
        });

        Self { addr, state }
    }

    pub fn api_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn endpoints(&self) -> ServiceEndpoints {
        ServiceEndpoints::from_api_url(self.api_url())
    }

    /// How many times the upload endpoint was hit.
    pub fn upload_hits(&self) -> usize {
        self.state.0.upload_hits.load(Ordering::SeqCst)
    }

    /// `(field name, filename)` pairs received by the upload endpoint.
    pub fn upload_fields(&self) -> Vec<(String, String)> {
        self.state.0.upload_fields.lock().unwrap().clone()
    }

    /// The handshake record received on the socket, if any yet.
    pub fn handshake(&self) -> Option<serde_json::Value> {
        self.state.0.handshake.lock().unwrap().clone()
    }
}

// ---- handlers ----

async fn upload(State(state): State<StubState>, mut multipart: Multipart) -> Response {
    state.0.upload_hits.fetch_add(1, Ordering::SeqCst);

    if let Some(delay) = state.0.config.upload_delay {
        tokio::time::sleep(delay).await;
    }

    let mut midi_filename = String::new();
    while let Some(field) = multipart.next_field().await.expect("multipart field") {
        let name = field.name().unwrap_or("").to_string();
        let filename = field.file_name().unwrap_or("").to_string();
        let _bytes = field.bytes().await.expect("field bytes");
        if name == "midi" {
            midi_filename = filename.clone();
        }
        state.0.upload_fields.lock().unwrap().push((name, filename));
    }

    match &state.0.config.upload {
        UploadBehavior::Accept => (
            StatusCode::OK,
            Json(serde_json::json!({
                "jobId": "job-1",
                "remoteFilename": midi_filename,
            })),
        )
            .into_response(),
        UploadBehavior::Reject { status, detail } => {
            let code = StatusCode::from_u16(*status).expect("valid status");
            match detail {
                Some(detail) => {
                    (code, Json(serde_json::json!({ "detail": detail }))).into_response()
                }
                None => code.into_response(),
            }
        }
        UploadBehavior::MalformedBody => (
            StatusCode::OK,
            Json(serde_json::json!({ "unexpected": true })),
        )
            .into_response(),
    }
}

async fn ws_process(State(state): State<StubState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_socket(socket, state))
}

async fn run_socket(mut socket: WebSocket, state: StubState) {
    // The first frame is the job handshake.
    if let Some(Ok(Message::Text(text))) = socket.recv().await {
        *state.0.handshake.lock().unwrap() = serde_json::from_str(&text).ok();
    }

    for record in &state.0.config.script {
        if socket
            .send(Message::Text(record.to_string().into()))
            .await
            .is_err()
        {
            return;
        }
    }

    match state.0.config.finale {
        Finale::Close => {
            let _ = socket.send(Message::Close(None)).await;
        }
        Finale::Hold => {
            // Drain frames until the client hangs up.
            while let Some(Ok(_)) = socket.recv().await {}
        }
    }
}

async fn asset(State(state): State<StubState>, Path(path): Path<String>) -> Response {
    match state.0.config.assets.get(&path) {
        Some(bytes) => (StatusCode::OK, bytes.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
