//! Local stand-in for the provider, served by axum on an ephemeral port.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::Router;
use serde_json::{json, Value};

use gemchat_shared::constants::API_KEY_HEADER;

/// A request as the provider saw it.
#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub path: String,
    pub api_key: Option<String>,
    pub body: Value,
}

struct MockState {
    status: StatusCode,
    body: String,
    delay: Duration,
    requests: Mutex<Vec<RecordedRequest>>,
}

pub(crate) struct MockProvider {
    /// Value for `ClientConfig::endpoint`.
    pub endpoint: String,
    state: Arc<MockState>,
}

impl MockProvider {
    /// Serve `body` with `status` for every request.
    pub async fn replying(status: StatusCode, body: String) -> Self {
        Self::spawn(status, body, Duration::ZERO).await
    }

    /// Like [`replying`](Self::replying) but hold each response for `delay`.
    pub async fn delayed(status: StatusCode, body: String, delay: Duration) -> Self {
        Self::spawn(status, body, delay).await
    }

    /// A successful body whose single candidate says `text`.
    pub fn text_body(text: &str) -> String {
        json!({"candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]}).to_string()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    async fn spawn(status: StatusCode, body: String, delay: Duration) -> Self {
        let state = Arc::new(MockState {
            status,
            body,
            delay,
            requests: Mutex::new(Vec::new()),
        });
        let app = Router::new().fallback(handle).with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            endpoint: format!("http://{addr}/v1beta/models"),
            state,
        }
    }
}

async fn handle(
    State(state): State<Arc<MockState>>,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    state.requests.lock().unwrap().push(RecordedRequest {
        path: uri.path().to_string(),
        api_key: headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_str(&body).unwrap_or(Value::Null),
    });

    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }

    (
        state.status,
        [(header::CONTENT_TYPE, "application/json")],
        state.body.clone(),
    )
}
