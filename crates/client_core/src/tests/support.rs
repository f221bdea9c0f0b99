use std::{collections::VecDeque, sync::Arc};

use axum::{
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    Router,
};
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: String,
}

#[derive(Clone, Default)]
struct ScriptState {
    responses: Arc<Mutex<VecDeque<(StatusCode, String)>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

/// Answers every request with the next scripted response, then `200 {}`.
pub struct ScriptedServer {
    pub base_url: String,
    state: ScriptState,
}

impl ScriptedServer {
    pub async fn spawn(responses: &[(u16, &str)]) -> Self {
        std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
        let state = ScriptState::default();
        {
            let mut queue = state.responses.lock().await;
            for (status, body) in responses {
                let status = StatusCode::from_u16(*status).expect("status code");
                queue.push_back((status, (*body).to_string()));
            }
        }

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let app = Router::new().fallback(handle).with_state(state.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().await.clone()
    }
}

async fn handle(
    State(state): State<ScriptState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    state.requests.lock().await.push(RecordedRequest {
        method,
        path: uri.path().to_string(),
        headers,
        body,
    });
    state
        .responses
        .lock()
        .await
        .pop_front()
        .unwrap_or((StatusCode::OK, "{}".to_string()))
}
