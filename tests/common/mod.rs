//! In-process workflow backend for integration tests.

#![allow(dead_code)]

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

/// Scripted backend state, shared between the test and the server.
#[derive(Default)]
pub struct MockBackend {
    /// Status bodies per request id. Served in order; the last one repeats.
    statuses: Mutex<HashMap<String, Vec<Value>>>,
    /// Raw events body per request id. Missing means 404.
    events: Mutex<HashMap<String, String>>,
    /// Request ids whose status endpoint answers 500.
    failing: Mutex<HashSet<String>>,
    approvals: Mutex<Vec<(String, Value)>>,
    status_calls: Mutex<HashMap<String, usize>>,
}

impl MockBackend {
    pub fn script_status(&self, request_id: &str, bodies: Vec<Value>) {
        self.statuses
            .lock()
            .unwrap()
            .insert(request_id.to_string(), bodies);
    }

    pub fn set_events(&self, request_id: &str, body: &str) {
        self.events
            .lock()
            .unwrap()
            .insert(request_id.to_string(), body.to_string());
    }

    pub fn fail_status(&self, request_id: &str) {
        self.failing.lock().unwrap().insert(request_id.to_string());
    }

    pub fn approvals(&self) -> Vec<(String, Value)> {
        self.approvals.lock().unwrap().clone()
    }

    pub fn status_calls(&self, request_id: &str) -> usize {
        self.status_calls
            .lock()
            .unwrap()
            .get(request_id)
            .copied()
            .unwrap_or(0)
    }
}

fn not_found(detail: &str) -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "detail": detail }))).into_response()
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": "credit-workflow" }))
}

async fn status(State(mock): State<Arc<MockBackend>>, Path(id): Path<String>) -> Response {
    *mock.status_calls.lock().unwrap().entry(id.clone()).or_default() += 1;
    if mock.failing.lock().unwrap().contains(&id) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response();
    }
    let mut statuses = mock.statuses.lock().unwrap();
    match statuses.get_mut(&id) {
        Some(queue) if !queue.is_empty() => {
            let body = if queue.len() > 1 {
                queue.remove(0)
            } else {
                queue[0].clone()
            };
            Json(body).into_response()
        }
        _ => not_found("Workflow not found"),
    }
}

async fn events(State(mock): State<Arc<MockBackend>>, Path(id): Path<String>) -> Response {
    match mock.events.lock().unwrap().get(&id) {
        Some(body) => (
            StatusCode::OK,
            [("content-type", "application/json")],
            body.clone(),
        )
            .into_response(),
        None => not_found("No events found for this request"),
    }
}

async fn start(State(mock): State<Arc<MockBackend>>, Path(id): Path<String>) -> Json<Value> {
    mock.statuses
        .lock()
        .unwrap()
        .insert(id.clone(), vec![json!({ "status": "running" })]);
    Json(json!({
        "message": "Workflow started",
        "request_id": id,
        "status": "running"
    }))
}

async fn approve(
    State(mock): State<Arc<MockBackend>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let decision = body["decision"].clone();
    mock.approvals.lock().unwrap().push((id, body));
    Json(json!({ "message": "Decision recorded", "decision": decision }))
}

async fn summary(State(mock): State<Arc<MockBackend>>, Path(id): Path<String>) -> Response {
    let statuses = mock.statuses.lock().unwrap();
    let Some(current) = statuses.get(&id).and_then(|q| q.first()) else {
        return not_found("Workflow not found");
    };
    if current["status"] != "completed" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "detail": "Workflow not completed" })),
        )
            .into_response();
    }
    Json(current["result"].clone()).into_response()
}

/// Start the backend on an ephemeral port. Returns `None` when the sandbox
/// forbids binding sockets; callers skip the test.
pub async fn start_backend() -> Option<(String, Arc<MockBackend>)> {
    let mock = Arc::new(MockBackend::default());
    let app = Router::new()
        .route("/health", get(health))
        .route("/api/workflow/status/{id}", get(status))
        .route("/api/workflow/events/{id}", get(events))
        .route("/api/workflow/start/{id}", post(start))
        .route("/api/workflow/approve/{id}", post(approve))
        .route("/api/workflow/summary/{id}", get(summary))
        .with_state(mock.clone());

    let listener = match tokio::net::TcpListener::bind("127.0.0.1:0").await {
        Ok(listener) => listener,
        Err(err) => {
            eprintln!("skipping: cannot bind test listener: {}", err);
            return None;
        }
    };
    let addr: SocketAddr = listener.local_addr().ok()?;

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Some((format!("http://{}", addr), mock))
}

/// A base URL nothing listens on.
pub async fn unreachable_base_url() -> Option<String> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.ok()?;
    let addr = listener.local_addr().ok()?;
    drop(listener);
    Some(format!("http://{}", addr))
}

pub fn completed_status() -> Value {
    json!({
        "status": "completed",
        "started_at": "2024-05-01T10:00:00",
        "completed_at": "2024-05-01T10:02:30",
        "result": {
            "request_id": "REQ-2024-001",
            "workflow_summary": "Credit block released after human approval",
            "final_decision": "APPROVED",
            "final_credit_limit": 50000000.0,
            "final_block_status": false,
            "demo_talk_track": ["AI recommended release", "Approver confirmed"]
        }
    })
}

pub fn events_body() -> String {
    json!([
        {
            "step": "Credit Block Request",
            "status": "Completed",
            "actor": "Human",
            "timestamp": "2024-05-01T10:00:00",
            "payload": {"request_type": "UNBLOCK", "requestor": {"name": "Asha"}}
        },
        {
            "step": "AI Analysis & Recommendation",
            "status": "Completed",
            "actor": "AI",
            "timestamp": "2024-05-01T10:00:20",
            "payload": {"recommendation": "RELEASE_BLOCK", "confidence": 0.87}
        },
        {
            "step": "Human Approval",
            "status": "Pending",
            "actor": "Human",
            "timestamp": "2024-05-01T10:00:30",
            "payload": null
        },
        {
            "step": "Legal Review",
            "status": "Completed",
            "actor": "Human",
            "timestamp": "2024-05-01T10:00:40",
            "payload": null
        }
    ])
    .to_string()
}
