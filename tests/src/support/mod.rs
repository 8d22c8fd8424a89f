//! In-process stand-in for the finance backend.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use parking_lot::Mutex;
use pocketbook_core::{ApiSettings, MonthCursor};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// One request as the backend saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub body: Option<Value>,
}

#[derive(Default)]
struct BackendState {
    log: Mutex<Vec<Recorded>>,
    categories: Mutex<Vec<Value>>,
    transactions: Mutex<Vec<Value>>,
    summary: Mutex<Value>,
    history: Mutex<Vec<Value>>,
    required_token: Mutex<Option<String>>,
    failure: Mutex<Option<StatusCode>>,
    created: Mutex<usize>,
}

/// Serves the backend's routes under `/api` on an ephemeral localhost port.
pub struct FakeBackend {
    addr: std::net::SocketAddr,
    state: Arc<BackendState>,
    task: JoinHandle<()>,
}

impl FakeBackend {
    pub async fn start() -> Self {
        let state = Arc::new(BackendState::default());
        *state.categories.lock() = vec![
            category("food", "Food", "#ef4444", "expense"),
            category("rent", "Rent", "#f97316", "expense"),
            category("salary", "Salary", "#22c55e", "income"),
        ];
        *state.summary.lock() = json!({
            "totalExpenses": 0,
            "totalIncomes": 0,
            "balance": 0,
            "expensesByCategory": []
        });

        let app = Router::new().fallback(handle).with_state(state.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let task = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        Self { addr, state, task }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    pub fn settings(&self) -> ApiSettings {
        ApiSettings {
            base_url: self.base_url(),
            timeout: Duration::from_secs(5),
        }
    }

    pub fn set_transactions(&self, transactions: Vec<Value>) {
        *self.state.transactions.lock() = transactions;
    }

    pub fn set_summary(&self, summary: Value) {
        *self.state.summary.lock() = summary;
    }

    pub fn set_history(&self, history: Vec<Value>) {
        *self.state.history.lock() = history;
    }

    /// Answer 401 unless `Authorization: Bearer <token>` is present.
    pub fn require_token(&self, token: &str) {
        *self.state.required_token.lock() = Some(token.to_string());
    }

    /// Answer every request with `status` and a JSON error body.
    pub fn fail_with(&self, status: StatusCode) {
        *self.state.failure.lock() = Some(status);
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.log.lock().clone()
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        self.state
            .log
            .lock()
            .iter()
            .filter(|req| req.method == method && req.path == path)
            .count()
    }

    pub fn transaction_ids(&self) -> Vec<String> {
        self.state
            .transactions
            .lock()
            .iter()
            .filter_map(|tx| tx["id"].as_str().map(str::to_string))
            .collect()
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn handle(
    State(state): State<Arc<BackendState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let path = uri.path().to_string();
    state.log.lock().push(Recorded {
        method: method.clone(),
        path: path.clone(),
        query: uri.query().map(str::to_string),
        authorization: authorization.clone(),
        body: serde_json::from_slice(&body).ok(),
    });

    if let Some(status) = *state.failure.lock() {
        return (status, Json(json!({ "message": "backend exploded" }))).into_response();
    }
    if let Some(token) = state.required_token.lock().clone() {
        if authorization.as_deref() != Some(format!("Bearer {token}").as_str()) {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "missing or invalid token" })),
            )
                .into_response();
        }
    }

    let segments: Vec<&str> = path
        .trim_start_matches("/api")
        .trim_matches('/')
        .split('/')
        .collect();
    match (method, segments.as_slice()) {
        (Method::GET, ["categories"]) => Json(Value::Array(state.categories.lock().clone())).into_response(),
        (Method::GET, ["transactions"]) => {
            Json(Value::Array(state.transactions.lock().clone())).into_response()
        }
        (Method::GET, ["transactions", "summary"]) => Json(state.summary.lock().clone()).into_response(),
        (Method::GET, ["transactions", "historical"]) => {
            Json(json!({ "history": state.history.lock().clone() })).into_response()
        }
        (Method::POST, ["transactions"]) => {
            let Ok(mut created) = serde_json::from_slice::<Value>(&body) else {
                return (StatusCode::BAD_REQUEST, Json(json!({ "message": "invalid body" })))
                    .into_response();
            };
            let id = {
                let mut counter = state.created.lock();
                *counter += 1;
                format!("new-{}", *counter)
            };
            created["id"] = json!(id);
            created["userId"] = json!("uid-ana");
            state.transactions.lock().push(created.clone());
            (StatusCode::CREATED, Json(created)).into_response()
        }
        (Method::DELETE, ["transactions", id]) => {
            let mut transactions = state.transactions.lock();
            let before = transactions.len();
            transactions.retain(|tx| tx["id"].as_str() != Some(*id));
            if transactions.len() == before {
                return (
                    StatusCode::NOT_FOUND,
                    Json(json!({ "message": "Transaction not found" })),
                )
                    .into_response();
            }
            StatusCode::NO_CONTENT.into_response()
        }
        _ => (StatusCode::NOT_FOUND, Json(json!({ "message": "no such route" }))).into_response(),
    }
}

pub fn category(id: &str, name: &str, color: &str, kind: &str) -> Value {
    json!({ "id": id, "name": name, "color": color, "type": kind })
}

/// A transaction in the backend's JSON shape, dated mid-month of `period`.
pub fn transaction(id: &str, period: MonthCursor, kind: &str, amount: f64, description: &str) -> Value {
    json!({
        "id": id,
        "userId": "uid-ana",
        "amount": amount,
        "date": format!("{:04}-{:02}-15T12:00:00.000Z", period.year(), period.month()),
        "categoryId": if kind == "income" { "salary" } else { "food" },
        "type": kind,
        "description": description,
        "createdAt": "2024-03-01T12:00:00.000Z",
        "updatedAt": "2024-03-01T12:00:00.000Z"
    })
}

pub fn march_2024() -> MonthCursor {
    MonthCursor::new(3, 2024).expect("march")
}
