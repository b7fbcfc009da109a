#![allow(dead_code)]

use axum::{
    extract::{Multipart, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};
use tokio::net::TcpListener;

pub const GOOD_TOKEN: &str = "good-token";
pub const PDF: &[u8] = b"%PDF-1.4 fake report";

type Rejection = (StatusCode, Json<Value>);

#[derive(Default)]
pub struct MockBackend {
    pub metrics_calls: AtomicUsize,
    /// Metrics requests after this many calls are rejected with 401.
    pub revoke_after: Option<usize>,
    pub notified: Mutex<Vec<Value>>,
    pub uploads: Mutex<Vec<(String, String, Vec<u8>)>>,
    pub chat_requests: Mutex<Vec<(Option<String>, Value)>>,
    /// Status returned by the chat endpoint instead of a stream.
    pub chat_status: Option<u16>,
}

fn unauthorized() -> Rejection {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"detail": "Invalid token"})),
    )
}

fn authorize(headers: &HeaderMap) -> Result<(), Rejection> {
    let expected = format!("Bearer {GOOD_TOKEN}");
    match headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => Ok(()),
        _ => Err(unauthorized()),
    }
}

async fn login(Json(body): Json<Value>) -> Result<Json<Value>, Rejection> {
    if body["email"] == "analyst@anomalyse.bank" && body["password"] == "secret" {
        Ok(Json(json!({"access_token": GOOD_TOKEN, "token_type": "bearer"})))
    } else {
        Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Invalid credentials"})),
        ))
    }
}

async fn transactions(headers: HeaderMap) -> Result<Json<Value>, Rejection> {
    authorize(&headers)?;
    Ok(Json(json!([
        {
            "id": "t-2", "timestamp": "2024-03-01T09:15:00", "amount": 912.5,
            "user_id": "42", "city": "Lagos", "category": "Electronics",
            "status": "Suspicious", "flags": [], "notification_sent": false
        },
        {
            "id": "t-1", "timestamp": "2024-03-01T08:00:00", "amount": 12.0,
            "user_id": "42", "city": "Lagos", "category": "Food",
            "status": "Safe", "flags": [], "notification_sent": false
        },
        {
            "id": "t-3", "timestamp": "2024-02-28T23:59:59", "amount": 5400.0,
            "user_id": "17", "city": "Moscow", "category": "Crypto",
            "status": "Fake/Suspicious", "notification_sent": true
        },
        { "id": "broken", "amount": 100, "user_id": null }
    ])))
}

async fn metrics(
    State(state): State<Arc<MockBackend>>,
    headers: HeaderMap,
) -> Result<Json<Value>, Rejection> {
    authorize(&headers)?;
    let call = state.metrics_calls.fetch_add(1, Ordering::SeqCst) + 1;
    if state.revoke_after.is_some_and(|limit| call > limit) {
        return Err(unauthorized());
    }
    Ok(Json(json!({
        "totalTransactions": 1450,
        "flaggedTransactions": 87,
        "overallRiskScore": 6.0,
        "fraudTrend": [{"date": "2024-03-01", "fraudCount": 4, "safeCount": 120}],
        "riskDistribution": [{"name": "Safe", "value": 1363}, {"name": "Suspicious", "value": 87}],
        "mostActiveUser": "42",
        "fraudTypeCounts": {"HIGH_AMOUNT": 50, "NEW_CITY": 37},
        "call": call
    })))
}

async fn notify(
    State(state): State<Arc<MockBackend>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, Rejection> {
    authorize(&headers)?;
    if body["id"] != "t-2" {
        return Err((
            StatusCode::NOT_FOUND,
            Json(json!({"detail": "Transaction not found"})),
        ));
    }
    let email = body["email"].as_str().unwrap_or("admin@anomalyse.bank").to_string();
    state.notified.lock().unwrap().push(body);
    Ok(Json(json!({"success": true, "message": format!("Notification sent to {email}")})))
}

async fn clear(headers: HeaderMap) -> Result<Json<Value>, Rejection> {
    authorize(&headers)?;
    Ok(Json(json!({"success": true, "deleted": 3})))
}

async fn upload(
    State(state): State<Arc<MockBackend>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<Value>, Rejection> {
    authorize(&headers)?;
    if let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.unwrap().to_vec();
        let rows = bytes.iter().filter(|b| **b == b'\n').count().saturating_sub(1);
        state.uploads.lock().unwrap().push((name, file_name, bytes));
        return Ok(Json(json!({
            "success": true,
            "message": "File processed and transactions stored.",
            "rowsProcessed": rows
        })));
    }
    Err((
        StatusCode::BAD_REQUEST,
        Json(json!({"detail": "Only CSV files are supported"})),
    ))
}

async fn report(headers: HeaderMap) -> Result<Response, Rejection> {
    authorize(&headers)?;
    Ok(([(header::CONTENT_TYPE, "application/pdf")], PDF).into_response())
}

fn sse_event(text: &str) -> String {
    let chunk = json!({"candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]});
    format!("data: {chunk}\r\n\r\n")
}

async fn chat(
    State(state): State<Arc<MockBackend>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let key = headers
        .get("x-goog-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.chat_requests.lock().unwrap().push((key, body));

    if let Some(status) = state.chat_status {
        let status = StatusCode::from_u16(status).unwrap();
        return (status, "Resource has been exhausted (e.g. check quota).").into_response();
    }

    let body: String = ["Go to Card Settings", " > Freeze.", " Did you find the freeze button?"]
        .iter()
        .map(|t| sse_event(t))
        .collect();
    ([(header::CONTENT_TYPE, "text/event-stream")], body).into_response()
}

/// Starts the mock backend on an ephemeral port and returns its base URL.
pub async fn spawn_backend(state: MockBackend) -> (String, Arc<MockBackend>) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let state = Arc::new(state);

    let app = Router::new()
        .route("/auth/login", post(login))
        .route("/transactions", get(transactions))
        .route("/transactions/notify", post(notify))
        .route("/transactions/clear", post(clear))
        .route("/dashboard/metrics", get(metrics))
        .route("/upload", post(upload))
        .route("/reports/fraud.pdf", get(report))
        .route(
            "/v1beta/models/test-model:streamGenerateContent",
            post(chat),
        )
        .with_state(state.clone());

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}"), state)
}
