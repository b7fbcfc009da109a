mod common;

use common::{spawn_backend, MockBackend, GOOD_TOKEN, PDF};
use fraudwatch::{
    api::{ApiClient, ApiError},
    core::prelude::*,
    domain::prelude::*,
};
use std::path::Path;

async fn authed() -> (ApiClient, std::sync::Arc<MockBackend>) {
    let (url, state) = spawn_backend(MockBackend::default()).await;
    (ApiClient::new(url).with_token(GOOD_TOKEN), state)
}

#[tokio::test]
async fn login_returns_user_with_token() {
    let (url, _) = spawn_backend(MockBackend::default()).await;
    let client = ApiClient::new(url.clone());

    let user = client
        .login("analyst@anomalyse.bank", "secret")
        .await
        .expect("login");
    assert_eq!(user.token, GOOD_TOKEN);
    assert_eq!(user.role, Role::Analyst);

    let mut session = Session::default();
    session.login(user);
    let transactions = ApiClient::for_session(url, &session)
        .transactions()
        .await
        .expect("transactions");
    assert_eq!(transactions.len(), 4);
}

#[tokio::test]
async fn login_rejects_bad_password() {
    let (url, _) = spawn_backend(MockBackend::default()).await;
    let err = ApiClient::new(url)
        .login("analyst@anomalyse.bank", "nope")
        .await
        .expect_err("must fail");
    assert!(matches!(err, ApiError::InvalidCredentials));
}

#[tokio::test]
async fn fetched_transactions_order_and_filter() {
    let (client, _) = authed().await;
    let all = client.transactions().await.expect("transactions");

    let ordered = order_transactions(&all);
    let ids: Vec<&str> = ordered.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, ["t-3", "t-1", "t-2"]);

    let mut state = ConsoleState::default();
    state.load(all);
    assert_eq!(state.transactions.len(), 2);
    assert_eq!(state.new_fraud_count(), 1);
}

#[tokio::test]
async fn rejected_token_logs_out() {
    let (url, _) = spawn_backend(MockBackend::default()).await;
    let mut session = Session::Authenticated(User {
        id: "u".to_string(),
        username: "analyst@anomalyse.bank".to_string(),
        role: Role::Analyst,
        token: "expired".to_string(),
    });
    let client = ApiClient::for_session(url, &session);

    let (result, transition) = session.observe(client.transactions().await);
    assert!(matches!(result, Err(ApiError::Unauthenticated)));
    assert_eq!(transition, SessionTransition::ToLogin);
    assert_eq!(session, Session::Unauthenticated);
}

#[tokio::test]
async fn missing_token_fails_without_request() {
    let (url, state) = spawn_backend(MockBackend::default()).await;
    let err = ApiClient::new(url)
        .fraud_metrics()
        .await
        .expect_err("must fail");
    assert!(matches!(err, ApiError::Unauthenticated));
    assert_eq!(state.metrics_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn metrics_decode_extras() {
    let (client, _) = authed().await;
    let metrics = client.fraud_metrics().await.expect("metrics");
    assert_eq!(metrics.total_transactions, 1450);
    assert_eq!(metrics.flagged_transactions, 87);
    assert_eq!(metrics.fraud_trend[0].fraud_count, 4);
    assert_eq!(metrics.most_active_user.as_deref(), Some("42"));
    assert_eq!(metrics.fraud_type_counts["NEW_CITY"], 37);
    assert_eq!(metrics.avg_amount_fraud, 0.0);
}

#[tokio::test]
async fn notify_sends_id_and_recipient() {
    let (client, state) = authed().await;
    let mut console = ConsoleState::default();
    console.load(client.transactions().await.expect("transactions"));

    let recipient = console.find("t-2").expect("queued").default_alert_recipient();
    assert_eq!(recipient, "user42@anomalyse.bank");

    let response = client
        .notify_transaction("t-2", Some(&recipient))
        .await
        .expect("notify");
    assert!(response.success);
    assert!(console.mark_notified("t-2"));
    assert_eq!(console.new_fraud_count(), 0);

    let sent = state.notified.lock().unwrap();
    assert_eq!(sent[0]["id"], "t-2");
    assert_eq!(sent[0]["email"], "user42@anomalyse.bank");
}

#[tokio::test]
async fn notify_unknown_transaction_is_not_found() {
    let (client, state) = authed().await;
    let err = client
        .notify_transaction("nope", None)
        .await
        .expect_err("must fail");
    assert!(matches!(err, ApiError::NotFound(ref m) if m == "Transaction not found"));
    assert!(state.notified.lock().unwrap().is_empty());
}

#[tokio::test]
async fn clear_reports_deleted_rows() {
    let (client, _) = authed().await;
    let response = client.clear_transactions().await.expect("clear");
    assert!(response.success);
    assert_eq!(response.deleted, 3);
}

#[tokio::test]
async fn upload_sends_csv_as_multipart_file() {
    let (client, state) = authed().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("batch.csv");
    std::fs::write(
        &path,
        "Timestamp,UserID,Amount,City,Category\n2024-03-01 10:00:00,42,10.5,Lagos,Food\n",
    )
    .expect("write csv");

    let response = client.upload_csv(&path).await.expect("upload");
    assert!(response.success);
    assert_eq!(response.rows_processed, 1);

    let uploads = state.uploads.lock().unwrap();
    assert_eq!(uploads[0].0, "file");
    assert_eq!(uploads[0].1, "batch.csv");
}

#[tokio::test]
async fn upload_rejects_other_extensions() {
    let (client, state) = authed().await;
    let err = client
        .upload_csv_bytes("batch.json".to_string(), b"[]".to_vec())
        .await
        .expect_err("must fail");
    assert!(matches!(err, ApiError::InvalidFile(_)));
    assert!(state.uploads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn report_is_saved_with_timestamped_name() {
    let (client, _) = authed().await;
    let dir = tempfile::tempdir().expect("tempdir");

    let path = client
        .download_fraud_report(dir.path())
        .await
        .expect("report");
    let name = path.file_name().and_then(|n| n.to_str()).expect("name");
    assert!(name.starts_with("anomalyse_fraud_report_"));
    assert!(name.ends_with(".pdf"));
    assert!(!name.contains(':'));
    assert_eq!(std::fs::read(&path).expect("read"), PDF);
    assert_eq!(path.parent(), Some(Path::new(dir.path())));
}
