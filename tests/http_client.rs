//! Wire-level tests for the HTTP service client against a local fake server

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use pupero_sweeper::{CreditKind, Endpoints, HttpServiceClient, RecordId, ServiceClient};
use serde_json::{json, Value};

#[derive(Clone, Default)]
struct Captured {
    sweeps: Arc<Mutex<Vec<Value>>>,
    credits: Arc<Mutex<Vec<(u64, Value)>>>,
}

async fn balance(Path(address): Path<String>) -> impl IntoResponse {
    match address.as_str() {
        "A" => (StatusCode::OK, Json(json!({ "unlocked_balance_xmr": 0.25, "balance_xmr": 0.3 }))),
        "broken" => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "detail": "wallet rpc down" })),
        ),
        _ => (StatusCode::OK, Json(json!({}))),
    }
}

async fn sweep_all(State(captured): State<Captured>, Json(body): Json<Value>) -> Json<Value> {
    captured.sweeps.lock().unwrap().push(body);
    Json(json!({ "total_xmr": 0.25, "tx_hash_list": ["abc"] }))
}

async fn increase(
    State(captured): State<Captured>,
    Path(user_id): Path<u64>,
    Json(body): Json<Value>,
) -> StatusCode {
    captured.credits.lock().unwrap().push((user_id, body));
    StatusCode::OK
}

async fn delete_record(Path(id): Path<String>) -> StatusCode {
    match id.as_str() {
        "11" => StatusCode::NO_CONTENT,
        "12" => StatusCode::ACCEPTED,
        _ => StatusCode::NOT_FOUND,
    }
}

async fn addresses() -> Json<Value> {
    Json(json!([
        { "id": 10, "address": "A", "user_id": 1, "is_disabled": false },
        { "id": "11", "address": "B", "user_id": "2", "is_disabled": true,
          "deletion_date": "2000-01-01T00:00:00Z" },
        { "id": 12, "address": "", "user_id": 3 },
        { "id": 13, "address": "D", "user_id": "nobody" },
        "garbage"
    ]))
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(2)).await;
    Json(json!({ "address": "late" }))
}

fn wallet_app(captured: Captured) -> Router {
    Router::new()
        .route("/primary_address", get(|| async { Json(json!({ "address": "4Primary" })) }))
        .route("/addresses", get(addresses))
        .route("/addresses/:id", delete(delete_record))
        .route("/balance/:id", get(balance))
        .route("/balance/:id/increase", post(increase))
        .route("/sweep_all", post(sweep_all))
        .with_state(captured)
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn client_for(base: &str, read_timeout: Duration) -> HttpServiceClient {
    HttpServiceClient::new(Endpoints {
        wallet_url: base.to_string(),
        ledger_url: base.to_string(),
        read_timeout,
        sweep_timeout: Duration::from_secs(5),
    })
    .unwrap()
}

async fn setup() -> (HttpServiceClient, Captured) {
    let captured = Captured::default();
    let base = serve(wallet_app(captured.clone())).await;
    (client_for(&base, Duration::from_secs(5)), captured)
}

#[tokio::test]
async fn test_primary_address() {
    let (client, _) = setup().await;
    assert_eq!(client.fetch_primary_address().await.unwrap(), "4Primary");
}

#[tokio::test]
async fn test_null_primary_address_is_an_error() {
    let base = serve(Router::new().route("/primary_address", get(|| async { "null" }))).await;
    let client = client_for(&base, Duration::from_secs(5));

    let err = client.fetch_primary_address().await.unwrap_err();
    assert_eq!(err.status(), None);
    assert!(!err.is_transport());
}

#[tokio::test]
async fn test_list_drops_malformed_records() {
    let (client, _) = setup().await;

    let records = client.list_address_records().await.unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].address, "A");
    assert_eq!(records[0].id, Some(RecordId::new("10")));
    assert_eq!(records[1].user_id, 2);
    assert!(records[1].is_disabled);
    assert_eq!(records[1].deletion_date.as_deref(), Some("2000-01-01T00:00:00Z"));
}

#[tokio::test]
async fn test_empty_inventory_body() {
    let base = serve(Router::new().route("/addresses", get(|| async { "" }))).await;
    let client = client_for(&base, Duration::from_secs(5));

    assert!(client.list_address_records().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_balance_reads_unlocked_field() {
    let (client, _) = setup().await;

    assert_eq!(client.get_unlocked_balance("A").await.unwrap(), 0.25);
    // Missing field reads as zero
    assert_eq!(client.get_unlocked_balance("Z").await.unwrap(), 0.0);
}

#[tokio::test]
async fn test_balance_upstream_error_carries_status() {
    let (client, _) = setup().await;

    let err = client.get_unlocked_balance("broken").await.unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert!(err.to_string().contains("wallet rpc down"));
}

#[tokio::test]
async fn test_sweep_request_and_response() {
    let (client, captured) = setup().await;

    let swept = client.sweep_address("A", "T").await.unwrap();

    assert_eq!(swept, 0.25);
    assert_eq!(
        captured.sweeps.lock().unwrap().as_slice(),
        &[json!({ "from_address": "A", "to_address": "T" })]
    );
}

#[tokio::test]
async fn test_credit_request_body() {
    let (client, captured) = setup().await;

    client.credit_user(7, 0.25, CreditKind::Real).await.unwrap();
    client.credit_user(7, 0.0, CreditKind::Real).await.unwrap();

    let credits = captured.credits.lock().unwrap();
    assert_eq!(credits.len(), 1);
    assert_eq!(credits[0].0, 7);
    assert_eq!(credits[0].1, json!({ "amount_xmr": 0.25, "kind": "real" }));
}

#[tokio::test]
async fn test_delete_statuses() {
    let (client, _) = setup().await;

    assert!(client.delete_address_record(&RecordId::new("11")).await.unwrap());
    assert!(!client.delete_address_record(&RecordId::new("12")).await.unwrap());

    let err = client
        .delete_address_record(&RecordId::new("99"))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn test_read_timeout_is_transport_error() {
    let base = serve(Router::new().route("/primary_address", get(slow))).await;
    let client = client_for(&base, Duration::from_millis(100));

    let err = client.fetch_primary_address().await.unwrap_err();
    assert!(err.is_transport());
}

#[tokio::test]
async fn test_unreachable_service_is_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let client = client_for(&base, Duration::from_secs(2));
    let err = client.list_address_records().await.unwrap_err();
    assert!(err.is_transport());
}
