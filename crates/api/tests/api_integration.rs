//! Integration tests for the API server.

use std::sync::OnceLock;

use api::config::Config;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup() -> Router {
    let state = api::create_in_memory_state(&Config::default());
    api::create_app(state, get_metrics_handle())
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    (status, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn post_empty(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn order_body(lines: Value) -> Value {
    json!({
        "customer_name": "Grace Hopper",
        "shipping_address": "1 Navy Yard, Arlington",
        "lines": lines,
    })
}

async fn create_order(app: &Router, lines: Value) -> Value {
    let (status, order) = send(app, post_json("/orders", order_body(lines))).await;
    assert_eq!(status, StatusCode::CREATED, "{order}");
    order
}

#[tokio::test]
async fn test_health_check() {
    let app = setup();

    let (status, json) = send(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_create_order() {
    let app = setup();

    let order = create_order(&app, json!([{ "product_id": 1, "quantity": 2 }])).await;

    assert_eq!(order["status"], "CONFIRMED");
    assert_eq!(order["payment_status"], "PENDING");
    assert_eq!(order["subtotal_cents"], 17_998);
    assert_eq!(order["tax_cents"], 1_800);
    assert_eq!(order["shipping_cents"], 1_000);
    assert_eq!(order["total_cents"], 20_798);
    assert_eq!(order["lines"][0]["sku"], "KB-001");
    assert_eq!(order["lines"][0]["status"], "RESERVED");
    assert!(order["order_number"].as_str().unwrap().starts_with("ORD-"));
    assert!(order["expected_delivery_date"].is_string());
}

#[tokio::test]
async fn test_create_and_get_order() {
    let app = setup();
    let created = create_order(&app, json!([{ "product_id": 2, "quantity": 1 }])).await;
    let id = created["id"].as_str().unwrap();

    let (status, order) = send(&app, get(&format!("/orders/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["id"], id);
    assert_eq!(order["total_cents"], created["total_cents"]);

    let number = created["order_number"].as_str().unwrap();
    let (status, by_number) = send(&app, get(&format!("/orders/by-number/{number}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_number["id"], id);
}

#[tokio::test]
async fn test_get_nonexistent_order() {
    let app = setup();
    let fake_id = uuid::Uuid::new_v4();

    let (status, json) = send(&app, get(&format!("/orders/{fake_id}"))).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["kind"], "order_not_found");
}

#[tokio::test]
async fn test_invalid_order_id() {
    let app = setup();

    let (status, _) = send(&app, get("/orders/not-a-uuid")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_insufficient_stock_is_conflict() {
    let app = setup();

    let (status, json) = send(
        &app,
        post_json(
            "/orders",
            order_body(json!([
                { "product_id": 1, "quantity": 1 },
                { "product_id": 4, "quantity": 2 }
            ])),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["kind"], "insufficient_stock");
    assert_eq!(json["retryable"], false);

    let (_, orders) = send(&app, get("/orders")).await;
    assert_eq!(orders.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_unknown_product_is_unprocessable() {
    let app = setup();

    let (status, json) = send(
        &app,
        post_json(
            "/orders",
            order_body(json!([{ "product_id": 999, "quantity": 1 }])),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["kind"], "product_not_found");
}

#[tokio::test]
async fn test_empty_lines_is_bad_request() {
    let app = setup();

    let (status, json) = send(&app, post_json("/orders", order_body(json!([])))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "validation");
}

#[tokio::test]
async fn test_cancel_order() {
    let app = setup();
    let created = create_order(&app, json!([{ "product_id": 3, "quantity": 2 }])).await;
    let id = created["id"].as_str().unwrap();

    let (status, order) = send(&app, post_empty(&format!("/orders/{id}/cancel"))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], "CANCELLED");
    assert_eq!(order["lines"][0]["status"], "CANCELLED");
}

#[tokio::test]
async fn test_ship_then_cancel_is_illegal_state() {
    let app = setup();
    let created = create_order(&app, json!([{ "product_id": 2, "quantity": 3 }])).await;
    let id = created["id"].as_str().unwrap();

    for target in ["PROCESSING", "shipped"] {
        let (status, order) = send(
            &app,
            post_json(
                &format!("/orders/{id}/status"),
                json!({ "status": target }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{order}");
    }

    let (status, json) = send(&app, post_empty(&format!("/orders/{id}/cancel"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["kind"], "illegal_state");

    let (_, order) = send(&app, get(&format!("/orders/{id}"))).await;
    assert_eq!(order["status"], "SHIPPED");
}

#[tokio::test]
async fn test_invalid_transition_is_conflict() {
    let app = setup();
    let created = create_order(&app, json!([{ "product_id": 2, "quantity": 1 }])).await;
    let id = created["id"].as_str().unwrap();

    let (status, json) = send(
        &app,
        post_json(
            &format!("/orders/{id}/status"),
            json!({ "status": "DELIVERED" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["kind"], "invalid_transition");
}

#[tokio::test]
async fn test_unknown_status_is_bad_request() {
    let app = setup();
    let created = create_order(&app, json!([{ "product_id": 2, "quantity": 1 }])).await;
    let id = created["id"].as_str().unwrap();

    let (status, _) = send(
        &app,
        post_json(
            &format!("/orders/{id}/status"),
            json!({ "status": "TELEPORTED" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_orders_with_filters() {
    let app = setup();
    let customer = uuid::Uuid::new_v4().to_string();
    for _ in 0..2 {
        let mut body = order_body(json!([{ "product_id": 2, "quantity": 1 }]));
        body["customer_id"] = json!(customer);
        let (status, _) = send(&app, post_json("/orders", body)).await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let other = create_order(&app, json!([{ "product_id": 2, "quantity": 1 }])).await;
    let other_id = other["id"].as_str().unwrap();
    send(&app, post_empty(&format!("/orders/{other_id}/cancel"))).await;

    let (status, mine) = send(&app, get(&format!("/orders?customer_id={customer}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine.as_array().unwrap().len(), 2);

    let (_, cancelled) = send(&app, get("/orders?status=cancelled")).await;
    assert_eq!(cancelled.as_array().unwrap().len(), 1);
    assert_eq!(cancelled[0]["id"], other_id);

    let (_, page) = send(&app, get("/orders?limit=1&offset=1")).await;
    assert_eq!(page.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = setup();
    create_order(&app, json!([{ "product_id": 1, "quantity": 1 }])).await;

    let response = app.oneshot(get("/metrics")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("orders_created_total"));
}
