//! # Tally Server
//!
//! REST API over the Tally sales store.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally Server                                     │
//! │                                                                         │
//! │  Web client ──► HTTP (8080) ──► TraceLayer ──► CorsLayer ──► Router     │
//! │                                                              │          │
//! │                                   /health ◄──────────────────┤          │
//! │                                                              │          │
//! │                      Session (Bearer JWT) ◄── /api/* ────────┘          │
//! │                              │                                          │
//! │                              ▼                                          │
//! │                          handlers ──► tally-db ──► SQLite               │
//! │                                   └─► tally-core (dashboard)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tally_core::TotalPolicy;
use tally_db::Database;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::JwtManager;
use crate::handlers::{customers, dashboard, health, products, sales};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub jwt: Arc<JwtManager>,
    pub total_policy: TotalPolicy,
}

impl AppState {
    pub fn new(db: Database, jwt: JwtManager, total_policy: TotalPolicy) -> Self {
        AppState {
            db,
            jwt: Arc::new(jwt),
            total_policy,
        }
    }
}

/// Builds the application router.
pub fn build_router(state: AppState, cors_allow_any: bool) -> Router {
    let cors = if cors_allow_any {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    };

    let api = Router::new()
        .route("/products", get(products::list).post(products::create))
        .route(
            "/products/{id}",
            get(products::get).put(products::update).delete(products::delete),
        )
        .route("/customers", get(customers::list).post(customers::create))
        .route(
            "/customers/{id}",
            get(customers::get).put(customers::update).delete(customers::delete),
        )
        .route("/sales", get(sales::list).post(sales::commit))
        .route("/sales/{id}", get(sales::get).put(sales::update))
        .route("/dashboard", get(dashboard::get));

    Router::new()
        .route("/health", get(health::check))
        .nest("/api", api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// Router Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::Duration;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tally_db::DbConfig;
    use tower::ServiceExt;

    const SECRET: &str = "router-test-secret";

    async fn app() -> (Router, AppState) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let state = AppState::new(db, JwtManager::new(SECRET), TotalPolicy::Trust);
        (build_router(state.clone(), false), state)
    }

    fn token(lifetime: Duration) -> String {
        JwtManager::new(SECRET)
            .issue_token("user-1", Some("owner"), lifetime)
            .unwrap()
    }

    fn request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {}", token(Duration::hours(1))));

        match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn create_product(app: &Router, name: &str, price_cents: i64, stock: i64) -> String {
        let (status, body) = send(
            app,
            request(
                "POST",
                "/api/products",
                Some(json!({ "name": name, "priceCents": price_cents, "stock": stock })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }

    fn sale_body(items: Value, total: i64) -> Value {
        json!({
            "customer": { "name": "Asha Rao", "email": "asha@example.com", "phone": "555 0100" },
            "items": items,
            "totalAmountCents": total,
        })
    }

    #[tokio::test]
    async fn test_health_needs_no_token() {
        let (app, _) = app().await;
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();

        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_missing_token_is_rejected_before_storage() {
        let (app, state) = app().await;
        state.db.close().await;

        let req = Request::builder().uri("/api/products").body(Body::empty()).unwrap();
        let (status, body) = send(&app, req).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected() {
        let (app, _) = app().await;
        let req = Request::builder()
            .uri("/api/sales")
            .header("authorization", format!("Bearer {}", token(Duration::minutes(-5))))
            .body(Body::empty())
            .unwrap();

        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_commit_sale_decrements_stock() {
        let (app, _) = app().await;
        let notebook = create_product(&app, "Notebook", 4500, 4).await;

        let (status, body) = send(
            &app,
            request(
                "POST",
                "/api/sales",
                Some(sale_body(json!([{ "productId": notebook, "quantity": 3 }]), 13500)),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["customerCreated"], true);
        assert_eq!(body["sale"]["totalAmountCents"], 13500);
        assert_eq!(body["sale"]["items"][0]["productName"], "Notebook");

        let (_, product) = send(&app, request("GET", &format!("/api/products/{}", notebook), None)).await;
        assert_eq!(product["stock"], 1);

        let sale_id = body["sale"]["id"].as_str().unwrap();
        let (status, detail) = send(&app, request("GET", &format!("/api/sales/{}", sale_id), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(detail["customer"]["email"], "asha@example.com");
    }

    #[tokio::test]
    async fn test_insufficient_stock_is_conflict() {
        let (app, _) = app().await;
        let notebook = create_product(&app, "Notebook", 4500, 4).await;

        let (status, body) = send(
            &app,
            request(
                "POST",
                "/api/sales",
                Some(sale_body(
                    json!([
                        { "productId": notebook, "quantity": 3 },
                        { "productId": notebook, "quantity": 2 }
                    ]),
                    22500,
                )),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "INSUFFICIENT_STOCK");

        let (_, product) = send(&app, request("GET", &format!("/api/products/{}", notebook), None)).await;
        assert_eq!(product["stock"], 4);
    }

    #[tokio::test]
    async fn test_empty_cart_is_validation_error() {
        let (app, _) = app().await;

        let (status, body) = send(&app, request("POST", "/api/sales", Some(sale_body(json!([]), 0)))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_malformed_body_is_validation_error() {
        let (app, _) = app().await;

        let (status, body) = send(
            &app,
            request("POST", "/api/products", Some(json!({ "name": "Pen" }))),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_customer_create_is_idempotent_by_email() {
        let (app, _) = app().await;
        let profile = json!({ "name": "Asha Rao", "email": "asha@example.com", "phone": "555 0100" });

        let (first, created) = send(&app, request("POST", "/api/customers", Some(profile.clone()))).await;
        assert_eq!(first, StatusCode::CREATED);

        let (second, existing) = send(&app, request("POST", "/api/customers", Some(profile))).await;
        assert_eq!(second, StatusCode::OK);
        assert_eq!(existing["id"], created["id"]);
    }

    #[tokio::test]
    async fn test_dashboard() {
        let (app, _) = app().await;
        let pen = create_product(&app, "Pen", 1000, 10).await;
        send(
            &app,
            request(
                "POST",
                "/api/sales",
                Some(sale_body(json!([{ "productId": pen, "quantity": 2 }]), 2000)),
            ),
        )
        .await;

        let (status, body) = send(&app, request("GET", "/api/dashboard?granularity=yearly", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["granularity"], "yearly");
        assert_eq!(body["totalSales"], 1);
        assert_eq!(body["totalRevenueCents"], 2000);
        assert_eq!(body["revenueTodayCents"], 2000);
        assert_eq!(body["totalCustomers"], 1);
        assert_eq!(body["bestseller"], "Pen");

        let (status, body) = send(&app, request("GET", "/api/dashboard?granularity=daily", None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_unknown_ids_are_not_found() {
        let (app, _) = app().await;

        for uri in ["/api/products/nope", "/api/customers/nope", "/api/sales/nope"] {
            let (status, body) = send(&app, request("GET", uri, None)).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
            assert_eq!(body["code"], "NOT_FOUND");
        }

        let (status, _) = send(&app, request("DELETE", "/api/products/nope", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
