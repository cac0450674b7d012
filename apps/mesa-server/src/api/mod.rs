//! # HTTP API
//!
//! JSON routes under `/api`, plus `/health`.
//!
//! ```text
//! /api/accounts ─────────────── accounts.rs   lifecycle, orders, items,
//!                                             subcuentas, split, bill
//! /api/accounts/{id}/…/payments payments.rs   the four payment targets
//! /api/accounts/{id}/kitchen ── kitchen.rs    comandas, ready, queue
//! /api/shifts/{id}/stats ────── shifts.rs     shift statistics
//! ```
//!
//! Every `/api` handler takes an [`AccessScope`](crate::scope::AccessScope)
//! extracted from the identity headers.

mod accounts;
mod kitchen;
mod payments;
mod shifts;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Builds the full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(accounts::router())
        .merge(payments::router())
        .merge(kitchen::router())
        .merge(shifts::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    database: bool,
    version: &'static str,
    currency_symbol: String,
}

/// GET /health - Liveness and database reachability
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = state.db.health_check().await;
    Json(HealthResponse {
        status: if database { "ok" } else { "degraded" },
        database,
        version: env!("CARGO_PKG_VERSION"),
        currency_symbol: state.config.currency_symbol.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use mesa_core::{CatalogProduct, Money};
    use mesa_db::{Database, DbConfig};

    use crate::config::ServerConfig;
    use crate::scope::{ACTOR_ID_HEADER, ACTOR_NAME_HEADER, ACTOR_ROLE_HEADER, TENANT_HEADER};

    async fn app() -> Router {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.catalog()
            .upsert(
                "t1",
                &CatalogProduct {
                    id: "TAC-001".to_string(),
                    name: "Tacos al pastor".to_string(),
                    category: Some("tacos".to_string()),
                    price: Money::from_cents(7500),
                },
            )
            .await
            .unwrap();
        router(AppState::new(db, ServerConfig::default()))
    }

    fn request(method: &str, uri: &str, role: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(TENANT_HEADER, "t1")
            .header(ACTOR_ID_HEADER, "s1")
            .header(ACTOR_NAME_HEADER, "Luis")
            .header(ACTOR_ROLE_HEADER, role);
        match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    async fn open_account(app: &Router, table: &str) -> String {
        let (status, body) = send(
            app,
            request(
                "POST",
                "/api/accounts",
                "waiter",
                Some(json!({ "tables": [{ "id": table, "label": table }], "guest_count": 2 })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let app = app().await;
        let (status, body) = send(
            &app,
            Request::builder().uri("/health").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["currency_symbol"], "$");
    }

    #[tokio::test]
    async fn test_missing_identity_is_forbidden() {
        let app = app().await;
        let (status, body) = send(
            &app,
            Request::builder()
                .uri("/api/accounts")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "FORBIDDEN");
    }

    #[tokio::test]
    async fn test_error_codes_over_http() {
        let app = app().await;

        let (status, body) = send(&app, request("GET", "/api/accounts/nope", "waiter", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");

        let id = open_account(&app, "12").await;

        // Same table again
        let (status, body) = send(
            &app,
            request(
                "POST",
                "/api/accounts",
                "waiter",
                Some(json!({ "tables": [{ "id": "12", "label": "12" }], "guest_count": 1 })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");

        // Kitchen may not add orders
        let order = json!({ "items": [{ "product_id": "TAC-001", "quantity": 1 }] });
        let uri = format!("/api/accounts/{}/orders", id);
        let (status, _) = send(&app, request("POST", &uri, "kitchen", Some(order.clone()))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(&app, request("POST", &uri, "waiter", Some(order))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["order_number"], 1);
        assert_eq!(body["account"]["subtotal"], 7500);

        // Short card payment
        let pay_uri = format!("/api/accounts/{}/payments", id);
        let (status, body) = send(
            &app,
            request(
                "POST",
                &pay_uri,
                "cashier",
                Some(json!({ "method": "card", "received": 7000 })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "PAYMENT_MISMATCH");
        assert_eq!(body["details"]["expected"], 7500);

        let (status, body) = send(
            &app,
            request("POST", &pay_uri, "cashier", Some(json!({ "method": "card" }))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["account"]["status"], "paid");

        // Paid accounts reject every mutation
        let (status, body) = send(
            &app,
            request("POST", &format!("/api/accounts/{}/request-bill", id), "waiter", None),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "INVALID_STATE");
    }

    #[tokio::test]
    async fn test_subcuenta_bill_and_payment_routes() {
        let app = app().await;
        let id = open_account(&app, "4").await;

        let (status, _) = send(
            &app,
            request(
                "POST",
                &format!("/api/accounts/{}/subcuentas", id),
                "waiter",
                Some(json!({ "name": "Ana" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        send(
            &app,
            request(
                "POST",
                &format!("/api/accounts/{}/orders", id),
                "waiter",
                Some(json!({ "items": [
                    { "product_id": "TAC-001", "quantity": 1, "subcuenta": "Ana" },
                    { "product_id": "TAC-001", "quantity": 2 }
                ] })),
            ),
        )
        .await;

        let (status, bill) = send(
            &app,
            request("GET", &format!("/api/accounts/{}/bill?subcuenta=Ana", id), "waiter", None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(bill["subtotal"], 7500);

        let (status, receipt) = send(
            &app,
            request(
                "POST",
                &format!("/api/accounts/{}/subcuentas/Ana/payments", id),
                "cashier",
                Some(json!({ "method": "cash", "received": 10000, "tip": { "type": "fixed", "amount": 500 } })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(receipt["settlement"]["total_with_tip"], 8000);
        assert_eq!(receipt["settlement"]["change"], 2000);
        assert_eq!(receipt["account"]["status"], "open");

        let (status, receipt) = send(
            &app,
            request(
                "POST",
                &format!("/api/accounts/{}/unassigned/payments", id),
                "cashier",
                Some(json!({ "method": "transfer" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(receipt["account"]["status"], "paid");

        let (status, summary) = send(
            &app,
            request("GET", &format!("/api/accounts/{}/subcuentas", id), "kitchen", None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["subcuentas"][0]["is_paid"], true);
        assert_eq!(summary["unassigned"]["subtotal"], 15000);
    }
}
