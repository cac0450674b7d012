//! Payment API Handlers
//!
//! One route per settlement target. All four take the same
//! [`PaymentRequest`] body:
//!
//! ```json
//! {
//!   "method": "mixed",
//!   "instruments": [
//!     { "method": "cash", "amount": 20000, "received": 20000 },
//!     { "method": "transfer", "amount": 6000 },
//!     { "method": "card", "amount": 5050 }
//!   ],
//!   "tip": { "type": "fixed", "amount": 4050 }
//! }
//! ```

use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};

use mesa_core::payment::PaymentRequest;
use mesa_core::Partition;

use crate::error::ApiResult;
use crate::scope::AccessScope;
use crate::services::PaymentReceipt;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/accounts/{id}/payments", post(pay_account))
        .route("/api/accounts/{id}/subcuentas/{name}/payments", post(pay_subcuenta))
        .route("/api/accounts/{id}/unassigned/payments", post(pay_unassigned))
        .route("/api/accounts/{id}/split/{share}/payments", post(pay_split))
}

/// POST /api/accounts/{id}/payments - Pay the undivided account
async fn pay_account(
    State(state): State<AppState>,
    scope: AccessScope,
    Path(id): Path<String>,
    Json(request): Json<PaymentRequest>,
) -> ApiResult<Json<PaymentReceipt>> {
    Ok(Json(state.accounts.pay_account(&scope, &id, request).await?))
}

/// POST /api/accounts/{id}/subcuentas/{name}/payments
async fn pay_subcuenta(
    State(state): State<AppState>,
    scope: AccessScope,
    Path((id, name)): Path<(String, String)>,
    Json(request): Json<PaymentRequest>,
) -> ApiResult<Json<PaymentReceipt>> {
    Ok(Json(
        state
            .accounts
            .pay_partition(&scope, &id, Partition::Named(name), request)
            .await?,
    ))
}

/// POST /api/accounts/{id}/unassigned/payments
async fn pay_unassigned(
    State(state): State<AppState>,
    scope: AccessScope,
    Path(id): Path<String>,
    Json(request): Json<PaymentRequest>,
) -> ApiResult<Json<PaymentReceipt>> {
    Ok(Json(
        state
            .accounts
            .pay_partition(&scope, &id, Partition::Unassigned, request)
            .await?,
    ))
}

/// POST /api/accounts/{id}/split/{share}/payments
async fn pay_split(
    State(state): State<AppState>,
    scope: AccessScope,
    Path((id, share)): Path<(String, u32)>,
    Json(request): Json<PaymentRequest>,
) -> ApiResult<Json<PaymentReceipt>> {
    Ok(Json(state.accounts.pay_split(&scope, &id, share, request).await?))
}
