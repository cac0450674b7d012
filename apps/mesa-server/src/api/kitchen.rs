//! Kitchen API Handlers
//!
//! The only write routes open to the `kitchen` role.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};

use mesa_core::kitchen::{Comanda, KitchenTicket};
use mesa_core::Account;

use crate::error::ApiResult;
use crate::scope::AccessScope;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/accounts/{id}/kitchen", post(send_to_kitchen))
        .route("/api/accounts/{id}/items/{item_id}/ready", post(mark_ready))
        .route("/api/kitchen/queue", get(queue))
}

/// POST /api/accounts/{id}/kitchen - Send pending items, returns the comanda
async fn send_to_kitchen(
    State(state): State<AppState>,
    scope: AccessScope,
    Path(id): Path<String>,
) -> ApiResult<Json<Comanda>> {
    Ok(Json(state.accounts.send_to_kitchen(&scope, &id).await?))
}

/// POST /api/accounts/{id}/items/{item_id}/ready
async fn mark_ready(
    State(state): State<AppState>,
    scope: AccessScope,
    Path((id, item_id)): Path<(String, String)>,
) -> ApiResult<Json<Account>> {
    Ok(Json(state.accounts.mark_ready(&scope, &id, &item_id).await?))
}

/// GET /api/kitchen/queue - Polled by the kitchen display
async fn queue(
    State(state): State<AppState>,
    scope: AccessScope,
) -> ApiResult<Json<Vec<KitchenTicket>>> {
    Ok(Json(state.accounts.kitchen_queue(&scope).await?))
}
