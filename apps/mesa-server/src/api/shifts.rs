//! Shift API Handlers

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};

use mesa_core::stats::ShiftStats;

use crate::error::ApiResult;
use crate::scope::AccessScope;
use crate::services::StatsQuery;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/shifts/{shift_id}/stats", get(stats))
}

/// GET /api/shifts/{shift_id}/stats?from=&to= - Totals over the shift's settlements
async fn stats(
    State(state): State<AppState>,
    scope: AccessScope,
    Path(shift_id): Path<String>,
    Query(query): Query<StatsQuery>,
) -> ApiResult<Json<ShiftStats>> {
    Ok(Json(state.accounts.shift_stats(&scope, &shift_id, query).await?))
}
