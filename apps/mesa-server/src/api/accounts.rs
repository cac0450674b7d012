//! Account API Handlers

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, patch, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use mesa_core::bill::PreliminaryBill;
use mesa_core::subledger::SubcuentaSummary;
use mesa_core::{Account, Discount, ItemChanges, Partition, SplitShare, TableRef, TipInput};

use crate::error::ApiResult;
use crate::scope::AccessScope;
use crate::services::{OpenAccountInput, OrderLineInput};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/accounts", get(list).post(open))
        .route("/api/accounts/{id}", get(get_by_id))
        .route("/api/accounts/{id}/orders", post(add_order))
        .route("/api/accounts/{id}/items/{item_id}", patch(edit_item))
        .route("/api/accounts/{id}/items/{item_id}/cancel", post(cancel_item))
        .route("/api/accounts/{id}/subcuentas", get(subcuenta_summary).post(add_subcuenta))
        .route("/api/accounts/{id}/subcuentas/{name}", delete(remove_subcuenta))
        .route("/api/accounts/{id}/split", post(configure_split).delete(clear_split))
        .route("/api/accounts/{id}/discount", put(apply_discount))
        .route("/api/accounts/{id}/tip", put(apply_tip))
        .route("/api/accounts/{id}/bill", get(bill))
        .route("/api/accounts/{id}/request-bill", post(request_bill))
        .route("/api/accounts/{id}/reopen", post(reopen))
        .route("/api/accounts/{id}/cancel", post(cancel))
        .route("/api/accounts/{id}/tables", post(merge_tables))
}

// =============================================================================
// Request / Response Bodies
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct AddOrderRequest {
    pub items: Vec<OrderLineInput>,
}

#[derive(Debug, Serialize)]
pub struct OrderAdded {
    pub order_number: u32,
    pub account: Account,
}

#[derive(Debug, Deserialize)]
pub struct ReasonRequest {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct SubcuentaRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct SplitRequest {
    pub shares: u32,
}

/// `{"discount": null}` removes the discount.
#[derive(Debug, Deserialize)]
pub struct DiscountRequest {
    pub discount: Option<Discount>,
}

#[derive(Debug, Deserialize)]
pub struct MergeTablesRequest {
    pub tables: Vec<TableRef>,
}

/// `?subcuenta=Ana` for one sub-ledger, `?unassigned=true` for the
/// unassigned bucket, nothing for the whole account.
#[derive(Debug, Default, Deserialize)]
pub struct BillQuery {
    pub subcuenta: Option<String>,
    #[serde(default)]
    pub unassigned: bool,
}

impl BillQuery {
    fn partition(self) -> Option<Partition> {
        if self.unassigned {
            Some(Partition::Unassigned)
        } else {
            self.subcuenta.map(Partition::Named)
        }
    }
}

// =============================================================================
// Lifecycle
// =============================================================================

/// POST /api/accounts - Open an account on one or more tables
async fn open(
    State(state): State<AppState>,
    scope: AccessScope,
    Json(input): Json<OpenAccountInput>,
) -> ApiResult<(StatusCode, Json<Account>)> {
    let account = state.accounts.open_account(&scope, input).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

/// GET /api/accounts - Active accounts of the tenant
async fn list(State(state): State<AppState>, scope: AccessScope) -> ApiResult<Json<Vec<Account>>> {
    Ok(Json(state.accounts.list_active(&scope).await?))
}

/// GET /api/accounts/{id}
async fn get_by_id(
    State(state): State<AppState>,
    scope: AccessScope,
    Path(id): Path<String>,
) -> ApiResult<Json<Account>> {
    Ok(Json(state.accounts.get_account(&scope, &id).await?))
}

/// POST /api/accounts/{id}/request-bill
async fn request_bill(
    State(state): State<AppState>,
    scope: AccessScope,
    Path(id): Path<String>,
) -> ApiResult<Json<Account>> {
    Ok(Json(state.accounts.request_bill(&scope, &id).await?))
}

/// POST /api/accounts/{id}/reopen
async fn reopen(
    State(state): State<AppState>,
    scope: AccessScope,
    Path(id): Path<String>,
) -> ApiResult<Json<Account>> {
    Ok(Json(state.accounts.reopen(&scope, &id).await?))
}

/// POST /api/accounts/{id}/cancel
async fn cancel(
    State(state): State<AppState>,
    scope: AccessScope,
    Path(id): Path<String>,
    Json(body): Json<ReasonRequest>,
) -> ApiResult<Json<Account>> {
    Ok(Json(state.accounts.cancel(&scope, &id, &body.reason).await?))
}

/// POST /api/accounts/{id}/tables - Merge further tables into the account
async fn merge_tables(
    State(state): State<AppState>,
    scope: AccessScope,
    Path(id): Path<String>,
    Json(body): Json<MergeTablesRequest>,
) -> ApiResult<Json<Account>> {
    Ok(Json(state.accounts.merge_tables(&scope, &id, body.tables).await?))
}

// =============================================================================
// Orders and Items
// =============================================================================

/// POST /api/accounts/{id}/orders
async fn add_order(
    State(state): State<AppState>,
    scope: AccessScope,
    Path(id): Path<String>,
    Json(body): Json<AddOrderRequest>,
) -> ApiResult<(StatusCode, Json<OrderAdded>)> {
    let (order_number, account) = state.accounts.add_order(&scope, &id, body.items).await?;
    Ok((
        StatusCode::CREATED,
        Json(OrderAdded {
            order_number,
            account,
        }),
    ))
}

/// PATCH /api/accounts/{id}/items/{item_id}
async fn edit_item(
    State(state): State<AppState>,
    scope: AccessScope,
    Path((id, item_id)): Path<(String, String)>,
    Json(changes): Json<ItemChanges>,
) -> ApiResult<Json<Account>> {
    Ok(Json(state.accounts.edit_item(&scope, &id, &item_id, changes).await?))
}

/// POST /api/accounts/{id}/items/{item_id}/cancel
async fn cancel_item(
    State(state): State<AppState>,
    scope: AccessScope,
    Path((id, item_id)): Path<(String, String)>,
    Json(body): Json<ReasonRequest>,
) -> ApiResult<Json<Account>> {
    Ok(Json(
        state
            .accounts
            .cancel_item(&scope, &id, &item_id, &body.reason)
            .await?,
    ))
}

// =============================================================================
// Sub-ledgers and Split
// =============================================================================

/// GET /api/accounts/{id}/subcuentas
async fn subcuenta_summary(
    State(state): State<AppState>,
    scope: AccessScope,
    Path(id): Path<String>,
) -> ApiResult<Json<SubcuentaSummary>> {
    Ok(Json(state.accounts.subcuenta_summary(&scope, &id).await?))
}

/// POST /api/accounts/{id}/subcuentas
async fn add_subcuenta(
    State(state): State<AppState>,
    scope: AccessScope,
    Path(id): Path<String>,
    Json(body): Json<SubcuentaRequest>,
) -> ApiResult<Json<Account>> {
    Ok(Json(state.accounts.add_subcuenta(&scope, &id, &body.name).await?))
}

/// DELETE /api/accounts/{id}/subcuentas/{name}
async fn remove_subcuenta(
    State(state): State<AppState>,
    scope: AccessScope,
    Path((id, name)): Path<(String, String)>,
) -> ApiResult<Json<Account>> {
    Ok(Json(state.accounts.remove_subcuenta(&scope, &id, &name).await?))
}

/// POST /api/accounts/{id}/split
async fn configure_split(
    State(state): State<AppState>,
    scope: AccessScope,
    Path(id): Path<String>,
    Json(body): Json<SplitRequest>,
) -> ApiResult<Json<Vec<SplitShare>>> {
    Ok(Json(state.accounts.configure_split(&scope, &id, body.shares).await?))
}

/// DELETE /api/accounts/{id}/split
async fn clear_split(
    State(state): State<AppState>,
    scope: AccessScope,
    Path(id): Path<String>,
) -> ApiResult<Json<Account>> {
    Ok(Json(state.accounts.clear_split(&scope, &id).await?))
}

// =============================================================================
// Adjustments and Bill
// =============================================================================

/// PUT /api/accounts/{id}/discount
async fn apply_discount(
    State(state): State<AppState>,
    scope: AccessScope,
    Path(id): Path<String>,
    Json(body): Json<DiscountRequest>,
) -> ApiResult<Json<Account>> {
    Ok(Json(state.accounts.apply_discount(&scope, &id, body.discount).await?))
}

/// PUT /api/accounts/{id}/tip
async fn apply_tip(
    State(state): State<AppState>,
    scope: AccessScope,
    Path(id): Path<String>,
    Json(tip): Json<TipInput>,
) -> ApiResult<Json<Account>> {
    Ok(Json(state.accounts.apply_tip(&scope, &id, tip).await?))
}

/// GET /api/accounts/{id}/bill
async fn bill(
    State(state): State<AppState>,
    scope: AccessScope,
    Path(id): Path<String>,
    Query(query): Query<BillQuery>,
) -> ApiResult<Json<PreliminaryBill>> {
    Ok(Json(
        state
            .accounts
            .preliminary_bill(&scope, &id, query.partition())
            .await?,
    ))
}
