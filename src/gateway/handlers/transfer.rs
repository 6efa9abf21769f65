//! Transfer handlers

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use uuid::Uuid;

use super::super::state::AppState;
use super::super::types::{
    ApiResult, CreateTransferRequest, TransferData, TransferListData, created, ok,
};
use super::{json_body, path_param, query_params};
use crate::transfer::TransferRequest;
use crate::validation::ListParams;

/// Execute a transfer
///
/// POST /api/v1/funds/{fund_id}/transfers
///
/// Atomically debits `fromOwner` and credits `toOwner`, creating the target's
/// entry if needed. With an `idempotencyKey`, an identical replay returns the
/// original transfer; a different request under the same key is rejected.
#[utoipa::path(
    post,
    path = "/api/v1/funds/{fund_id}/transfers",
    params(
        ("fund_id" = Uuid, Path, description = "Fund ID")
    ),
    request_body = CreateTransferRequest,
    responses(
        (status = 201, description = "Transfer committed (or replayed)", body = TransferData, content_type = "application/json"),
        (status = 400, description = "Invalid owner or units, self-transfer, or insufficient units"),
        (status = 404, description = "Fund or source owner not found"),
        (status = 409, description = "Idempotency key reused with different data"),
        (status = 500, description = "Internal error")
    ),
    tag = "Transfers"
)]
pub async fn create_transfer(
    State(state): State<Arc<AppState>>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<CreateTransferRequest>, JsonRejection>,
) -> ApiResult<TransferData> {
    let fund_id = path_param(path)?;
    let req = json_body(payload)?;

    let request = TransferRequest {
        fund_id,
        from_owner: req.from_owner,
        to_owner: req.to_owner,
        units: req.units,
        idempotency_key: req.idempotency_key,
    };
    let transfer = state.ledger.execute_transfer(request).await?;
    created(transfer.into())
}

/// Transfer history, oldest first
///
/// GET /api/v1/funds/{fund_id}/transfers
#[utoipa::path(
    get,
    path = "/api/v1/funds/{fund_id}/transfers",
    params(
        ("fund_id" = Uuid, Path, description = "Fund ID"),
        ListParams
    ),
    responses(
        (status = 200, description = "Page of transfers", body = TransferListData, content_type = "application/json"),
        (status = 404, description = "Fund not found")
    ),
    tag = "Transfers"
)]
pub async fn list_transfers(
    State(state): State<Arc<AppState>>,
    path: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<TransferListData> {
    let fund_id = path_param(path)?;
    let params = query_params(query)?;
    let page = state.ledger.list_transfers(fund_id, params).await?;
    ok(page.into())
}
