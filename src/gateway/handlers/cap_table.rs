//! Cap table handlers

use std::sync::Arc;

use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use uuid::Uuid;

use super::super::state::AppState;
use super::super::types::{ApiResult, CapTableData, OwnershipData, ok};
use super::{path_param, query_params};
use crate::validation::ListParams;

/// Get a fund's cap table
///
/// GET /api/v1/funds/{fund_id}/cap-table
///
/// Active entries only, largest holders first, with each holder's percentage.
#[utoipa::path(
    get,
    path = "/api/v1/funds/{fund_id}/cap-table",
    params(
        ("fund_id" = Uuid, Path, description = "Fund ID"),
        ListParams
    ),
    responses(
        (status = 200, description = "Cap table page", body = CapTableData, content_type = "application/json"),
        (status = 404, description = "Fund not found")
    ),
    tag = "Cap Table"
)]
pub async fn get_cap_table(
    State(state): State<Arc<AppState>>,
    path: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<CapTableData> {
    let fund_id = path_param(path)?;
    let params = query_params(query)?;
    let view = state.ledger.get_cap_table(fund_id, params).await?;
    ok(view.into())
}

/// Get one owner's stake
///
/// GET /api/v1/funds/{fund_id}/cap-table/{owner}
#[utoipa::path(
    get,
    path = "/api/v1/funds/{fund_id}/cap-table/{owner}",
    params(
        ("fund_id" = Uuid, Path, description = "Fund ID"),
        ("owner" = String, Path, description = "Owner name (case-sensitive)")
    ),
    responses(
        (status = 200, description = "Owner's entry", body = OwnershipData, content_type = "application/json"),
        (status = 400, description = "Invalid owner name"),
        (status = 404, description = "Fund or owner not found")
    ),
    tag = "Cap Table"
)]
pub async fn get_ownership(
    State(state): State<Arc<AppState>>,
    path: Result<Path<(Uuid, String)>, PathRejection>,
) -> ApiResult<OwnershipData> {
    let (fund_id, owner) = path_param(path)?;
    let entry = state.ledger.get_ownership(fund_id, &owner).await?;
    ok(entry.into())
}
