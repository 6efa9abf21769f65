//! Fund handlers

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use uuid::Uuid;

use super::super::state::AppState;
use super::super::types::{ApiResult, CreateFundRequest, FundData, FundListData, created, ok};
use super::{json_body, path_param, query_params};
use crate::validation::ListParams;

/// Create a fund
///
/// POST /api/v1/funds
///
/// The initial owner receives every unit of the fund.
#[utoipa::path(
    post,
    path = "/api/v1/funds",
    request_body = CreateFundRequest,
    responses(
        (status = 201, description = "Fund created", body = FundData, content_type = "application/json"),
        (status = 400, description = "Invalid fund name, unit count or owner"),
        (status = 409, description = "Fund name already exists"),
        (status = 500, description = "Internal error")
    ),
    tag = "Funds"
)]
pub async fn create_fund(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateFundRequest>, JsonRejection>,
) -> ApiResult<FundData> {
    let req = json_body(payload)?;
    let fund = state
        .ledger
        .create_fund(&req.name, req.total_units, &req.initial_owner)
        .await?;
    created(fund.into())
}

/// List funds, newest first
///
/// GET /api/v1/funds
#[utoipa::path(
    get,
    path = "/api/v1/funds",
    params(ListParams),
    responses(
        (status = 200, description = "Page of funds", body = FundListData, content_type = "application/json"),
        (status = 500, description = "Internal error")
    ),
    tag = "Funds"
)]
pub async fn list_funds(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<FundListData> {
    let params = query_params(query)?;
    let page = state.ledger.list_funds(params).await?;
    ok(page.into())
}

/// Get a fund
///
/// GET /api/v1/funds/{fund_id}
#[utoipa::path(
    get,
    path = "/api/v1/funds/{fund_id}",
    params(
        ("fund_id" = Uuid, Path, description = "Fund ID")
    ),
    responses(
        (status = 200, description = "Fund", body = FundData, content_type = "application/json"),
        (status = 400, description = "Malformed fund ID"),
        (status = 404, description = "Fund not found")
    ),
    tag = "Funds"
)]
pub async fn get_fund(
    State(state): State<Arc<AppState>>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<FundData> {
    let fund_id = path_param(path)?;
    let fund = state.ledger.get_fund(fund_id).await?;
    ok(fund.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::handlers::test_support::{data, memory_state};
    use crate::gateway::types::error_codes;
    use axum::http::StatusCode;

    fn body(name: &str, units: i64, owner: &str) -> Result<Json<CreateFundRequest>, JsonRejection> {
        Ok(Json(CreateFundRequest {
            name: name.into(),
            total_units: units,
            initial_owner: owner.into(),
        }))
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let state = memory_state();

        let (status, fund) = data(create_fund(State(state.clone()), body("Alpha", 1000, "Alice")).await);
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(fund.total_units, 1000);

        let (status, fetched) = data(get_fund(State(state), Ok(Path(fund.id))).await);
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched.name, "Alpha");
    }

    #[tokio::test]
    async fn test_create_errors_map_to_status() {
        let state = memory_state();

        let err = create_fund(State(state.clone()), body("", 10, "Alice"))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, error_codes::INVALID_FUND);

        data(create_fund(State(state.clone()), body("Dup", 10, "Alice")).await);
        let err = create_fund(State(state), body("Dup", 10, "Alice"))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert_eq!(err.code, error_codes::DUPLICATE_FUND_NAME);
    }

    #[tokio::test]
    async fn test_get_unknown_fund_is_404() {
        let err = get_fund(State(memory_state()), Ok(Path(Uuid::new_v4())))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.code, error_codes::FUND_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_funds_clamps_limit() {
        let state = memory_state();
        data(create_fund(State(state.clone()), body("One", 1, "A")).await);

        let (_, page) = data(
            list_funds(State(state), Ok(Query(ListParams::new(5000, -1)))).await,
        );
        assert_eq!(page.limit, 1000);
        assert_eq!(page.offset, 0);
        assert_eq!(page.total, 1);
    }
}
