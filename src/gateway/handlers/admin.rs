//! Internal administration handlers
//!
//! SECURITY: compiled only with the `admin-api` feature. Production builds
//! must disable it.

use std::sync::Arc;

use axum::extract::State;

use super::super::state::AppState;
use super::super::types::{ApiError, ApiResult, ResetData, ok};

/// Delete every fund, cap table entry and transfer
///
/// POST /internal/reset
#[utoipa::path(
    post,
    path = "/internal/reset",
    responses(
        (status = 200, description = "All ledger data deleted", body = ResetData, content_type = "application/json"),
        (status = 503, description = "Store unavailable")
    ),
    tag = "Internal"
)]
pub async fn reset_ledger(State(state): State<Arc<AppState>>) -> ApiResult<ResetData> {
    match state.ledger.reset().await {
        Ok(counts) => ok(counts.into()),
        Err(e) => {
            tracing::error!(error = %e, "Ledger reset failed");
            ApiError::service_unavailable("reset failed").into_err()
        }
    }
}
