//! API Response types and error codes
//!
//! - `ApiResponse<T>`: Unified response wrapper
//! - `ApiError`: Error half of every handler result, rendered as an `ApiResponse`
//! - `error_codes`: Numeric codes, one per ledger error kind

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::LedgerError;

// ============================================================================
// Unified API Response Format
// ============================================================================

/// Unified API response wrapper
///
/// All API responses follow this structure:
/// - code: 0 = success, non-zero = error code
/// - msg: short message description
/// - data: actual data (success) or null (error)
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response code: 0 for success, non-zero for errors
    #[schema(example = 0)]
    pub code: i32,
    /// Response message
    #[schema(example = "ok")]
    pub msg: String,
    /// Response data (only present when code == 0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Create success response
    pub fn success(data: T) -> Self {
        Self {
            code: error_codes::SUCCESS,
            msg: "ok".to_string(),
            data: Some(data),
        }
    }

    /// Create error response
    pub fn error(code: i32, msg: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            code,
            msg: msg.into(),
            data: None,
        }
    }
}

/// Handler result: status + envelope, or an [`ApiError`]
pub type ApiResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), ApiError>;

/// 200 OK with data
pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok((StatusCode::OK, Json(ApiResponse::success(data))))
}

/// 201 Created with data
pub fn created<T>(data: T) -> ApiResult<T> {
    Ok((StatusCode::CREATED, Json(ApiResponse::success(data))))
}

// ============================================================================
// ApiError
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: i32,
    pub msg: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: i32, msg: impl Into<String>) -> Self {
        Self {
            status,
            code,
            msg: msg.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error_codes::INVALID_PARAMETER, msg)
    }

    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            error_codes::SERVICE_UNAVAILABLE,
            msg,
        )
    }

    pub fn into_err<T>(self) -> ApiResult<T> {
        Err(self)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ApiResponse::<()>::error(self.code, self.msg)),
        )
            .into_response()
    }
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        let status =
            StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let code = error_codes::for_ledger_error(&e);

        // Store details stay in the log
        if let LedgerError::StoreUnavailable(inner) = &e {
            tracing::error!(error = %inner, "Ledger store failure");
            return Self::new(status, code, format!("{}: internal error", e.code()));
        }
        Self::new(status, code, format!("{}: {}", e.code(), e))
    }
}

// ============================================================================
// Error Codes
// ============================================================================

/// Standard API error codes
pub mod error_codes {
    use crate::error::LedgerError;

    // Success
    pub const SUCCESS: i32 = 0;

    // Client errors (1xxx)
    pub const INVALID_PARAMETER: i32 = 1000;
    pub const INVALID_FUND: i32 = 1001;
    pub const INVALID_OWNER: i32 = 1002;
    pub const INVALID_UNITS: i32 = 1003;
    pub const SELF_TRANSFER: i32 = 1004;
    pub const INSUFFICIENT_UNITS: i32 = 1005;

    // Resource errors (4xxx)
    pub const FUND_NOT_FOUND: i32 = 4001;
    pub const OWNER_NOT_FOUND: i32 = 4002;
    pub const DUPLICATE_FUND_NAME: i32 = 4091;
    pub const DUPLICATE_TRANSFER: i32 = 4092;

    // Server errors (5xxx)
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const SERVICE_UNAVAILABLE: i32 = 5001;

    pub fn for_ledger_error(e: &LedgerError) -> i32 {
        match e {
            LedgerError::InvalidFund => INVALID_FUND,
            LedgerError::InvalidOwner => INVALID_OWNER,
            LedgerError::InvalidUnits { .. } => INVALID_UNITS,
            LedgerError::SelfTransfer => SELF_TRANSFER,
            LedgerError::InsufficientUnits { .. } => INSUFFICIENT_UNITS,
            LedgerError::FundNotFound(_) => FUND_NOT_FOUND,
            LedgerError::OwnerNotFound { .. } => OWNER_NOT_FOUND,
            LedgerError::DuplicateFundName(_) => DUPLICATE_FUND_NAME,
            LedgerError::DuplicateIdempotencyKey => DUPLICATE_TRANSFER,
            LedgerError::StoreUnavailable(_) => INTERNAL_ERROR,
        }
    }
}
