//! HTTP handlers
//!
//! Extractor rejections are wrapped so malformed input still gets the
//! standard `{code, msg}` envelope instead of axum's plain-text body.

#[cfg(feature = "admin-api")]
pub mod admin;
pub mod cap_table;
pub mod fund;
pub mod health;
pub mod transfer;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query};

use super::types::ApiError;

#[cfg(feature = "admin-api")]
pub use admin::*;
pub use cap_table::*;
pub use fund::*;
pub use health::*;
pub use transfer::*;

pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(v)| v)
        .map_err(|e| ApiError::bad_request(e.body_text()))
}

pub(crate) fn path_param<T>(path: Result<Path<T>, PathRejection>) -> Result<T, ApiError> {
    path.map(|Path(v)| v)
        .map_err(|e| ApiError::bad_request(e.body_text()))
}

pub(crate) fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    query
        .map(|Query(v)| v)
        .map_err(|e| ApiError::bad_request(e.body_text()))
}
