//! OpenAPI / Swagger UI Documentation
//!
//! - Swagger UI: `http://localhost:8080/docs`
//! - OpenAPI JSON: `http://localhost:8080/api-docs/openapi.json`

use utoipa::OpenApi;

use crate::gateway::handlers::HealthResponse;
use crate::gateway::types::{
    CapTableData, CapTableRowData, CreateFundRequest, CreateTransferRequest, FundData,
    FundListData, OwnershipData, ResetData, TransferData, TransferListData,
};

#[cfg(feature = "admin-api")]
#[derive(OpenApi)]
#[openapi(
    paths(crate::gateway::handlers::reset_ledger),
    components(schemas(ResetData)),
    tags((name = "Internal", description = "Development-only administration (admin-api feature)"))
)]
struct AdminApiDoc;

/// Main API Documentation struct
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Cap Table Ledger API",
        version = "1.0.0",
        description = "Fund cap tables with atomic, idempotent unit transfers.",
        license(
            name = "MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Development"),
    ),
    paths(
        crate::gateway::handlers::health_check,
        crate::gateway::handlers::create_fund,
        crate::gateway::handlers::list_funds,
        crate::gateway::handlers::get_fund,
        crate::gateway::handlers::get_cap_table,
        crate::gateway::handlers::get_ownership,
        crate::gateway::handlers::create_transfer,
        crate::gateway::handlers::list_transfers,
    ),
    components(
        schemas(
            HealthResponse,
            CreateFundRequest,
            FundData,
            FundListData,
            CapTableData,
            CapTableRowData,
            OwnershipData,
            CreateTransferRequest,
            TransferData,
            TransferListData,
        )
    ),
    tags(
        (name = "Funds", description = "Fund creation and lookup"),
        (name = "Cap Table", description = "Current ownership of a fund"),
        (name = "Transfers", description = "Unit transfers between owners"),
        (name = "System", description = "Health checks and system info")
    )
)]
pub struct ApiDoc;

impl ApiDoc {
    /// Full document, including admin endpoints when they are compiled in.
    pub fn document() -> utoipa::openapi::OpenApi {
        #[allow(unused_mut)]
        let mut doc = <ApiDoc as OpenApi>::openapi();
        #[cfg(feature = "admin-api")]
        doc.merge(AdminApiDoc::openapi());
        doc
    }
}
