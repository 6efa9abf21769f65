//! captable - Fund Cap Table Ledger
//!
//! Tracks which owners hold the units of each fund and moves units between
//! owners with atomic, idempotent transfers.
//!
//! # Modules
//!
//! - [`validation`] - Name and unit limits, pagination
//! - [`error`] - `LedgerError` and `StoreError`
//! - [`fund`] - Fund entity and creation with an initial owner
//! - [`ownership`] - Cap table entries and cap table reads
//! - [`transfer`] - The transfer engine
//! - [`store`] - Ledger store traits, PostgreSQL and in-memory backends
//! - [`db`] - PostgreSQL pool and schema
//! - [`ledger`] - Services composed behind `LedgerApi`
//! - [`gateway`] - HTTP API (axum) and OpenAPI docs
//! - [`config`] / [`logging`] - Application configuration and tracing setup

pub mod config;
pub mod db;
pub mod error;
pub mod fund;
pub mod gateway;
pub mod ledger;
pub mod logging;
pub mod ownership;
pub mod store;
pub mod transfer;
pub mod validation;

// Convenient re-exports at crate root
pub use error::{LedgerError, StoreError};
pub use fund::{Fund, FundService};
pub use ledger::{Ledger, LedgerApi};
pub use ownership::{CapTableEntry, CapTableView, EntryState, OwnershipService};
pub use store::{LedgerStore, LedgerTx, MemoryLedgerStore, PgLedgerStore};
pub use transfer::{Transfer, TransferRequest, TransferService};
pub use validation::{ListParams, Page};
