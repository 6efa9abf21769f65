//! Cap table ownership
//!
//! One [`CapTableEntry`] per (fund, owner) among active rows. Balances are
//! only changed by the transfer engine after creation.

pub mod models;
pub mod service;

pub use models::{CapTableEntry, CapTableView, EntryState};
pub use service::OwnershipService;
