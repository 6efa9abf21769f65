//! Transfer engine
//!
//! Moves units between two owners of the same fund inside one store
//! transaction:
//!
//! ```text
//! validate -> begin -> idempotency lookup
//!          -> lock source + existing target (FOR UPDATE, owner-name order)
//!          -> sufficiency check -> debit source -> credit-or-create target
//!          -> append transfer record -> commit
//! ```
//!
//! Crediting an existing target through the upsert takes that row's lock,
//! so a transfer may touch two locked rows. Both are locked up front in
//! ascending owner-name order; transfers running in opposite directions
//! then queue on the same first row instead of forming a wait cycle. A new
//! target has no row to lock: its insert only waits on another transaction
//! inserting the same owner, and that transaction already holds all of its
//! entry locks.

pub mod service;
pub mod types;
pub mod validation;

pub use service::TransferService;
pub use types::{Replay, Transfer, TransferRequest, ValidatedTransfer};
