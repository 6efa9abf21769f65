//! Fund module
//!
//! A fund is a named vehicle with a fixed number of units. It is created
//! together with one initial owner holding all of its units.

pub mod models;
pub mod service;

pub use models::Fund;
pub use service::FundService;
