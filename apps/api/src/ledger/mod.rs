//! Application ledger: records, CSV persistence and the HTTP handlers over them.

pub mod handlers;
pub mod models;
pub mod store;

pub use store::Ledger;
