//! Command/query facade over the inventory domain.
//!
//! `StockroomService` is the handle an application layer holds: constructed
//! with injected registries and a transaction store, no ambient global state.
//! Commands validate foreign keys before touching the ledger; queries are
//! pure derivations and safe to call concurrently with writes.

pub mod service;

pub use service::{EventIngestion, StockroomService};
