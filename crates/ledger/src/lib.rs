//! Transaction ledger & derived-stock calculator.
//!
//! The append-only transaction log is the single source of truth for quantity
//! changes. Nothing here keeps a mutable on-hand counter: `StockView` derives
//! on-hand lazily from an item's baseline count plus signed ledger deltas, so
//! repeated reads can never drift.

pub mod derived;
pub mod store;
pub mod transaction;

pub use derived::StockView;
pub use store::{InMemoryTransactionLedger, LedgerError, TransactionStore};
pub use transaction::{RecordedTransaction, TransactionDraft, TransactionId, TransactionKind};
