//! `larder-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! typed identifiers, the domain error taxonomy, and units of measure with the
//! weight-equivalence table shared by the ledger and planning crates.

pub mod error;
pub mod id;
pub mod units;

pub use error::{DomainError, DomainResult};
pub use id::{BeoRef, RecordId};
pub use units::{Confidence, ConversionOverrides, Unit, Weighing, convert_quantity, pounds_equivalent};
