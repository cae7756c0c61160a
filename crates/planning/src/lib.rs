//! Event planning: consumption expansion and butchery cut planning.
//!
//! Planned banquet events flow in from the external BEO source; this crate
//! expands guest counts into raw-ingredient demand (BOM expansion with buffer
//! scaling), turns resolved demand into consumption drafts for the ledger,
//! and derives raw-cut requirements with trim-yield loss modeling.

pub mod butchery;
pub mod expansion;

pub use butchery::{
    CutBoard, CutId, CutRequirement, CutStatus, ProteinKind, YieldTable, classify_protein,
};
pub use expansion::{
    BanquetEvent, ExpandedConsumption, IngredientDemand, MenuSelection, batches_required,
    consumption_drafts, expand_event, expand_recipe,
};
