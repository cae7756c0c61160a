//! Catalog & recipe domain module.
//!
//! Holds inventory item definitions (unit, unit cost, par level, baseline
//! count, lots) and recipes (ingredient lines, yield). On-hand quantity is
//! never stored here; it is always derived from the transaction ledger.

pub mod ingest;
pub mod item;
pub mod recipe;

pub use ingest::CatalogEntry;
pub use item::{
    Baseline, Catalog, InventoryItem, ItemCategory, ItemId, Lot, LotId, MatchSuggestion,
};
pub use recipe::{IngredientLine, Recipe, RecipeBook, RecipeId};
