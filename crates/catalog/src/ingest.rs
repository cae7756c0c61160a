//! Catalog ingestion from external document extraction.
//!
//! The menu/invoice ingestion collaborator supplies flat catalog entries
//! (name, unit, cost, GL code); this module indexes them into the catalog.
//! OCR/NLP extraction itself happens upstream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use larder_core::{DomainResult, Unit};
use larder_topology::AreaId;

use crate::item::{Baseline, Catalog, InventoryItem, ItemCategory, ItemId};

/// A catalog record supplied by the ingestion collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    pub unit: Unit,
    pub unit_cost_cents: i64,
    pub gl_code: Option<String>,
}

impl Catalog {
    /// Upsert an ingested entry, keyed by case-insensitive name.
    ///
    /// Existing items keep their baseline, par level and lots; only the unit
    /// and cost are refreshed. New items start with a zero baseline dated at
    /// `ingested_at` until a physical count lands.
    pub fn ingest_entry(
        &mut self,
        entry: CatalogEntry,
        area_id: AreaId,
        category: ItemCategory,
        ingested_at: DateTime<Utc>,
    ) -> DomainResult<ItemId> {
        if let Some(id) = self.resolve_exact(&entry.name) {
            self.update_definition(id, entry.unit, entry.unit_cost_cents)?;
            return Ok(id);
        }

        let item = InventoryItem::new(
            entry.name,
            category,
            area_id,
            entry.unit,
            entry.unit_cost_cents,
            None,
            Baseline {
                counted_quantity: 0.0,
                counted_at: ingested_at,
            },
        )?;
        self.insert(item)
    }
}
