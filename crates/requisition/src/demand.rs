//! Cross-outlet demand aggregation over open requisitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use larder_catalog::{Catalog, ItemId};
use larder_core::{Confidence, Unit, convert_quantity};

use crate::requisition::RequisitionQueue;

/// Aggregated demand for one inventory item, in the item's own unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDemand {
    pub item_id: ItemId,
    pub name: String,
    pub quantity: f64,
    pub unit: Unit,
    /// Approximate when any contributing line needed a unit fallback.
    pub confidence: Confidence,
}

/// A line that could not be grouped: no explicit inventory link. Carried
/// through ungrouped rather than dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnresolvedDemand {
    pub name: String,
    pub quantity: f64,
    pub unit: Unit,
}

/// Result of merging open requisition lines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DemandRollup {
    pub by_item: HashMap<ItemId, ItemDemand>,
    pub unresolved: Vec<UnresolvedDemand>,
}

/// Merge every requisition line due on or before `as_of`, grouping by the
/// line's explicit inventory link and summing quantities in the item's unit.
///
/// Lines without a confirmed link (or whose link points at a retired item)
/// land in `unresolved` untouched; silent drops in a demand figure would
/// under-order.
pub fn demand_by_item(
    queue: &RequisitionQueue,
    catalog: &Catalog,
    as_of: DateTime<Utc>,
) -> DemandRollup {
    let mut rollup = DemandRollup::default();

    for requisition in queue.open_due_by(as_of) {
        for line in &requisition.lines {
            let item = line.item_ref.and_then(|id| catalog.item(id));
            let Some(item) = item else {
                rollup.unresolved.push(UnresolvedDemand {
                    name: line.name.clone(),
                    quantity: line.quantity,
                    unit: line.unit.clone(),
                });
                continue;
            };

            let (quantity, confidence) = convert_quantity(line.quantity, &line.unit, &item.unit);
            let entry = rollup.by_item.entry(item.id).or_insert_with(|| ItemDemand {
                item_id: item.id,
                name: item.name.clone(),
                quantity: 0.0,
                unit: item.unit.clone(),
                confidence: Confidence::Exact,
            });
            entry.quantity += quantity;
            entry.confidence = entry.confidence.combine(confidence);
        }
    }

    if !rollup.unresolved.is_empty() {
        tracing::debug!(
            unresolved = rollup.unresolved.len(),
            "demand lines without a confirmed item link"
        );
    }
    rollup
}
