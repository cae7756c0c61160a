use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use larder_core::{DomainError, DomainResult, RecordId, Unit};
use larder_topology::AreaId;

/// Inventory item identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub RecordId);

impl ItemId {
    pub fn new(id: RecordId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ItemId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Lot identifier (FEFO tracking).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LotId(pub RecordId);

impl LotId {
    pub fn new(id: RecordId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for LotId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Item classification used for rollups and butchery defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ItemCategory {
    Protein,
    Seafood,
    Produce,
    Dairy,
    DryGoods,
    Beverage,
    Disposable,
    Other,
}

/// A dated lot for expiry-sensitive items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lot {
    pub id: LotId,
    pub quantity: f64,
    pub expires_at: DateTime<Utc>,
}

/// The last physical count: ground truth that ledger deltas build on.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub counted_quantity: f64,
    pub counted_at: DateTime<Utc>,
}

/// An inventory item definition.
///
/// Invariant: references exactly one live storage area, and never stores an
/// on-hand counter; on-hand is derived from the baseline plus ledger deltas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: ItemId,
    pub name: String,
    pub category: ItemCategory,
    pub area_id: AreaId,
    pub unit: Unit,
    /// Cost per unit in smallest currency unit (cents).
    pub unit_cost_cents: i64,
    /// Desired on-hand level; reorder trigger when set.
    pub par_level: Option<f64>,
    pub baseline: Baseline,
    pub lots: Vec<Lot>,
}

impl InventoryItem {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        category: ItemCategory,
        area_id: AreaId,
        unit: Unit,
        unit_cost_cents: i64,
        par_level: Option<f64>,
        baseline: Baseline,
    ) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("item name cannot be empty"));
        }
        if unit_cost_cents < 0 {
            return Err(DomainError::validation("unit cost cannot be negative"));
        }
        if let Some(par) = par_level {
            if !par.is_finite() || par < 0.0 {
                return Err(DomainError::validation("par level must be a non-negative number"));
            }
        }
        if !baseline.counted_quantity.is_finite() || baseline.counted_quantity < 0.0 {
            return Err(DomainError::validation(
                "baseline count must be a non-negative number",
            ));
        }
        Ok(Self {
            id: ItemId::new(RecordId::new()),
            name,
            category,
            area_id,
            unit,
            unit_cost_cents,
            par_level,
            baseline,
            lots: Vec::new(),
        })
    }

    /// First-Expired-First-Out: the lot to draw from next.
    pub fn next_expiring(&self) -> Option<&Lot> {
        self.lots
            .iter()
            .filter(|l| l.quantity > 0.0)
            .min_by_key(|l| l.expires_at)
    }
}

/// A scored best-effort name match. Suggestions are surfaced for human
/// confirmation; nothing is ever auto-linked off one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSuggestion {
    pub item_id: ItemId,
    pub name: String,
    pub score: f64,
}

/// Registry of inventory item definitions, indexed by id and by
/// case-insensitive name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    items: HashMap<ItemId, InventoryItem>,
    name_index: HashMap<String, ItemId>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, item: InventoryItem) -> DomainResult<ItemId> {
        let key = item.name.trim().to_lowercase();
        if self.name_index.contains_key(&key) {
            return Err(DomainError::conflict(format!(
                "item named '{}' already exists",
                item.name
            )));
        }
        let id = item.id;
        self.name_index.insert(key, id);
        self.items.insert(id, item);
        Ok(id)
    }

    pub fn item(&self, id: ItemId) -> Option<&InventoryItem> {
        self.items.get(&id)
    }

    pub fn items(&self) -> impl Iterator<Item = &InventoryItem> {
        self.items.values()
    }

    pub fn by_area(&self, area_id: AreaId) -> impl Iterator<Item = &InventoryItem> {
        self.items.values().filter(move |i| i.area_id == area_id)
    }

    pub fn by_category(&self, category: ItemCategory) -> impl Iterator<Item = &InventoryItem> {
        self.items.values().filter(move |i| i.category == category)
    }

    /// Exact case-insensitive name lookup.
    pub fn resolve_exact(&self, name: &str) -> Option<ItemId> {
        self.name_index.get(&name.trim().to_lowercase()).copied()
    }

    /// Replace the baseline with a fresh physical count. The new count is the
    /// new ground truth; older transactions no longer contribute to on-hand.
    pub fn record_count(
        &mut self,
        id: ItemId,
        counted_quantity: f64,
        counted_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        if !counted_quantity.is_finite() || counted_quantity < 0.0 {
            return Err(DomainError::validation(
                "physical count must be a non-negative number",
            ));
        }
        let item = self.items.get_mut(&id).ok_or(DomainError::NotFound)?;
        item.baseline = Baseline {
            counted_quantity,
            counted_at,
        };
        Ok(())
    }

    pub fn set_par_level(&mut self, id: ItemId, par_level: Option<f64>) -> DomainResult<()> {
        if let Some(par) = par_level {
            if !par.is_finite() || par < 0.0 {
                return Err(DomainError::validation("par level must be a non-negative number"));
            }
        }
        let item = self.items.get_mut(&id).ok_or(DomainError::NotFound)?;
        item.par_level = par_level;
        Ok(())
    }

    /// Refresh the purchasable definition (unit + cost) without touching the
    /// baseline, par level or lots.
    pub fn update_definition(
        &mut self,
        id: ItemId,
        unit: Unit,
        unit_cost_cents: i64,
    ) -> DomainResult<()> {
        if unit_cost_cents < 0 {
            return Err(DomainError::validation("unit cost cannot be negative"));
        }
        let item = self.items.get_mut(&id).ok_or(DomainError::NotFound)?;
        item.unit = unit;
        item.unit_cost_cents = unit_cost_cents;
        Ok(())
    }

    pub fn add_lot(&mut self, id: ItemId, lot: Lot) -> DomainResult<()> {
        if !lot.quantity.is_finite() || lot.quantity <= 0.0 {
            return Err(DomainError::validation("lot quantity must be positive"));
        }
        let item = self.items.get_mut(&id).ok_or(DomainError::NotFound)?;
        item.lots.push(lot);
        Ok(())
    }

    /// Scored fuzzy matches for a free-text name (word overlap + substring
    /// bonus), best first. Empty when nothing plausibly matches.
    pub fn suggest_matches(&self, name: &str) -> Vec<MatchSuggestion> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        let needle_words: Vec<&str> = needle.split_whitespace().collect();

        let mut suggestions: Vec<MatchSuggestion> = self
            .items
            .values()
            .filter_map(|item| {
                let candidate = item.name.trim().to_lowercase();
                let candidate_words: Vec<&str> = candidate.split_whitespace().collect();
                let overlap = needle_words
                    .iter()
                    .filter(|w| candidate_words.contains(*w))
                    .count();
                let union = needle_words.len() + candidate_words.len() - overlap;
                let mut score = if union == 0 {
                    0.0
                } else {
                    overlap as f64 / union as f64
                };
                if candidate.contains(&needle) || needle.contains(&candidate) {
                    score += 0.5;
                }
                if score > 0.0 {
                    Some(MatchSuggestion {
                        item_id: item.id,
                        name: item.name.clone(),
                        score,
                    })
                } else {
                    None
                }
            })
            .collect();

        suggestions.sort_by(|a, b| b.score.total_cmp(&a.score));
        suggestions
    }

    /// Retire every item stored in an area (cascade path of area removal).
    /// Returns the retired ids; ledger history referencing them is untouched.
    pub fn retire_area_items(&mut self, area_id: AreaId) -> Vec<ItemId> {
        let retired: Vec<ItemId> = self
            .items
            .values()
            .filter(|i| i.area_id == area_id)
            .map(|i| i.id)
            .collect();
        for id in &retired {
            if let Some(item) = self.items.remove(id) {
                self.name_index.remove(&item.name.trim().to_lowercase());
            }
        }
        retired
    }
}
