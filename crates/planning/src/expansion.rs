use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use larder_catalog::{Catalog, ItemId, Recipe, RecipeBook, RecipeId};
use larder_core::{BeoRef, Confidence, DomainError, DomainResult, Unit, convert_quantity};
use larder_ledger::{TransactionDraft, TransactionKind};
use larder_topology::DepartmentId;

/// One menu line of a banquet event, as supplied by the BEO source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuSelection {
    pub recipe_id: RecipeId,
    /// Days of advance prep the BEO requests for this item.
    pub prep_days_advance: Option<u32>,
}

/// A planned event from the external BEO source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BanquetEvent {
    pub beo: BeoRef,
    pub event_date: DateTime<Utc>,
    pub outlet: DepartmentId,
    /// Guaranteed or expected covers.
    pub guest_count: u32,
    pub menu: Vec<MenuSelection>,
}

/// One line of expanded raw-ingredient demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientDemand {
    pub recipe_id: RecipeId,
    pub name: String,
    pub item_ref: Option<ItemId>,
    pub quantity: f64,
    pub unit: Unit,
    pub lead_days: u32,
}

/// Batches needed to cover a guest count with a safety buffer.
pub fn batches_required(
    guest_count: u32,
    buffer_percent: f64,
    yield_servings: u32,
) -> DomainResult<u32> {
    if !buffer_percent.is_finite() || buffer_percent < 0.0 {
        return Err(DomainError::validation("buffer percent must be non-negative"));
    }
    if yield_servings == 0 {
        return Err(DomainError::validation("recipe yield must be positive"));
    }
    let covers = guest_count as f64 * (1.0 + buffer_percent / 100.0);
    Ok((covers / yield_servings as f64).ceil() as u32)
}

/// BOM expansion of one recipe: guest count → per-ingredient quantities.
///
/// A zero-batch expansion (no guests) yields no demand lines.
pub fn expand_recipe(
    recipe: &Recipe,
    guest_count: u32,
    buffer_percent: f64,
) -> DomainResult<Vec<IngredientDemand>> {
    let batches = batches_required(guest_count, buffer_percent, recipe.yield_servings)?;
    if batches == 0 {
        return Ok(Vec::new());
    }
    Ok(recipe
        .ingredients
        .iter()
        .map(|line| IngredientDemand {
            recipe_id: recipe.id,
            name: line.name.clone(),
            item_ref: line.item_ref,
            quantity: line.quantity * batches as f64,
            unit: line.unit.clone(),
            lead_days: line.prep_lead_days,
        })
        .collect())
}

/// Expand every menu selection of an event.
///
/// A BEO-level `prep_days_advance` raises (never lowers) each line's lead
/// days. A selection referencing an unknown recipe aborts the expansion.
pub fn expand_event(
    book: &RecipeBook,
    event: &BanquetEvent,
    buffer_percent: f64,
) -> DomainResult<Vec<IngredientDemand>> {
    let mut demand = Vec::new();
    for selection in &event.menu {
        let recipe = book
            .recipe(selection.recipe_id)
            .ok_or(DomainError::NotFound)?;
        let mut lines = expand_recipe(recipe, event.guest_count, buffer_percent)?;
        if let Some(advance) = selection.prep_days_advance {
            for line in &mut lines {
                line.lead_days = line.lead_days.max(advance);
            }
        }
        demand.append(&mut lines);
    }
    Ok(demand)
}

/// Result of turning expanded demand into ledger drafts.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedConsumption {
    /// Consumption drafts for explicitly linked items, tagged with the BEO.
    pub drafts: Vec<TransactionDraft>,
    /// Lines with no confirmed inventory link; carried, never dropped.
    pub unresolved: Vec<IngredientDemand>,
}

/// Build consumption drafts from expanded demand.
///
/// Only lines carrying an explicit `item_ref` that resolves in the catalog
/// become transactions; free-text names are never auto-linked into the
/// ledger. Quantities are converted into the item's own unit.
pub fn consumption_drafts(
    event: &BanquetEvent,
    demand: &[IngredientDemand],
    catalog: &Catalog,
) -> ExpandedConsumption {
    let mut drafts = Vec::new();
    let mut unresolved = Vec::new();

    for line in demand {
        let item = line.item_ref.and_then(|id| catalog.item(id));
        let Some(item) = item else {
            if line.item_ref.is_some() {
                tracing::warn!(
                    ingredient = %line.name,
                    "ingredient links to a retired item; carrying as unresolved"
                );
            }
            unresolved.push(line.clone());
            continue;
        };

        let (quantity, confidence) = convert_quantity(line.quantity, &line.unit, &item.unit);
        if confidence == Confidence::Approximate {
            tracing::warn!(
                ingredient = %line.name,
                from = %line.unit,
                to = %item.unit,
                "unit conversion fell back to 1:1"
            );
        }

        drafts.push(
            TransactionDraft::new(
                item.id,
                TransactionKind::Consumption,
                quantity,
                event.event_date,
            )
            .with_beo(event.beo)
            .between_departments(None, Some(event.outlet)),
        );
    }

    ExpandedConsumption { drafts, unresolved }
}

#[cfg(test)]
mod tests {
    use super::*;
    use larder_catalog::{Baseline, IngredientLine, InventoryItem, ItemCategory};
    use larder_core::RecordId;
    use larder_topology::AreaId;

    fn line(name: &str, qty: f64, unit: &str, item_ref: Option<ItemId>) -> IngredientLine {
        IngredientLine {
            name: name.to_string(),
            item_ref,
            quantity: qty,
            unit: Unit::new(unit),
            prep_lead_days: 0,
            prep_note: None,
        }
    }

    fn test_event(menu: Vec<MenuSelection>, guests: u32) -> BanquetEvent {
        BanquetEvent {
            beo: BeoRef::new(),
            event_date: Utc::now(),
            outlet: DepartmentId::new(RecordId::new()),
            guest_count: guests,
            menu,
        }
    }

    #[test]
    fn buffer_and_yield_drive_batches() {
        // 150 guests + 4% buffer = 156 covers; yield 8 → 20 batches.
        assert_eq!(batches_required(150, 4.0, 8).unwrap(), 20);
        assert_eq!(batches_required(0, 4.0, 8).unwrap(), 0);
        assert_eq!(batches_required(8, 0.0, 8).unwrap(), 1);
    }

    #[test]
    fn expansion_scales_ingredients_by_batches() {
        let recipe = Recipe::new(
            "Chateaubriand",
            vec![line("Beef Tenderloin", 2.0, "lb", None)],
            8,
        )
        .unwrap();

        let demand = expand_recipe(&recipe, 150, 4.0).unwrap();
        assert_eq!(demand.len(), 1);
        assert_eq!(demand[0].quantity, 40.0);
        assert_eq!(demand[0].unit, Unit::new("lb"));
    }

    #[test]
    fn zero_guests_expand_to_nothing() {
        let recipe = Recipe::new("Amuse", vec![line("Caviar", 0.1, "oz", None)], 4).unwrap();
        assert!(expand_recipe(&recipe, 0, 10.0).unwrap().is_empty());
    }

    #[test]
    fn negative_buffer_is_rejected() {
        let recipe = Recipe::new("Soup", vec![line("Onion", 1.0, "lb", None)], 10).unwrap();
        assert!(matches!(
            expand_recipe(&recipe, 50, -5.0),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn unknown_recipe_aborts_event_expansion() {
        let book = RecipeBook::new();
        let event = test_event(
            vec![MenuSelection {
                recipe_id: RecipeId::new(RecordId::new()),
                prep_days_advance: None,
            }],
            100,
        );
        assert_eq!(
            expand_event(&book, &event, 0.0).unwrap_err(),
            DomainError::NotFound
        );
    }

    #[test]
    fn beo_advance_days_raise_line_lead() {
        let mut book = RecipeBook::new();
        let mut ingredient = line("Lamb Rack", 1.5, "lb", None);
        ingredient.prep_lead_days = 1;
        let recipe = Recipe::new("Rack of Lamb", vec![ingredient], 4).unwrap();
        let recipe_id = book.insert(recipe);

        let event = test_event(
            vec![MenuSelection {
                recipe_id,
                prep_days_advance: Some(3),
            }],
            40,
        );

        let demand = expand_event(&book, &event, 0.0).unwrap();
        assert_eq!(demand[0].lead_days, 3);
    }

    #[test]
    fn only_linked_lines_become_drafts() {
        let mut catalog = Catalog::new();
        let area = AreaId::new(RecordId::new());
        let item = InventoryItem::new(
            "Beef Tenderloin",
            ItemCategory::Protein,
            area,
            Unit::new("lb"),
            2200,
            None,
            Baseline {
                counted_quantity: 100.0,
                counted_at: Utc::now(),
            },
        )
        .unwrap();
        let item_id = catalog.insert(item).unwrap();

        let recipe = Recipe::new(
            "Surf and Turf",
            vec![
                line("Beef Tenderloin", 2.0, "lb", Some(item_id)),
                line("Mystery Garnish", 0.5, "lb", None),
            ],
            8,
        )
        .unwrap();

        let event = test_event(vec![], 150);
        let demand = expand_recipe(&recipe, event.guest_count, 4.0).unwrap();
        let expansion = consumption_drafts(&event, &demand, &catalog);

        assert_eq!(expansion.drafts.len(), 1);
        assert_eq!(expansion.drafts[0].item_id, item_id);
        assert_eq!(expansion.drafts[0].quantity, 40.0);
        assert_eq!(expansion.drafts[0].kind, TransactionKind::Consumption);
        assert_eq!(expansion.drafts[0].beo, Some(event.beo));

        assert_eq!(expansion.unresolved.len(), 1);
        assert_eq!(expansion.unresolved[0].name, "Mystery Garnish");
    }

    #[test]
    fn draft_quantity_is_converted_to_the_item_unit() {
        let mut catalog = Catalog::new();
        let area = AreaId::new(RecordId::new());
        let item = InventoryItem::new(
            "Sea Salt",
            ItemCategory::DryGoods,
            area,
            Unit::new("lb"),
            90,
            None,
            Baseline {
                counted_quantity: 10.0,
                counted_at: Utc::now(),
            },
        )
        .unwrap();
        let item_id = catalog.insert(item).unwrap();

        let recipe = Recipe::new(
            "Cure",
            vec![line("Sea Salt", 8.0, "oz", Some(item_id))],
            1,
        )
        .unwrap();

        let event = test_event(vec![], 2);
        let demand = expand_recipe(&recipe, event.guest_count, 0.0).unwrap();
        let expansion = consumption_drafts(&event, &demand, &catalog);

        // 2 batches × 8 oz = 16 oz = 1 lb.
        assert_eq!(expansion.drafts[0].quantity, 1.0);
    }
}
