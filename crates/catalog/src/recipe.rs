use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use larder_core::{DomainError, DomainResult, RecordId, Unit};

use crate::item::ItemId;

/// Recipe identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipeId(pub RecordId);

impl RecipeId {
    pub fn new(id: RecordId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for RecipeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// One ingredient line of a recipe.
///
/// `item_ref` is an explicit link to an inventory item, populated at
/// data-entry time. Lines without one stay unresolved until a human confirms
/// a match; free-text names are never silently linked into the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientLine {
    pub name: String,
    pub item_ref: Option<ItemId>,
    /// Quantity per batch, in `unit`.
    pub quantity: f64,
    pub unit: Unit,
    /// Days of prep needed before service (butchery lead time).
    pub prep_lead_days: u32,
    pub prep_note: Option<String>,
}

/// A recipe: ordered ingredient lines plus servings per batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: RecipeId,
    pub name: String,
    pub ingredients: Vec<IngredientLine>,
    /// Servings yielded per batch. Invariant: > 0.
    pub yield_servings: u32,
}

impl Recipe {
    pub fn new(
        name: impl Into<String>,
        ingredients: Vec<IngredientLine>,
        yield_servings: u32,
    ) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("recipe name cannot be empty"));
        }
        if yield_servings == 0 {
            return Err(DomainError::validation("recipe yield must be positive"));
        }
        if ingredients.is_empty() {
            return Err(DomainError::validation("recipe must have ingredient lines"));
        }
        for line in &ingredients {
            if line.name.trim().is_empty() {
                return Err(DomainError::validation("ingredient name cannot be empty"));
            }
            if !line.quantity.is_finite() || line.quantity <= 0.0 {
                return Err(DomainError::validation(format!(
                    "ingredient '{}' quantity must be positive",
                    line.name
                )));
            }
        }
        Ok(Self {
            id: RecipeId::new(RecordId::new()),
            name,
            ingredients,
            yield_servings,
        })
    }
}

/// Registry of recipes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeBook {
    recipes: HashMap<RecipeId, Recipe>,
}

impl RecipeBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, recipe: Recipe) -> RecipeId {
        let id = recipe.id;
        self.recipes.insert(id, recipe);
        id
    }

    pub fn recipe(&self, id: RecipeId) -> Option<&Recipe> {
        self.recipes.get(&id)
    }

    pub fn recipes(&self) -> impl Iterator<Item = &Recipe> {
        self.recipes.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(name: &str, qty: f64) -> IngredientLine {
        IngredientLine {
            name: name.to_string(),
            item_ref: None,
            quantity: qty,
            unit: Unit::new("lb"),
            prep_lead_days: 0,
            prep_note: None,
        }
    }

    #[test]
    fn zero_yield_is_rejected() {
        let err = Recipe::new("Consommé", vec![line("Beef Bone", 4.0)], 0).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn non_positive_ingredient_quantity_is_rejected() {
        let err = Recipe::new("Beurre Blanc", vec![line("Butter", 0.0)], 8).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn recipes_are_retrievable_by_id() {
        let mut book = RecipeBook::new();
        let recipe = Recipe::new("Duck Confit", vec![line("Duck Leg", 2.0)], 6).unwrap();
        let id = book.insert(recipe);

        assert_eq!(book.recipe(id).unwrap().name, "Duck Confit");
        assert_eq!(book.recipe(id).unwrap().yield_servings, 6);
    }
}
