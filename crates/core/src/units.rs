//! Units of measure and weight equivalence.
//!
//! Quantities move between recipes, the ledger and the butchery planner in
//! whatever unit they were authored in. Cross-unit math goes through a
//! pounds-equivalent weighing, with per-item overrides taking precedence over
//! the built-in table. Count units ("each") have no physically accurate weight;
//! they fall back to 1.0 lb apiece and the result is tagged approximate so
//! downstream consumers can filter low-confidence figures.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Unit of measure, stored canonically (trimmed, lowercase).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Unit(String);

impl Unit {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Unit {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// How trustworthy a derived figure is.
///
/// `Approximate` marks results that went through a documented fallback
/// (count-unit weighing, forecast-derived reorder targets). Consumers must be
/// able to distinguish these from exact figures.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Exact,
    Approximate,
}

impl Confidence {
    /// Combine two confidences: any approximate input taints the result.
    pub fn combine(self, other: Confidence) -> Confidence {
        if self == Confidence::Exact && other == Confidence::Exact {
            Confidence::Exact
        } else {
            Confidence::Approximate
        }
    }

    pub fn is_approximate(self) -> bool {
        self == Confidence::Approximate
    }
}

/// A quantity expressed in pounds, with the confidence of the conversion.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weighing {
    pub pounds: f64,
    pub confidence: Confidence,
}

/// Pounds per unit for the built-in weight units. `None` for count/unknown.
fn pounds_factor(unit: &Unit) -> Option<f64> {
    match unit.as_str() {
        "lb" | "lbs" | "pound" | "pounds" => Some(1.0),
        "oz" | "ounce" | "ounces" => Some(1.0 / 16.0),
        "kg" | "kilogram" | "kilograms" => Some(2.20462),
        "g" | "gram" | "grams" => Some(0.002_204_62),
        _ => None,
    }
}

/// Convert a quantity to its pounds equivalent.
///
/// Count units ("each"/"ea") and unrecognized units fall back to 1.0 lb per
/// unit and are tagged `Approximate` rather than failing the computation.
pub fn pounds_equivalent(quantity: f64, unit: &Unit) -> Weighing {
    match pounds_factor(unit) {
        Some(factor) => Weighing {
            pounds: quantity * factor,
            confidence: Confidence::Exact,
        },
        None => Weighing {
            pounds: quantity,
            confidence: Confidence::Approximate,
        },
    }
}

/// Convert a quantity between units via the pounds table.
///
/// Identical units convert exactly; two weight units convert through their
/// pounds factors; anything involving a count/unknown unit passes through 1:1
/// and is tagged `Approximate`.
pub fn convert_quantity(quantity: f64, from: &Unit, to: &Unit) -> (f64, Confidence) {
    if from == to {
        return (quantity, Confidence::Exact);
    }
    match (pounds_factor(from), pounds_factor(to)) {
        (Some(a), Some(b)) => (quantity * a / b, Confidence::Exact),
        _ => (quantity, Confidence::Approximate),
    }
}

/// Per-item unit conversion overrides.
///
/// Callers register pounds-per-unit factors for (item, unit) pairs where the
/// built-in table is wrong or absent, e.g. `("whole chicken", "each", 3.5)`.
/// An override restores `Exact` confidence for that pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversionOverrides {
    factors: HashMap<(String, String), f64>,
}

impl ConversionOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register pounds-per-unit for an item + unit pair. Keys are
    /// case-insensitive.
    pub fn set(&mut self, item_name: impl AsRef<str>, unit: &Unit, pounds_per_unit: f64) {
        self.factors.insert(
            (item_name.as_ref().trim().to_lowercase(), unit.as_str().to_string()),
            pounds_per_unit,
        );
    }

    pub fn lookup(&self, item_name: &str, unit: &Unit) -> Option<f64> {
        self.factors
            .get(&(item_name.trim().to_lowercase(), unit.as_str().to_string()))
            .copied()
    }

    /// Weigh a quantity for a named item: override first, table second.
    pub fn weigh(&self, item_name: &str, quantity: f64, unit: &Unit) -> Weighing {
        match self.lookup(item_name, unit) {
            Some(factor) => Weighing {
                pounds: quantity * factor,
                confidence: Confidence::Exact,
            },
            None => pounds_equivalent(quantity, unit),
        }
    }
}
