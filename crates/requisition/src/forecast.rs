use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use larder_catalog::{Catalog, ItemId};
use larder_core::{Confidence, DomainError, DomainResult};
use larder_ledger::{StockView, TransactionStore};

/// Trailing window for usage-rate estimation.
pub const DEFAULT_WINDOW_DAYS: u32 = 30;
/// Coverage horizon for reorder suggestions.
pub const DEFAULT_HORIZON_DAYS: u32 = 7;

/// A proposed reorder for one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReorderProposal {
    pub item_id: ItemId,
    pub name: String,
    pub suggested_quantity: f64,
    pub unit_cost_cents: i64,
    pub estimated_cost_cents: i64,
    /// Approximate when the target came from the usage forecast instead of a
    /// par level.
    pub confidence: Confidence,
}

/// An item sitting below its par level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LowStockItem {
    pub item_id: ItemId,
    pub name: String,
    pub on_hand: f64,
    pub par_level: f64,
}

/// Reorder forecasting over the ledger's consumption history.
///
/// Pure reads: usage rates and suggestions are recomputed from the log on
/// every call, so they follow the ledger with no cache to invalidate.
#[derive(Debug, Clone, Copy)]
pub struct ForecastEngine<'a, S: TransactionStore + ?Sized> {
    catalog: &'a Catalog,
    ledger: &'a S,
}

impl<'a, S: TransactionStore + ?Sized> ForecastEngine<'a, S> {
    pub fn new(catalog: &'a Catalog, ledger: &'a S) -> Self {
        Self { catalog, ledger }
    }

    fn stock_view(&self) -> StockView<'a, S> {
        StockView::new(self.catalog, self.ledger)
    }

    /// Average daily usage over the trailing window: consumption-class
    /// transactions (sale, consumption, transfer-out) divided by window
    /// length.
    pub fn daily_use(
        &self,
        item_id: ItemId,
        as_of: DateTime<Utc>,
        window_days: u32,
    ) -> DomainResult<f64> {
        if window_days == 0 {
            return Err(DomainError::validation("forecast window must be positive"));
        }
        if self.catalog.item(item_id).is_none() {
            return Err(DomainError::NotFound);
        }
        let from = as_of - Duration::days(window_days as i64);
        let used: f64 = self
            .ledger
            .for_item_in_range(item_id, from, as_of)?
            .iter()
            .filter(|t| t.kind.is_consumption_class())
            .map(|t| t.quantity)
            .sum();
        Ok(used / window_days as f64)
    }

    /// Reorder quantity to bring the item up to its target level over the
    /// horizon: `max(0, ceil(target − on-hand))`. Target is the par level
    /// when set, otherwise the forecast-derived `daily use × horizon`
    /// (tagged approximate).
    pub fn suggest_reorder(
        &self,
        item_id: ItemId,
        as_of: DateTime<Utc>,
        horizon_days: u32,
    ) -> DomainResult<ReorderProposal> {
        let item = self.catalog.item(item_id).ok_or(DomainError::NotFound)?;
        let on_hand = self.stock_view().on_hand(item_id, as_of)?;

        let (target, confidence) = match item.par_level {
            Some(par) => (par, Confidence::Exact),
            None => (
                self.daily_use(item_id, as_of, DEFAULT_WINDOW_DAYS)? * horizon_days as f64,
                Confidence::Approximate,
            ),
        };

        let suggested_quantity = (target - on_hand).ceil().max(0.0);
        Ok(ReorderProposal {
            item_id,
            name: item.name.clone(),
            suggested_quantity,
            unit_cost_cents: item.unit_cost_cents,
            estimated_cost_cents: (suggested_quantity * item.unit_cost_cents as f64).round() as i64,
            confidence,
        })
    }

    /// Items with a par level set and on-hand strictly below it. Items
    /// without a par level never appear, whatever their on-hand.
    pub fn low_stock(&self, as_of: DateTime<Utc>) -> DomainResult<Vec<LowStockItem>> {
        let view = self.stock_view();
        let mut low = Vec::new();
        for item in self.catalog.items() {
            let Some(par) = item.par_level else { continue };
            let on_hand = view.on_hand(item.id, as_of)?;
            if on_hand < par {
                low.push(LowStockItem {
                    item_id: item.id,
                    name: item.name.clone(),
                    on_hand,
                    par_level: par,
                });
            }
        }
        low.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(low)
    }

    /// Reorder proposals across the catalog, filtered to quantities > 0.
    pub fn auto_purchase_proposals(
        &self,
        as_of: DateTime<Utc>,
        horizon_days: u32,
    ) -> DomainResult<Vec<ReorderProposal>> {
        let mut proposals = Vec::new();
        for item in self.catalog.items() {
            let proposal = self.suggest_reorder(item.id, as_of, horizon_days)?;
            if proposal.suggested_quantity > 0.0 {
                proposals.push(proposal);
            }
        }
        proposals.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(proposals)
    }
}
