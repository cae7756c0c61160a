use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use larder_catalog::{
    Catalog, InventoryItem, ItemCategory, ItemId, MatchSuggestion, Recipe, RecipeBook, RecipeId,
};
use larder_core::{BeoRef, ConversionOverrides, DomainError, DomainResult};
use larder_ledger::{StockView, TransactionDraft, TransactionId, TransactionStore};
use larder_planning::{
    BanquetEvent, CutBoard, CutId, CutRequirement, CutStatus, IngredientDemand, YieldTable,
    consumption_drafts, expand_event,
};
use larder_requisition::{
    DemandRollup, ForecastEngine, LowStockItem, OrderId, PurchaseOrder, ReorderProposal,
    Requisition, RequisitionId, RequisitionQueue, RequisitionStatus, demand_by_item,
};
use larder_topology::{AreaId, AreaKind, DepartmentId, DepartmentKind, StorageTopology};

fn poisoned() -> DomainError {
    DomainError::inconsistent("service lock poisoned")
}

/// Report returned by `ingest_event`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventIngestion {
    pub beo: BeoRef,
    /// Expanded demand, linked lines included.
    pub demand: Vec<IngredientDemand>,
    /// Lines with no confirmed inventory link; surfaced for a human.
    pub unresolved: Vec<IngredientDemand>,
    /// Consumption transactions recorded for this generation.
    pub transactions: Vec<TransactionId>,
    /// Cut requirements planned for this generation.
    pub cuts: Vec<CutId>,
}

/// Holds a BEO ref in the in-flight regeneration set for the duration of an
/// `ingest_event` call. A second writer hitting the same ref gets `Conflict`
/// and must retry; releases on drop, error paths included.
#[derive(Debug)]
struct RegenerationGuard<'a> {
    in_flight: &'a Mutex<HashSet<BeoRef>>,
    beo: BeoRef,
}

impl<'a> RegenerationGuard<'a> {
    fn acquire(in_flight: &'a Mutex<HashSet<BeoRef>>, beo: BeoRef) -> DomainResult<Self> {
        let mut set = in_flight.lock().map_err(|_| poisoned())?;
        if !set.insert(beo) {
            return Err(DomainError::conflict(format!(
                "regeneration already in progress for event {beo}"
            )));
        }
        Ok(Self { in_flight, beo })
    }
}

impl Drop for RegenerationGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut set) = self.in_flight.lock() {
            set.remove(&self.beo);
        }
    }
}

/// The application-facing service handle.
///
/// All registries are injected at construction; the transaction store is the
/// seam for a durable backend. Interior locks keep commands serialized per
/// registry while queries read consistent snapshots.
pub struct StockroomService<S: TransactionStore> {
    topology: RwLock<StorageTopology>,
    catalog: RwLock<Catalog>,
    recipes: RwLock<RecipeBook>,
    ledger: S,
    cuts: RwLock<CutBoard>,
    requisitions: RwLock<RequisitionQueue>,
    orders: RwLock<HashMap<OrderId, PurchaseOrder>>,
    yields: YieldTable,
    conversions: ConversionOverrides,
    regenerations: Mutex<HashSet<BeoRef>>,
}

impl<S: TransactionStore> StockroomService<S> {
    pub fn new(
        topology: StorageTopology,
        catalog: Catalog,
        recipes: RecipeBook,
        ledger: S,
    ) -> Self {
        Self {
            topology: RwLock::new(topology),
            catalog: RwLock::new(catalog),
            recipes: RwLock::new(recipes),
            ledger,
            cuts: RwLock::new(CutBoard::new()),
            requisitions: RwLock::new(RequisitionQueue::new()),
            orders: RwLock::new(HashMap::new()),
            yields: YieldTable::new(),
            conversions: ConversionOverrides::new(),
            regenerations: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_yields(mut self, yields: YieldTable) -> Self {
        self.yields = yields;
        self
    }

    pub fn with_conversions(mut self, conversions: ConversionOverrides) -> Self {
        self.conversions = conversions;
        self
    }

    // ---- registration commands ----

    pub fn add_storage_area(&self, name: &str, kind: AreaKind) -> DomainResult<AreaId> {
        self.topology.write().map_err(|_| poisoned())?.add_area(name, kind)
    }

    pub fn add_department(&self, name: &str, kind: DepartmentKind) -> DomainResult<DepartmentId> {
        self.topology
            .write()
            .map_err(|_| poisoned())?
            .add_department(name, kind)
    }

    /// Register an item; its storage area must exist.
    pub fn register_item(&self, item: InventoryItem) -> DomainResult<ItemId> {
        let topology = self.topology.read().map_err(|_| poisoned())?;
        if !topology.contains_area(item.area_id) {
            return Err(DomainError::NotFound);
        }
        drop(topology);
        self.catalog.write().map_err(|_| poisoned())?.insert(item)
    }

    /// Register a recipe; any explicitly linked ingredient items must exist.
    pub fn add_recipe(&self, recipe: Recipe) -> DomainResult<RecipeId> {
        let catalog = self.catalog.read().map_err(|_| poisoned())?;
        for line in &recipe.ingredients {
            if let Some(item_ref) = line.item_ref {
                if catalog.item(item_ref).is_none() {
                    return Err(DomainError::NotFound);
                }
            }
        }
        drop(catalog);
        Ok(self.recipes.write().map_err(|_| poisoned())?.insert(recipe))
    }

    pub fn submit_requisition(&self, requisition: Requisition) -> DomainResult<RequisitionId> {
        let topology = self.topology.read().map_err(|_| poisoned())?;
        if !topology.contains_department(requisition.outlet) {
            return Err(DomainError::NotFound);
        }
        drop(topology);
        Ok(self
            .requisitions
            .write()
            .map_err(|_| poisoned())?
            .submit(requisition))
    }

    /// Remove a storage area. Refuses with `Conflict` while items still live
    /// there unless `cascade` is set, in which case those items are retired
    /// and their ids returned. Ledger history referencing them is untouched.
    pub fn remove_storage_area(&self, id: AreaId, cascade: bool) -> DomainResult<Vec<ItemId>> {
        // Lock order (topology, then catalog) matches every other command.
        let mut topology = self.topology.write().map_err(|_| poisoned())?;
        let mut catalog = self.catalog.write().map_err(|_| poisoned())?;

        if !topology.contains_area(id) {
            return Err(DomainError::NotFound);
        }
        let occupied = catalog.by_area(id).next().is_some();
        if occupied && !cascade {
            return Err(DomainError::conflict(
                "storage area still holds items; pass cascade to retire them",
            ));
        }

        let retired = catalog.retire_area_items(id);
        topology.remove_area(id)?;
        if !retired.is_empty() {
            tracing::warn!(area = %id, retired = retired.len(), "cascade-retired items with area");
        }
        Ok(retired)
    }

    // ---- ledger commands ----

    /// Validate and append one transaction. Referenced item, areas and
    /// departments must exist; a failing draft is never partially written.
    pub fn record_tx(&self, draft: TransactionDraft) -> DomainResult<TransactionId> {
        draft.validate()?;

        let catalog = self.catalog.read().map_err(|_| poisoned())?;
        if catalog.item(draft.item_id).is_none() {
            return Err(DomainError::NotFound);
        }
        drop(catalog);

        let topology = self.topology.read().map_err(|_| poisoned())?;
        for area in [draft.source_area, draft.dest_area].into_iter().flatten() {
            if !topology.contains_area(area) {
                return Err(DomainError::NotFound);
            }
        }
        for department in [draft.source_department, draft.dest_department]
            .into_iter()
            .flatten()
        {
            if !topology.contains_department(department) {
                return Err(DomainError::NotFound);
            }
        }
        drop(topology);

        let recorded = self.ledger.append(vec![draft])?;
        Ok(recorded[0].id)
    }

    /// Record a fresh physical count as the item's new baseline.
    pub fn record_count(
        &self,
        item_id: ItemId,
        counted_quantity: f64,
        counted_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        self.catalog
            .write()
            .map_err(|_| poisoned())?
            .record_count(item_id, counted_quantity, counted_at)
    }

    // ---- event ingestion ----

    /// Expand a banquet event into consumption transactions and cut
    /// requirements, superseding any prior generation for the same BEO ref.
    ///
    /// The whole regeneration is guarded per BEO: a concurrent call for the
    /// same event gets `Conflict` and must retry. Re-running with identical
    /// input replaces rather than duplicates.
    pub fn ingest_event(
        &self,
        event: &BanquetEvent,
        buffer_percent: f64,
    ) -> DomainResult<EventIngestion> {
        let topology = self.topology.read().map_err(|_| poisoned())?;
        if !topology.contains_department(event.outlet) {
            return Err(DomainError::NotFound);
        }
        drop(topology);

        let _guard = RegenerationGuard::acquire(&self.regenerations, event.beo)?;

        let recipes = self.recipes.read().map_err(|_| poisoned())?;
        let demand = expand_event(&recipes, event, buffer_percent)?;
        drop(recipes);

        let catalog = self.catalog.read().map_err(|_| poisoned())?;
        let expansion = consumption_drafts(event, &demand, &catalog);
        drop(catalog);

        let recorded = self.ledger.supersede_event(event.beo, expansion.drafts)?;

        let mut cuts = self.cuts.write().map_err(|_| poisoned())?;
        let planned = cuts.plan_cuts(event, &demand, &self.yields, &self.conversions);
        drop(cuts);

        tracing::info!(
            beo = %event.beo,
            guests = event.guest_count,
            lines = demand.len(),
            unresolved = expansion.unresolved.len(),
            cuts = planned.len(),
            "event ingested"
        );

        Ok(EventIngestion {
            beo: event.beo,
            demand,
            unresolved: expansion.unresolved,
            transactions: recorded.into_iter().map(|t| t.id).collect(),
            cuts: planned,
        })
    }

    // ---- status commands ----

    pub fn update_requisition_status(
        &self,
        id: RequisitionId,
        next: RequisitionStatus,
    ) -> DomainResult<()> {
        self.requisitions
            .write()
            .map_err(|_| poisoned())?
            .update_status(id, next)
    }

    pub fn update_cut_status(&self, id: CutId, next: CutStatus) -> DomainResult<()> {
        self.cuts.write().map_err(|_| poisoned())?.update_status(id, next)
    }

    // ---- purchase orders ----

    /// Materialize current reorder proposals into a draft purchase order.
    pub fn create_purchase_order(
        &self,
        as_of: DateTime<Utc>,
        horizon_days: u32,
    ) -> DomainResult<PurchaseOrder> {
        let proposals = self.auto_purchase_proposals(as_of, horizon_days)?;
        let order = PurchaseOrder::from_proposals(&proposals, as_of)?;
        self.orders
            .write()
            .map_err(|_| poisoned())?
            .insert(order.id, order.clone());
        Ok(order)
    }

    pub fn approve_purchase_order(&self, id: OrderId) -> DomainResult<()> {
        let mut orders = self.orders.write().map_err(|_| poisoned())?;
        orders.get_mut(&id).ok_or(DomainError::NotFound)?.approve()
    }

    /// Receive an approved order: the resulting purchase transactions are
    /// appended to the ledger in one batch.
    pub fn receive_purchase_order(
        &self,
        id: OrderId,
        received_at: DateTime<Utc>,
    ) -> DomainResult<Vec<TransactionId>> {
        let mut orders = self.orders.write().map_err(|_| poisoned())?;
        let order = orders.get_mut(&id).ok_or(DomainError::NotFound)?;
        let drafts = order.receive(received_at)?;
        drop(orders);

        let recorded = self.ledger.append(drafts)?;
        Ok(recorded.into_iter().map(|t| t.id).collect())
    }

    pub fn purchase_order(&self, id: OrderId) -> DomainResult<Option<PurchaseOrder>> {
        Ok(self.orders.read().map_err(|_| poisoned())?.get(&id).cloned())
    }

    // ---- queries ----

    pub fn on_hand(&self, item_id: ItemId, as_of: DateTime<Utc>) -> DomainResult<f64> {
        let catalog = self.catalog.read().map_err(|_| poisoned())?;
        StockView::new(&catalog, &self.ledger).on_hand(item_id, as_of)
    }

    /// Strict derivation for validation runs: inconsistent stock is an error.
    pub fn on_hand_strict(&self, item_id: ItemId, as_of: DateTime<Utc>) -> DomainResult<f64> {
        let catalog = self.catalog.read().map_err(|_| poisoned())?;
        StockView::new(&catalog, &self.ledger).on_hand_strict(item_id, as_of)
    }

    pub fn valuation_cents(&self, item_id: ItemId, as_of: DateTime<Utc>) -> DomainResult<i64> {
        let catalog = self.catalog.read().map_err(|_| poisoned())?;
        StockView::new(&catalog, &self.ledger).valuation_cents(item_id, as_of)
    }

    pub fn valuation_by_category(
        &self,
        category: ItemCategory,
        as_of: DateTime<Utc>,
    ) -> DomainResult<i64> {
        let catalog = self.catalog.read().map_err(|_| poisoned())?;
        StockView::new(&catalog, &self.ledger).valuation_by_category(category, as_of)
    }

    pub fn valuation_by_area(&self, area_id: AreaId, as_of: DateTime<Utc>) -> DomainResult<i64> {
        let catalog = self.catalog.read().map_err(|_| poisoned())?;
        StockView::new(&catalog, &self.ledger).valuation_by_area(area_id, as_of)
    }

    pub fn daily_use(
        &self,
        item_id: ItemId,
        as_of: DateTime<Utc>,
        window_days: u32,
    ) -> DomainResult<f64> {
        let catalog = self.catalog.read().map_err(|_| poisoned())?;
        ForecastEngine::new(&catalog, &self.ledger).daily_use(item_id, as_of, window_days)
    }

    pub fn low_stock_items(&self, as_of: DateTime<Utc>) -> DomainResult<Vec<LowStockItem>> {
        let catalog = self.catalog.read().map_err(|_| poisoned())?;
        ForecastEngine::new(&catalog, &self.ledger).low_stock(as_of)
    }

    pub fn auto_purchase_proposals(
        &self,
        as_of: DateTime<Utc>,
        horizon_days: u32,
    ) -> DomainResult<Vec<ReorderProposal>> {
        let catalog = self.catalog.read().map_err(|_| poisoned())?;
        ForecastEngine::new(&catalog, &self.ledger).auto_purchase_proposals(as_of, horizon_days)
    }

    /// The butchery worklist for a date (due on/before, not yet transferred).
    pub fn upcoming_cuts_for_date(&self, date: DateTime<Utc>) -> DomainResult<Vec<CutRequirement>> {
        let cuts = self.cuts.read().map_err(|_| poisoned())?;
        Ok(cuts.upcoming_for_date(date).into_iter().cloned().collect())
    }

    pub fn cuts_by_outlet(&self, outlet: DepartmentId) -> DomainResult<Vec<CutRequirement>> {
        let cuts = self.cuts.read().map_err(|_| poisoned())?;
        Ok(cuts.by_outlet(outlet).into_iter().cloned().collect())
    }

    pub fn cuts_for_event(&self, beo: BeoRef) -> DomainResult<Vec<CutRequirement>> {
        let cuts = self.cuts.read().map_err(|_| poisoned())?;
        Ok(cuts.active_for_event(beo).into_iter().cloned().collect())
    }

    pub fn requisitions_by_outlet(&self, outlet: DepartmentId) -> DomainResult<Vec<Requisition>> {
        let requisitions = self.requisitions.read().map_err(|_| poisoned())?;
        Ok(requisitions.by_outlet(outlet).into_iter().cloned().collect())
    }

    /// Aggregate open requisition demand due on or before `as_of`.
    pub fn demand_by_item(&self, as_of: DateTime<Utc>) -> DomainResult<DemandRollup> {
        let requisitions = self.requisitions.read().map_err(|_| poisoned())?;
        let catalog = self.catalog.read().map_err(|_| poisoned())?;
        Ok(demand_by_item(&requisitions, &catalog, as_of))
    }

    /// Scored name-match candidates for a human to confirm.
    pub fn suggest_matches(&self, name: &str) -> DomainResult<Vec<MatchSuggestion>> {
        let catalog = self.catalog.read().map_err(|_| poisoned())?;
        Ok(catalog.suggest_matches(name))
    }
}
