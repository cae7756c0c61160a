//! Requisitions, demand aggregation and reorder forecasting.
//!
//! Outlets request goods via requisitions; open requests aggregate into
//! per-item demand. The forecast engine reads trailing consumption out of the
//! ledger to propose reorder quantities against par levels, and proposals
//! materialize into purchase orders.

pub mod demand;
pub mod forecast;
pub mod purchase_order;
pub mod requisition;

pub use demand::{DemandRollup, ItemDemand, UnresolvedDemand, demand_by_item};
pub use forecast::{
    DEFAULT_HORIZON_DAYS, DEFAULT_WINDOW_DAYS, ForecastEngine, LowStockItem, ReorderProposal,
};
pub use purchase_order::{OrderId, OrderLine, PurchaseOrder, PurchaseOrderStatus};
pub use requisition::{
    Requisition, RequisitionId, RequisitionLine, RequisitionQueue, RequisitionStatus,
};
