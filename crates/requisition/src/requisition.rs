use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use larder_catalog::{ItemId, RecipeId};
use larder_core::{DomainError, DomainResult, RecordId, Unit};
use larder_topology::DepartmentId;

/// Requisition identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequisitionId(pub RecordId);

impl RequisitionId {
    pub fn new(id: RecordId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for RequisitionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Requisition lifecycle. Forward-only through the fulfillment chain;
/// cancellation is reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequisitionStatus {
    Requested,
    Approved,
    Scheduled,
    Fulfilled,
    Cancelled,
}

impl RequisitionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RequisitionStatus::Fulfilled | RequisitionStatus::Cancelled)
    }

    fn ordinal(self) -> u8 {
        match self {
            RequisitionStatus::Requested => 0,
            RequisitionStatus::Approved => 1,
            RequisitionStatus::Scheduled => 2,
            RequisitionStatus::Fulfilled => 3,
            // Not on the forward chain; handled separately.
            RequisitionStatus::Cancelled => u8::MAX,
        }
    }
}

/// One requested line. `item_ref` links to an inventory item when the request
/// is for raw goods; `recipe_ref` marks a finished-goods request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequisitionLine {
    pub name: String,
    pub quantity: f64,
    pub unit: Unit,
    pub item_ref: Option<ItemId>,
    pub recipe_ref: Option<RecipeId>,
}

/// An outlet's request for goods by a due time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requisition {
    pub id: RequisitionId,
    pub outlet: DepartmentId,
    pub due_at: DateTime<Utc>,
    pub status: RequisitionStatus,
    pub lines: Vec<RequisitionLine>,
}

impl Requisition {
    pub fn new(
        outlet: DepartmentId,
        due_at: DateTime<Utc>,
        lines: Vec<RequisitionLine>,
    ) -> DomainResult<Self> {
        if lines.is_empty() {
            return Err(DomainError::validation("requisition must have lines"));
        }
        for line in &lines {
            if line.name.trim().is_empty() {
                return Err(DomainError::validation("requisition line name cannot be empty"));
            }
            if !line.quantity.is_finite() || line.quantity <= 0.0 {
                return Err(DomainError::validation(format!(
                    "requisition line '{}' quantity must be positive",
                    line.name
                )));
            }
        }
        Ok(Self {
            id: RequisitionId::new(RecordId::new()),
            outlet,
            due_at,
            status: RequisitionStatus::Requested,
            lines,
        })
    }

    /// Forward-only transition; cancellation allowed from any non-terminal
    /// state. Invalid moves leave the status untouched.
    pub fn transition_to(&mut self, next: RequisitionStatus) -> DomainResult<()> {
        if self.status.is_terminal() {
            return Err(DomainError::validation(format!(
                "requisition is already {:?}",
                self.status
            )));
        }
        if next == RequisitionStatus::Cancelled {
            self.status = next;
            return Ok(());
        }
        if next.ordinal() <= self.status.ordinal() {
            return Err(DomainError::validation(format!(
                "requisition status cannot move from {:?} to {:?}",
                self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }
}

/// Registry of requisitions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequisitionQueue {
    requisitions: HashMap<RequisitionId, Requisition>,
}

impl RequisitionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submit(&mut self, requisition: Requisition) -> RequisitionId {
        let id = requisition.id;
        self.requisitions.insert(id, requisition);
        id
    }

    pub fn requisition(&self, id: RequisitionId) -> Option<&Requisition> {
        self.requisitions.get(&id)
    }

    pub fn update_status(
        &mut self,
        id: RequisitionId,
        next: RequisitionStatus,
    ) -> DomainResult<()> {
        let requisition = self.requisitions.get_mut(&id).ok_or(DomainError::NotFound)?;
        requisition.transition_to(next)
    }

    /// Open (non-terminal) requisitions due on or before `as_of`.
    pub fn open_due_by(&self, as_of: DateTime<Utc>) -> Vec<&Requisition> {
        self.requisitions
            .values()
            .filter(|r| !r.status.is_terminal() && r.due_at <= as_of)
            .collect()
    }

    pub fn by_outlet(&self, outlet: DepartmentId) -> Vec<&Requisition> {
        self.requisitions
            .values()
            .filter(|r| r.outlet == outlet)
            .collect()
    }
}
