use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use larder_catalog::ItemId;
use larder_core::{BeoRef, DomainError, DomainResult, RecordId};
use larder_topology::{AreaId, DepartmentId};

/// Ledger transaction identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(pub RecordId);

impl TransactionId {
    pub fn new(id: RecordId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Movement kind. Closed enumeration; quantity is strictly positive for every
/// kind and direction is a total function of the kind.
///
/// Adjustments are split into explicit increase/decrease variants instead of
/// a signed quantity, so no caller can smuggle a sign through the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransactionKind {
    Purchase,
    TransferIn,
    TransferOut,
    Consumption,
    Sale,
    AdjustmentIncrease,
    AdjustmentDecrease,
}

impl TransactionKind {
    /// +1.0 for stock-increasing kinds, -1.0 for stock-decreasing kinds.
    pub fn sign(self) -> f64 {
        match self {
            TransactionKind::Purchase
            | TransactionKind::TransferIn
            | TransactionKind::AdjustmentIncrease => 1.0,
            TransactionKind::TransferOut
            | TransactionKind::Consumption
            | TransactionKind::Sale
            | TransactionKind::AdjustmentDecrease => -1.0,
        }
    }

    /// Kinds that count as usage when forecasting demand.
    pub fn is_consumption_class(self) -> bool {
        matches!(
            self,
            TransactionKind::Sale | TransactionKind::Consumption | TransactionKind::TransferOut
        )
    }
}

/// A transaction ready to be appended (no id or sequence yet).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionDraft {
    pub item_id: ItemId,
    pub kind: TransactionKind,
    /// Always > 0; direction comes from `kind`.
    pub quantity: f64,
    /// Actual cost per unit for purchases, in cents.
    pub unit_cost_cents: Option<i64>,
    pub occurred_at: DateTime<Utc>,
    pub source_area: Option<AreaId>,
    pub dest_area: Option<AreaId>,
    pub source_department: Option<DepartmentId>,
    pub dest_department: Option<DepartmentId>,
    /// Originating banquet event, for traceability and supersede-by-event.
    pub beo: Option<BeoRef>,
    pub note: Option<String>,
}

impl TransactionDraft {
    pub fn new(
        item_id: ItemId,
        kind: TransactionKind,
        quantity: f64,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            item_id,
            kind,
            quantity,
            unit_cost_cents: None,
            occurred_at,
            source_area: None,
            dest_area: None,
            source_department: None,
            dest_department: None,
            beo: None,
            note: None,
        }
    }

    pub fn with_cost(mut self, unit_cost_cents: i64) -> Self {
        self.unit_cost_cents = Some(unit_cost_cents);
        self
    }

    pub fn with_beo(mut self, beo: BeoRef) -> Self {
        self.beo = Some(beo);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn between_areas(mut self, source: Option<AreaId>, dest: Option<AreaId>) -> Self {
        self.source_area = source;
        self.dest_area = dest;
        self
    }

    pub fn between_departments(
        mut self,
        source: Option<DepartmentId>,
        dest: Option<DepartmentId>,
    ) -> Self {
        self.source_department = source;
        self.dest_department = dest;
        self
    }

    /// Shape validation applied before any append; a failing draft is never
    /// partially written.
    pub fn validate(&self) -> DomainResult<()> {
        if !self.quantity.is_finite() || self.quantity <= 0.0 {
            return Err(DomainError::validation(
                "transaction quantity must be a positive number",
            ));
        }
        if let Some(cost) = self.unit_cost_cents {
            if cost < 0 {
                return Err(DomainError::validation("unit cost cannot be negative"));
            }
        }
        Ok(())
    }
}

/// A transaction recorded in the ledger.
///
/// Immutable once recorded: corrections are new adjustment transactions, and
/// event regeneration deactivates rows (`active = false`) rather than
/// deleting them, so the audit trail survives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedTransaction {
    pub id: TransactionId,
    /// Monotonically increasing position in the item's stream.
    pub sequence: u64,
    /// False once superseded by an event regeneration.
    pub active: bool,
    pub item_id: ItemId,
    pub kind: TransactionKind,
    pub quantity: f64,
    pub unit_cost_cents: Option<i64>,
    pub occurred_at: DateTime<Utc>,
    pub source_area: Option<AreaId>,
    pub dest_area: Option<AreaId>,
    pub source_department: Option<DepartmentId>,
    pub dest_department: Option<DepartmentId>,
    pub beo: Option<BeoRef>,
    pub note: Option<String>,
}

impl RecordedTransaction {
    pub(crate) fn from_draft(draft: TransactionDraft, id: TransactionId, sequence: u64) -> Self {
        Self {
            id,
            sequence,
            active: true,
            item_id: draft.item_id,
            kind: draft.kind,
            quantity: draft.quantity,
            unit_cost_cents: draft.unit_cost_cents,
            occurred_at: draft.occurred_at,
            source_area: draft.source_area,
            dest_area: draft.dest_area,
            source_department: draft.source_department,
            dest_department: draft.dest_department,
            beo: draft.beo,
            note: draft.note,
        }
    }

    /// Quantity with the kind's direction applied.
    pub fn signed_quantity(&self) -> f64 {
        self.kind.sign() * self.quantity
    }
}
