use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use larder_catalog::ItemId;
use larder_core::{DomainError, DomainResult, RecordId};
use larder_ledger::{TransactionDraft, TransactionKind};

use crate::forecast::ReorderProposal;

/// Purchase order identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub RecordId);

impl OrderId {
    pub fn new(id: RecordId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for OrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Purchase order status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseOrderStatus {
    Draft,
    Approved,
    Received,
    Closed,
}

/// Purchase order line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub line_no: u32,
    pub item_id: ItemId,
    pub name: String,
    pub quantity: f64,
    pub unit_cost_cents: i64,
}

impl OrderLine {
    pub fn line_total_cents(&self) -> i64 {
        (self.quantity * self.unit_cost_cents as f64).round() as i64
    }
}

/// A purchase order built from reorder proposals.
///
/// Receiving goods produces `purchase` drafts for the ledger; the order
/// itself never mutates stock directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub id: OrderId,
    pub status: PurchaseOrderStatus,
    pub lines: Vec<OrderLine>,
    pub created_at: DateTime<Utc>,
}

impl PurchaseOrder {
    pub fn new(created_at: DateTime<Utc>) -> Self {
        Self {
            id: OrderId::new(RecordId::new()),
            status: PurchaseOrderStatus::Draft,
            lines: Vec::new(),
            created_at,
        }
    }

    /// Materialize reorder proposals into a draft order.
    pub fn from_proposals(
        proposals: &[ReorderProposal],
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if proposals.is_empty() {
            return Err(DomainError::validation(
                "cannot create purchase order without proposals",
            ));
        }
        let mut order = Self::new(created_at);
        for proposal in proposals {
            order.add_line(
                proposal.item_id,
                &proposal.name,
                proposal.suggested_quantity,
                proposal.unit_cost_cents,
            )?;
        }
        Ok(order)
    }

    /// Only draft orders can be modified.
    pub fn add_line(
        &mut self,
        item_id: ItemId,
        name: &str,
        quantity: f64,
        unit_cost_cents: i64,
    ) -> DomainResult<()> {
        if self.status != PurchaseOrderStatus::Draft {
            return Err(DomainError::validation(
                "cannot modify purchase order once approved or received",
            ));
        }
        if !quantity.is_finite() || quantity <= 0.0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        let line_no = (self.lines.len() as u32) + 1;
        self.lines.push(OrderLine {
            line_no,
            item_id,
            name: name.to_string(),
            quantity,
            unit_cost_cents,
        });
        Ok(())
    }

    pub fn approve(&mut self) -> DomainResult<()> {
        if self.status != PurchaseOrderStatus::Draft {
            return Err(DomainError::validation(
                "only draft purchase orders can be approved",
            ));
        }
        if self.lines.is_empty() {
            return Err(DomainError::validation(
                "cannot approve purchase order without lines",
            ));
        }
        self.status = PurchaseOrderStatus::Approved;
        Ok(())
    }

    /// Mark the order received and return the purchase drafts to append.
    pub fn receive(&mut self, received_at: DateTime<Utc>) -> DomainResult<Vec<TransactionDraft>> {
        if self.status != PurchaseOrderStatus::Approved {
            return Err(DomainError::validation(
                "cannot receive goods before purchase order is approved",
            ));
        }
        self.status = PurchaseOrderStatus::Received;
        Ok(self
            .lines
            .iter()
            .map(|line| {
                TransactionDraft::new(
                    line.item_id,
                    TransactionKind::Purchase,
                    line.quantity,
                    received_at,
                )
                .with_cost(line.unit_cost_cents)
            })
            .collect())
    }

    pub fn close(&mut self) -> DomainResult<()> {
        if self.status != PurchaseOrderStatus::Received {
            return Err(DomainError::validation(
                "only received purchase orders can be closed",
            ));
        }
        self.status = PurchaseOrderStatus::Closed;
        Ok(())
    }

    pub fn total_cents(&self) -> i64 {
        self.lines.iter().map(OrderLine::line_total_cents).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use larder_core::Confidence;

    fn test_item_id() -> ItemId {
        ItemId::new(RecordId::new())
    }

    fn proposal(name: &str, qty: f64, unit_cost: i64) -> ReorderProposal {
        ReorderProposal {
            item_id: test_item_id(),
            name: name.to_string(),
            suggested_quantity: qty,
            unit_cost_cents: unit_cost,
            estimated_cost_cents: (qty * unit_cost as f64).round() as i64,
            confidence: Confidence::Exact,
        }
    }

    #[test]
    fn proposals_become_numbered_draft_lines() {
        let order = PurchaseOrder::from_proposals(
            &[proposal("Ribeye", 18.0, 1250), proposal("Shrimp", 7.0, 950)],
            Utc::now(),
        )
        .unwrap();

        assert_eq!(order.status, PurchaseOrderStatus::Draft);
        assert_eq!(order.lines.len(), 2);
        assert_eq!(order.lines[0].line_no, 1);
        assert_eq!(order.lines[1].line_no, 2);
        assert_eq!(order.total_cents(), 18 * 1250 + 7 * 950);
    }

    #[test]
    fn empty_proposals_cannot_form_an_order() {
        assert!(matches!(
            PurchaseOrder::from_proposals(&[], Utc::now()),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn cannot_receive_before_approval() {
        let mut order =
            PurchaseOrder::from_proposals(&[proposal("Ribeye", 18.0, 1250)], Utc::now()).unwrap();

        let err = order.receive(Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(order.status, PurchaseOrderStatus::Draft);
    }

    #[test]
    fn cannot_approve_an_empty_order() {
        let mut order = PurchaseOrder::new(Utc::now());
        assert!(order.approve().is_err());
    }

    #[test]
    fn receive_after_approval_yields_purchase_drafts() {
        let mut order =
            PurchaseOrder::from_proposals(&[proposal("Ribeye", 18.0, 1250)], Utc::now()).unwrap();
        order.approve().unwrap();

        let received_at = Utc::now();
        let drafts = order.receive(received_at).unwrap();

        assert_eq!(order.status, PurchaseOrderStatus::Received);
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].kind, TransactionKind::Purchase);
        assert_eq!(drafts[0].quantity, 18.0);
        assert_eq!(drafts[0].unit_cost_cents, Some(1250));
        assert_eq!(drafts[0].occurred_at, received_at);

        order.close().unwrap();
        assert_eq!(order.status, PurchaseOrderStatus::Closed);

        // Drafts stay append-only facts; modifying a received order fails.
        assert!(order.add_line(test_item_id(), "Late", 1.0, 100).is_err());
    }
}
