use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use thiserror::Error;

use larder_catalog::ItemId;
use larder_core::{BeoRef, DomainError, RecordId};

use crate::transaction::{RecordedTransaction, TransactionDraft, TransactionId};

/// Ledger store operation error.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A draft failed shape validation; the whole batch is rejected and
    /// nothing is written.
    #[error("invalid append: {0}")]
    InvalidAppend(String),

    /// The ledger lock was poisoned by a panicking writer.
    #[error("ledger lock poisoned")]
    Poisoned,
}

impl From<LedgerError> for DomainError {
    fn from(value: LedgerError) -> Self {
        match value {
            LedgerError::InvalidAppend(msg) => DomainError::Validation(msg),
            LedgerError::Poisoned => DomainError::inconsistent("ledger lock poisoned"),
        }
    }
}

/// Append-only transaction store.
///
/// The seam for a durable backend. Implementations must:
/// - serialize appends per item (no lost updates),
/// - give readers a consistent snapshot (never a torn batch),
/// - make `supersede_event` an atomic replace (readers never observe the
///   event with zero or duplicate active rows mid-regeneration),
/// - answer range queries in O(filtered), not O(full log).
pub trait TransactionStore: Send + Sync {
    /// Validate and append a batch. All drafts are written or none are.
    fn append(&self, drafts: Vec<TransactionDraft>)
        -> Result<Vec<RecordedTransaction>, LedgerError>;

    /// Atomically deactivate every active transaction tagged with `beo` and
    /// append the replacements (stamped with `beo`). Superseded rows stay in
    /// the log, inactive, for audit.
    fn supersede_event(
        &self,
        beo: BeoRef,
        drafts: Vec<TransactionDraft>,
    ) -> Result<Vec<RecordedTransaction>, LedgerError>;

    /// Active transactions for an item with `occurred_at` in `[from, to]`
    /// (inclusive), in append order.
    fn for_item_in_range(
        &self,
        item_id: ItemId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<RecordedTransaction>, LedgerError>;

    /// Active transactions tagged with a banquet event.
    fn for_event(&self, beo: BeoRef) -> Result<Vec<RecordedTransaction>, LedgerError>;
}

impl<S> TransactionStore for Arc<S>
where
    S: TransactionStore + ?Sized,
{
    fn append(
        &self,
        drafts: Vec<TransactionDraft>,
    ) -> Result<Vec<RecordedTransaction>, LedgerError> {
        (**self).append(drafts)
    }

    fn supersede_event(
        &self,
        beo: BeoRef,
        drafts: Vec<TransactionDraft>,
    ) -> Result<Vec<RecordedTransaction>, LedgerError> {
        (**self).supersede_event(beo, drafts)
    }

    fn for_item_in_range(
        &self,
        item_id: ItemId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<RecordedTransaction>, LedgerError> {
        (**self).for_item_in_range(item_id, from, to)
    }

    fn for_event(&self, beo: BeoRef) -> Result<Vec<RecordedTransaction>, LedgerError> {
        (**self).for_event(beo)
    }
}

#[derive(Debug, Default)]
struct LedgerInner {
    log: Vec<RecordedTransaction>,
    by_item: HashMap<ItemId, Vec<usize>>,
    by_event: HashMap<BeoRef, Vec<usize>>,
    next_sequence: HashMap<ItemId, u64>,
}

impl LedgerInner {
    fn push(&mut self, draft: TransactionDraft) -> RecordedTransaction {
        let sequence = self.next_sequence.entry(draft.item_id).or_insert(0);
        *sequence += 1;
        let recorded =
            RecordedTransaction::from_draft(draft, TransactionId::new(RecordId::new()), *sequence);

        let index = self.log.len();
        self.by_item.entry(recorded.item_id).or_default().push(index);
        if let Some(beo) = recorded.beo {
            self.by_event.entry(beo).or_default().push(index);
        }
        self.log.push(recorded.clone());
        recorded
    }
}

/// In-memory append-only transaction ledger.
///
/// Writes take the single write lock, which serializes appends per item and
/// makes batch append and supersede atomic with respect to readers. Intended
/// for tests/dev and as the reference semantics for durable backends.
#[derive(Debug, Default)]
pub struct InMemoryTransactionLedger {
    inner: RwLock<LedgerInner>,
}

impl InMemoryTransactionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn validate_batch(drafts: &[TransactionDraft]) -> Result<(), LedgerError> {
        for (idx, draft) in drafts.iter().enumerate() {
            draft
                .validate()
                .map_err(|e| LedgerError::InvalidAppend(format!("draft {idx}: {e}")))?;
        }
        Ok(())
    }

    /// Full history for an event, superseded rows included. Not part of the
    /// store trait; audit/debug surface of the in-memory backend.
    pub fn event_history(&self, beo: BeoRef) -> Result<Vec<RecordedTransaction>, LedgerError> {
        let inner = self.inner.read().map_err(|_| LedgerError::Poisoned)?;
        Ok(inner
            .by_event
            .get(&beo)
            .into_iter()
            .flatten()
            .map(|&i| inner.log[i].clone())
            .collect())
    }

    /// Total number of rows in the log (superseded included).
    pub fn len(&self) -> usize {
        self.inner.read().map(|i| i.log.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TransactionStore for InMemoryTransactionLedger {
    fn append(
        &self,
        drafts: Vec<TransactionDraft>,
    ) -> Result<Vec<RecordedTransaction>, LedgerError> {
        if drafts.is_empty() {
            return Ok(vec![]);
        }
        Self::validate_batch(&drafts)?;

        let mut inner = self.inner.write().map_err(|_| LedgerError::Poisoned)?;
        Ok(drafts.into_iter().map(|d| inner.push(d)).collect())
    }

    fn supersede_event(
        &self,
        beo: BeoRef,
        mut drafts: Vec<TransactionDraft>,
    ) -> Result<Vec<RecordedTransaction>, LedgerError> {
        for draft in &mut drafts {
            draft.beo = Some(beo);
        }
        Self::validate_batch(&drafts)?;

        // One write lock spans deactivation and re-append: readers see the
        // old generation or the new one, never an in-between state.
        let mut inner = self.inner.write().map_err(|_| LedgerError::Poisoned)?;

        let prior: Vec<usize> = inner.by_event.get(&beo).cloned().unwrap_or_default();
        let retired = prior.iter().filter(|&&i| inner.log[i].active).count();
        for i in prior {
            inner.log[i].active = false;
        }

        let recorded: Vec<RecordedTransaction> =
            drafts.into_iter().map(|d| inner.push(d)).collect();

        tracing::debug!(
            %beo,
            retired,
            recorded = recorded.len(),
            "superseded event consumption"
        );
        Ok(recorded)
    }

    fn for_item_in_range(
        &self,
        item_id: ItemId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<RecordedTransaction>, LedgerError> {
        let inner = self.inner.read().map_err(|_| LedgerError::Poisoned)?;
        Ok(inner
            .by_item
            .get(&item_id)
            .into_iter()
            .flatten()
            .map(|&i| &inner.log[i])
            .filter(|t| t.active && t.occurred_at >= from && t.occurred_at <= to)
            .cloned()
            .collect())
    }

    fn for_event(&self, beo: BeoRef) -> Result<Vec<RecordedTransaction>, LedgerError> {
        let inner = self.inner.read().map_err(|_| LedgerError::Poisoned)?;
        Ok(inner
            .by_event
            .get(&beo)
            .into_iter()
            .flatten()
            .map(|&i| &inner.log[i])
            .filter(|t| t.active)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::TransactionKind;
    use chrono::Duration;

    fn test_item_id() -> ItemId {
        ItemId::new(RecordId::new())
    }

    fn draft(item: ItemId, kind: TransactionKind, qty: f64, at: DateTime<Utc>) -> TransactionDraft {
        TransactionDraft::new(item, kind, qty, at)
    }

    #[test]
    fn append_assigns_monotonic_sequence_per_item() {
        let ledger = InMemoryTransactionLedger::new();
        let a = test_item_id();
        let b = test_item_id();
        let now = Utc::now();

        let recorded = ledger
            .append(vec![
                draft(a, TransactionKind::Purchase, 10.0, now),
                draft(b, TransactionKind::Purchase, 5.0, now),
                draft(a, TransactionKind::Consumption, 2.0, now),
            ])
            .unwrap();

        assert_eq!(recorded[0].sequence, 1);
        assert_eq!(recorded[1].sequence, 1);
        assert_eq!(recorded[2].sequence, 2);
    }

    #[test]
    fn invalid_draft_rejects_whole_batch() {
        let ledger = InMemoryTransactionLedger::new();
        let item = test_item_id();
        let now = Utc::now();

        let err = ledger
            .append(vec![
                draft(item, TransactionKind::Purchase, 10.0, now),
                draft(item, TransactionKind::Purchase, -1.0, now),
            ])
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAppend(_)));

        // Nothing was partially written.
        assert!(ledger.is_empty());
    }

    #[test]
    fn range_query_is_inclusive_and_skips_inactive() {
        let ledger = InMemoryTransactionLedger::new();
        let item = test_item_id();
        let beo = BeoRef::new();
        let t0 = Utc::now();
        let t1 = t0 + Duration::days(1);
        let t2 = t0 + Duration::days(2);

        ledger
            .append(vec![draft(item, TransactionKind::Purchase, 10.0, t0)])
            .unwrap();
        ledger
            .supersede_event(
                beo,
                vec![draft(item, TransactionKind::Consumption, 3.0, t1)],
            )
            .unwrap();
        ledger
            .append(vec![draft(item, TransactionKind::Purchase, 7.0, t2)])
            .unwrap();

        // Inclusive at both ends.
        let txs = ledger.for_item_in_range(item, t0, t2).unwrap();
        assert_eq!(txs.len(), 3);

        // Superseding retires the consumption row from active reads.
        ledger.supersede_event(beo, vec![]).unwrap();
        let txs = ledger.for_item_in_range(item, t0, t2).unwrap();
        assert_eq!(txs.len(), 2);
        assert!(txs.iter().all(|t| t.kind == TransactionKind::Purchase));
    }

    #[test]
    fn supersede_replaces_active_set_and_keeps_history() {
        let ledger = InMemoryTransactionLedger::new();
        let item = test_item_id();
        let beo = BeoRef::new();
        let now = Utc::now();

        ledger
            .supersede_event(
                beo,
                vec![draft(item, TransactionKind::Consumption, 12.0, now)],
            )
            .unwrap();
        ledger
            .supersede_event(
                beo,
                vec![draft(item, TransactionKind::Consumption, 16.0, now)],
            )
            .unwrap();

        let active = ledger.for_event(beo).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].quantity, 16.0);

        let history = ledger.event_history(beo).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history.iter().filter(|t| !t.active).count(), 1);
    }

    #[test]
    fn supersede_is_idempotent_for_identical_input() {
        let ledger = InMemoryTransactionLedger::new();
        let item = test_item_id();
        let beo = BeoRef::new();
        let now = Utc::now();

        for _ in 0..3 {
            ledger
                .supersede_event(
                    beo,
                    vec![draft(item, TransactionKind::Consumption, 12.0, now)],
                )
                .unwrap();
        }

        let active = ledger.for_event(beo).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].quantity, 12.0);
    }

    #[test]
    fn concurrent_appends_are_serialized() {
        let ledger = Arc::new(InMemoryTransactionLedger::new());
        let item = test_item_id();
        let now = Utc::now();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        ledger
                            .append(vec![draft(item, TransactionKind::Purchase, 1.0, now)])
                            .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let txs = ledger.for_item_in_range(item, now, now).unwrap();
        assert_eq!(txs.len(), 400);
        // Sequences are dense and unique.
        let mut seqs: Vec<u64> = txs.iter().map(|t| t.sequence).collect();
        seqs.sort_unstable();
        assert_eq!(seqs, (1..=400).collect::<Vec<u64>>());
    }
}
