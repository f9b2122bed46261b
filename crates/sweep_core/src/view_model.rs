use std::collections::BTreeMap;

use crate::queue::{BatchId, Reconciliation};
use crate::record::Source;

/// Counts from the most recent reconciled batch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncSummary {
    pub batch_id: BatchId,
    pub acked: usize,
    pub requeued: usize,
    pub dropped: usize,
    pub failure: Option<String>,
}

impl From<&Reconciliation> for SyncSummary {
    fn from(reconciliation: &Reconciliation) -> Self {
        Self {
            batch_id: reconciliation.batch_id,
            acked: reconciliation.acked.len(),
            requeued: reconciliation.requeued,
            dropped: reconciliation.dropped.len(),
            failure: reconciliation.failure.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CollectorView {
    pub session_domain: Option<String>,
    pub total: usize,
    pub per_source: BTreeMap<Source, usize>,
    pub pending: usize,
    pub in_flight: usize,
    pub last_sync: Option<SyncSummary>,
}

impl CollectorView {
    pub fn count(&self, source: Source) -> usize {
        self.per_source.get(&source).copied().unwrap_or(0)
    }
}
