//! Sync queue: FIFO of accepted records awaiting remote delivery.
//!
//! At most one batch is in flight at a time. Records that come back
//! unconfirmed are reinserted at the head in their original order, ahead of
//! anything enqueued while the batch was out.

use std::collections::VecDeque;

use crate::record::{RecordState, SubdomainRecord};

pub type BatchId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub id: BatchId,
    pub records: Vec<SubdomainRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchStart {
    /// Nothing queued.
    Empty,
    /// Another batch is still awaiting its result.
    Busy,
    Started(Batch),
}

/// Result of sending one batch to the remote sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The sink accepted the request and stored the first `added` records.
    Delivered { added: usize },
    /// Transport, status, protocol, or timeout failure.
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reconciliation {
    pub batch_id: BatchId,
    pub acked: Vec<SubdomainRecord>,
    pub requeued: usize,
    pub dropped: Vec<SubdomainRecord>,
    pub failure: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct InFlight {
    batch: Batch,
    /// Set by an explicit clear while the batch was out; its result is then
    /// reconciled without requeueing anything.
    discarded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncQueue {
    pending: VecDeque<SubdomainRecord>,
    in_flight: Option<InFlight>,
    next_batch_id: BatchId,
}

impl SyncQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a queue from a persisted snapshot. Records caught in flight
    /// when the snapshot was taken are pending again.
    pub fn restore(records: impl IntoIterator<Item = SubdomainRecord>) -> Self {
        let pending = records
            .into_iter()
            .filter(|record| {
                !matches!(record.state, RecordState::Acked | RecordState::Dropped)
            })
            .map(|mut record| {
                record.state = RecordState::Pending;
                record
            })
            .collect();
        Self {
            pending,
            in_flight: None,
            next_batch_id: 0,
        }
    }

    pub fn enqueue(&mut self, mut record: SubdomainRecord) {
        record.state = RecordState::Pending;
        self.pending.push_back(record);
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn in_flight_len(&self) -> usize {
        self.in_flight
            .as_ref()
            .map_or(0, |in_flight| in_flight.batch.records.len())
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Everything not yet confirmed: the in-flight batch first, then the
    /// pending records in queue order.
    pub fn snapshot(&self) -> Vec<SubdomainRecord> {
        let in_flight = self
            .in_flight
            .iter()
            .filter(|in_flight| !in_flight.discarded)
            .flat_map(|in_flight| in_flight.batch.records.iter());
        in_flight.chain(self.pending.iter()).cloned().collect()
    }

    /// Takes up to `batch_size` records from the head and marks them in flight.
    pub fn begin_batch(&mut self, batch_size: usize) -> BatchStart {
        if self.pending.is_empty() {
            return BatchStart::Empty;
        }
        if self.in_flight.is_some() {
            return BatchStart::Busy;
        }

        let take = batch_size.max(1).min(self.pending.len());
        let records: Vec<_> = self
            .pending
            .drain(..take)
            .map(|mut record| {
                record.state = RecordState::InFlight;
                record
            })
            .collect();

        self.next_batch_id += 1;
        let batch = Batch {
            id: self.next_batch_id,
            records,
        };
        self.in_flight = Some(InFlight {
            batch: batch.clone(),
            discarded: false,
        });
        BatchStart::Started(batch)
    }

    /// Applies a batch result and clears the in-flight flag.
    ///
    /// Returns `None` when `batch_id` is not the batch in flight.
    pub fn complete(
        &mut self,
        batch_id: BatchId,
        outcome: SyncOutcome,
        max_retries: u32,
    ) -> Option<Reconciliation> {
        if self.in_flight.as_ref()?.batch.id != batch_id {
            return None;
        }
        let InFlight { batch, discarded } = self.in_flight.take()?;
        let mut reconciliation = Reconciliation {
            batch_id,
            ..Reconciliation::default()
        };

        let mut requeue = Vec::new();
        match outcome {
            SyncOutcome::Delivered { added } => {
                let added = added.min(batch.records.len());
                let mut records = batch.records;
                let unconfirmed = records.split_off(added);
                reconciliation.acked = records
                    .into_iter()
                    .map(|mut record| {
                        record.state = RecordState::Acked;
                        record
                    })
                    .collect();
                requeue.extend(unconfirmed);
            }
            SyncOutcome::Failed { reason } => {
                for mut record in batch.records {
                    record.retry_count += 1;
                    if record.retry_count > max_retries {
                        record.state = RecordState::Dropped;
                        reconciliation.dropped.push(record);
                    } else {
                        requeue.push(record);
                    }
                }
                reconciliation.failure = Some(reason);
            }
        }

        if !discarded {
            reconciliation.requeued = requeue.len();
            for mut record in requeue.into_iter().rev() {
                record.state = RecordState::Pending;
                self.pending.push_front(record);
            }
        }
        Some(reconciliation)
    }

    /// Drops every pending record. A batch already in flight still completes,
    /// but nothing from it is requeued.
    pub fn clear(&mut self) {
        self.pending.clear();
        if let Some(in_flight) = self.in_flight.as_mut() {
            in_flight.discarded = true;
        }
    }
}
