use crate::queue::Batch;
use crate::record::SubdomainRecord;

/// Logical keys of the persistence collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotKey {
    /// Accepted-record array behind the dedup store.
    Subdomains,
    /// Records awaiting delivery, in queue order.
    PendingSync,
}

impl SnapshotKey {
    pub fn as_str(self) -> &'static str {
        match self {
            SnapshotKey::Subdomains => "subdomains",
            SnapshotKey::PendingSync => "pendingSync",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Replace the stored value of a key wholesale.
    Persist {
        key: SnapshotKey,
        records: Vec<SubdomainRecord>,
    },
    /// Remove a key from storage.
    DropSnapshot(SnapshotKey),
    /// Fetch the body behind a request URL and feed it back as text.
    AnalyzeContent { url: String },
    /// Send a batch to the remote sink and report back with `SyncFinished`.
    DispatchBatch(Batch),
}
