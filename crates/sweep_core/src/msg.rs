use crate::queue::{BatchId, SyncOutcome};
use crate::record::{Source, SubdomainRecord, Timestamp};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Persisted snapshot loaded at startup.
    Restore {
        subdomains: Vec<SubdomainRecord>,
        pending: Vec<SubdomainRecord>,
    },
    /// The active page changed.
    PageNavigated { url: String },
    /// A URL string to reduce directly to its host: request targets and
    /// URL-bearing markup attributes.
    UrlObserved {
        url: String,
        source: Source,
        at: Timestamp,
    },
    /// A text blob to scan for hostnames.
    TextObserved {
        text: String,
        source: Source,
        at: Timestamp,
    },
    /// Candidate pushed from a separate scanning context.
    CandidatePushed {
        candidate: String,
        source: Source,
        page_url: Option<String>,
        at: Timestamp,
    },
    /// Periodic timer tick or manual trigger.
    SyncRequested,
    /// Result of a dispatched batch.
    SyncFinished {
        batch_id: BatchId,
        outcome: SyncOutcome,
    },
    /// User asked to forget everything collected so far.
    ClearRequested,
    NoOp,
}
