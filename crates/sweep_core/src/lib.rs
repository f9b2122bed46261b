//! Hostsweep core: pure discovery pipeline and sync state machine.
mod dedup;
mod discover;
mod effect;
mod host;
mod msg;
mod queue;
mod record;
mod scan;
mod state;
mod update;
mod validate;
mod view_model;

pub use dedup::DedupStore;
pub use discover::discover_hosts;
pub use effect::{Effect, SnapshotKey};
pub use host::{normalize_host, page_domain, registrable_domain, should_analyze_content};
pub use msg::Msg;
pub use queue::{Batch, BatchId, BatchStart, Reconciliation, SyncOutcome, SyncQueue};
pub use record::{RecordState, Source, SubdomainRecord, Timestamp, UnknownSource};
pub use scan::{scan, Candidate, Candidates, PatternFamily, ALL_FAMILIES};
pub use state::{AppState, CoreSettings, DEFAULT_BATCH_SIZE, DEFAULT_MAX_RETRIES};
pub use update::update;
pub use validate::{Validator, ValidatorPolicy};
pub use view_model::{CollectorView, SyncSummary};
