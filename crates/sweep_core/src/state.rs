use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::dedup::DedupStore;
use crate::host::{normalize_host, page_domain, registrable_domain};
use crate::queue::{Reconciliation, SyncQueue};
use crate::record::{Source, SubdomainRecord, Timestamp};
use crate::validate::{Validator, ValidatorPolicy};
use crate::view_model::{CollectorView, SyncSummary};

pub const DEFAULT_BATCH_SIZE: usize = 50;
pub const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreSettings {
    /// Upper bound on records per sync request.
    pub batch_size: usize,
    /// A record is dropped once its failure count exceeds this.
    pub max_retries: u32,
    pub validator: ValidatorPolicy,
}

impl Default for CoreSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
            validator: ValidatorPolicy::Base,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    settings: CoreSettings,
    validator: Validator,
    dedup: DedupStore,
    queue: SyncQueue,
    page: Option<Url>,
    session_domain: Option<String>,
    last_sync: Option<SyncSummary>,
    /// Set when a snapshot was restored whose site could not be told; the
    /// first navigation then starts a new session.
    unscoped_restore: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: CoreSettings) -> Self {
        Self {
            settings,
            validator: Validator::new(settings.validator),
            ..Self::default()
        }
    }

    pub fn settings(&self) -> &CoreSettings {
        &self.settings
    }

    pub fn dedup(&self) -> &DedupStore {
        &self.dedup
    }

    pub fn queue(&self) -> &SyncQueue {
        &self.queue
    }

    pub fn page(&self) -> Option<&Url> {
        self.page.as_ref()
    }

    pub fn session_domain(&self) -> Option<&str> {
        self.session_domain.as_deref()
    }

    /// Deduplicated records sorted by domain, optionally limited to one source.
    pub fn records(&self, filter: Option<Source>) -> Vec<SubdomainRecord> {
        self.dedup
            .records()
            .into_iter()
            .filter(|record| filter.is_none_or(|source| record.source == source))
            .collect()
    }

    pub fn view(&self) -> CollectorView {
        let mut per_source = BTreeMap::new();
        for record in self.dedup.records() {
            *per_source.entry(record.source).or_insert(0) += 1;
        }
        CollectorView {
            session_domain: self.session_domain.clone(),
            total: self.dedup.len(),
            per_source,
            pending: self.queue.pending_len(),
            in_flight: self.queue.in_flight_len(),
            last_sync: self.last_sync.clone(),
        }
    }

    /// The session resumes on the site of the most recent restored discovery.
    pub(crate) fn restore(&mut self, subdomains: Vec<SubdomainRecord>, pending: Vec<SubdomainRecord>) {
        self.session_domain = latest_site(&subdomains);
        self.unscoped_restore = self.session_domain.is_none() && !subdomains.is_empty();
        self.dedup = DedupStore::restore(subdomains);
        self.queue = SyncQueue::restore(pending);
    }

    /// Moves to a new page. Returns `true` when the registrable domain changed
    /// and the dedup store was cleared.
    pub(crate) fn navigate(&mut self, page: Url) -> bool {
        let domain = page_domain(&page);
        self.page = Some(page);

        let Some(domain) = domain else {
            return false;
        };
        let boundary = match self.session_domain.as_deref() {
            Some(previous) => previous != domain,
            None => std::mem::take(&mut self.unscoped_restore),
        };
        if boundary {
            self.dedup.clear_all();
        }
        self.session_domain = Some(domain);
        boundary
    }

    /// Normalizes, validates, and deduplicates one candidate; a new host is
    /// recorded and enqueued for delivery. Returns whether it was new.
    pub(crate) fn accept(
        &mut self,
        candidate: &str,
        source: Source,
        at: Timestamp,
        origin: Option<&Url>,
    ) -> bool {
        let origin = origin.or(self.page.as_ref());
        let Some(host) = normalize_host(candidate, origin) else {
            return false;
        };
        if !self.validator.accepts(&host) || self.dedup.contains(&host) {
            return false;
        }

        let record = SubdomainRecord::new(host, source, at)
            .with_origin(origin.and_then(|url| url.host_str()).map(ToOwned::to_owned));
        self.dedup.insert(record.clone());
        self.queue.enqueue(record);
        true
    }

    pub(crate) fn queue_mut(&mut self) -> &mut SyncQueue {
        &mut self.queue
    }

    pub(crate) fn record_sync(&mut self, reconciliation: &Reconciliation) {
        self.last_sync = Some(SyncSummary::from(reconciliation));
    }

    pub(crate) fn clear(&mut self) {
        self.dedup.clear_all();
        self.queue.clear();
    }
}

fn latest_site(records: &[SubdomainRecord]) -> Option<String> {
    records
        .iter()
        .filter_map(|record| Some((record.timestamp, record.origin.as_deref()?)))
        .max_by_key(|(at, _)| *at)
        .and_then(|(_, origin)| registrable_domain(origin))
}
