//! Composition root: owns the core state and runs the effects `update`
//! asks for against storage, the sink, and the content fetcher.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sweep_core::{
    update, AppState, Batch, CollectorView, CoreSettings, Effect, Msg, SnapshotKey, Source,
    SubdomainRecord, SyncOutcome, SyncSummary, Timestamp,
};
use sweep_logging::{sweep_debug, sweep_error, sweep_info, sweep_warn};
use url::Url;

use crate::export::{build_export, write_export, ExportError};
use crate::fetch::ContentFetcher;
use crate::markup::MarkupWalker;
use crate::sink::{duration_secs, RemoteSink, SinkError, SinkHealth};
use crate::store::{load_records, save_records, KeyValueStore, StoreError};
use crate::{FetchError, Observation};

/// Epoch milliseconds.
pub type Clock = Arc<dyn Fn() -> Timestamp + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(|| u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorSettings {
    pub core: CoreSettings,
    #[serde(with = "duration_secs")]
    pub sync_interval: Duration,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            core: CoreSettings::default(),
            sync_interval: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncReport {
    /// Queue was empty.
    Idle,
    /// Another batch is still out.
    Busy,
    Completed(SyncSummary),
}

pub struct Collector {
    state: Mutex<AppState>,
    store: Arc<dyn KeyValueStore>,
    sink: Arc<dyn RemoteSink>,
    fetcher: Arc<dyn ContentFetcher>,
    walker: MarkupWalker,
    clock: Clock,
    settings: CollectorSettings,
}

impl Collector {
    pub fn new(
        settings: CollectorSettings,
        store: Arc<dyn KeyValueStore>,
        sink: Arc<dyn RemoteSink>,
        fetcher: Arc<dyn ContentFetcher>,
    ) -> Self {
        Self {
            state: Mutex::new(AppState::with_settings(settings.core)),
            store,
            sink,
            fetcher,
            walker: MarkupWalker::new(),
            clock: system_clock(),
            settings,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &CollectorSettings {
        &self.settings
    }

    pub fn now(&self) -> Timestamp {
        (self.clock)()
    }

    /// Loads both snapshots into the state. A missing key is an empty list.
    pub fn restore(&self) -> Result<(), StoreError> {
        let subdomains = load_records(self.store.as_ref(), SnapshotKey::Subdomains)?;
        let pending = load_records(self.store.as_ref(), SnapshotKey::PendingSync)?;
        sweep_info!(
            "Restored {} host(s), {} pending record(s)",
            subdomains.len(),
            pending.len()
        );
        self.apply(Msg::Restore {
            subdomains,
            pending,
        });
        Ok(())
    }

    pub fn view(&self) -> CollectorView {
        self.lock().view()
    }

    pub fn records(&self, filter: Option<Source>) -> Vec<SubdomainRecord> {
        self.lock().records(filter)
    }

    pub fn export_to(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        let now = self.now();
        let document = build_export(&self.records(None), now);
        let path = write_export(dir, &document, now)?;
        sweep_info!(
            "Exported {} host(s) to {}",
            document.total_count,
            path.display()
        );
        Ok(path)
    }

    pub async fn ping(&self) -> Result<SinkHealth, SinkError> {
        self.sink.health().await
    }

    /// Applies `msg` and returns the effects that need IO beyond storage.
    pub fn apply(&self, msg: Msg) -> Vec<Effect> {
        self.apply_with(msg, |_| ()).0
    }

    /// Applies `msg` under the state lock and lets `inspect` read the new
    /// state before anyone else can change it. Storage effects are carried
    /// out before the lock is released.
    pub fn apply_with<R>(&self, msg: Msg, inspect: impl FnOnce(&AppState) -> R) -> (Vec<Effect>, R) {
        let mut guard = self.lock();
        let (next, effects) = update(std::mem::take(&mut *guard), msg);
        *guard = next;

        let mut deferred = Vec::new();
        for effect in effects {
            match effect {
                Effect::Persist { key, records } => {
                    if let Err(err) = save_records(self.store.as_ref(), key, &records) {
                        sweep_error!("Failed to persist {}: {}", key.as_str(), err);
                    }
                }
                Effect::DropSnapshot(key) => {
                    if let Err(err) = self.store.remove(key) {
                        sweep_error!("Failed to drop {}: {}", key.as_str(), err);
                    }
                }
                other => deferred.push(other),
            }
        }
        let inspected = inspect(&guard);
        (deferred, inspected)
    }

    /// Runs `msg` and everything it leads to. Content analysis feeds text
    /// back in; a dispatched batch is reconciled before this returns.
    pub async fn handle(&self, msg: Msg) {
        let mut inbox = VecDeque::from([msg]);
        while let Some(msg) = inbox.pop_front() {
            for effect in self.apply(msg) {
                if let Some(follow_up) = self.run_effect(effect).await {
                    inbox.push_back(follow_up);
                }
            }
        }
    }

    pub async fn observe(&self, observation: Observation) {
        let msg = observation.into_msg(self.now());
        self.handle(msg).await;
    }

    pub async fn navigate(&self, url: &str) {
        self.handle(Msg::PageNavigated {
            url: url.to_string(),
        })
        .await;
    }

    /// Navigates to `url`, fetches it, and feeds the markup and every
    /// sub-resource request it would make through the pipeline.
    pub async fn visit(&self, url: &str) -> Result<(), FetchError> {
        self.navigate(url).await;
        self.observe(Observation::url(url, Source::Url)).await;

        let output = self.fetcher.fetch(url).await?;
        let decoded = output.decode();
        if decoded.lossy {
            sweep_debug!(
                "{} decoded lossily as {}",
                output.metadata.final_url,
                decoded.encoding_label
            );
        }

        for observation in self.walker.walk_document(&decoded.text) {
            self.observe(observation).await;
        }
        if let Ok(base) = Url::parse(&output.metadata.final_url) {
            for request in self.walker.subresource_urls(&decoded.text, &base) {
                self.observe(Observation::url(request, Source::Url)).await;
            }
        }
        Ok(())
    }

    /// One consumer step: take a batch from the head, send it, reconcile.
    pub async fn run_sync_cycle(&self) -> SyncReport {
        let (effects, in_flight) = self.apply_with(Msg::SyncRequested, |state| {
            state.queue().is_in_flight()
        });

        let batch = effects.into_iter().find_map(|effect| match effect {
            Effect::DispatchBatch(batch) => Some(batch),
            _ => None,
        });
        let Some(batch) = batch else {
            return if in_flight {
                SyncReport::Busy
            } else {
                SyncReport::Idle
            };
        };

        let finished = self.dispatch(batch).await;
        let (_, summary) = self.apply_with(finished, |state| state.view().last_sync);
        match summary {
            Some(summary) => SyncReport::Completed(summary),
            None => SyncReport::Idle,
        }
    }

    pub fn clear(&self) {
        sweep_info!("Clearing collected hosts and pending records");
        self.apply(Msg::ClearRequested);
    }

    async fn run_effect(&self, effect: Effect) -> Option<Msg> {
        match effect {
            Effect::AnalyzeContent { url } => self.analyze(&url).await,
            Effect::DispatchBatch(batch) => Some(self.dispatch(batch).await),
            Effect::Persist { .. } | Effect::DropSnapshot(_) => None,
        }
    }

    async fn analyze(&self, url: &str) -> Option<Msg> {
        match self.fetcher.fetch(url).await {
            Ok(output) => Some(Msg::TextObserved {
                text: output.decode().text,
                source: Source::Content,
                at: self.now(),
            }),
            Err(err) => {
                sweep_debug!("Skipping content of {}: {}", url, err);
                None
            }
        }
    }

    async fn dispatch(&self, batch: Batch) -> Msg {
        let outcome = match self.sink.add_subdomains(&batch.records).await {
            Ok(ack) => {
                if ack.total_requested != batch.records.len() {
                    sweep_warn!(
                        "Sink counted {} record(s) in batch {} of {}",
                        ack.total_requested,
                        batch.id,
                        batch.records.len()
                    );
                }
                SyncOutcome::Delivered { added: ack.added }
            }
            Err(err) => err.into_outcome(),
        };
        Msg::SyncFinished {
            batch_id: batch.id,
            outcome,
        }
    }

    fn lock(&self) -> MutexGuard<'_, AppState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
