use sweep_logging::{sweep_debug, sweep_info, sweep_warn};
use url::Url;

use crate::host::should_analyze_content;
use crate::queue::BatchStart;
use crate::scan::scan;
use crate::{AppState, Effect, Msg, SnapshotKey, Source};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::Restore {
            subdomains,
            pending,
        } => {
            state.restore(subdomains, pending);
            Vec::new()
        }
        Msg::PageNavigated { url } => {
            let Ok(page) = Url::parse(url.trim()) else {
                sweep_debug!("Ignoring navigation to unparseable url {:?}", url);
                return (state, Vec::new());
            };
            let previous = state.session_domain().map(ToOwned::to_owned);
            if state.navigate(page) {
                sweep_info!(
                    "Session boundary {:?} -> {:?}; cleared collected hosts",
                    previous,
                    state.session_domain()
                );
                vec![Effect::DropSnapshot(SnapshotKey::Subdomains)]
            } else {
                Vec::new()
            }
        }
        Msg::UrlObserved { url, source, at } => {
            let mut effects = Vec::new();
            if state.accept(&url, source, at, None) {
                effects.extend(persist_all(&state));
            }
            if source == Source::Url && should_analyze_content(&url) {
                if let Some(target) = absolute_url(&state, &url) {
                    effects.push(Effect::AnalyzeContent { url: target });
                }
            }
            effects
        }
        Msg::TextObserved { text, source, at } => {
            let mut accepted = 0usize;
            for candidate in scan(&text) {
                if state.accept(candidate.text, source, at, None) {
                    accepted += 1;
                }
            }
            if accepted > 0 {
                sweep_debug!("{} new host(s) from {} text", accepted, source);
                persist_all(&state)
            } else {
                Vec::new()
            }
        }
        Msg::CandidatePushed {
            candidate,
            source,
            page_url,
            at,
        } => {
            let origin = page_url.as_deref().and_then(|page| Url::parse(page).ok());
            if state.accept(&candidate, source, at, origin.as_ref()) {
                persist_all(&state)
            } else {
                Vec::new()
            }
        }
        Msg::SyncRequested => {
            let batch_size = state.settings().batch_size;
            match state.queue_mut().begin_batch(batch_size) {
                BatchStart::Started(batch) => {
                    sweep_debug!(
                        "Dispatching batch {} with {} record(s)",
                        batch.id,
                        batch.records.len()
                    );
                    vec![Effect::DispatchBatch(batch)]
                }
                BatchStart::Busy => {
                    sweep_debug!("Sync already in flight; skipping");
                    Vec::new()
                }
                BatchStart::Empty => Vec::new(),
            }
        }
        Msg::SyncFinished { batch_id, outcome } => {
            let max_retries = state.settings().max_retries;
            let Some(reconciliation) = state.queue_mut().complete(batch_id, outcome, max_retries)
            else {
                sweep_warn!("Result for unknown batch {} ignored", batch_id);
                return (state, Vec::new());
            };
            for record in &reconciliation.dropped {
                sweep_warn!(
                    "Dropping {} ({}) after {} failed deliveries",
                    record.domain,
                    record.source,
                    record.retry_count
                );
            }
            match &reconciliation.failure {
                Some(reason) => sweep_warn!(
                    "Batch {} failed: {}; requeued {}, dropped {}",
                    batch_id,
                    reason,
                    reconciliation.requeued,
                    reconciliation.dropped.len()
                ),
                None => sweep_info!(
                    "Batch {} delivered {}; requeued {}",
                    batch_id,
                    reconciliation.acked.len(),
                    reconciliation.requeued
                ),
            }
            state.record_sync(&reconciliation);
            vec![Effect::Persist {
                key: SnapshotKey::PendingSync,
                records: state.queue().snapshot(),
            }]
        }
        Msg::ClearRequested => {
            state.clear();
            vec![
                Effect::DropSnapshot(SnapshotKey::Subdomains),
                Effect::DropSnapshot(SnapshotKey::PendingSync),
            ]
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn persist_all(state: &AppState) -> Vec<Effect> {
    vec![
        Effect::Persist {
            key: SnapshotKey::Subdomains,
            records: state.dedup().records(),
        },
        Effect::Persist {
            key: SnapshotKey::PendingSync,
            records: state.queue().snapshot(),
        },
    ]
}

fn absolute_url(state: &AppState, raw: &str) -> Option<String> {
    let raw = raw.trim();
    match Url::parse(raw) {
        Ok(url) => Some(url.into()),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            state.page()?.join(raw).ok().map(Into::into)
        }
        Err(_) => None,
    }
}
