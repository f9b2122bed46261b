//! Event bus between the page collaborator and the collector.
//!
//! Events are handled one at a time, each to completion, in the order they
//! were sent. The sync timer runs beside the bus and finishes each cycle
//! before it looks at the clock again; the queue's in-flight flag keeps its
//! cycles from overlapping with manual ones.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use sweep_core::{Msg, Source};
use sweep_logging::{sweep_debug, sweep_info, sweep_warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::collector::{Collector, SyncReport};
use crate::markup::MarkupWalker;
use crate::observed::RequestObserver;
use crate::Observation;

/// Cheap to clone; every producer gets its own.
#[derive(Clone)]
pub struct BusHandle {
    tx: mpsc::UnboundedSender<Msg>,
    collector: Arc<Collector>,
}

impl BusHandle {
    /// Returns false once the bus has shut down.
    pub fn send(&self, msg: Msg) -> bool {
        self.tx.send(msg).is_ok()
    }

    pub fn observe(&self, observation: Observation) -> bool {
        self.send(observation.into_msg(self.collector.now()))
    }

    pub fn navigate(&self, url: impl Into<String>) -> bool {
        self.send(Msg::PageNavigated { url: url.into() })
    }

    /// Markup inserted into the live page.
    pub fn observe_fragment(&self, html: &str) -> bool {
        MarkupWalker::new()
            .walk_fragment(html)
            .into_iter()
            .all(|observation| self.observe(observation))
    }

    pub fn push_candidate(
        &self,
        candidate: impl Into<String>,
        source: Source,
        page_url: Option<String>,
    ) -> bool {
        self.send(Msg::CandidatePushed {
            candidate: candidate.into(),
            source,
            page_url,
            at: self.collector.now(),
        })
    }

    /// Manual trigger; runs on the caller's task.
    pub async fn sync_now(&self) -> SyncReport {
        self.collector.run_sync_cycle().await
    }
}

impl RequestObserver for BusHandle {
    fn request_observed(&self, url: &str, source: Source) {
        if !self.observe(Observation::url(url, source)) {
            sweep_debug!("Bus closed; request to {} not recorded", url);
        }
    }
}

/// Request observer for clients built before the bus they report to; the
/// collector owns its fetcher, so the bus handle arrives later.
#[derive(Default)]
pub struct DeferredObserver {
    handle: OnceLock<BusHandle>,
}

impl DeferredObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when a handle was already attached.
    pub fn attach(&self, handle: BusHandle) -> bool {
        self.handle.set(handle).is_ok()
    }
}

impl RequestObserver for DeferredObserver {
    fn request_observed(&self, url: &str, source: Source) {
        match self.handle.get() {
            Some(handle) => handle.request_observed(url, source),
            None => sweep_debug!("No bus attached; request to {} not recorded", url),
        }
    }
}

pub struct EventBus {
    handle: BusHandle,
    cancel: CancellationToken,
    dispatcher: JoinHandle<()>,
    ticker: JoinHandle<()>,
}

impl EventBus {
    /// Starts the dispatcher and the sync timer on the current runtime.
    pub fn spawn(collector: Arc<Collector>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let interval = collector.settings().sync_interval;

        let dispatcher = tokio::spawn(dispatch_loop(collector.clone(), rx, cancel.clone()));
        let ticker = tokio::spawn(sync_timer(collector.clone(), interval, cancel.clone()));

        Self {
            handle: BusHandle { tx, collector },
            cancel,
            dispatcher,
            ticker,
        }
    }

    pub fn handle(&self) -> BusHandle {
        self.handle.clone()
    }

    /// Stops the timer once any timed cycle under way has reconciled, finishes
    /// every event already sent, then runs one last sync cycle.
    pub async fn shutdown(self) -> SyncReport {
        self.cancel.cancel();
        if let Err(err) = self.ticker.await {
            sweep_warn!("Sync timer ended abnormally: {}", err);
        }
        if let Err(err) = self.dispatcher.await {
            sweep_warn!("Event dispatcher ended abnormally: {}", err);
        }
        let report = self.handle.collector.run_sync_cycle().await;
        sweep_info!("Event bus stopped; final sync {:?}", report);
        report
    }
}

async fn dispatch_loop(
    collector: Arc<Collector>,
    mut rx: mpsc::UnboundedReceiver<Msg>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            msg = rx.recv() => match msg {
                Some(msg) => collector.handle(msg).await,
                None => return,
            },
            _ = cancel.cancelled() => break,
        }
    }
    rx.close();
    while let Some(msg) = rx.recv().await {
        collector.handle(msg).await;
    }
}

async fn sync_timer(collector: Arc<Collector>, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    interval.tick().await;
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                let report = collector.run_sync_cycle().await;
                sweep_debug!("Timed sync: {:?}", report);
            }
        }
    }
}
