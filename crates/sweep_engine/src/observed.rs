use std::sync::Arc;

use sweep_core::Source;

use crate::fetch::ContentFetcher;
use crate::{FetchError, FetchOutput};

/// Receives the target URL of every request made through an
/// [`ObservingFetcher`].
pub trait RequestObserver: Send + Sync {
    fn request_observed(&self, url: &str, source: Source);
}

/// Decorator that reports each request target before delegating to the
/// wrapped client. The report happens even when the request then fails.
pub struct ObservingFetcher {
    inner: Arc<dyn ContentFetcher>,
    observer: Arc<dyn RequestObserver>,
    source: Source,
}

impl ObservingFetcher {
    pub fn new(
        inner: Arc<dyn ContentFetcher>,
        observer: Arc<dyn RequestObserver>,
        source: Source,
    ) -> Self {
        Self {
            inner,
            observer,
            source,
        }
    }
}

#[async_trait::async_trait]
impl ContentFetcher for ObservingFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchOutput, FetchError> {
        self.observer.request_observed(url, self.source);
        self.inner.fetch(url).await
    }
}
