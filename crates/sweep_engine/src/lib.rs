//! Hostsweep engine: IO around the core pipeline and effect execution.
mod bus;
mod collector;
mod decode;
mod export;
mod fetch;
mod markup;
mod observed;
mod persist;
mod sink;
mod store;
mod types;

pub use bus::{BusHandle, DeferredObserver, EventBus};
pub use collector::{system_clock, Clock, Collector, CollectorSettings, SyncReport};
pub use decode::{decode_text, DecodedText};
pub use export::{
    build_export, export_filename, format_timestamp, write_export, ExportDocument, ExportEntry,
    ExportError,
};
pub use fetch::{ContentFetcher, FetchSettings, ReqwestFetcher};
pub use markup::{MarkupWalker, URL_ATTRIBUTES};
pub use observed::{ObservingFetcher, RequestObserver};
pub use persist::{ensure_dir, AtomicFileWriter, PersistError};
pub use sink::{HttpSink, RemoteSink, SinkAck, SinkError, SinkHealth, SinkSettings};
pub use store::{load_records, save_records, FileStore, KeyValueStore, MemoryStore, StoreError};
pub use types::{FailureKind, FetchError, FetchMetadata, FetchOutput, Observation};
