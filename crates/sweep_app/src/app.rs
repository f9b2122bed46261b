use std::sync::Arc;

use anyhow::{bail, Context, Result};
use sweep_core::{CollectorView, Source, SyncSummary};
use sweep_engine::{
    Collector, ContentFetcher, DeferredObserver, EventBus, FileStore, HttpSink, KeyValueStore,
    MemoryStore, Observation, ObservingFetcher, RemoteSink, RequestObserver, ReqwestFetcher,
    SyncReport,
};
use sweep_logging::{sweep_info, sweep_warn};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::cli::{Cli, Command};
use crate::config::{apply_endpoint_env, load_config, AppConfig, ENDPOINT_ENV};

pub async fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(&cli)?;
    let has_endpoint = config.sink.endpoint.is_some();
    // In a live session the content-analysis client reports its own requests.
    let requests = Arc::new(DeferredObserver::new());
    let observer = matches!(cli.command, Command::Run)
        .then(|| requests.clone() as Arc<dyn RequestObserver>);
    let collector = build_collector(&config, cli.ephemeral, observer)?;
    collector
        .restore()
        .context("restoring persisted snapshots")?;

    match cli.command {
        Command::Visit { urls } => {
            for url in &urls {
                if let Err(err) = collector.visit(url).await {
                    sweep_warn!("Could not load {}: {}", url, err);
                    eprintln!("{url}: {err}");
                }
            }
            if has_endpoint {
                print_report(&collector.run_sync_cycle().await);
            } else {
                sweep_info!("No sink endpoint configured; records stay queued");
            }
            print_status(&collector.view());
        }
        Command::Run => {
            if !has_endpoint {
                bail!("`run` needs a sink endpoint (config sink.endpoint, {ENDPOINT_ENV}, or --endpoint)");
            }
            run_stdin_session(collector, &requests).await?;
        }
        Command::Sync => {
            if !has_endpoint {
                bail!("no sink endpoint configured");
            }
            print_report(&collector.run_sync_cycle().await);
        }
        Command::Status => print_status(&collector.view()),
        Command::List { source } => {
            for record in collector.records(source) {
                println!("{}\t{}", record.domain, record.source);
            }
        }
        Command::Export { out } => {
            let path = collector
                .export_to(&out)
                .with_context(|| format!("exporting to {}", out.display()))?;
            println!("{}", path.display());
        }
        Command::Clear => {
            collector.clear();
            println!("cleared");
        }
        Command::Ping => {
            let health = collector.ping().await.context("sink health check")?;
            match health.timestamp {
                Some(at) => println!("{} ({at})", health.status),
                None => println!("{}", health.status),
            }
        }
    }
    Ok(())
}

fn resolve_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = load_config(cli.config.as_deref())?;
    let env_endpoint = std::env::var(ENDPOINT_ENV).ok();
    apply_endpoint_env(&mut config, env_endpoint.as_deref())?;
    if let Some(endpoint) = &cli.endpoint {
        config.sink.endpoint = Some(endpoint.clone());
    }
    if let Some(dir) = &cli.state_dir {
        config.state_dir = dir.clone();
    }
    Ok(config)
}

fn build_collector(
    config: &AppConfig,
    ephemeral: bool,
    observer: Option<Arc<dyn RequestObserver>>,
) -> Result<Arc<Collector>> {
    let store: Arc<dyn KeyValueStore> = if ephemeral {
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(FileStore::new(config.state_dir.clone()))
    };
    let sink: Arc<dyn RemoteSink> =
        Arc::new(HttpSink::new(&config.sink).context("building sink client")?);
    let mut fetcher: Arc<dyn ContentFetcher> =
        Arc::new(ReqwestFetcher::new(config.fetch.to_settings()));
    if let Some(observer) = observer {
        fetcher = Arc::new(ObservingFetcher::new(fetcher, observer, Source::Fetch));
    }
    Ok(Arc::new(Collector::new(
        config.collector.clone(),
        store,
        sink,
        fetcher,
    )))
}

/// Each stdin line is a navigation, or inserted markup when it starts with
/// `<`. Ends on EOF or Ctrl-C.
async fn run_stdin_session(collector: Arc<Collector>, requests: &DeferredObserver) -> Result<()> {
    let bus = EventBus::spawn(collector);
    let handle = bus.handle();
    requests.attach(bus.handle());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("reading stdin")? else {
                    break;
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line.starts_with('<') {
                    handle.observe_fragment(line);
                } else {
                    handle.navigate(line);
                    handle.observe(Observation::url(line, Source::Url));
                }
            }
            _ = tokio::signal::ctrl_c() => {
                sweep_info!("Interrupted; flushing");
                break;
            }
        }
    }

    print_report(&bus.shutdown().await);
    Ok(())
}

fn print_report(report: &SyncReport) {
    match report {
        SyncReport::Idle => println!("sync: nothing pending"),
        SyncReport::Busy => println!("sync: a batch is already in flight"),
        SyncReport::Completed(summary) => print_summary(summary),
    }
}

fn print_summary(summary: &SyncSummary) {
    let SyncSummary {
        batch_id,
        acked,
        requeued,
        dropped,
        failure,
    } = summary;
    match failure {
        Some(reason) => println!(
            "sync: batch {batch_id} failed ({reason}); requeued {requeued}, dropped {dropped}"
        ),
        None => println!("sync: batch {batch_id} delivered {acked}, requeued {requeued}"),
    }
}

fn print_status(view: &CollectorView) {
    println!(
        "session: {}",
        view.session_domain.as_deref().unwrap_or("-")
    );
    println!("hosts:   {}", view.total);
    for (source, count) in &view.per_source {
        println!("  {source:<10} {count}");
    }
    println!("pending: {}", view.pending);
    println!("sending: {}", view.in_flight);
    if let Some(summary) = &view.last_sync {
        print_summary(summary);
    }
}
