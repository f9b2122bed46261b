use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use log::LevelFilter;
use sweep_core::Source;
use sweep_logging::{LogDestination, DEFAULT_LOG_FILE};
use url::Url;

#[derive(Debug, Parser)]
#[command(name = "hostsweep", version, about = "Collect subdomains seen while browsing and ship them to a sink")]
pub struct Cli {
    /// Increase verbosity and mirror the log to the terminal (-vv for trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (default: ./hostsweep.ron when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the persisted snapshots
    #[arg(long, global = true)]
    pub state_dir: Option<PathBuf>,

    /// Remote sink endpoint; overrides config and HOSTSWEEP_ENDPOINT
    #[arg(long, global = true)]
    pub endpoint: Option<Url>,

    /// Keep everything in memory for this invocation only
    #[arg(long, global = true)]
    pub ephemeral: bool,

    /// Log file path
    #[arg(long, global = true, default_value = DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load pages, collect their hosts, then sync once
    Visit {
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Read page URLs (or `<markup>` lines) from stdin while syncing periodically
    Run,
    /// Send one batch to the sink now
    Sync,
    /// Show collection and queue statistics
    Status,
    /// List collected hosts
    List {
        /// Only hosts found by this source tag (URL, HTML, JavaScript, ...)
        #[arg(long)]
        source: Option<Source>,
    },
    /// Write the collected hosts to subdomains_<ms>.json
    Export {
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Forget collected hosts and pending records
    Clear,
    /// Check that the sink answers
    Ping,
}

impl Cli {
    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    pub fn log_destination(&self) -> LogDestination {
        if self.verbose == 0 {
            LogDestination::File(self.log_file.clone())
        } else {
            LogDestination::Both(self.log_file.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn list_accepts_any_case_source() {
        let cli = Cli::try_parse_from(["hostsweep", "list", "--source", "javascript"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::List {
                source: Some(Source::JavaScript)
            }
        ));
        assert!(Cli::try_parse_from(["hostsweep", "list", "--source", "smoke"]).is_err());
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let cli = Cli::try_parse_from([
            "hostsweep",
            "sync",
            "--endpoint",
            "https://sink.example.com/exec",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.log_level(), LevelFilter::Trace);
        assert!(cli.endpoint.is_some());
        assert_eq!(
            cli.log_destination(),
            LogDestination::Both(PathBuf::from(DEFAULT_LOG_FILE))
        );
    }

    #[test]
    fn visit_requires_a_url() {
        assert!(Cli::try_parse_from(["hostsweep", "visit"]).is_err());
    }
}
