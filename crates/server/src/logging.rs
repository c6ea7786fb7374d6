//! Tracing setup.
//!
//! The server logs JSON (or pretty text) to `<data dir>/logs/server.log`;
//! the one-shot notify command logs to stderr so it never touches the data
//! dir.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::paths;

const DEFAULT_FILTER: &str = "info,tower_http=warn,hyper=warn";
const LOG_FILE: &str = "server.log";

pub struct LoggingHandle {
    pub run_id: String,
    pub guard: WorkerGuard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum LogDestination {
    Stderr,
    File(PathBuf),
}

impl LogDestination {
    /// Pick the destination, creating `log_dir` only for file output.
    fn prepare(to_stderr: bool, log_dir: &Path) -> std::io::Result<Self> {
        if to_stderr {
            return Ok(Self::Stderr);
        }
        std::fs::create_dir_all(log_dir)?;
        Ok(Self::File(log_dir.join(LOG_FILE)))
    }

    fn writer(&self) -> (NonBlocking, WorkerGuard) {
        match self {
            Self::Stderr => tracing_appender::non_blocking(std::io::stderr()),
            Self::File(path) => {
                let dir = path.parent().unwrap_or_else(|| Path::new("."));
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, LOG_FILE))
            }
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Stderr => "stderr".to_string(),
            Self::File(path) => path.display().to_string(),
        }
    }
}

/// `CC_SLACK_LOG_FILTER`, then `RUST_LOG`, then the default.
fn env_filter() -> (EnvFilter, String) {
    std::env::var("CC_SLACK_LOG_FILTER")
        .ok()
        .and_then(|value| EnvFilter::try_new(&value).ok().map(|f| (f, value)))
        .or_else(|| {
            let value = std::env::var("RUST_LOG").ok()?;
            EnvFilter::try_new(&value).ok().map(|f| (f, value))
        })
        .unwrap_or_else(|| (EnvFilter::new(DEFAULT_FILTER), DEFAULT_FILTER.to_string()))
}

fn run_id() -> String {
    std::env::var("CC_SLACK_RUN_ID").unwrap_or_else(|_| {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        format!("pid-{}-{}", std::process::id(), now)
    })
}

/// Install the global subscriber.
pub fn init_logging(to_stderr: bool) -> anyhow::Result<LoggingHandle> {
    let destination = LogDestination::prepare(to_stderr, &paths::log_dir())?;
    let (writer, guard) = destination.writer();
    let (filter, filter_source) = env_filter();
    let format = std::env::var("CC_SLACK_LOG_FORMAT").unwrap_or_else(|_| "json".into());

    let registry = tracing_subscriber::registry().with(filter);
    if format.eq_ignore_ascii_case("pretty") {
        registry
            .with(
                fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .pretty()
                    .with_file(true)
                    .with_line_number(true)
                    .with_target(true),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_writer(writer)
                    .json()
                    .flatten_event(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_target(true)
                    .with_current_span(true),
            )
            .init();
    }

    let run_id = run_id();
    tracing::info!(
        component = "logging",
        event = "logging.initialized",
        run_id = %run_id,
        destination = %destination.describe(),
        format = %format,
        filter = %filter_source,
    );

    Ok(LoggingHandle { run_id, guard })
}
