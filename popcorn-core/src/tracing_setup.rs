//! Log output for the popcorn binary.
//!
//! The terminal only shows what the user asked for. A second sink keeps
//! every popcorn event of the current run on disk, which is where request
//! generations and discarded responses can be followed after the fact.

use std::fs::{File, create_dir_all};
use std::path::{Path, PathBuf};

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

/// Name of the per-run log file inside the logs directory.
pub const RUN_LOG_FILE: &str = "popcorn-last-run.log";

/// Popcorn crates at trace, dependencies at info.
const RUN_LOG_DIRECTIVES: &str = "info,popcorn_core=trace,popcorn_search=trace,popcorn=trace";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn terminal_layer(level: Level) -> BoxedLayer {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    fmt::layer()
        .compact()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(filter)
        .boxed()
}

fn run_log_layer(file: File) -> BoxedLayer {
    fmt::layer()
        .with_ansi(false)
        .with_file(true)
        .with_line_number(true)
        .with_writer(file)
        .with_filter(EnvFilter::new(RUN_LOG_DIRECTIVES))
        .boxed()
}

/// Installs the global subscriber and returns the path of the run log.
///
/// `RUN_LOG_FILE` is created in `logs_dir` (default `./logs`) and truncated
/// on every run. `RUST_LOG` overrides `console_level` for the terminal only.
///
/// # Errors
///
/// - `Box<dyn std::error::Error>` - If the logs directory or the log file cannot be created
pub fn init_tracing(
    console_level: Level,
    logs_dir: Option<&Path>,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let logs_dir = logs_dir.unwrap_or_else(|| Path::new("logs"));
    create_dir_all(logs_dir)?;

    let run_log = logs_dir.join(RUN_LOG_FILE);
    let file = File::create(&run_log)?;

    tracing_subscriber::registry()
        .with(vec![terminal_layer(console_level), run_log_layer(file)])
        .try_init()?;

    tracing::debug!(console = %console_level, run_log = %run_log.display(), "Logging ready");
    Ok(run_log)
}

/// Verbosity accepted by `--log-level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliLogLevel {
    /// Failures only
    Error,
    /// Recoverable problems such as an unreadable watched list
    Warn,
    /// Session start and stop
    Info,
    /// Every search and detail transition
    Debug,
    /// Also discarded responses of superseded requests
    Trace,
}

impl CliLogLevel {
    /// The `tracing` level this flag value stands for.
    ///
    /// # Examples
    /// ```
    /// use popcorn_core::tracing_setup::CliLogLevel;
    ///
    /// assert_eq!(CliLogLevel::Debug.as_tracing_level(), tracing::Level::DEBUG);
    /// ```
    pub fn as_tracing_level(self) -> Level {
        Level::from(self)
    }
}

impl From<CliLogLevel> for Level {
    fn from(level: CliLogLevel) -> Self {
        match level {
            CliLogLevel::Error => Level::ERROR,
            CliLogLevel::Warn => Level::WARN,
            CliLogLevel::Info => Level::INFO,
            CliLogLevel::Debug => Level::DEBUG,
            CliLogLevel::Trace => Level::TRACE,
        }
    }
}
