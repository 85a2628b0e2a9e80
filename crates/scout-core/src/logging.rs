//! Structured logging schema, field name constants, and subscriber setup.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation can query by the same names across the ranking,
//! session, and dispatch subsystems.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events, turn completions |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-candidate and per-dimension iteration |

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::defaults;
use crate::error::{Error, Result};

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID of one inbound turn.
/// Format: UUIDv7 (time-ordered).
pub const TURN_ID: &str = "turn_id";

/// Subsystem originating the log event.
/// Values: "search", "session", "db", "jobs"
pub const SUBSYSTEM: &str = "subsystem";

/// Logical operation name.
/// Examples: "rank", "commit_page", "dispatch", "new_query"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Opaque conversation key (sender, optionally scoped by room).
pub const CONVERSATION_KEY: &str = "conversation_key";

/// Sender of an inbound message.
pub const SENDER_ID: &str = "sender_id";

/// Candidate record id.
pub const CANDIDATE_ID: &str = "candidate_id";

/// Scoring dimension name.
pub const DIMENSION: &str = "dimension";

/// Conversation phase.
pub const PHASE: &str = "phase";

/// Contact-flow step.
pub const CONTACT_STEP: &str = "contact_step";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Candidates in the fetched pool.
pub const POOL_SIZE: &str = "pool_size";

/// Candidates on the current page.
pub const PAGE_SIZE: &str = "page_size";

/// Pagination offset.
pub const OFFSET: &str = "offset";

/// Aggregate candidate score.
pub const SCORE: &str = "score";

/// Number of clauses in a structural filter.
pub const CLAUSE_COUNT: &str = "clause_count";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

// ─── Subscriber setup ──────────────────────────────────────────────────────

/// Output format of the fmt layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Subscriber settings.
#[derive(Debug, Clone, Default)]
pub struct LogSettings {
    pub format: LogFormat,
    /// Log file path; stdout when `None`.
    pub file: Option<PathBuf>,
    /// Force ANSI colors on or off; auto-detected when `None`.
    pub ansi: Option<bool>,
}

impl LogSettings {
    /// Read settings from the environment.
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `LOG_FORMAT` | `text` | `text` or `json` |
    /// | `LOG_FILE` | unset | Daily-rotated log file path |
    /// | `LOG_ANSI` | auto | `true`/`false` color override |
    pub fn from_env() -> Self {
        let format = match std::env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };
        let file = std::env::var("LOG_FILE").ok().map(PathBuf::from);
        let ansi = std::env::var("LOG_ANSI")
            .ok()
            .map(|v| v == "true" || v == "1");
        Self { format, file, ansi }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }
}

/// Install the global tracing subscriber.
///
/// Uses `RUST_LOG` when set, otherwise [`defaults::LOG_FILTER`]. Returns the
/// appender guard when logging to a file; it must be kept alive for the
/// lifetime of the process. Fails if a global subscriber is already set.
pub fn init_tracing(settings: &LogSettings) -> Result<Option<WorkerGuard>> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(defaults::LOG_FILTER));
    let registry = tracing_subscriber::registry().with(env_filter);

    let init_err = |e: tracing_subscriber::util::TryInitError| Error::Config(e.to_string());

    match &settings.file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(std::path::Path::new("."));
            let name = path
                .file_name()
                .and_then(|f| f.to_str())
                .unwrap_or("talentscout.log");
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, name));

            match settings.format {
                LogFormat::Json => registry
                    .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
                    .try_init()
                    .map_err(init_err)?,
                LogFormat::Text => registry
                    .with(
                        tracing_subscriber::fmt::layer()
                            .with_ansi(settings.ansi.unwrap_or(false))
                            .with_writer(writer),
                    )
                    .try_init()
                    .map_err(init_err)?,
            }
            Ok(Some(guard))
        }
        None => {
            match settings.format {
                LogFormat::Json => registry
                    .with(tracing_subscriber::fmt::layer().json())
                    .try_init()
                    .map_err(init_err)?,
                LogFormat::Text => {
                    let mut layer = tracing_subscriber::fmt::layer();
                    if let Some(ansi) = settings.ansi {
                        layer = layer.with_ansi(ansi);
                    }
                    registry.with(layer).try_init().map_err(init_err)?
                }
            }
            Ok(None)
        }
    }
}
