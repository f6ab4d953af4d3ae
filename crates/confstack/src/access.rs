//! Access-event reporting.
//!
//! Every reader operation can synthesize an [`AccessEvent`]: what was asked
//! (kind, key, type, call site), what each consulted provider answered, any
//! conversion failure, and the result the caller actually observed. A
//! configured [`AccessReporter`] receives the event; reporters must never
//! fail into the read path.
//!
//! Three reporters ship with the crate:
//!
//! - [`BroadcastingAccessReporter`] fans out to several upstreams;
//! - [`LoggingAccessReporter`] emits one structured `tracing` record per
//!   event;
//! - [`FileAccessLogger`] appends single-line records to a file, suitable
//!   for auditing which configuration a process actually read.

use std::fmt::Write as _;
use std::fs::{File, OpenOptions};
use std::io::Write as _;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::SystemTime;

use parking_lot::Mutex;
use tracing::Level;

use crate::error::ConfigError;
use crate::key::AbsoluteConfigKey;
use crate::provider::ProviderOutcome;
use crate::value::{ConfigType, ConfigValue};

/// Environment variable that activates the process-wide file access logger.
pub const ACCESS_LOG_FILE_ENV: &str = "CONFIG_ACCESS_LOG_FILE";

/// Which reader entry point produced an event.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AccessKind {
    /// Synchronous snapshot read.
    Get,
    /// One-shot async fetch.
    Fetch,
    /// Delivered element of a continuous watch.
    Watch,
}

impl std::fmt::Display for AccessKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessKind::Get => write!(f, "get"),
            AccessKind::Fetch => write!(f, "fetch"),
            AccessKind::Watch => write!(f, "watch"),
        }
    }
}

/// Invocation metadata of one logical read.
#[derive(Clone, Debug)]
pub struct AccessEventMetadata {
    /// The access mode.
    pub kind: AccessKind,

    /// The absolute key that was read.
    pub key: AbsoluteConfigKey,

    /// The requested value type.
    pub value_type: ConfigType,

    /// The call site of the reader operation.
    pub source_location: &'static Location<'static>,

    /// When the read completed.
    pub timestamp: SystemTime,
}

/// A structured record of one logical configuration read.
#[derive(Clone, Debug)]
pub struct AccessEvent {
    /// Invocation metadata.
    pub metadata: AccessEventMetadata,

    /// Per-provider outcomes, in consultation order.
    pub provider_results: Vec<ProviderOutcome>,

    /// Conversion failure, if the resolved value did not fit the caller's
    /// type.
    pub conversion_error: Option<ConfigError>,

    /// The result the caller observes: a value, an absence (after defaults
    /// are applied this is what the fallback replaced), or an error.
    pub result: Result<Option<ConfigValue>, ConfigError>,
}

impl AccessEvent {
    /// The provider whose value won the read, if any.
    #[must_use]
    pub fn winning_provider(&self) -> Option<&str> {
        self.provider_results
            .iter()
            .rev()
            .find(|outcome| {
                matches!(&outcome.result, Ok(lookup) if lookup.value.is_some())
            })
            .map(|outcome| outcome.provider_name.as_str())
    }
}

/// Receives access events. Implementations must not fail into the caller's
/// read path.
pub trait AccessReporter: Send + Sync {
    /// Reports one event.
    fn report(&self, event: &AccessEvent);
}

// ============================================================================
// Broadcasting reporter
// ============================================================================

/// Forwards every event to each upstream reporter in order.
pub struct BroadcastingAccessReporter {
    upstreams: Vec<Arc<dyn AccessReporter>>,
}

impl std::fmt::Debug for BroadcastingAccessReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BroadcastingAccessReporter")
            .field("upstreams", &self.upstreams.len())
            .finish()
    }
}

impl BroadcastingAccessReporter {
    /// Builds a broadcaster over a non-empty upstream list.
    ///
    /// # Errors
    ///
    /// Rejects an empty list.
    pub fn new(upstreams: Vec<Arc<dyn AccessReporter>>) -> Result<Self, ConfigError> {
        if upstreams.is_empty() {
            return Err(ConfigError::EmptyReporterList);
        }
        Ok(Self { upstreams })
    }
}

impl AccessReporter for BroadcastingAccessReporter {
    fn report(&self, event: &AccessEvent) {
        for upstream in &self.upstreams {
            upstream.report(event);
        }
    }
}

// ============================================================================
// Logging reporter
// ============================================================================

/// Emits one structured `tracing` record per event.
pub struct LoggingAccessReporter {
    level: Level,
    counter: AtomicU64,
}

impl LoggingAccessReporter {
    /// A reporter logging at DEBUG.
    #[must_use]
    pub fn new() -> Self {
        Self::with_level(Level::DEBUG)
    }

    /// A reporter logging at the given level.
    #[must_use]
    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            counter: AtomicU64::new(0),
        }
    }
}

impl Default for LoggingAccessReporter {
    fn default() -> Self {
        Self::new()
    }
}

fn render_providers(outcomes: &[ProviderOutcome]) -> String {
    let mut out = String::new();
    for (i, outcome) in outcomes.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        match &outcome.result {
            Ok(lookup) => {
                let rendered = lookup
                    .value
                    .as_ref()
                    .map_or_else(|| "none".to_string(), ToString::to_string);
                let _ = write!(
                    out,
                    "{}[{}]={rendered}",
                    outcome.provider_name, lookup.encoded_key
                );
            }
            Err(e) => {
                let _ = write!(out, "{}=error({e})", outcome.provider_name);
            }
        }
    }
    out
}

fn render_result(result: &Result<Option<ConfigValue>, ConfigError>) -> String {
    match result {
        Ok(Some(value)) => value.to_string(),
        Ok(None) => "none".to_string(),
        Err(e) => format!("error({e})"),
    }
}

impl AccessReporter for LoggingAccessReporter {
    fn report(&self, event: &AccessEvent) {
        let counter = self.counter.fetch_add(1, Ordering::Relaxed);
        let providers = render_providers(&event.provider_results);
        let value = render_result(&event.result);
        let conversion = event
            .conversion_error
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();

        macro_rules! emit {
            ($level:expr) => {
                tracing::event!(
                    $level,
                    kind = %event.metadata.kind,
                    key = %event.metadata.key,
                    value_type = %event.metadata.value_type,
                    location = %event.metadata.source_location,
                    counter,
                    value = %value,
                    providers = %providers,
                    conversion_error = %conversion,
                    "config access"
                )
            };
        }

        // tracing's event macro needs a const level, so dispatch explicitly.
        if self.level == Level::TRACE {
            emit!(Level::TRACE);
        } else if self.level == Level::DEBUG {
            emit!(Level::DEBUG);
        } else if self.level == Level::INFO {
            emit!(Level::INFO);
        } else if self.level == Level::WARN {
            emit!(Level::WARN);
        } else {
            emit!(Level::ERROR);
        }
    }
}

// ============================================================================
// File access logger
// ============================================================================

/// Appends one line per access event to a log file.
///
/// Lines carry a status glyph (`✅` provider hit, `🟡` default/absent/
/// conversion fallback, `❌` error), the key, the rendered value (secrets
/// redacted), attribution, kind, type, call site, and an ISO-8601 timestamp.
pub struct FileAccessLogger {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileAccessLogger {
    /// Opens (appending) the log file, creating parent directories as
    /// needed, and writes a header line identifying this process.
    ///
    /// # Errors
    ///
    /// Propagates file creation and write failures.
    pub fn create(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;

        writeln!(
            file,
            "# config access log - {} (pid {}) opened {}",
            process_name(),
            std::process::id(),
            iso8601(SystemTime::now()),
        )?;
        file.flush()?;

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// The log file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The process-wide logger configured through
    /// [`ACCESS_LOG_FILE_ENV`], if that variable is set and the file is
    /// writable.
    ///
    /// The logger is constructed lazily once; later calls return the same
    /// instance. It is never attached to a reader automatically.
    pub fn try_from_environment() -> Option<Arc<FileAccessLogger>> {
        static SINGLETON: OnceLock<Option<Arc<FileAccessLogger>>> = OnceLock::new();

        SINGLETON
            .get_or_init(|| {
                let path = std::env::var_os(ACCESS_LOG_FILE_ENV)?;
                match FileAccessLogger::create(PathBuf::from(path)) {
                    Ok(logger) => Some(Arc::new(logger)),
                    Err(e) => {
                        eprintln!("confstack: cannot open access log: {e}");
                        None
                    }
                }
            })
            .clone()
    }

    fn format_line(event: &AccessEvent) -> String {
        let (glyph, rendered, attribution) = match &event.result {
            Err(e) => ("❌", format!("error({e})"), "error".to_string()),

            Ok(Some(value)) => match event.winning_provider() {
                Some(provider) if event.conversion_error.is_none() => {
                    ("✅", value.to_string(), format!("from {provider}"))
                }
                _ => ("🟡", value.to_string(), "default".to_string()),
            },

            Ok(None) => ("🟡", "none".to_string(), "absent".to_string()),
        };

        format!(
            "{glyph} {key}={rendered} [{attribution}] kind={kind} type={ty} at {location} {ts}",
            key = event.metadata.key,
            kind = event.metadata.kind,
            ty = event.metadata.value_type,
            location = event.metadata.source_location,
            ts = iso8601(event.metadata.timestamp),
        )
    }
}

impl AccessReporter for FileAccessLogger {
    fn report(&self, event: &AccessEvent) {
        let line = Self::format_line(event);

        let mut file = self.file.lock();
        if let Err(e) = writeln!(file, "{line}").and_then(|()| file.flush()) {
            eprintln!("confstack: access log write failed: {e}");
        }
    }
}

impl Drop for FileAccessLogger {
    fn drop(&mut self) {
        let _ = self.file.lock().flush();
    }
}

fn process_name() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "unknown".to_string())
}

fn iso8601(ts: SystemTime) -> String {
    chrono::DateTime::<chrono::Utc>::from(ts).to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
