//! Structured logging.
//!
//! # Responsibilities
//! - Map the five abstract severities onto the tracing backend
//! - Initialize the subscriber (env-filter + fmt layer)
//! - Keep file output reopenable so log rotation needs no restart
//!
//! # Design Decisions
//! - tracing has no level above ERROR, so Critical emits at ERROR tagged
//!   with `severity = "critical"`; the other four map one-to-one
//! - `RUST_LOG` overrides the configured level when set
//! - The file writer swaps its handle atomically on reopen; in-flight
//!   writes finish on the old handle

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use arc_swap::ArcSwap;
use thiserror::Error;
use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::schema::LogConfig;

/// Abstract log severities, ordered from most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Critical,
    Error,
    Warning,
    Info,
    Debug,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
            Severity::Debug => "debug",
        }
    }

    /// The tracing level this severity emits at.
    pub fn level(&self) -> Level {
        match self {
            Severity::Critical | Severity::Error => Level::ERROR,
            Severity::Warning => Level::WARN,
            Severity::Info => Level::INFO,
            Severity::Debug => Level::DEBUG,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for unrecognized severity names.
#[derive(Debug, Error)]
#[error("unknown severity {0:?}")]
pub struct ParseSeverityError(String);

impl FromStr for Severity {
    type Err = ParseSeverityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "critical" => Ok(Severity::Critical),
            "error" => Ok(Severity::Error),
            "warning" | "warn" => Ok(Severity::Warning),
            "info" => Ok(Severity::Info),
            "debug" => Ok(Severity::Debug),
            _ => Err(ParseSeverityError(s.to_string())),
        }
    }
}

/// Log `message` at the given severity.
pub fn emit(severity: Severity, message: &str) {
    match severity {
        Severity::Critical => tracing::error!(severity = "critical", "{}", message),
        Severity::Error => tracing::error!("{}", message),
        Severity::Warning => tracing::warn!("{}", message),
        Severity::Info => tracing::info!("{}", message),
        Severity::Debug => tracing::debug!("{}", message),
    }
}

/// Log an error-severity record with the failure's full source chain
/// attached, the moral equivalent of logging an exception with its
/// traceback.
pub fn emit_exception(message: &str, error: &(dyn std::error::Error + 'static)) {
    tracing::error!(error = %error_chain(error), "{}", message);
}

/// Render an error and its sources as `"outer: middle: root"`.
pub fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}

/// Error type for logging initialization.
#[derive(Debug, Error)]
pub enum LogInitError {
    #[error(transparent)]
    Level(#[from] ParseSeverityError),

    #[error("failed to open log file: {0}")]
    Io(#[from] io::Error),
}

/// Handle to the active log output. Cloneable; all clones share the same
/// underlying writer.
#[derive(Clone)]
pub struct LogHandle {
    file: Option<ReopenableFile>,
}

impl LogHandle {
    /// Reopen every output capable of reopening (the file writer). After
    /// a rotation this releases the renamed file and continues into a
    /// fresh one at the configured path. A no-op when logging to stderr.
    pub fn reopen(&self) -> io::Result<()> {
        match &self.file {
            Some(file) => file.reopen(),
            None => Ok(()),
        }
    }

    /// Whether this handle has a reopenable file output.
    pub fn has_file(&self) -> bool {
        self.file.is_some()
    }
}

/// The default handle has no file output, so [`reopen`] is a no-op.
/// What [`init`] returns when no log path is configured.
///
/// [`reopen`]: LogHandle::reopen
impl Default for LogHandle {
    fn default() -> Self {
        Self { file: None }
    }
}

/// File writer whose handle can be swapped while the subscriber keeps
/// writing through it.
#[derive(Clone)]
struct ReopenableFile {
    path: Arc<PathBuf>,
    file: Arc<ArcSwap<File>>,
}

impl ReopenableFile {
    fn create(path: &Path) -> io::Result<Self> {
        let file = open_log_file(path)?;
        Ok(Self {
            path: Arc::new(path.to_path_buf()),
            file: Arc::new(ArcSwap::from_pointee(file)),
        })
    }

    fn reopen(&self) -> io::Result<()> {
        let fresh = open_log_file(&self.path)?;
        self.file.store(Arc::new(fresh));
        Ok(())
    }
}

fn open_log_file(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Writes to whichever file handle was current when the record started.
struct SwappedWriter(Arc<File>);

impl Write for SwappedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (&*self.0).write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        (&*self.0).flush()
    }
}

impl<'a> MakeWriter<'a> for ReopenableFile {
    type Writer = SwappedWriter;

    fn make_writer(&'a self) -> Self::Writer {
        SwappedWriter(self.file.load_full())
    }
}

/// Install the global subscriber per the log settings and return the
/// handle for later reopening. Call once, before anything logs.
pub fn init(settings: &LogConfig) -> Result<LogHandle, LogInitError> {
    let level: Severity = settings.level.parse()?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "stashd={}",
            level.level().as_str().to_ascii_lowercase()
        ))
    });

    match &settings.path {
        Some(path) => {
            let file = ReopenableFile::create(path)?;
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(file.clone()),
                )
                .init();
            Ok(LogHandle { file: Some(file) })
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
                .init();
            Ok(LogHandle { file: None })
        }
    }
}
