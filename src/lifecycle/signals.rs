//! OS signal handling.
//!
//! # Responsibilities
//! - Name every portable POSIX signal (constant table, no lazy globals)
//! - Carry the explicit signal → action registration table
//! - Arm handlers through Tokio's async-safe signal streams
//!
//! # Design Decisions
//! - Actions are registered up front in a [`SignalTable`]; nothing is
//!   discovered at runtime
//! - Signals without a registered action keep their default disposition
//! - SIGXFSZ is forced to ignored before the table is armed: a storage
//!   hitting the file-size rlimit must surface as a write error, not
//!   kill the process
//! - Everything here is a no-op on non-POSIX platforms

use crate::lifecycle::shutdown::Shutdown;
use crate::observability::logging::LogHandle;

/// Portable POSIX signals by number and symbolic name.
///
/// Numbers come from libc, so the table is correct per target. Only real
/// signals appear; disposition constants (`SIG_IGN`, `SIG_DFL`) and
/// numeric aliases do not.
#[cfg(unix)]
pub const SIGNALS: &[(i32, &str)] = &[
    (libc::SIGHUP, "SIGHUP"),
    (libc::SIGINT, "SIGINT"),
    (libc::SIGQUIT, "SIGQUIT"),
    (libc::SIGILL, "SIGILL"),
    (libc::SIGTRAP, "SIGTRAP"),
    (libc::SIGABRT, "SIGABRT"),
    (libc::SIGBUS, "SIGBUS"),
    (libc::SIGFPE, "SIGFPE"),
    (libc::SIGKILL, "SIGKILL"),
    (libc::SIGUSR1, "SIGUSR1"),
    (libc::SIGSEGV, "SIGSEGV"),
    (libc::SIGUSR2, "SIGUSR2"),
    (libc::SIGPIPE, "SIGPIPE"),
    (libc::SIGALRM, "SIGALRM"),
    (libc::SIGTERM, "SIGTERM"),
    (libc::SIGCHLD, "SIGCHLD"),
    (libc::SIGCONT, "SIGCONT"),
    (libc::SIGSTOP, "SIGSTOP"),
    (libc::SIGTSTP, "SIGTSTP"),
    (libc::SIGTTIN, "SIGTTIN"),
    (libc::SIGTTOU, "SIGTTOU"),
    (libc::SIGURG, "SIGURG"),
    (libc::SIGXCPU, "SIGXCPU"),
    (libc::SIGXFSZ, "SIGXFSZ"),
    (libc::SIGVTALRM, "SIGVTALRM"),
    (libc::SIGPROF, "SIGPROF"),
    (libc::SIGWINCH, "SIGWINCH"),
    (libc::SIGIO, "SIGIO"),
    (libc::SIGSYS, "SIGSYS"),
];

#[cfg(not(unix))]
pub const SIGNALS: &[(i32, &str)] = &[];

/// Symbolic name for a signal number, `"signal N"` when unknown.
pub fn signame(signo: i32) -> String {
    SIGNALS
        .iter()
        .find(|(n, _)| *n == signo)
        .map(|(_, name)| (*name).to_string())
        .unwrap_or_else(|| format!("signal {signo}"))
}

/// Action bound to a signal in the registration table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// Log the signal and stop serving; the process then exits 0.
    Shutdown,
    /// Reopen log outputs without interrupting service.
    ReopenLogs,
}

/// Explicit registration table from signal number to action, built once
/// at initialization. Signals absent from the table keep their default
/// disposition.
#[derive(Debug, Default)]
pub struct SignalTable {
    bindings: Vec<(i32, SignalAction)>,
}

impl SignalTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The server's table: SIGTERM and SIGINT stop the process, SIGUSR2
    /// reopens log outputs.
    #[cfg(unix)]
    pub fn server_default() -> Self {
        let mut table = Self::new();
        table.register(libc::SIGTERM, SignalAction::Shutdown);
        table.register(libc::SIGINT, SignalAction::Shutdown);
        table.register(libc::SIGUSR2, SignalAction::ReopenLogs);
        table
    }

    #[cfg(not(unix))]
    pub fn server_default() -> Self {
        Self::new()
    }

    /// Bind `action` to `signo`, replacing any previous binding.
    pub fn register(&mut self, signo: i32, action: SignalAction) {
        if let Some(slot) = self.bindings.iter_mut().find(|(n, _)| *n == signo) {
            slot.1 = action;
        } else {
            self.bindings.push((signo, action));
        }
    }

    /// The action registered for `signo`, if any.
    pub fn action(&self, signo: i32) -> Option<SignalAction> {
        self.bindings
            .iter()
            .find(|(n, _)| *n == signo)
            .map(|(_, action)| *action)
    }

    /// All bindings, in registration order.
    pub fn bindings(&self) -> &[(i32, SignalAction)] {
        &self.bindings
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Arm exactly the signals the table carries an action for. Each armed
/// signal gets a dispatch task that discards the raw signal context and
/// performs its action. Handlers stay armed for the process lifetime.
#[cfg(unix)]
pub fn install(
    table: &SignalTable,
    shutdown: &Shutdown,
    log: &LogHandle,
) -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    // A storage hitting the file-size rlimit must get EFBIG on the
    // write, not a fatal signal. Applied before the table, whether or
    // not SIGXFSZ is registered.
    unsafe {
        libc::signal(libc::SIGXFSZ, libc::SIG_IGN);
    }

    for &(signo, action) in table.bindings() {
        let mut stream = signal(SignalKind::from_raw(signo))?;
        let shutdown = shutdown.clone();
        let log = log.clone();

        tokio::spawn(async move {
            while stream.recv().await.is_some() {
                match action {
                    SignalAction::Shutdown => {
                        tracing::info!(signal = %signame(signo), "terminated by signal");
                        shutdown.trigger();
                    }
                    SignalAction::ReopenLogs => {
                        tracing::info!(signal = %signame(signo), "reopening log outputs");
                        match log.reopen() {
                            Ok(()) => tracing::info!("log outputs reopened"),
                            Err(e) => {
                                tracing::warn!(error = %e, "failed to reopen log outputs")
                            }
                        }
                    }
                }
            }
        });
    }

    tracing::debug!(handlers = table.bindings().len(), "signal handlers armed");
    Ok(())
}

#[cfg(not(unix))]
pub fn install(
    _table: &SignalTable,
    _shutdown: &Shutdown,
    _log: &LogHandle,
) -> std::io::Result<()> {
    Ok(())
}
