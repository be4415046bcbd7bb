//! Armed-signal behavior: a raised signal must reach its dispatch task,
//! and only registered signals get handlers.

#![cfg(unix)]

use std::time::Duration;

use stashd::lifecycle::signals::install;
use stashd::lifecycle::{Shutdown, SignalAction, SignalTable};
use stashd::observability::logging::LogHandle;

#[tokio::test]
async fn test_raised_signal_reaches_the_shutdown_broadcast() {
    let mut table = SignalTable::new();
    table.register(libc::SIGUSR1, SignalAction::Shutdown);

    let shutdown = Shutdown::new();
    let mut rx = shutdown.subscribe();
    install(&table, &shutdown, &LogHandle::default()).unwrap();

    unsafe {
        libc::raise(libc::SIGUSR1);
    }

    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("armed SIGUSR1 never triggered the shutdown broadcast");
}

#[tokio::test]
async fn test_only_registered_signals_change_disposition() {
    // Empty table: nothing gets armed, yet the SIGXFSZ exception applies.
    install(&SignalTable::new(), &Shutdown::new(), &LogHandle::default()).unwrap();

    unsafe {
        // SIGUSR2 is untouched by this test binary, so it still carries
        // its default disposition.
        let usr2 = libc::signal(libc::SIGUSR2, libc::SIG_DFL);
        assert_eq!(usr2, libc::SIG_DFL);

        // SIGXFSZ is forced to ignored whether or not it is registered.
        let xfsz = libc::signal(libc::SIGXFSZ, libc::SIG_IGN);
        assert_eq!(xfsz, libc::SIG_IGN);
    }
}
