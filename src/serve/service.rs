//! Built-in storage service loop.
//!
//! # Responsibilities
//! - Bind the configured address and accept client sessions
//! - Answer the line protocol: `stat`, `stores`, `quit`
//! - Track live and total sessions for the status snapshot
//! - Stop accepting the moment the shutdown receiver fires

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::lifecycle::shutdown::ShutdownReceiver;
use crate::observability::stats::StatsContext;
use crate::serve::listener::{AsyncStream, BoundListener};
use crate::serve::monitor::MonitorServer;
use crate::serve::{RequestLoop, ServeError, ServeOptions};
use crate::storage::registry::StorageRegistry;

/// The stock serving loop: one task per session, answering status
/// queries against a snapshot of the open registry.
#[derive(Debug, Default)]
pub struct StorageService;

impl StorageService {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RequestLoop for StorageService {
    async fn run(
        &mut self,
        options: &ServeOptions,
        registry: &StorageRegistry,
        mut shutdown: ShutdownReceiver,
    ) -> Result<(), ServeError> {
        let listener = BoundListener::bind(&options.address, options.max_connections)
            .await
            .map_err(|e| ServeError::Bind {
                address: options.address.to_string(),
                source: e,
            })?;

        let stats = StatsContext::new(
            options.address.to_string(),
            options.read_only,
            options.invalidation_queue_size,
            options.transaction_timeout,
            registry.names(),
        );

        let monitor = match &options.monitor {
            Some(addr) => {
                let server = MonitorServer::bind(addr, stats.clone()).await?;
                Some(server.spawn())
            }
            None => None,
        };

        tracing::info!(
            address = %options.address,
            storages = registry.len(),
            read_only = options.read_only,
            "storage service ready"
        );

        let outcome = loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("storage service stopping");
                    break Ok(());
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer, permit)) => {
                            let stats = stats.clone();
                            let idle_timeout = options.transaction_timeout;
                            tokio::spawn(async move {
                                let _permit = permit;
                                let _guard = stats.sessions().track();
                                if let Err(e) =
                                    serve_session(stream, &peer, &stats, idle_timeout).await
                                {
                                    tracing::debug!(peer = %peer, error = %e, "session ended with error");
                                }
                            });
                        }
                        Err(e) => {
                            break Err(ServeError::Accept {
                                address: options.address.to_string(),
                                source: e,
                            });
                        }
                    }
                }
            }
        };

        // Session tasks drain on their own; the monitor accept loop
        // must not outlive the service.
        if let Some(task) = monitor {
            task.abort();
        }
        outcome
    }
}

/// Serve one session: read newline-delimited commands, answer each on
/// its own line. `quit` or EOF ends the session, as does sitting idle
/// past the transaction timeout.
async fn serve_session(
    stream: Box<dyn AsyncStream>,
    peer: &str,
    stats: &StatsContext,
    idle_timeout: Option<Duration>,
) -> std::io::Result<()> {
    tracing::debug!(peer = %peer, "session started");
    let mut stream = BufReader::new(stream);
    let mut line = String::new();

    loop {
        line.clear();
        let read = match idle_timeout {
            Some(limit) => match tokio::time::timeout(limit, stream.read_line(&mut line)).await {
                Ok(read) => read?,
                Err(_) => {
                    tracing::debug!(peer = %peer, "session idle past timeout");
                    break;
                }
            },
            None => stream.read_line(&mut line).await?,
        };
        if read == 0 {
            break;
        }

        let command = line.trim();
        if command.is_empty() {
            continue;
        }
        match command {
            "stat" => {
                let body =
                    serde_json::to_string(&stats.snapshot()).map_err(std::io::Error::other)?;
                stream.get_mut().write_all(body.as_bytes()).await?;
                stream.get_mut().write_all(b"\n").await?;
            }
            "stores" => {
                let names = stats.storage_names().join(" ");
                stream.get_mut().write_all(names.as_bytes()).await?;
                stream.get_mut().write_all(b"\n").await?;
            }
            "quit" => break,
            other => {
                tracing::debug!(peer = %peer, command = %other, "unknown command");
                stream.get_mut().write_all(b"err unknown command\n").await?;
            }
        }
    }

    tracing::debug!(peer = %peer, "session closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_stats(storages: Vec<String>) -> StatsContext {
        StatsContext::new("127.0.0.1:8100".to_string(), false, 100, None, storages)
    }

    #[tokio::test]
    async fn session_answers_stores_and_stat() {
        let (client, server) = tokio::io::duplex(1024);
        let stats = test_stats(vec!["1".to_string(), "2".to_string()]);
        let task = tokio::spawn(async move {
            serve_session(Box::new(server), "test", &stats, None).await
        });

        let mut client = BufReader::new(client);
        let mut line = String::new();

        client.get_mut().write_all(b"stores\n").await.unwrap();
        client.read_line(&mut line).await.unwrap();
        assert_eq!(line.trim(), "1 2");

        line.clear();
        client.get_mut().write_all(b"stat\n").await.unwrap();
        client.read_line(&mut line).await.unwrap();
        let snapshot: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(snapshot["storages"], serde_json::json!(["1", "2"]));
        assert_eq!(snapshot["read_only"], serde_json::json!(false));

        client.get_mut().write_all(b"quit\n").await.unwrap();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn unknown_commands_get_an_error_line() {
        let (client, server) = tokio::io::duplex(1024);
        let stats = test_stats(vec![]);
        let task = tokio::spawn(async move {
            serve_session(Box::new(server), "test", &stats, None).await
        });

        let mut client = BufReader::new(client);
        let mut line = String::new();

        client.get_mut().write_all(b"frobnicate\n").await.unwrap();
        client.read_line(&mut line).await.unwrap();
        assert_eq!(line.trim(), "err unknown command");

        // Blank lines are ignored, the session keeps going
        line.clear();
        client.get_mut().write_all(b"\nstores\n").await.unwrap();
        client.read_line(&mut line).await.unwrap();
        assert_eq!(line.trim(), "");

        drop(client);
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn idle_session_times_out() {
        let (client, server) = tokio::io::duplex(64);
        let stats = test_stats(vec![]);
        let task = tokio::spawn(async move {
            serve_session(
                Box::new(server),
                "test",
                &stats,
                Some(Duration::from_millis(100)),
            )
            .await
        });

        // No traffic; the held client keeps EOF away, so only the idle
        // timeout can end the session.
        task.await.unwrap().unwrap();
        drop(client);
    }
}
