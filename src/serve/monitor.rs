//! One-shot status endpoint.
//!
//! # Responsibilities
//! - Listen on the monitor address, separate from the client address
//! - Write a single JSON status line to each connection, then close

use tokio::io::AsyncWriteExt;
use tokio::task::JoinHandle;

use crate::config::address::ListenAddr;
use crate::observability::stats::StatsContext;
use crate::serve::listener::BoundListener;
use crate::serve::ServeError;

/// Connections the monitor will serve at once. It answers in one write,
/// so a handful of slots is plenty.
const MONITOR_SESSIONS: usize = 8;

/// Dumps one status snapshot per connection and closes. Inspectable
/// with `nc` or the control utility; no commands, no session state.
pub struct MonitorServer {
    listener: BoundListener,
    stats: StatsContext,
}

impl MonitorServer {
    pub async fn bind(addr: &ListenAddr, stats: StatsContext) -> Result<Self, ServeError> {
        let listener = BoundListener::bind(addr, MONITOR_SESSIONS)
            .await
            .map_err(|e| ServeError::Bind {
                address: addr.to_string(),
                source: e,
            })?;
        tracing::info!(address = %addr, "monitor listening");
        Ok(Self { listener, stats })
    }

    /// Run the accept loop until the serving loop aborts the task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match self.listener.accept().await {
                    Ok((mut stream, peer, _permit)) => {
                        match serde_json::to_string(&self.stats.snapshot()) {
                            Ok(mut body) => {
                                body.push('\n');
                                if let Err(e) = stream.write_all(body.as_bytes()).await {
                                    tracing::debug!(peer = %peer, error = %e, "monitor write failed");
                                }
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, "could not encode status snapshot")
                            }
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "monitor accept failed");
                        break;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serve::listener::connect;
    use tokio::io::{AsyncBufReadExt, BufReader};

    fn free_port() -> u16 {
        std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port()
    }

    #[tokio::test]
    async fn each_connection_gets_one_snapshot_line() {
        let addr = ListenAddr::Tcp {
            host: Some("127.0.0.1".to_string()),
            port: free_port(),
        };
        let stats = StatsContext::new(
            "127.0.0.1:8100".to_string(),
            true,
            100,
            None,
            vec!["main".to_string()],
        );
        let task = MonitorServer::bind(&addr, stats).await.unwrap().spawn();

        for _ in 0..2 {
            let stream = connect(&addr).await.unwrap();
            let mut reader = BufReader::new(stream);
            let mut line = String::new();
            reader.read_line(&mut line).await.unwrap();

            let snapshot: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
            assert_eq!(snapshot["read_only"], serde_json::json!(true));
            assert_eq!(snapshot["storages"], serde_json::json!(["main"]));

            // The connection closes after the dump
            line.clear();
            let read = reader.read_line(&mut line).await.unwrap();
            assert_eq!(read, 0);
        }

        task.abort();
    }
}
