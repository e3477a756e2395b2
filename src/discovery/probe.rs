//! Instance probes.

use std::future::Future;
use std::io;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time;

use crate::instance::InstanceKey;

/// Why a probe failed.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connect(#[from] io::Error),
}

/// Checks whether an instance is reachable.
///
/// Implementations own their timeout; the scheduler never cancels a probe
/// except on shutdown.
pub trait Prober: Send + Sync + 'static {
    fn probe(&self, key: &InstanceKey) -> impl Future<Output = Result<(), ProbeError>> + Send;
}

/// Considers an instance alive when a TCP connection can be opened.
#[derive(Debug, Clone)]
pub struct TcpProber {
    timeout: Duration,
}

impl TcpProber {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Prober for TcpProber {
    async fn probe(&self, key: &InstanceKey) -> Result<(), ProbeError> {
        let connect = TcpStream::connect((key.hostname.as_str(), key.port));
        match time::timeout(self.timeout, connect).await {
            Ok(Ok(_stream)) => Ok(()),
            Ok(Err(e)) => Err(ProbeError::Connect(e)),
            Err(_) => Err(ProbeError::Timeout(self.timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::net::TcpListener;

    use super::*;

    #[tokio::test]
    async fn reachable_listener_probes_ok() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let prober = TcpProber::new(Duration::from_secs(1));
        let key = InstanceKey::new("127.0.0.1", addr.port());
        assert!(prober.probe(&key).await.is_ok());
    }

    #[tokio::test]
    async fn closed_port_probes_failed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let prober = TcpProber::new(Duration::from_secs(1));
        let result = prober.probe(&InstanceKey::new("127.0.0.1", port)).await;
        assert!(result.is_err());
    }
}
