//! TCP reachability probe for external cluster endpoints

use crate::domain::ports::EndpointProber;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;

/// Opens (and immediately drops) a TCP connection to the endpoint
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpProber;

#[async_trait]
impl EndpointProber for TcpProber {
    async fn probe(&self, host: &str, port: u16, timeout: Duration) -> Result<()> {
        let endpoint = format!("{}:{}", host, port);
        debug!(%endpoint, ?timeout, "Probing endpoint");

        match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(_stream)) => Ok(()),
            Ok(Err(e)) => Err(Error::EndpointUnreachable {
                endpoint,
                reason: e.to_string(),
            }),
            Err(_) => Err(Error::EndpointUnreachable {
                endpoint,
                reason: format!("no connection within {:?}", timeout),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_probe_open_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        TcpProber
            .probe("127.0.0.1", port, Duration::from_secs(2))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_probe_closed_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = TcpProber
            .probe("127.0.0.1", port, Duration::from_secs(2))
            .await
            .unwrap_err();
        assert_matches!(err, Error::EndpointUnreachable { .. });
    }
}
