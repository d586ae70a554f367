//! DNS-over-TLS upstream transport (RFC 7858).
//!
//! One shared `ClientConfig` (session resumption comes free from the rustls
//! session cache) and a per-(addr, hostname) pool of idle streams so repeat
//! queries skip the TCP+TLS handshake.

use super::tcp::{read_with_length_prefix, send_with_length_prefix};
use super::{DnsTransport, TransportResponse};
use async_trait::async_trait;
use bastion_dns_domain::DnsError;
use bytes::Bytes;
use dashmap::DashMap;
use rustls::pki_types::ServerName;
use std::net::SocketAddr;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tracing::debug;

const MAX_IDLE_PER_HOST: usize = 2;

static SHARED_TLS_CONFIG: LazyLock<Arc<rustls::ClientConfig>> = LazyLock::new(|| {
    let mut root_store = rustls::RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    Arc::new(config)
});

static TLS_POOL: LazyLock<DashMap<(SocketAddr, String), Vec<TlsStream<TcpStream>>>> =
    LazyLock::new(DashMap::new);

pub struct TlsTransport {
    server_addr: SocketAddr,
    hostname: String,
}

impl TlsTransport {
    pub fn new(server_addr: SocketAddr, hostname: String) -> Self {
        Self {
            server_addr,
            hostname,
        }
    }

    fn take_pooled(&self) -> Option<TlsStream<TcpStream>> {
        let key = (self.server_addr, self.hostname.clone());
        TLS_POOL.get_mut(&key)?.pop()
    }

    fn return_to_pool(&self, stream: TlsStream<TcpStream>) {
        let key = (self.server_addr, self.hostname.clone());
        let mut entry = TLS_POOL.entry(key).or_default();
        if entry.len() < MAX_IDLE_PER_HOST {
            entry.push(stream);
        }
    }

    async fn connect_new(&self, timeout: Duration) -> Result<TlsStream<TcpStream>, DnsError> {
        let server = self.server_addr.to_string();
        let connector = tokio_rustls::TlsConnector::from(SHARED_TLS_CONFIG.clone());

        let server_name = ServerName::try_from(self.hostname.clone()).map_err(|e| {
            DnsError::Config(format!("Invalid TLS hostname '{}': {}", self.hostname, e))
        })?;

        let tcp_stream = tokio::time::timeout(timeout, TcpStream::connect(self.server_addr))
            .await
            .map_err(|_| DnsError::UpstreamTimeout {
                server: server.clone(),
            })?
            .map_err(|e| DnsError::UpstreamTransport {
                server: server.clone(),
                detail: format!("connect failed: {}", e),
            })?;

        let tls_stream = tokio::time::timeout(timeout, connector.connect(server_name, tcp_stream))
            .await
            .map_err(|_| DnsError::UpstreamTimeout {
                server: server.clone(),
            })?
            .map_err(|e| DnsError::UpstreamTransport {
                server,
                detail: format!("TLS handshake failed: {}", e),
            })?;

        debug!(server = %self.server_addr, hostname = %self.hostname, "TLS connection established");
        Ok(tls_stream)
    }

    async fn exchange(
        &self,
        stream: &mut TlsStream<TcpStream>,
        message_bytes: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, DnsError> {
        let server = self.server_addr.to_string();

        tokio::time::timeout(
            timeout,
            send_with_length_prefix(stream, message_bytes, &server),
        )
        .await
        .map_err(|_| DnsError::UpstreamTimeout {
            server: server.clone(),
        })??;

        tokio::time::timeout(timeout, read_with_length_prefix(stream, &server))
            .await
            .map_err(|_| DnsError::UpstreamTimeout { server })?
    }
}

#[async_trait]
impl DnsTransport for TlsTransport {
    async fn send(
        &self,
        message_bytes: &[u8],
        timeout: Duration,
    ) -> Result<TransportResponse, DnsError> {
        if let Some(mut stream) = self.take_pooled() {
            match self.exchange(&mut stream, message_bytes, timeout).await {
                Ok(response_bytes) => {
                    self.return_to_pool(stream);
                    return Ok(TransportResponse {
                        bytes: Bytes::from(response_bytes),
                        protocol_used: "TLS",
                    });
                }
                Err(_) => {
                    debug!(server = %self.server_addr, "Pooled TLS connection stale, reconnecting");
                }
            }
        }

        let mut stream = self.connect_new(timeout).await?;
        let response_bytes = self.exchange(&mut stream, message_bytes, timeout).await?;
        self.return_to_pool(stream);

        Ok(TransportResponse {
            bytes: Bytes::from(response_bytes),
            protocol_used: "TLS",
        })
    }

    fn protocol_name(&self) -> &'static str {
        "TLS"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_creation() {
        let addr: SocketAddr = "9.9.9.9:853".parse().unwrap();
        let transport = TlsTransport::new(addr, "dns.quad9.net".to_string());
        assert_eq!(transport.protocol_name(), "TLS");
        assert_eq!(transport.hostname, "dns.quad9.net");
    }

    #[test]
    fn shared_tls_config_builds() {
        let _config = &*SHARED_TLS_CONFIG;
    }
}
