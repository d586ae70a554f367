//! DNS-over-HTTPS upstream transport (RFC 8484).
//!
//! POST with `application/dns-message`; request and response bodies are raw
//! DNS wire messages. One shared HTTP/2 client pools connections per host.

use super::{DnsTransport, TransportResponse};
use async_trait::async_trait;
use bastion_dns_domain::DnsError;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::debug;

static SHARED_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .use_rustls_tls()
        .timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(4)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
});

const DNS_MESSAGE_CONTENT_TYPE: &str = "application/dns-message";

pub struct HttpsTransport {
    url: String,
}

impl HttpsTransport {
    pub fn new(url: String) -> Self {
        Self { url }
    }
}

#[async_trait]
impl DnsTransport for HttpsTransport {
    async fn send(
        &self,
        message_bytes: &[u8],
        timeout: Duration,
    ) -> Result<TransportResponse, DnsError> {
        let response = tokio::time::timeout(
            timeout,
            SHARED_CLIENT
                .post(&self.url)
                .header("Content-Type", DNS_MESSAGE_CONTENT_TYPE)
                .header("Accept", DNS_MESSAGE_CONTENT_TYPE)
                .body(message_bytes.to_vec())
                .send(),
        )
        .await
        .map_err(|_| DnsError::UpstreamTimeout {
            server: self.url.clone(),
        })?
        .map_err(|e| DnsError::UpstreamTransport {
            server: self.url.clone(),
            detail: format!("request failed: {}", e),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DnsError::UpstreamTransport {
                server: self.url.clone(),
                detail: format!("HTTP {}", status.as_u16()),
            });
        }

        let response_bytes = tokio::time::timeout(timeout, response.bytes())
            .await
            .map_err(|_| DnsError::UpstreamTimeout {
                server: self.url.clone(),
            })?
            .map_err(|e| DnsError::UpstreamTransport {
                server: self.url.clone(),
                detail: format!("body read failed: {}", e),
            })?;

        debug!(url = %self.url, response_len = response_bytes.len(), "DoH response received");

        Ok(TransportResponse {
            bytes: response_bytes,
            protocol_used: "HTTPS",
        })
    }

    fn protocol_name(&self) -> &'static str {
        "HTTPS"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_creation() {
        let transport = HttpsTransport::new("https://cloudflare-dns.com/dns-query".to_string());
        assert_eq!(transport.url, "https://cloudflare-dns.com/dns-query");
        assert_eq!(transport.protocol_name(), "HTTPS");
    }
}
