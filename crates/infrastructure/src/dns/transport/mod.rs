pub mod https;
pub mod resolver;
pub mod tcp;
pub mod tls;
pub mod udp;

use async_trait::async_trait;
use bastion_dns_domain::{DnsError, DnsProtocol};
use bytes::Bytes;
use std::time::Duration;

#[derive(Debug)]
pub struct TransportResponse {
    pub bytes: Bytes,
    pub protocol_used: &'static str,
}

#[async_trait]
pub trait DnsTransport: Send + Sync {
    async fn send(
        &self,
        message_bytes: &[u8],
        timeout: Duration,
    ) -> Result<TransportResponse, DnsError>;

    fn protocol_name(&self) -> &'static str;
}

/// Closed transport dispatch — one variant per supported upstream kind,
/// exactly the operations the pool needs.
pub enum Transport {
    Udp(udp::UdpTransport),
    Tcp(tcp::TcpTransport),
    Tls(tls::TlsTransport),
    Https(https::HttpsTransport),
}

impl Transport {
    pub async fn send(
        &self,
        message_bytes: &[u8],
        timeout: Duration,
    ) -> Result<TransportResponse, DnsError> {
        match self {
            Self::Udp(t) => DnsTransport::send(t, message_bytes, timeout).await,
            Self::Tcp(t) => DnsTransport::send(t, message_bytes, timeout).await,
            Self::Tls(t) => DnsTransport::send(t, message_bytes, timeout).await,
            Self::Https(t) => DnsTransport::send(t, message_bytes, timeout).await,
        }
    }

    pub fn protocol_name(&self) -> &'static str {
        match self {
            Self::Udp(_) => "UDP",
            Self::Tcp(_) => "TCP",
            Self::Tls(_) => "TLS",
            Self::Https(_) => "HTTPS",
        }
    }
}

pub fn create_transport(protocol: &DnsProtocol) -> Result<Transport, DnsError> {
    match protocol {
        DnsProtocol::Udp { addr } => {
            let addr = addr.socket_addr().ok_or_else(|| {
                DnsError::Config(format!("UDP upstream requires a resolved address: {}", addr))
            })?;
            Ok(Transport::Udp(udp::UdpTransport::new(addr)))
        }
        DnsProtocol::Tcp { addr } => {
            let addr = addr.socket_addr().ok_or_else(|| {
                DnsError::Config(format!("TCP upstream requires a resolved address: {}", addr))
            })?;
            Ok(Transport::Tcp(tcp::TcpTransport::new(addr)))
        }
        DnsProtocol::Tls { addr, hostname } => {
            let addr = addr.socket_addr().ok_or_else(|| {
                DnsError::Config(format!("TLS upstream requires a resolved address: {}", addr))
            })?;
            Ok(Transport::Tls(tls::TlsTransport::new(
                addr,
                hostname.to_string(),
            )))
        }
        DnsProtocol::Https { url, .. } => {
            Ok(Transport::Https(https::HttpsTransport::new(url.to_string())))
        }
    }
}
