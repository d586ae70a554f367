//! Plain UDP upstream transport (RFC 1035 §4.2.1).
//!
//! Messages go out unframed. With our EDNS0 OPT advertising 4096 bytes the
//! response buffer matches; a TC-flagged response makes the pool retry the
//! same server over TCP.

use super::{DnsTransport, TransportResponse};
use async_trait::async_trait;
use bastion_dns_domain::DnsError;
use bytes::Bytes;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::{debug, warn};

const MAX_UDP_RESPONSE_SIZE: usize = 4096;

pub struct UdpTransport {
    server_addr: SocketAddr,
}

impl UdpTransport {
    pub fn new(server_addr: SocketAddr) -> Self {
        Self { server_addr }
    }
}

#[async_trait]
impl DnsTransport for UdpTransport {
    async fn send(
        &self,
        message_bytes: &[u8],
        timeout: Duration,
    ) -> Result<TransportResponse, DnsError> {
        let bind_addr: SocketAddr = if self.server_addr.is_ipv4() {
            "0.0.0.0:0".parse().unwrap()
        } else {
            "[::]:0".parse().unwrap()
        };

        let socket = UdpSocket::bind(bind_addr)
            .await
            .map_err(|e| DnsError::Io(format!("Failed to bind UDP socket: {}", e)))?;

        tokio::time::timeout(timeout, socket.send_to(message_bytes, self.server_addr))
            .await
            .map_err(|_| DnsError::UpstreamTimeout {
                server: self.server_addr.to_string(),
            })?
            .map_err(|e| DnsError::UpstreamTransport {
                server: self.server_addr.to_string(),
                detail: format!("send failed: {}", e),
            })?;

        let mut recv_buf = vec![0u8; MAX_UDP_RESPONSE_SIZE];
        let (bytes_received, from_addr) =
            tokio::time::timeout(timeout, socket.recv_from(&mut recv_buf))
                .await
                .map_err(|_| DnsError::UpstreamTimeout {
                    server: self.server_addr.to_string(),
                })?
                .map_err(|e| DnsError::UpstreamTransport {
                    server: self.server_addr.to_string(),
                    detail: format!("recv failed: {}", e),
                })?;

        if from_addr.ip() != self.server_addr.ip() {
            warn!(
                expected = %self.server_addr,
                received_from = %from_addr,
                "UDP response from unexpected source"
            );
        }

        recv_buf.truncate(bytes_received);
        debug!(server = %self.server_addr, bytes_received, "UDP response received");

        Ok(TransportResponse {
            bytes: Bytes::from(recv_buf),
            protocol_used: "UDP",
        })
    }

    fn protocol_name(&self) -> &'static str {
        "UDP"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_creation() {
        let addr: SocketAddr = "9.9.9.9:53".parse().unwrap();
        let transport = UdpTransport::new(addr);
        assert_eq!(transport.server_addr, addr);
        assert_eq!(transport.protocol_name(), "UDP");
    }

    #[tokio::test]
    async fn round_trip_against_local_echo_server() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let server_addr = server.local_addr().unwrap();

        tokio::spawn(async move {
            let mut buf = [0u8; 512];
            let (n, from) = server.recv_from(&mut buf).await.unwrap();
            server.send_to(&buf[..n], from).await.unwrap();
        });

        let transport = UdpTransport::new(server_addr);
        let response = transport
            .send(b"\x12\x34hello", Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(&response.bytes[..], b"\x12\x34hello");
    }

    #[tokio::test]
    async fn unresponsive_server_times_out() {
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = silent.local_addr().unwrap();

        let transport = UdpTransport::new(addr);
        let err = transport
            .send(b"\x00\x00", Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, DnsError::UpstreamTimeout { .. }));
    }
}
