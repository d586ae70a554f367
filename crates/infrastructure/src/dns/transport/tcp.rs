//! TCP upstream transport with two-byte length framing (RFC 1035 §4.2.2).
//!
//! Idle connections are pooled per server so repeat queries skip the
//! handshake.

use super::{DnsTransport, TransportResponse};
use async_trait::async_trait;
use bastion_dns_domain::DnsError;
use bytes::Bytes;
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

const MAX_TCP_MESSAGE_SIZE: usize = 65535;
const MAX_IDLE_TCP_PER_HOST: usize = 2;

static TCP_POOL: LazyLock<DashMap<SocketAddr, Vec<TcpStream>>> = LazyLock::new(DashMap::new);

pub struct TcpTransport {
    server_addr: SocketAddr,
}

impl TcpTransport {
    pub fn new(server_addr: SocketAddr) -> Self {
        Self { server_addr }
    }

    fn take_pooled(&self) -> Option<TcpStream> {
        TCP_POOL.get_mut(&self.server_addr)?.pop()
    }

    fn return_to_pool(&self, stream: TcpStream) {
        let mut entry = TCP_POOL.entry(self.server_addr).or_default();
        if entry.len() < MAX_IDLE_TCP_PER_HOST {
            entry.push(stream);
        }
    }

    async fn connect_new(&self, timeout: Duration) -> Result<TcpStream, DnsError> {
        let stream = tokio::time::timeout(timeout, TcpStream::connect(self.server_addr))
            .await
            .map_err(|_| DnsError::UpstreamTimeout {
                server: self.server_addr.to_string(),
            })?
            .map_err(|e| DnsError::UpstreamTransport {
                server: self.server_addr.to_string(),
                detail: format!("connect failed: {}", e),
            })?;

        stream
            .set_nodelay(true)
            .map_err(|e| DnsError::UpstreamTransport {
                server: self.server_addr.to_string(),
                detail: format!("TCP_NODELAY failed: {}", e),
            })?;

        Ok(stream)
    }
}

#[async_trait]
impl DnsTransport for TcpTransport {
    async fn send(
        &self,
        message_bytes: &[u8],
        timeout: Duration,
    ) -> Result<TransportResponse, DnsError> {
        let server = self.server_addr.to_string();

        // A pooled stream may be stale; on any failure reconnect once.
        let mut stream = match self.take_pooled() {
            Some(mut pooled) => {
                match tokio::time::timeout(
                    timeout,
                    send_with_length_prefix(&mut pooled, message_bytes, &server),
                )
                .await
                {
                    Ok(Ok(())) => pooled,
                    _ => {
                        debug!(server = %server, "Pooled TCP connection stale, reconnecting");
                        let mut fresh = self.connect_new(timeout).await?;
                        tokio::time::timeout(
                            timeout,
                            send_with_length_prefix(&mut fresh, message_bytes, &server),
                        )
                        .await
                        .map_err(|_| DnsError::UpstreamTimeout {
                            server: server.clone(),
                        })??;
                        fresh
                    }
                }
            }
            None => {
                let mut fresh = self.connect_new(timeout).await?;
                tokio::time::timeout(
                    timeout,
                    send_with_length_prefix(&mut fresh, message_bytes, &server),
                )
                .await
                .map_err(|_| DnsError::UpstreamTimeout {
                    server: server.clone(),
                })??;
                fresh
            }
        };

        let response_bytes =
            tokio::time::timeout(timeout, read_with_length_prefix(&mut stream, &server))
                .await
                .map_err(|_| DnsError::UpstreamTimeout {
                    server: server.clone(),
                })??;

        debug!(server = %server, response_len = response_bytes.len(), "TCP response received");
        self.return_to_pool(stream);

        Ok(TransportResponse {
            bytes: Bytes::from(response_bytes),
            protocol_used: "TCP",
        })
    }

    fn protocol_name(&self) -> &'static str {
        "TCP"
    }
}

pub(crate) async fn send_with_length_prefix<S>(
    stream: &mut S,
    message_bytes: &[u8],
    server: &str,
) -> Result<(), DnsError>
where
    S: AsyncWriteExt + Unpin,
{
    let length = message_bytes.len() as u16;
    stream
        .write_all(&length.to_be_bytes())
        .await
        .map_err(|e| DnsError::UpstreamTransport {
            server: server.to_string(),
            detail: format!("write length failed: {}", e),
        })?;
    stream
        .write_all(message_bytes)
        .await
        .map_err(|e| DnsError::UpstreamTransport {
            server: server.to_string(),
            detail: format!("write body failed: {}", e),
        })?;
    stream
        .flush()
        .await
        .map_err(|e| DnsError::UpstreamTransport {
            server: server.to_string(),
            detail: format!("flush failed: {}", e),
        })?;
    Ok(())
}

pub(crate) async fn read_with_length_prefix<S>(
    stream: &mut S,
    server: &str,
) -> Result<Vec<u8>, DnsError>
where
    S: AsyncReadExt + Unpin,
{
    let mut len_buf = [0u8; 2];
    stream
        .read_exact(&mut len_buf)
        .await
        .map_err(|e| DnsError::UpstreamTransport {
            server: server.to_string(),
            detail: format!("read length failed: {}", e),
        })?;

    let response_len = u16::from_be_bytes(len_buf) as usize;
    if response_len > MAX_TCP_MESSAGE_SIZE {
        return Err(DnsError::UpstreamTransport {
            server: server.to_string(),
            detail: format!("response too large: {} bytes", response_len),
        });
    }

    let mut response = vec![0u8; response_len];
    stream
        .read_exact(&mut response)
        .await
        .map_err(|e| DnsError::UpstreamTransport {
            server: server.to_string(),
            detail: format!("read body failed: {}", e),
        })?;

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn framed_round_trip_against_local_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_with_length_prefix(&mut socket, "test").await.unwrap();
            send_with_length_prefix(&mut socket, &request, "test")
                .await
                .unwrap();
        });

        let transport = TcpTransport::new(addr);
        let response = transport
            .send(b"\xAB\xCDquery", Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(&response.bytes[..], b"\xAB\xCDquery");
    }

    #[tokio::test]
    async fn refused_connection_is_a_transport_error() {
        // Port 1 on localhost is essentially never listening.
        let transport = TcpTransport::new("127.0.0.1:1".parse().unwrap());
        let err = transport
            .send(b"\x00\x00", Duration::from_millis(500))
            .await
            .unwrap_err();
        assert!(err.is_transport_failure());
    }
}
