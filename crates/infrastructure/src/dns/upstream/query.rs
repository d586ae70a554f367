use super::server::UpstreamServer;
use crate::dns::forwarding::{ResponseParser, UpstreamAnswer};
use crate::dns::transport::{self, tcp::TcpTransport, DnsTransport};
use bastion_dns_domain::{DnsError, DnsProtocol};
use std::time::{Duration, Instant};
use tracing::debug;

pub struct ServerReply {
    pub answer: UpstreamAnswer,
    pub latency_us: u64,
}

/// One attempt against one server: send, parse, and retry over TCP if a UDP
/// answer came back truncated. Undecodable bytes are a `RecordDecode`
/// failure charged to this server.
pub async fn query_server(
    server: &UpstreamServer,
    query_bytes: &[u8],
    timeout: Duration,
) -> Result<ServerReply, DnsError> {
    let start = Instant::now();

    let transport = transport::create_transport(&server.protocol)?;
    let response = transport.send(query_bytes, timeout).await?;

    let mut answer =
        ResponseParser::parse(&response.bytes).map_err(|_| DnsError::RecordDecode {
            server: server.display.to_string(),
        })?;

    if answer.truncated {
        if let DnsProtocol::Udp { addr } = &*server.protocol {
            if let Some(socket_addr) = addr.socket_addr() {
                debug!(server = %server.display, "Truncated UDP answer, retrying over TCP");
                let tcp = TcpTransport::new(socket_addr);
                let tcp_response = tcp.send(query_bytes, timeout).await?;
                answer = ResponseParser::parse(&tcp_response.bytes).map_err(|_| {
                    DnsError::RecordDecode {
                        server: server.display.to_string(),
                    }
                })?;
            }
        }
    }

    Ok(ServerReply {
        answer,
        latency_us: start.elapsed().as_micros() as u64,
    })
}
