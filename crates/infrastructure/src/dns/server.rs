use crate::dns::wire::{self, ResponseCode, WireQuery};
use bastion_dns_application::ports::{
    QueryEvent, QueryEventSink, QueryOutcome, Resolution, ResolutionSource,
};
use bastion_dns_application::use_cases::HandleDnsQuery;
use bastion_dns_domain::{DnsClass, DnsError, DnsQuery, DnsRequest};
use socket2::{Domain, Protocol, Socket, Type};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

const UDP_RECV_BUF: usize = 4096;
const MAX_TCP_QUERY: usize = 65535;

/// Ingress: N UDP workers on SO_REUSEPORT sockets plus one TCP listener for
/// truncation retries. Each query runs end-to-end in its own task; cache
/// hits are answered inline on the receiving worker without a spawn.
pub struct DnsServer {
    use_case: Arc<HandleDnsQuery>,
    events: Arc<dyn QueryEventSink>,
    bind_addr: SocketAddr,
    udp_workers: usize,
    tcp_idle_timeout: Duration,
    malformed_dropped: Arc<AtomicU64>,
}

impl DnsServer {
    pub fn new(
        use_case: Arc<HandleDnsQuery>,
        events: Arc<dyn QueryEventSink>,
        bind_addr: SocketAddr,
        udp_workers: usize,
        tcp_idle_timeout: Duration,
    ) -> Self {
        Self {
            use_case,
            events,
            bind_addr,
            udp_workers: udp_workers.max(1),
            tcp_idle_timeout,
            malformed_dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn malformed_dropped(&self) -> u64 {
        self.malformed_dropped.load(Ordering::Relaxed)
    }

    pub async fn run(self: Arc<Self>) -> std::io::Result<()> {
        info!(
            bind = %self.bind_addr,
            udp_workers = self.udp_workers,
            "Starting DNS server"
        );

        let mut join_set: JoinSet<()> = JoinSet::new();

        for worker_id in 0..self.udp_workers {
            let socket = Arc::new(create_udp_socket(self.bind_addr)?);
            let server = Arc::clone(&self);
            join_set.spawn(async move {
                server.run_udp_worker(socket, worker_id).await;
            });
        }

        let tcp_listener = TcpListener::bind(self.bind_addr).await?;
        let server = Arc::clone(&self);
        join_set.spawn(async move {
            server.run_tcp_listener(tcp_listener).await;
        });

        info!("DNS server ready on {}", self.bind_addr);
        while join_set.join_next().await.is_some() {}
        Ok(())
    }

    async fn run_udp_worker(self: &Arc<Self>, socket: Arc<UdpSocket>, worker_id: usize) {
        let mut recv_buf = [0u8; UDP_RECV_BUF];

        loop {
            let (len, peer) = match socket.recv_from(&mut recv_buf).await {
                Ok(r) => r,
                Err(e) => {
                    error!(worker = worker_id, error = %e, "UDP recv error");
                    continue;
                }
            };
            let query_buf = &recv_buf[..len];

            let query = match wire::decode_query(query_buf) {
                Ok(q) => q,
                Err(_) => {
                    // Malformed input: counted and dropped, no response.
                    self.malformed_dropped.fetch_add(1, Ordering::Relaxed);
                    continue;
                }
            };

            // Inline fast path: positive cache hits answered on the worker.
            if let Some(request) = self.to_request(&query, peer) {
                let start = Instant::now();
                if let Some(resolution) = self.use_case.try_cache(&request) {
                    let encoded = wire::encode_answer_response(
                        &query,
                        query_buf,
                        &resolution.answers,
                        resolution.remaining_ttl,
                        Some(query.max_udp_payload()),
                    );
                    let _ = socket.send_to(&encoded.bytes, peer).await;
                    self.emit(&request.query, Ok(&resolution), start.elapsed());
                    continue;
                }
            }

            // Everything else resolves in its own task.
            let server = Arc::clone(self);
            let socket = Arc::clone(&socket);
            let owned_buf: Arc<[u8]> = Arc::from(query_buf);
            tokio::spawn(async move {
                let response = server
                    .handle_query(query, &owned_buf, peer, /*udp*/ true)
                    .await;
                if let Some(bytes) = response {
                    let _ = socket.send_to(&bytes, peer).await;
                }
            });
        }
    }

    async fn run_tcp_listener(self: &Arc<Self>, listener: TcpListener) {
        loop {
            let (stream, peer) = match listener.accept().await {
                Ok(r) => r,
                Err(e) => {
                    warn!(error = %e, "TCP accept error");
                    continue;
                }
            };
            let server = Arc::clone(self);
            tokio::spawn(async move {
                if let Err(e) = server.serve_tcp_connection(stream, peer).await {
                    debug!(peer = %peer, error = %e, "TCP connection closed");
                }
            });
        }
    }

    async fn serve_tcp_connection(
        self: &Arc<Self>,
        mut stream: TcpStream,
        peer: SocketAddr,
    ) -> std::io::Result<()> {
        loop {
            let mut len_buf = [0u8; 2];
            let read = tokio::time::timeout(self.tcp_idle_timeout, stream.read_exact(&mut len_buf));
            match read.await {
                Ok(Ok(_)) => {}
                _ => return Ok(()), // idle timeout or peer closed
            }

            let query_len = u16::from_be_bytes(len_buf) as usize;
            if query_len == 0 || query_len > MAX_TCP_QUERY {
                return Ok(());
            }
            let mut query_buf = vec![0u8; query_len];
            stream.read_exact(&mut query_buf).await?;

            let query = match wire::decode_query(&query_buf) {
                Ok(q) => q,
                Err(_) => {
                    self.malformed_dropped.fetch_add(1, Ordering::Relaxed);
                    return Ok(());
                }
            };

            // TCP responses are never size-limited.
            if let Some(bytes) = self.handle_query(query, &query_buf, peer, false).await {
                stream.write_all(&(bytes.len() as u16).to_be_bytes()).await?;
                stream.write_all(&bytes).await?;
                stream.flush().await?;
            }
        }
    }

    /// Full pipeline for one decoded query. Returns the wire response, or
    /// None when no response should be sent.
    async fn handle_query(
        self: &Arc<Self>,
        query: WireQuery,
        query_buf: &[u8],
        peer: SocketAddr,
        udp: bool,
    ) -> Option<Vec<u8>> {
        let udp_limit = udp.then(|| query.max_udp_payload());

        let Some(request) = self.to_request(&query, peer) else {
            // Well-formed but not something we serve.
            return Some(wire::encode_rcode_response(&query, query_buf, ResponseCode::NotImp).bytes);
        };

        let start = Instant::now();
        let result = self.use_case.execute(&request).await;
        let latency = start.elapsed();

        let bytes = match &result {
            Ok(resolution) if resolution.answers.is_empty() => {
                wire::encode_negative_response(&query, query_buf, false).bytes
            }
            Ok(resolution) => {
                wire::encode_answer_response(
                    &query,
                    query_buf,
                    &resolution.answers,
                    resolution.remaining_ttl,
                    udp_limit,
                )
                .bytes
            }
            Err(DnsError::NxDomain) => {
                wire::encode_negative_response(&query, query_buf, true).bytes
            }
            Err(DnsError::Blocked) => {
                wire::encode_rcode_response(&query, query_buf, ResponseCode::Refused).bytes
            }
            Err(_) => wire::encode_rcode_response(&query, query_buf, ResponseCode::ServFail).bytes,
        };

        self.emit(&request.query, result.as_ref(), latency);
        Some(bytes)
    }

    fn to_request(&self, query: &WireQuery, peer: SocketAddr) -> Option<DnsRequest> {
        if query.class != DnsClass::In {
            return None;
        }
        let record_type = query.record_type?;
        Some(DnsRequest::new(
            DnsQuery {
                domain: Arc::from(query.domain.as_str()),
                record_type,
                class: query.class,
            },
            peer.ip(),
        ))
    }

    /// Fire-and-forget event hand-off after the response went out.
    fn emit(&self, query: &DnsQuery, result: Result<&Resolution, &DnsError>, latency: Duration) {
        let (outcome, hit_tier, upstream_server, blocked) = match result {
            Ok(resolution) => {
                let outcome = if resolution.source == ResolutionSource::StaleCache {
                    QueryOutcome::Stale
                } else if resolution.answers.is_empty() {
                    QueryOutcome::NoData
                } else {
                    QueryOutcome::Answered
                };
                let upstream = match &resolution.source {
                    ResolutionSource::Upstream(server) => Some(Arc::clone(server)),
                    _ => None,
                };
                (outcome, Some(resolution.source.as_str()), upstream, false)
            }
            Err(DnsError::NxDomain) => (QueryOutcome::NxDomain, None, None, false),
            Err(DnsError::Blocked) => (QueryOutcome::Blocked, None, None, true),
            Err(_) => (QueryOutcome::ServFail, None, None, false),
        };

        self.events.deliver(QueryEvent {
            domain: Arc::clone(&query.domain),
            record_type: query.record_type,
            outcome,
            hit_tier,
            upstream_server,
            latency_us: latency.as_micros() as u64,
            blocked,
        });
    }
}

fn create_udp_socket(bind_addr: SocketAddr) -> std::io::Result<UdpSocket> {
    let domain = if bind_addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };
    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
    if bind_addr.is_ipv6() {
        socket.set_only_v6(false)?;
    }
    socket.set_reuse_address(true)?;
    #[cfg(unix)]
    socket.set_reuse_port(true)?;
    socket.set_recv_buffer_size(512 * 1024)?;
    socket.set_send_buffer_size(512 * 1024)?;
    socket.bind(&bind_addr.into())?;
    socket.set_nonblocking(true)?;
    UdpSocket::from_std(socket.into())
}
