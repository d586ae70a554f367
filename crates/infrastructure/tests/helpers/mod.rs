#![allow(dead_code)]

use async_trait::async_trait;
use bastion_dns_infrastructure::dns::cache::{DnsCacheConfig, EvictionStrategy, NegativeKind};
use bastion_dns_infrastructure::dns::resolver::{UpstreamResolution, UpstreamResolve};
use bastion_dns_domain::{DnsError, DnsQuery, RecordData};
use hickory_proto::op::{Message, MessageType, OpCode, ResponseCode};
use hickory_proto::rr::rdata::A;
use hickory_proto::rr::{RData, Record};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;

pub fn small_cache_config(max_entries: usize, strategy: EvictionStrategy) -> DnsCacheConfig {
    DnsCacheConfig {
        max_entries,
        shard_amount: 4,
        local_capacity: 64,
        eviction_strategy: strategy,
        eviction_sample_size: max_entries.max(8),
        window_buckets: 8,
        bucket_width_secs: 60,
        min_ttl: 1,
        max_ttl: 86_400,
        refresh_fraction: 0.75,
        bloom_fp_rate: 0.01,
    }
}

pub fn answers(ips: &[&str]) -> Arc<[RecordData]> {
    let records: Vec<RecordData> = ips
        .iter()
        .map(|ip| RecordData::A(ip.parse().unwrap()))
        .collect();
    Arc::from(records)
}

/// Mock network layer under the cache: fixed answer (or failure), optional
/// artificial delay, and an attempt counter for coalescing assertions.
pub struct MockUpstream {
    pub calls: AtomicUsize,
    response: Result<(Arc<[RecordData]>, u32), DnsError>,
    delay: Duration,
    pub fail_after_first: AtomicUsize,
}

impl MockUpstream {
    pub fn answering(ips: &[&str], ttl: u32) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            response: Ok((answers(ips), ttl)),
            delay: Duration::ZERO,
            fail_after_first: AtomicUsize::new(usize::MAX),
        }
    }

    pub fn failing(error: DnsError) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            response: Err(error),
            delay: Duration::ZERO,
            fail_after_first: AtomicUsize::new(usize::MAX),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Succeed for the first `n` calls, then report exhaustion.
    pub fn exhausted_after(self, n: usize) -> Self {
        self.fail_after_first.store(n, Ordering::SeqCst);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UpstreamResolve for MockUpstream {
    async fn resolve_upstream(&self, _query: &DnsQuery) -> Result<UpstreamResolution, DnsError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if call >= self.fail_after_first.load(Ordering::SeqCst) {
            return Err(DnsError::UpstreamExhausted);
        }
        match &self.response {
            Ok((answers, ttl)) => Ok(UpstreamResolution {
                answers: Arc::clone(answers),
                ttl: Some(*ttl),
                negative: None,
                negative_ttl: None,
                server: Arc::from("mock://upstream"),
            }),
            Err(e) => Err(e.clone()),
        }
    }
}

/// Mock upstream answering NXDOMAIN for everything.
pub struct NxDomainUpstream;

#[async_trait]
impl UpstreamResolve for NxDomainUpstream {
    async fn resolve_upstream(&self, _query: &DnsQuery) -> Result<UpstreamResolution, DnsError> {
        Ok(UpstreamResolution {
            answers: Arc::from(Vec::new()),
            ttl: None,
            negative: Some(NegativeKind::NxDomain),
            negative_ttl: Some(120),
            server: Arc::from("mock://upstream"),
        })
    }
}

/// A real loopback UDP socket speaking just enough DNS to answer A queries
/// with the given address. Returns the address to configure as an upstream.
pub async fn spawn_mock_dns_server(answer: Ipv4Addr, ttl: u32) -> SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();

    tokio::spawn(async move {
        let mut buf = [0u8; 512];
        loop {
            let Ok((len, peer)) = socket.recv_from(&mut buf).await else {
                break;
            };
            let Ok(request) = Message::from_vec(&buf[..len]) else {
                continue;
            };
            let Some(question) = request.queries().first().cloned() else {
                continue;
            };

            let mut response = Message::new(request.id(), MessageType::Response, OpCode::Query);
            response.set_recursion_desired(true);
            response.set_recursion_available(true);
            response.set_response_code(ResponseCode::NoError);
            let record =
                Record::from_rdata(question.name().clone(), ttl, RData::A(A(answer)));
            response.add_query(question);
            response.add_answer(record);

            if let Ok(bytes) = response.to_vec() {
                let _ = socket.send_to(&bytes, peer).await;
            }
        }
    });

    addr
}

/// A bound socket that never answers — an unreachable upstream.
pub async fn spawn_silent_socket() -> (UdpSocket, SocketAddr) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    (socket, addr)
}
