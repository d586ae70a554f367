use crate::dns::cache::NegativeKind;
use crate::dns::upstream::UpstreamPool;
use async_trait::async_trait;
use bastion_dns_domain::{DnsError, DnsQuery, RecordData};
use std::sync::Arc;
use tracing::debug;

/// Output of a network resolution, rich enough for the cache layer to
/// install: answer set, TTL, negative kind with its RFC 2308 TTL, and the
/// server that answered.
#[derive(Debug, Clone)]
pub struct UpstreamResolution {
    pub answers: Arc<[RecordData]>,
    /// Smallest answer TTL; the caller's default when the response had none.
    pub ttl: Option<u32>,
    pub negative: Option<NegativeKind>,
    /// SOA MINIMUM from the authority section, when present.
    pub negative_ttl: Option<u32>,
    pub server: Arc<str>,
}

/// The layer below the cache: something that can actually go to the
/// network. Split out as a trait so the cache layer is testable against
/// mock upstreams.
#[async_trait]
pub trait UpstreamResolve: Send + Sync {
    async fn resolve_upstream(&self, query: &DnsQuery) -> Result<UpstreamResolution, DnsError>;
}

/// Dispatches to the upstream pool. The client's DNSSEC-OK bit is not
/// forwarded: answers are cached per key, irrespective of EDNS signaling.
pub struct CoreResolver {
    pool: Arc<UpstreamPool>,
}

impl CoreResolver {
    pub fn new(pool: Arc<UpstreamPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UpstreamResolve for CoreResolver {
    async fn resolve_upstream(&self, query: &DnsQuery) -> Result<UpstreamResolution, DnsError> {
        let (answer, server) = self
            .pool
            .resolve(&query.domain, &query.record_type, false)
            .await?;

        debug!(
            domain = %query.domain,
            record_type = %query.record_type,
            answers = answer.answers.len(),
            upstream = %server,
            "Upstream resolution complete"
        );

        let negative = if answer.is_nxdomain() {
            Some(NegativeKind::NxDomain)
        } else if answer.is_nodata() {
            Some(NegativeKind::NoData)
        } else {
            None
        };

        Ok(UpstreamResolution {
            answers: Arc::from(answer.answers),
            ttl: answer.min_ttl,
            negative,
            negative_ttl: answer.negative_ttl,
            server,
        })
    }
}
