use async_trait::async_trait;
use bastion_dns_domain::{DnsError, DnsQuery, RecordData};
use std::sync::Arc;

/// Where an answer came from. Carried through to response assembly and
/// query events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionSource {
    /// Worker-exclusive recent-answer tier.
    LocalTier,
    /// Cross-worker shared tier.
    SharedTier,
    /// Delivered by another query's in-flight upstream resolution.
    Coalesced,
    /// Fresh upstream resolution; carries the server's display form.
    Upstream(Arc<str>),
    /// Expired entry served because every upstream attempt failed.
    StaleCache,
}

impl ResolutionSource {
    pub fn is_cache_hit(&self) -> bool {
        !matches!(self, ResolutionSource::Upstream(_))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LocalTier => "local",
            Self::SharedTier => "shared",
            Self::Coalesced => "coalesced",
            Self::Upstream(_) => "upstream",
            Self::StaleCache => "stale",
        }
    }
}

/// A resolved answer set ready for assembly. Empty `answers` with an Ok
/// result is a NODATA response; NXDOMAIN surfaces as `DnsError::NxDomain`.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub answers: Arc<[RecordData]>,
    pub source: ResolutionSource,
    /// Live TTL for every answer record: expiry − now at read time, already
    /// floored and never above the original upstream TTL.
    pub remaining_ttl: u32,
}

impl Resolution {
    pub fn is_negative(&self) -> bool {
        self.answers.is_empty()
    }
}

#[async_trait]
pub trait DnsResolver: Send + Sync {
    async fn resolve(&self, query: &DnsQuery) -> Result<Resolution, DnsError>;

    /// Cache-only probe; never dispatches upstream. Used by the ingress
    /// fast path to answer hits without spawning a task.
    fn try_cache(&self, _query: &DnsQuery) -> Option<Resolution> {
        None
    }
}
