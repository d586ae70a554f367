use bastion_dns_domain::RecordType;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOutcome {
    Answered,
    NoData,
    NxDomain,
    Blocked,
    ServFail,
    Stale,
}

impl QueryOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Answered => "NOERROR",
            Self::NoData => "NODATA",
            Self::NxDomain => "NXDOMAIN",
            Self::Blocked => "BLOCKED",
            Self::ServFail => "SERVFAIL",
            Self::Stale => "STALE",
        }
    }
}

/// Structured record of one answered query, handed off after the response
/// is sent. Consumers run asynchronously; producers never wait for them.
#[derive(Debug, Clone)]
pub struct QueryEvent {
    pub domain: Arc<str>,
    pub record_type: RecordType,
    pub outcome: QueryOutcome,
    /// "local", "shared", "coalesced", "upstream" or "stale"; None when the
    /// query never reached resolution (blocked, malformed-adjacent paths).
    pub hit_tier: Option<&'static str>,
    pub upstream_server: Option<Arc<str>>,
    pub latency_us: u64,
    pub blocked: bool,
}

/// Hand-off point for query events. `deliver` MUST NOT block: a slow or
/// absent consumer drops events instead of backpressuring the resolver.
pub trait QueryEventSink: Send + Sync {
    fn deliver(&self, event: QueryEvent);
}

/// Sink that discards everything.
pub struct NullQueryEventSink;

impl QueryEventSink for NullQueryEventSink {
    fn deliver(&self, _event: QueryEvent) {}
}
