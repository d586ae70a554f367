use crate::ports::{BlockFilter, ClientPolicyResolver, DnsResolver, Resolution};
use bastion_dns_domain::{DnsError, DnsRequest};
use std::sync::Arc;
use tracing::debug;

/// The per-query pipeline: policy group lookup, block check, then the
/// layered resolver. Blocking short-circuits before any cache access.
pub struct HandleDnsQuery {
    resolver: Arc<dyn DnsResolver>,
    block_filter: Arc<dyn BlockFilter>,
    policy: Arc<dyn ClientPolicyResolver>,
}

impl HandleDnsQuery {
    pub fn new(
        resolver: Arc<dyn DnsResolver>,
        block_filter: Arc<dyn BlockFilter>,
        policy: Arc<dyn ClientPolicyResolver>,
    ) -> Self {
        Self {
            resolver,
            block_filter,
            policy,
        }
    }

    pub async fn execute(&self, request: &DnsRequest) -> Result<Resolution, DnsError> {
        let group = self.policy.group_for(request.client_ip);

        if self
            .block_filter
            .is_blocked(&request.query.domain, &group)
            .await
        {
            debug!(domain = %request.query.domain, group = %group.name, "Query blocked");
            return Err(DnsError::Blocked);
        }

        self.resolver.resolve(&request.query).await
    }

    /// Cache-only probe for the ingress fast path. Never blocks and never
    /// consults the block filter — callers use it only for domains already
    /// cleared by a prior full pass (cached entries imply a prior clearance).
    pub fn try_cache(&self, request: &DnsRequest) -> Option<Resolution> {
        self.resolver.try_cache(&request.query)
    }
}
