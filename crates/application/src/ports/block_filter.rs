use super::PolicyGroup;
use async_trait::async_trait;

/// Membership test against the blocklist/whitelist engine. List source
/// management lives with the collaborator; only the decision is consumed
/// here, before any cache lookup.
#[async_trait]
pub trait BlockFilter: Send + Sync {
    async fn is_blocked(&self, domain: &str, group: &PolicyGroup) -> bool;
}

/// Filter that blocks nothing. Used when no blocking engine is wired in.
pub struct NoopBlockFilter;

#[async_trait]
impl BlockFilter for NoopBlockFilter {
    async fn is_blocked(&self, _domain: &str, _group: &PolicyGroup) -> bool {
        false
    }
}
