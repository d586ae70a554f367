use std::net::IpAddr;
use std::sync::Arc;

/// Effective policy group for a client. Influences blocking decisions only;
/// caching is group-agnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyGroup {
    pub name: Arc<str>,
}

impl Default for PolicyGroup {
    fn default() -> Self {
        Self {
            name: Arc::from("default"),
        }
    }
}

pub trait ClientPolicyResolver: Send + Sync {
    fn group_for(&self, client_ip: IpAddr) -> PolicyGroup;
}

/// Maps every client to the default group.
pub struct DefaultPolicyResolver;

impl ClientPolicyResolver for DefaultPolicyResolver {
    fn group_for(&self, _client_ip: IpAddr) -> PolicyGroup {
        PolicyGroup::default()
    }
}
