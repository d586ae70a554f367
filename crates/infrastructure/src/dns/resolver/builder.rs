use super::cache_layer::{CachedResolver, CachedResolverConfig};
use super::core::CoreResolver;
use crate::dns::cache::DnsCache;
use crate::dns::upstream::UpstreamPool;
use bastion_dns_application::ports::DnsResolver;
use std::sync::Arc;
use tracing::info;

/// Assembles the layered resolver: pool dispatch at the bottom, caching and
/// coalescing on top.
pub struct ResolverBuilder {
    pool: Arc<UpstreamPool>,
    cache: Arc<DnsCache>,
    config: CachedResolverConfig,
}

impl ResolverBuilder {
    pub fn new(pool: Arc<UpstreamPool>, cache: Arc<DnsCache>) -> Self {
        Self {
            pool,
            cache,
            config: CachedResolverConfig::default(),
        }
    }

    pub fn with_config(mut self, config: CachedResolverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> (Arc<dyn DnsResolver>, Arc<CachedResolver>) {
        info!(
            serve_stale = self.config.serve_stale,
            "Building DNS resolver stack"
        );

        let core = Arc::new(CoreResolver::new(self.pool));
        let cached = Arc::new(CachedResolver::new(core, self.cache, self.config));
        (cached.clone() as Arc<dyn DnsResolver>, cached)
    }
}
