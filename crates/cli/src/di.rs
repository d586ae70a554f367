use anyhow::Context;
use bastion_dns_application::ports::{
    DefaultPolicyResolver, NoopBlockFilter, QueryEvent, QueryEventSink,
};
use bastion_dns_application::use_cases::HandleDnsQuery;
use bastion_dns_domain::{CacheConfig, Config};
use bastion_dns_infrastructure::dns::cache::{DnsCache, DnsCacheConfig};
use bastion_dns_infrastructure::dns::events::{
    spawn_event_drain, LoggingEventSink, QueryEventEmitter,
};
use bastion_dns_infrastructure::dns::maintenance::CacheMaintenance;
use bastion_dns_infrastructure::dns::resolver::{
    CachedResolver, CachedResolverConfig, CoreResolver, UpstreamResolve,
};
use bastion_dns_infrastructure::dns::server::DnsServer;
use bastion_dns_infrastructure::dns::upstream::UpstreamPool;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Builds and owns the wired component graph until the server takes over.
pub struct DnsServices {
    cache: Arc<DnsCache>,
    core: Arc<CoreResolver>,
    use_case: Arc<HandleDnsQuery>,
    emitter: QueryEventEmitter,
    event_rx: Option<mpsc::Receiver<QueryEvent>>,
}

impl DnsServices {
    pub async fn build(config: &Config) -> anyhow::Result<Self> {
        let pool = Arc::new(
            UpstreamPool::from_config(&config.dns.upstream)
                .await
                .context("building upstream pool")?,
        );

        let cache = Arc::new(DnsCache::new(DnsCacheConfig::from_config(&config.dns.cache)));

        let resolver_config = CachedResolverConfig {
            default_ttl: 300,
            negative_min_ttl: config.dns.cache.negative_min_ttl,
            negative_max_ttl: config.dns.cache.negative_max_ttl,
            serve_stale: config.dns.cache.serve_stale,
            stale_ttl: config.dns.cache.stale_ttl,
        };

        let core = Arc::new(CoreResolver::new(Arc::clone(&pool)));
        let cached = Arc::new(CachedResolver::new(
            Arc::clone(&core) as Arc<dyn UpstreamResolve>,
            Arc::clone(&cache),
            resolver_config,
        ));

        let use_case = Arc::new(HandleDnsQuery::new(
            cached,
            Arc::new(NoopBlockFilter),
            Arc::new(DefaultPolicyResolver),
        ));

        let (emitter, event_rx) = QueryEventEmitter::bounded(config.dns.event_queue_capacity);

        Ok(Self {
            cache,
            core,
            use_case,
            emitter,
            event_rx: Some(event_rx),
        })
    }

    pub fn start_maintenance(&self, config: &CacheConfig) -> Vec<tokio::task::JoinHandle<()>> {
        CacheMaintenance::new(
            Arc::clone(&self.cache),
            Arc::clone(&self.core) as Arc<dyn UpstreamResolve>,
            config,
        )
        .start()
    }

    pub fn start_event_drain(&mut self) -> Option<tokio::task::JoinHandle<()>> {
        self.event_rx
            .take()
            .map(|rx| spawn_event_drain(rx, Arc::new(LoggingEventSink)))
    }

    pub fn into_server(
        self,
        bind_addr: SocketAddr,
        udp_workers: usize,
        tcp_idle_timeout_secs: u64,
    ) -> DnsServer {
        DnsServer::new(
            self.use_case,
            Arc::new(self.emitter) as Arc<dyn QueryEventSink>,
            bind_addr,
            udp_workers,
            Duration::from_secs(tcp_idle_timeout_secs),
        )
    }
}
