use crate::dns::cache::{coarse_clock, DnsCache};
use crate::dns::resolver::UpstreamResolve;
use bastion_dns_domain::{CacheConfig, DnsQuery};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info, warn};

/// Entries renewed per refresh cycle. Bounds the low-priority upstream load
/// a single cycle can generate.
const REFRESH_BATCH_LIMIT: usize = 64;

/// Background upkeep: the coarse clock tick, refresh-ahead resolution,
/// compaction sweeps, and pre-filter generation rotation.
pub struct CacheMaintenance {
    cache: Arc<DnsCache>,
    upstream: Arc<dyn UpstreamResolve>,
    refresh_interval: Duration,
    compaction_interval: Duration,
    rotate_interval: Duration,
    rotate_insert_threshold: u64,
}

impl CacheMaintenance {
    pub fn new(cache: Arc<DnsCache>, upstream: Arc<dyn UpstreamResolve>, config: &CacheConfig) -> Self {
        Self {
            cache,
            upstream,
            refresh_interval: Duration::from_secs(config.refresh_interval_secs.max(1)),
            compaction_interval: Duration::from_secs(config.compaction_interval_secs.max(1)),
            rotate_interval: Duration::from_secs(config.bloom_rotate_interval_secs.max(1)),
            rotate_insert_threshold: config.effective_rotate_insert_threshold() as u64,
        }
    }

    pub fn start(self) -> Vec<JoinHandle<()>> {
        info!(
            refresh_secs = self.refresh_interval.as_secs(),
            compaction_secs = self.compaction_interval.as_secs(),
            rotate_secs = self.rotate_interval.as_secs(),
            "Cache maintenance started"
        );

        vec![
            spawn_clock_tick(),
            self.spawn_refresh(),
            self.spawn_compaction(),
            self.spawn_rotation(),
        ]
    }

    fn spawn_refresh(&self) -> JoinHandle<()> {
        let cache = Arc::clone(&self.cache);
        let upstream = Arc::clone(&self.upstream);
        let period = self.refresh_interval;

        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                refresh_cycle(&cache, &upstream).await;
            }
        })
    }

    fn spawn_compaction(&self) -> JoinHandle<()> {
        let cache = Arc::clone(&self.cache);
        let period = self.compaction_interval;

        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = cache.compact();
                if removed > 0 {
                    debug!(removed, "Compaction sweep");
                }
            }
        })
    }

    /// Rotates the pre-filter generations on the configured interval, or
    /// earlier once enough insertions have accumulated.
    fn spawn_rotation(&self) -> JoinHandle<()> {
        let cache = Arc::clone(&self.cache);
        let rotate_interval = self.rotate_interval;
        let threshold = self.rotate_insert_threshold;

        tokio::spawn(async move {
            let check_period = Duration::from_secs(10).min(rotate_interval);
            let mut ticker = interval(check_period);
            let mut elapsed = Duration::ZERO;
            ticker.tick().await;
            loop {
                ticker.tick().await;
                elapsed += check_period;

                let inserts = cache.filter().inserts_since_rotation();
                if elapsed >= rotate_interval || inserts >= threshold {
                    cache.filter().rotate();
                    debug!(inserts, "Pre-filter generation rotated");
                    elapsed = Duration::ZERO;
                }
            }
        })
    }
}

fn spawn_clock_tick() -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(1));
        loop {
            ticker.tick().await;
            coarse_clock::tick();
        }
    })
}

/// One refresh-ahead pass: re-resolve entries nearing expiry and renew them
/// in place. A failed refresh leaves the still-valid entry alone; it simply
/// becomes a candidate again next cycle.
async fn refresh_cycle(cache: &Arc<DnsCache>, upstream: &Arc<dyn UpstreamResolve>) {
    let candidates = cache.refresh_candidates(REFRESH_BATCH_LIMIT);
    if candidates.is_empty() {
        return;
    }

    debug!(candidates = candidates.len(), "Refreshing entries ahead of expiry");

    for (domain, record_type, class) in candidates {
        let query = DnsQuery {
            domain: Arc::from(domain.as_str()),
            record_type,
            class,
        };

        match upstream.resolve_upstream(&query).await {
            Ok(resolution) if resolution.negative.is_none() => {
                let ttl = resolution.ttl.unwrap_or(0);
                if ttl == 0
                    || !cache.refresh_record(
                        &query.domain,
                        record_type,
                        class,
                        resolution.answers,
                        ttl,
                    )
                {
                    cache.reset_refreshing(&query.domain, record_type, class);
                }
            }
            Ok(_) => {
                // The name went negative upstream; let the positive entry
                // age out on its own rather than replacing it early.
                cache.reset_refreshing(&query.domain, record_type, class);
            }
            Err(e) => {
                warn!(domain = %query.domain, error = %e, "Refresh-ahead attempt failed");
                cache.reset_refreshing(&query.domain, record_type, class);
            }
        }
    }
}
