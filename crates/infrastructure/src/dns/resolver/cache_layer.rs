use super::core::{UpstreamResolution, UpstreamResolve};
use crate::dns::cache::{CacheKey, CacheTier, CachedData, DnsCache, NegativeKind};
use async_trait::async_trait;
use bastion_dns_application::ports::{DnsResolver, Resolution, ResolutionSource};
use bastion_dns_domain::{DnsError, DnsQuery, RecordData};
use dashmap::DashMap;
use rustc_hash::FxBuildHasher;
use std::sync::{Arc, LazyLock};
use tokio::sync::watch;
use tracing::debug;

static EMPTY_ANSWERS: LazyLock<Arc<[RecordData]>> = LazyLock::new(|| Arc::from(Vec::new()));

#[derive(Clone)]
pub struct CachedResolverConfig {
    /// TTL used when an upstream answer carries no TTL at all.
    pub default_ttl: u32,
    pub negative_min_ttl: u32,
    pub negative_max_ttl: u32,
    pub serve_stale: bool,
    /// Forced TTL on answers served from an expired entry.
    pub stale_ttl: u32,
}

impl Default for CachedResolverConfig {
    fn default() -> Self {
        Self {
            default_ttl: 300,
            negative_min_ttl: 30,
            negative_max_ttl: 3_600,
            serve_stale: true,
            stale_ttl: 30,
        }
    }
}

/// What an in-flight resolution hands to its waiters. Every waiter for a
/// key observes the same outcome exactly once.
enum InflightOutcome {
    Resolved {
        answers: Arc<[RecordData]>,
        ttl: u32,
        negative: Option<NegativeKind>,
    },
    Stale {
        answers: Arc<[RecordData]>,
        ttl: u32,
    },
    Failed(DnsError),
}

type InflightSender = Arc<watch::Sender<Option<Arc<InflightOutcome>>>>;

/// Removes the in-flight slot and wakes waiters even when the leader's
/// future is cancelled mid-resolution; waiters then re-enter `resolve` and
/// one of them becomes the new leader.
struct InflightLeaderGuard {
    inflight: Arc<DashMap<CacheKey, InflightSender, FxBuildHasher>>,
    key: CacheKey,
    disarmed: bool,
}

impl Drop for InflightLeaderGuard {
    fn drop(&mut self) {
        if self.disarmed {
            return;
        }
        if let Some((_, tx)) = self.inflight.remove(&self.key) {
            let _ = tx.send(None);
        }
    }
}

/// The caching layer: pre-filter probe, local tier, shared tier, then a
/// coalesced dispatch to the upstream layer on a genuine miss. Successful
/// resolutions install into both tiers and the pre-filter before waiters
/// are released.
pub struct CachedResolver {
    inner: Arc<dyn UpstreamResolve>,
    cache: Arc<DnsCache>,
    config: CachedResolverConfig,
    inflight: Arc<DashMap<CacheKey, InflightSender, FxBuildHasher>>,
}

impl CachedResolver {
    pub fn new(
        inner: Arc<dyn UpstreamResolve>,
        cache: Arc<DnsCache>,
        config: CachedResolverConfig,
    ) -> Self {
        Self {
            inner,
            cache,
            config,
            inflight: Arc::new(DashMap::with_hasher(FxBuildHasher)),
        }
    }

    pub fn cache(&self) -> Arc<DnsCache> {
        Arc::clone(&self.cache)
    }

    fn check_cache(&self, query: &DnsQuery) -> Option<Result<Resolution, DnsError>> {
        let hit = self
            .cache
            .get(&query.domain, query.record_type, query.class)?;

        let source = match hit.tier {
            CacheTier::Local => ResolutionSource::LocalTier,
            CacheTier::Shared => ResolutionSource::SharedTier,
        };

        match hit.data {
            CachedData::Answers(answers) => Some(Ok(Resolution {
                answers,
                source,
                remaining_ttl: hit.remaining_ttl,
            })),
            CachedData::Negative(NegativeKind::NxDomain) => Some(Err(DnsError::NxDomain)),
            CachedData::Negative(NegativeKind::NoData) => Some(Ok(Resolution {
                answers: Arc::clone(&EMPTY_ANSWERS),
                source,
                remaining_ttl: hit.remaining_ttl,
            })),
        }
    }

    fn register_or_join(
        &self,
        key: &CacheKey,
    ) -> (bool, watch::Receiver<Option<Arc<InflightOutcome>>>) {
        match self.inflight.entry(key.clone()) {
            dashmap::Entry::Occupied(e) => {
                let rx = e.get().subscribe();
                drop(e);
                (false, rx)
            }
            dashmap::Entry::Vacant(e) => {
                let (tx, rx) = watch::channel(None::<Arc<InflightOutcome>>);
                e.insert(Arc::new(tx));
                (true, rx)
            }
        }
    }

    /// Stores a completed resolution into the shared tier (which also feeds
    /// the pre-filter and the calling worker's local tier).
    fn install(&self, query: &DnsQuery, resolution: &UpstreamResolution) -> (u32, Option<NegativeKind>) {
        match resolution.negative {
            Some(kind) => {
                let ttl = resolution
                    .negative_ttl
                    .unwrap_or(self.config.negative_min_ttl)
                    .clamp(self.config.negative_min_ttl, self.config.negative_max_ttl);
                self.cache
                    .insert_negative(&query.domain, query.record_type, query.class, kind, ttl);
                (ttl, Some(kind))
            }
            None => {
                let ttl = resolution.ttl.unwrap_or(self.config.default_ttl);
                self.cache.insert(
                    &query.domain,
                    query.record_type,
                    query.class,
                    Arc::clone(&resolution.answers),
                    ttl,
                );
                (ttl, None)
            }
        }
    }

    fn outcome_to_resolution(
        &self,
        outcome: &InflightOutcome,
    ) -> Result<Resolution, DnsError> {
        match outcome {
            InflightOutcome::Resolved {
                answers,
                ttl,
                negative,
            } => match negative {
                Some(NegativeKind::NxDomain) => Err(DnsError::NxDomain),
                Some(NegativeKind::NoData) => Ok(Resolution {
                    answers: Arc::clone(&EMPTY_ANSWERS),
                    source: ResolutionSource::Coalesced,
                    remaining_ttl: *ttl,
                }),
                None => Ok(Resolution {
                    answers: Arc::clone(answers),
                    source: ResolutionSource::Coalesced,
                    remaining_ttl: *ttl,
                }),
            },
            InflightOutcome::Stale { answers, ttl } => Ok(Resolution {
                answers: Arc::clone(answers),
                source: ResolutionSource::StaleCache,
                remaining_ttl: *ttl,
            }),
            InflightOutcome::Failed(e) => Err(e.clone()),
        }
    }

    async fn resolve_as_follower(
        &self,
        query: &DnsQuery,
        mut rx: watch::Receiver<Option<Arc<InflightOutcome>>>,
    ) -> Result<Resolution, DnsError> {
        // A waiter that is cancelled here just drops its receiver; the
        // in-flight resolution and the other waiters are unaffected.
        let _ = rx.changed().await;

        let outcome = rx.borrow().clone();
        match outcome {
            Some(outcome) => self.outcome_to_resolution(&outcome),
            // Leader vanished without delivering: retry from the top, which
            // elects a new leader (or hits the now-populated cache).
            None => self.resolve(query).await,
        }
    }

    async fn resolve_as_leader(
        &self,
        query: &DnsQuery,
        key: CacheKey,
    ) -> Result<Resolution, DnsError> {
        debug!(domain = %query.domain, record_type = %query.record_type, "Cache miss, resolving upstream");

        let mut guard = InflightLeaderGuard {
            inflight: Arc::clone(&self.inflight),
            key: key.clone(),
            disarmed: false,
        };

        let result = self.inner.resolve_upstream(query).await;

        let (reply, outcome) = match result {
            Ok(resolution) => {
                // Caches and pre-filter are populated before any waiter is
                // released.
                let (ttl, negative) = self.install(query, &resolution);
                let outcome = Arc::new(InflightOutcome::Resolved {
                    answers: Arc::clone(&resolution.answers),
                    ttl,
                    negative,
                });
                let reply = match negative {
                    Some(NegativeKind::NxDomain) => Err(DnsError::NxDomain),
                    Some(NegativeKind::NoData) => Ok(Resolution {
                        answers: Arc::clone(&EMPTY_ANSWERS),
                        source: ResolutionSource::Upstream(Arc::clone(&resolution.server)),
                        remaining_ttl: ttl,
                    }),
                    None => Ok(Resolution {
                        answers: Arc::clone(&resolution.answers),
                        source: ResolutionSource::Upstream(Arc::clone(&resolution.server)),
                        remaining_ttl: ttl.min(resolution.ttl.unwrap_or(ttl)),
                    }),
                };
                (reply, outcome)
            }
            Err(e) => {
                if let Some(stale) = self.try_serve_stale(query, &e) {
                    let outcome = Arc::new(InflightOutcome::Stale {
                        answers: Arc::clone(&stale.answers),
                        ttl: stale.remaining_ttl,
                    });
                    (Ok(stale), outcome)
                } else {
                    (Err(e.clone()), Arc::new(InflightOutcome::Failed(e)))
                }
            }
        };

        // Deliver to all waiters, then retire the in-flight slot.
        if let Some((_, tx)) = self.inflight.remove(&key) {
            let _ = tx.send(Some(outcome));
        }
        guard.disarmed = true;

        reply
    }

    /// Serve-stale policy: when every upstream attempt failed and an
    /// expired-but-recent entry exists, answer from it with the forced
    /// minimal TTL instead of failing.
    fn try_serve_stale(&self, query: &DnsQuery, error: &DnsError) -> Option<Resolution> {
        if !self.config.serve_stale {
            return None;
        }
        if !matches!(error, DnsError::UpstreamExhausted) {
            return None;
        }
        let data = self
            .cache
            .get_stale(&query.domain, query.record_type, query.class)?;
        let answers = match data {
            CachedData::Answers(answers) => answers,
            CachedData::Negative(_) => return None,
        };

        debug!(domain = %query.domain, "Serving stale answer after upstream exhaustion");
        Some(Resolution {
            answers,
            source: ResolutionSource::StaleCache,
            remaining_ttl: self.config.stale_ttl,
        })
    }
}

#[async_trait]
impl DnsResolver for CachedResolver {
    async fn resolve(&self, query: &DnsQuery) -> Result<Resolution, DnsError> {
        if let Some(cached) = self.check_cache(query) {
            return cached;
        }

        let key = CacheKey::new(&query.domain, query.record_type, query.class);
        let (is_leader, rx) = self.register_or_join(&key);

        if is_leader {
            self.resolve_as_leader(query, key).await
        } else {
            self.resolve_as_follower(query, rx).await
        }
    }

    fn try_cache(&self, query: &DnsQuery) -> Option<Resolution> {
        match self.check_cache(query) {
            Some(Ok(resolution)) if !resolution.answers.is_empty() => Some(resolution),
            _ => None,
        }
    }
}
