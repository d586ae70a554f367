use super::bloom::AtomicBloom;
use super::coarse_clock::coarse_now_secs;
use super::data::{CachedData, NegativeKind};
use super::eviction::{ActiveEvictionPolicy, AccessWindow, EvictionStrategy};
use super::key::{BorrowedKey, CacheKey};
use super::l1;
use super::metrics::CacheMetrics;
use super::record::CachedRecord;
use bastion_dns_domain::{CacheConfig, DnsClass, RecordData, RecordType};
use dashmap::DashMap;
use rustc_hash::FxBuildHasher;
use std::str::FromStr;
use std::sync::atomic::Ordering as AtomicOrdering;
use std::sync::Arc;
use tracing::{debug, info};

pub struct DnsCacheConfig {
    pub max_entries: usize,
    pub shard_amount: usize,
    pub local_capacity: usize,
    pub eviction_strategy: EvictionStrategy,
    pub eviction_sample_size: usize,
    pub window_buckets: usize,
    pub bucket_width_secs: u64,
    pub min_ttl: u32,
    pub max_ttl: u32,
    pub refresh_fraction: f64,
    pub bloom_fp_rate: f64,
}

impl DnsCacheConfig {
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            max_entries: config.max_entries,
            shard_amount: config.shard_amount,
            local_capacity: config.local_capacity,
            eviction_strategy: EvictionStrategy::from_str(&config.eviction_strategy)
                .unwrap_or(EvictionStrategy::LFUK),
            eviction_sample_size: config.eviction_sample_size,
            window_buckets: config.window_buckets,
            bucket_width_secs: config.bucket_width_secs,
            min_ttl: config.min_ttl,
            max_ttl: config.max_ttl,
            refresh_fraction: config.refresh_fraction,
            bloom_fp_rate: config.bloom_fp_rate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTier {
    Local,
    Shared,
}

/// A cache hit with its recomputed live TTL.
pub struct CacheHit {
    pub data: CachedData,
    pub remaining_ttl: u32,
    pub tier: CacheTier,
}

/// Shared answer cache: one `DashMap` partitioned into independently locked
/// shards, fronted by the negative pre-filter and each worker's local tier.
/// Shard critical sections cover map mutation only — scoring, clamping and
/// wire work all happen outside them.
pub struct DnsCache {
    pub(super) map: DashMap<CacheKey, CachedRecord, FxBuildHasher>,
    pub(super) bloom: AtomicBloom,
    pub(super) policy: ActiveEvictionPolicy,
    pub(super) max_entries: usize,
    pub(super) eviction_sample_size: usize,
    pub(super) window_buckets: usize,
    pub(super) bucket_width_secs: u64,
    pub(super) min_ttl: u32,
    pub(super) max_ttl: u32,
    pub(super) refresh_fraction: f64,
    pub(super) metrics: Arc<CacheMetrics>,
}

impl DnsCache {
    pub fn new(config: DnsCacheConfig) -> Self {
        let policy = ActiveEvictionPolicy::from_strategy(config.eviction_strategy);

        info!(
            max_entries = config.max_entries,
            shards = config.shard_amount,
            eviction = policy.strategy().as_str(),
            "Initializing DNS cache"
        );

        l1::configure_capacity(config.local_capacity);

        let map = DashMap::with_capacity_and_hasher_and_shard_amount(
            config.max_entries,
            FxBuildHasher,
            config.shard_amount.max(2),
        );
        let bloom = AtomicBloom::new(config.max_entries * 2, config.bloom_fp_rate);

        Self {
            map,
            bloom,
            policy,
            max_entries: config.max_entries,
            eviction_sample_size: config.eviction_sample_size.max(1),
            window_buckets: config.window_buckets,
            bucket_width_secs: config.bucket_width_secs,
            min_ttl: config.min_ttl,
            max_ttl: config.max_ttl,
            refresh_fraction: config.refresh_fraction,
            metrics: Arc::new(CacheMetrics::default()),
        }
    }

    pub fn get(&self, domain: &str, record_type: RecordType, class: DnsClass) -> Option<CacheHit> {
        // Pre-filter first: a definite absence skips both tiers entirely.
        let borrowed = BorrowedKey::new(domain, record_type, class);
        if !self.bloom.probe(&borrowed) {
            self.metrics.filter_rejects.fetch_add(1, AtomicOrdering::Relaxed);
            self.metrics.misses.fetch_add(1, AtomicOrdering::Relaxed);
            return None;
        }

        if let Some((answers, remaining_ttl, upstream_ttl)) = l1::get(domain, &record_type) {
            self.metrics.hits.fetch_add(1, AtomicOrdering::Relaxed);
            return Some(CacheHit {
                data: CachedData::Answers(answers),
                remaining_ttl: self.floor_ttl(remaining_ttl, upstream_ttl),
                tier: CacheTier::Local,
            });
        }

        let key = CacheKey::new(domain, record_type, class);
        if let Some(entry) = self.map.get(&key) {
            let record = entry.value();
            let now_secs = coarse_now_secs();

            if record.is_expired_at_secs(now_secs) || record.is_marked_for_deletion() {
                // Mark while holding the ref; the compaction sweep removes it.
                record.mark_for_deletion();
                drop(entry);
                self.metrics.misses.fetch_add(1, AtomicOrdering::Relaxed);
                return None;
            }

            record.record_hit(now_secs);
            let remaining_ttl =
                self.floor_ttl(record.remaining_ttl_at_secs(now_secs), record.upstream_ttl);

            if let CachedData::Answers(ref answers) = record.data {
                l1::insert(
                    domain,
                    &record_type,
                    Arc::clone(answers),
                    record.expires_at_secs,
                    record.upstream_ttl,
                );
            }

            self.metrics.hits.fetch_add(1, AtomicOrdering::Relaxed);
            return Some(CacheHit {
                data: record.data.clone(),
                remaining_ttl,
                tier: CacheTier::Shared,
            });
        }

        self.metrics.misses.fetch_add(1, AtomicOrdering::Relaxed);
        None
    }

    /// Expired-but-recent entry for the serve-stale path. Does not touch
    /// hit accounting; the caller decides whether it is actually served.
    pub fn get_stale(
        &self,
        domain: &str,
        record_type: RecordType,
        class: DnsClass,
    ) -> Option<CachedData> {
        let key = CacheKey::new(domain, record_type, class);
        let entry = self.map.get(&key)?;
        let record = entry.value();
        if record.is_stale_usable_at_secs(coarse_now_secs()) {
            self.metrics.stale_served.fetch_add(1, AtomicOrdering::Relaxed);
            Some(record.data.clone())
        } else {
            None
        }
    }

    pub fn insert(
        &self,
        domain: &str,
        record_type: RecordType,
        class: DnsClass,
        answers: Arc<[RecordData]>,
        upstream_ttl: u32,
    ) {
        let ttl = upstream_ttl.min(self.max_ttl).max(self.min_ttl);
        let key = CacheKey::new(domain, record_type, class);

        if self.map.len() >= self.max_entries {
            self.evict_one();
        }

        let record = CachedRecord::new(
            CachedData::Answers(Arc::clone(&answers)),
            ttl,
            upstream_ttl,
            self.new_window(),
        );
        let expires_at_secs = record.expires_at_secs;

        self.bloom.record(&key);
        self.map.insert(key, record);
        l1::insert(domain, &record_type, answers, expires_at_secs, upstream_ttl);

        self.metrics.insertions.fetch_add(1, AtomicOrdering::Relaxed);
        debug!(domain = %domain, record_type = %record_type, ttl, "Cached answer set");
    }

    /// Negative answers carry their own TTL policy (SOA minimum, clamped by
    /// the caller to the negative bounds) and are never promoted to L1.
    pub fn insert_negative(
        &self,
        domain: &str,
        record_type: RecordType,
        class: DnsClass,
        kind: NegativeKind,
        ttl: u32,
    ) {
        let key = CacheKey::new(domain, record_type, class);

        if self.map.len() >= self.max_entries {
            self.evict_one();
        }

        let record = CachedRecord::new(CachedData::Negative(kind), ttl, ttl, self.new_window());
        self.bloom.record(&key);
        self.map.insert(key, record);
        self.metrics.insertions.fetch_add(1, AtomicOrdering::Relaxed);
    }

    /// In-place renewal from a refresh-ahead resolution: new data and TTL,
    /// access bookkeeping preserved so the entry's score survives.
    pub fn refresh_record(
        &self,
        domain: &str,
        record_type: RecordType,
        class: DnsClass,
        answers: Arc<[RecordData]>,
        upstream_ttl: u32,
    ) -> bool {
        let key = CacheKey::new(domain, record_type, class);
        let now = coarse_now_secs();
        let ttl = upstream_ttl.min(self.max_ttl).max(self.min_ttl);

        if let Some(mut entry) = self.map.get_mut(&key) {
            let record = entry.value_mut();
            if record.is_marked_for_deletion() {
                return false;
            }
            record.expires_at_secs = now + ttl as u64;
            record.inserted_at_secs = now;
            record.ttl = ttl;
            record.upstream_ttl = upstream_ttl;
            record.data = CachedData::Answers(Arc::clone(&answers));
            record.refreshing.store(false, AtomicOrdering::Relaxed);
            drop(entry);

            l1::insert(domain, &record_type, answers, now + ttl as u64, upstream_ttl);
            self.metrics.refreshes.fetch_add(1, AtomicOrdering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Removes the shared entry and the calling worker's local copy. Other
    /// workers' local tiers drop theirs on expiry validation.
    pub fn remove(&self, domain: &str, record_type: RecordType, class: DnsClass) -> bool {
        let key = CacheKey::new(domain, record_type, class);
        l1::remove(domain, &record_type);
        if self.map.remove(&key).is_some() {
            self.metrics.evictions.fetch_add(1, AtomicOrdering::Relaxed);
            true
        } else {
            false
        }
    }

    pub fn clear(&self) {
        self.map.clear();
        self.bloom.clear();
        l1::clear();
        info!("Cache cleared");
    }

    /// Shared-tier membership only; ignores the local tier and does not
    /// touch access bookkeeping.
    pub fn contains(&self, domain: &str, record_type: RecordType, class: DnsClass) -> bool {
        let key = CacheKey::new(domain, record_type, class);
        self.map.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn metrics(&self) -> Arc<CacheMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn strategy(&self) -> EvictionStrategy {
        self.policy.strategy()
    }

    pub fn filter(&self) -> &AtomicBloom {
        &self.bloom
    }

    fn new_window(&self) -> Option<AccessWindow> {
        if self.policy.uses_access_window() {
            Some(AccessWindow::new(self.window_buckets, self.bucket_width_secs))
        } else {
            None
        }
    }

    /// Serving floor for a live entry: the configured minimum, but never
    /// pushed above what the upstream originally returned.
    #[inline]
    fn floor_ttl(&self, remaining: u32, upstream_ttl: u32) -> u32 {
        remaining.max(self.min_ttl.min(upstream_ttl))
    }

    /// Samples a bounded set of entries and evicts the lowest-scored one,
    /// oldest insertion breaking ties. Expired entries win immediately.
    /// Cost is O(sample size), independent of cache size.
    fn evict_one(&self) {
        let now = coarse_now_secs();
        let sample_size = self.eviction_sample_size;

        let mut victim: Option<(CacheKey, f64, u64)> = None;
        let mut sampled = 0usize;

        for entry in self.map.iter() {
            if sampled >= sample_size {
                break;
            }
            let record = entry.value();
            sampled += 1;

            if record.is_expired_at_secs(now) || record.is_marked_for_deletion() {
                victim = Some((entry.key().clone(), f64::MIN, record.inserted_at_secs));
                break;
            }

            let score = self.policy.compute_score(record, now);
            let inserted = record.inserted_at_secs;
            let replace = match victim {
                None => true,
                Some((_, best_score, best_inserted)) => {
                    score < best_score || (score == best_score && inserted < best_inserted)
                }
            };
            if replace {
                victim = Some((entry.key().clone(), score, inserted));
            }
        }
        // Iterator released before the write lock below.

        if let Some((key, _, _)) = victim {
            if self.map.remove(&key).is_some() {
                self.metrics.evictions.fetch_add(1, AtomicOrdering::Relaxed);
            }
        }
    }
}
