use super::upstream::UpstreamConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DnsConfig {
    #[serde(default)]
    pub upstream: UpstreamConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    /// Capacity of the bounded query-event channel. Events beyond this are
    /// dropped rather than backpressuring the resolver.
    #[serde(default = "default_event_queue_capacity")]
    pub event_queue_capacity: usize,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            upstream: UpstreamConfig::default(),
            cache: CacheConfig::default(),
            event_queue_capacity: default_event_queue_capacity(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Shard count for the shared tier. Must be a power of two.
    #[serde(default = "default_shard_amount")]
    pub shard_amount: usize,

    /// Capacity of each worker's thread-local tier.
    #[serde(default = "default_local_capacity")]
    pub local_capacity: usize,

    /// TTL clamp applied at insertion: min(upstream TTL, `max_ttl`) floored
    /// at `min_ttl`.
    #[serde(default = "default_min_ttl")]
    pub min_ttl: u32,

    #[serde(default = "default_max_ttl")]
    pub max_ttl: u32,

    #[serde(default = "default_negative_min_ttl")]
    pub negative_min_ttl: u32,

    #[serde(default = "default_negative_max_ttl")]
    pub negative_max_ttl: u32,

    /// Eviction policy: "lru", "lfu" or "lfu-k".
    #[serde(default = "default_eviction_strategy")]
    pub eviction_strategy: String,

    /// Entries sampled per eviction decision.
    #[serde(default = "default_eviction_sample_size")]
    pub eviction_sample_size: usize,

    /// LFU-K sliding window: number of time buckets and width of each.
    #[serde(default = "default_window_buckets")]
    pub window_buckets: usize,

    #[serde(default = "default_bucket_width_secs")]
    pub bucket_width_secs: u64,

    /// Fraction of the original TTL after which an entry becomes a
    /// refresh-ahead candidate.
    #[serde(default = "default_refresh_fraction")]
    pub refresh_fraction: f64,

    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    #[serde(default = "default_compaction_interval_secs")]
    pub compaction_interval_secs: u64,

    /// Serve an expired-but-recent answer when every upstream attempt fails.
    #[serde(default = "default_serve_stale")]
    pub serve_stale: bool,

    /// Forced TTL on stale answers.
    #[serde(default = "default_stale_ttl")]
    pub stale_ttl: u32,

    #[serde(default = "default_bloom_fp_rate")]
    pub bloom_fp_rate: f64,

    /// Pre-filter generation rotation: whichever of these triggers first.
    #[serde(default = "default_bloom_rotate_interval_secs")]
    pub bloom_rotate_interval_secs: u64,

    #[serde(default)]
    pub bloom_rotate_insert_threshold: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            shard_amount: default_shard_amount(),
            local_capacity: default_local_capacity(),
            min_ttl: default_min_ttl(),
            max_ttl: default_max_ttl(),
            negative_min_ttl: default_negative_min_ttl(),
            negative_max_ttl: default_negative_max_ttl(),
            eviction_strategy: default_eviction_strategy(),
            eviction_sample_size: default_eviction_sample_size(),
            window_buckets: default_window_buckets(),
            bucket_width_secs: default_bucket_width_secs(),
            refresh_fraction: default_refresh_fraction(),
            refresh_interval_secs: default_refresh_interval_secs(),
            compaction_interval_secs: default_compaction_interval_secs(),
            serve_stale: default_serve_stale(),
            stale_ttl: default_stale_ttl(),
            bloom_fp_rate: default_bloom_fp_rate(),
            bloom_rotate_interval_secs: default_bloom_rotate_interval_secs(),
            bloom_rotate_insert_threshold: 0,
        }
    }
}

impl CacheConfig {
    /// Insert-count rotation threshold; defaults to the cache capacity.
    pub fn effective_rotate_insert_threshold(&self) -> usize {
        if self.bloom_rotate_insert_threshold > 0 {
            self.bloom_rotate_insert_threshold
        } else {
            self.max_entries
        }
    }
}

fn default_event_queue_capacity() -> usize {
    4_096
}

fn default_max_entries() -> usize {
    200_000
}

fn default_shard_amount() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4);
    (cpus * 4).next_power_of_two().clamp(8, 256)
}

fn default_local_capacity() -> usize {
    512
}

fn default_min_ttl() -> u32 {
    5
}

fn default_max_ttl() -> u32 {
    86_400
}

fn default_negative_min_ttl() -> u32 {
    30
}

fn default_negative_max_ttl() -> u32 {
    3_600
}

fn default_eviction_strategy() -> String {
    "lfu-k".to_string()
}

fn default_eviction_sample_size() -> usize {
    8
}

fn default_window_buckets() -> usize {
    8
}

fn default_bucket_width_secs() -> u64 {
    60
}

fn default_refresh_fraction() -> f64 {
    0.75
}

fn default_refresh_interval_secs() -> u64 {
    30
}

fn default_compaction_interval_secs() -> u64 {
    300
}

fn default_serve_stale() -> bool {
    true
}

fn default_stale_ttl() -> u32 {
    30
}

fn default_bloom_fp_rate() -> f64 {
    0.01
}

fn default_bloom_rotate_interval_secs() -> u64 {
    3_600
}
