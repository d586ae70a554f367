use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

// align(64) keeps the hot pair (hits/misses) on their own cache line, away
// from the cold maintenance counters.
#[derive(Default)]
#[repr(align(64))]
pub struct CacheMetrics {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    _hot_pad: [u64; 6],

    pub insertions: AtomicU64,
    pub evictions: AtomicU64,
    pub filter_rejects: AtomicU64,
    pub refreshes: AtomicU64,
    pub stale_served: AtomicU64,
    pub compactions: AtomicU64,
}

impl CacheMetrics {
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(AtomicOrdering::Relaxed) as f64;
        let total = hits + self.misses.load(AtomicOrdering::Relaxed) as f64;
        if total > 0.0 {
            (hits / total) * 100.0
        } else {
            0.0
        }
    }
}
