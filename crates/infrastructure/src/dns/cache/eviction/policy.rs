use crate::dns::cache::record::CachedRecord;

/// Scoring interface for eviction decisions.
///
/// Higher score = more valuable entry. Scores are non-negative. The shard
/// logic evicts the lowest-scored entry of a sampled set and never needs to
/// know which scheme produced the number, so schemes are swappable here
/// without touching the storage code.
pub trait EvictionPolicy: Send + Sync {
    /// `now_secs` is the coarse timestamp, passed in to avoid re-reading
    /// the clock inside sampling loops.
    fn compute_score(&self, record: &CachedRecord, now_secs: u64) -> f64;

    /// Whether records should carry the sliding access window.
    fn uses_access_window(&self) -> bool {
        false
    }
}
