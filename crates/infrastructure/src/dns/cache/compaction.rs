use super::coarse_clock::coarse_now_secs;
use super::storage::DnsCache;
use std::sync::atomic::Ordering as AtomicOrdering;
use tracing::debug;

impl DnsCache {
    /// Sweeps out entries that are marked for deletion or expired past
    /// their stale window. Reads already treat expired entries as absent;
    /// this sweep only reclaims memory.
    pub fn compact(&self) -> usize {
        let now = coarse_now_secs();
        let before = self.map.len();
        self.map.retain(|_, record| {
            !record.is_marked_for_deletion() && !expired_past_stale(record, now)
        });
        let removed = before.saturating_sub(self.map.len());

        if removed > 0 {
            self.metrics.compactions.fetch_add(1, AtomicOrdering::Relaxed);
            debug!(removed, cache_size = self.map.len(), "Cache compaction completed");
        }

        removed
    }
}

fn expired_past_stale(record: &super::record::CachedRecord, now: u64) -> bool {
    record.is_expired_at_secs(now) && !record.is_stale_usable_at_secs(now)
}
