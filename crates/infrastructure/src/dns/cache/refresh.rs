use super::coarse_clock::coarse_now_secs;
use super::storage::DnsCache;
use bastion_dns_domain::{DnsClass, RecordType};
use compact_str::CompactString;
use std::sync::atomic::Ordering as AtomicOrdering;

/// Refresh-ahead selection.
impl DnsCache {
    /// Entries past the configured fraction of their TTL that are worth
    /// renewing before a client sees the miss. Negative entries are left
    /// to expire on their own.
    ///
    /// Each selected entry's `refreshing` flag is raised here so the same
    /// entry is not handed to two refresh cycles; the flag drops when
    /// `refresh_record` lands or the cycle gives up.
    pub fn refresh_candidates(&self, limit: usize) -> Vec<(CompactString, RecordType, DnsClass)> {
        let now = coarse_now_secs();
        let mut candidates = Vec::new();

        for entry in self.map.iter() {
            if candidates.len() >= limit {
                break;
            }
            let record = entry.value();

            if record.is_expired_at_secs(now) || record.is_marked_for_deletion() {
                continue;
            }
            if record.data.is_negative() {
                continue;
            }
            if !record.should_refresh(now, self.refresh_fraction) {
                continue;
            }
            if record.refreshing.swap(true, AtomicOrdering::Acquire) {
                continue;
            }

            let key = entry.key();
            candidates.push((key.domain.clone(), key.record_type, key.class));
        }

        candidates
    }

    /// Called when a refresh attempt fails; the still-valid entry stays in
    /// place and becomes eligible for the next cycle.
    pub fn reset_refreshing(&self, domain: &str, record_type: RecordType, class: DnsClass) {
        use super::key::CacheKey;
        let key = CacheKey::new(domain, record_type, class);
        if let Some(entry) = self.map.get(&key) {
            entry.refreshing.store(false, AtomicOrdering::Release);
        }
    }
}
