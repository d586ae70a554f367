use super::coarse_clock::coarse_now_secs;
use super::data::CachedData;
use super::eviction::window::AccessWindow;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};

/// One resolved answer set plus eviction bookkeeping.
///
/// Timestamps are coarse Unix seconds from the shared clock; the read hot
/// path never calls into the OS for time.
pub struct CachedRecord {
    pub data: CachedData,
    pub expires_at_secs: u64,
    pub inserted_at_secs: u64,
    /// Clamped TTL this entry was stored with: min(upstream, ceiling),
    /// floored at the configured minimum.
    pub ttl: u32,
    /// TTL as originally returned by the upstream, before clamping. A
    /// served response's remaining TTL never exceeds this.
    pub upstream_ttl: u32,
    pub hit_count: AtomicU64,
    pub last_access: AtomicU64,
    /// Sliding-window access buckets; present only under the LFU-K policy.
    pub window: Option<AccessWindow>,
    pub marked_for_deletion: AtomicBool,
    pub refreshing: AtomicBool,
}

impl CachedRecord {
    pub fn new(
        data: CachedData,
        ttl: u32,
        upstream_ttl: u32,
        window: Option<AccessWindow>,
    ) -> Self {
        let now_secs = coarse_now_secs();
        Self {
            data,
            expires_at_secs: now_secs + ttl as u64,
            inserted_at_secs: now_secs,
            ttl,
            upstream_ttl,
            hit_count: AtomicU64::new(0),
            last_access: AtomicU64::new(now_secs),
            window,
            marked_for_deletion: AtomicBool::new(false),
            refreshing: AtomicBool::new(false),
        }
    }

    #[inline(always)]
    pub fn is_expired_at_secs(&self, now_secs: u64) -> bool {
        now_secs >= self.expires_at_secs
    }

    /// Expired but still inside the serve-stale window (2x the stored TTL
    /// past insertion).
    #[inline(always)]
    pub fn is_stale_usable_at_secs(&self, now_secs: u64) -> bool {
        let age = now_secs.saturating_sub(self.inserted_at_secs);
        self.is_expired_at_secs(now_secs) && age < (self.ttl as u64) * 2
    }

    #[inline(always)]
    pub fn remaining_ttl_at_secs(&self, now_secs: u64) -> u32 {
        self.expires_at_secs
            .saturating_sub(now_secs)
            .min(self.upstream_ttl as u64) as u32
    }

    pub fn mark_for_deletion(&self) {
        self.marked_for_deletion.store(true, AtomicOrdering::Relaxed);
    }

    #[inline(always)]
    pub fn is_marked_for_deletion(&self) -> bool {
        self.marked_for_deletion.load(AtomicOrdering::Relaxed)
    }

    /// True once the entry has lived past `fraction` of its TTL and should
    /// be re-resolved ahead of expiry.
    #[inline(always)]
    pub fn should_refresh(&self, now_secs: u64, fraction: f64) -> bool {
        let elapsed = now_secs.saturating_sub(self.inserted_at_secs) as f64;
        elapsed >= (self.ttl as f64) * fraction
    }

    #[inline(always)]
    pub fn record_hit(&self, now_secs: u64) {
        self.hit_count.fetch_add(1, AtomicOrdering::Relaxed);
        self.last_access.store(now_secs, AtomicOrdering::Relaxed);
        if let Some(ref window) = self.window {
            window.record_access(now_secs);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::cache::data::NegativeKind;

    fn record(ttl: u32, upstream_ttl: u32) -> CachedRecord {
        CachedRecord::new(
            CachedData::Negative(NegativeKind::NoData),
            ttl,
            upstream_ttl,
            None,
        )
    }

    #[test]
    fn remaining_ttl_decrements_and_never_goes_negative() {
        let r = record(300, 300);
        let t0 = r.inserted_at_secs;
        assert_eq!(r.remaining_ttl_at_secs(t0), 300);
        assert_eq!(r.remaining_ttl_at_secs(t0 + 10), 290);
        assert_eq!(r.remaining_ttl_at_secs(t0 + 300), 0);
        assert_eq!(r.remaining_ttl_at_secs(t0 + 10_000), 0);
    }

    #[test]
    fn remaining_ttl_never_exceeds_upstream_ttl() {
        // Floored at insert: stored TTL (60) above what upstream returned (20).
        let r = record(60, 20);
        assert_eq!(r.remaining_ttl_at_secs(r.inserted_at_secs), 20);
    }

    #[test]
    fn stale_window_is_twice_the_ttl() {
        let r = record(100, 100);
        let t0 = r.inserted_at_secs;
        assert!(!r.is_stale_usable_at_secs(t0 + 50), "not yet expired");
        assert!(r.is_stale_usable_at_secs(t0 + 150));
        assert!(!r.is_stale_usable_at_secs(t0 + 250), "past stale window");
    }

    #[test]
    fn refresh_threshold_uses_ttl_fraction() {
        let r = record(100, 100);
        let t0 = r.inserted_at_secs;
        assert!(!r.should_refresh(t0 + 50, 0.75));
        assert!(r.should_refresh(t0 + 80, 0.75));
    }
}
