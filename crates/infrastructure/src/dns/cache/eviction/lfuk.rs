use super::policy::EvictionPolicy;
use crate::dns::cache::record::CachedRecord;

/// Frequency over a bounded sliding window of time buckets. Recent buckets
/// weigh more than old ones and buckets past the window contribute nothing,
/// so an unaccessed entry's score decays toward zero regardless of how hot
/// it once was.
pub struct LfukPolicy;

impl EvictionPolicy for LfukPolicy {
    fn compute_score(&self, record: &CachedRecord, now_secs: u64) -> f64 {
        match record.window {
            Some(ref window) => window.score(now_secs),
            None => 0.0,
        }
    }

    fn uses_access_window(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::cache::data::{CachedData, NegativeKind};
    use crate::dns::cache::eviction::window::AccessWindow;

    fn record_with_window() -> CachedRecord {
        CachedRecord::new(
            CachedData::Negative(NegativeKind::NoData),
            300,
            300,
            Some(AccessWindow::new(8, 60)),
        )
    }

    #[test]
    fn hot_entry_outscores_cold_entry() {
        let policy = LfukPolicy;
        let hot = record_with_window();
        let cold = record_with_window();
        let now = 600_000;

        for _ in 0..20 {
            hot.record_hit(now);
        }
        cold.record_hit(now);

        assert!(policy.compute_score(&hot, now) > policy.compute_score(&cold, now));
    }

    #[test]
    fn score_decays_without_access() {
        let policy = LfukPolicy;
        let record = record_with_window();
        let now = 600_000;
        for _ in 0..10 {
            record.record_hit(now);
        }

        let fresh = policy.compute_score(&record, now);
        let aged = policy.compute_score(&record, now + 3 * 60);
        let expired_window = policy.compute_score(&record, now + 10 * 60);

        assert!(fresh > aged);
        assert_eq!(expired_window, 0.0);
    }

    #[test]
    fn record_without_window_scores_zero() {
        let policy = LfukPolicy;
        let record = CachedRecord::new(
            CachedData::Negative(NegativeKind::NoData),
            300,
            300,
            None,
        );
        assert_eq!(policy.compute_score(&record, 600_000), 0.0);
    }
}
