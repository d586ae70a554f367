use super::policy::EvictionPolicy;
use crate::dns::cache::record::CachedRecord;
use std::sync::atomic::Ordering;

/// Score = lifetime hit count.
pub struct LfuPolicy;

impl EvictionPolicy for LfuPolicy {
    fn compute_score(&self, record: &CachedRecord, _now_secs: u64) -> f64 {
        record.hit_count.load(Ordering::Relaxed) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::cache::coarse_clock::coarse_now_secs;
    use crate::dns::cache::data::{CachedData, NegativeKind};

    #[test]
    fn score_tracks_hit_count() {
        let policy = LfuPolicy;
        let record = CachedRecord::new(
            CachedData::Negative(NegativeKind::NoData),
            300,
            300,
            None,
        );
        let now = coarse_now_secs();
        assert_eq!(policy.compute_score(&record, now), 0.0);

        for _ in 0..7 {
            record.record_hit(now);
        }
        assert_eq!(policy.compute_score(&record, now), 7.0);
    }
}
