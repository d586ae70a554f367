use super::lfu::LfuPolicy;
use super::lfuk::LfukPolicy;
use super::lru::LruPolicy;
use super::policy::EvictionPolicy;
use super::strategy::EvictionStrategy;
use crate::dns::cache::record::CachedRecord;

/// Active eviction policy with enum dispatch — each match arm inlines, no
/// vtable on the insert path. Built once in `DnsCache::new`.
pub enum ActiveEvictionPolicy {
    Lru(LruPolicy),
    Lfu(LfuPolicy),
    Lfuk(LfukPolicy),
}

impl ActiveEvictionPolicy {
    pub fn from_strategy(strategy: EvictionStrategy) -> Self {
        match strategy {
            EvictionStrategy::LRU => Self::Lru(LruPolicy),
            EvictionStrategy::LFU => Self::Lfu(LfuPolicy),
            EvictionStrategy::LFUK => Self::Lfuk(LfukPolicy),
        }
    }

    #[inline(always)]
    pub fn compute_score(&self, record: &CachedRecord, now_secs: u64) -> f64 {
        match self {
            Self::Lru(p) => p.compute_score(record, now_secs),
            Self::Lfu(p) => p.compute_score(record, now_secs),
            Self::Lfuk(p) => p.compute_score(record, now_secs),
        }
    }

    pub fn uses_access_window(&self) -> bool {
        match self {
            Self::Lru(p) => p.uses_access_window(),
            Self::Lfu(p) => p.uses_access_window(),
            Self::Lfuk(p) => p.uses_access_window(),
        }
    }

    pub fn strategy(&self) -> EvictionStrategy {
        match self {
            Self::Lru(_) => EvictionStrategy::LRU,
            Self::Lfu(_) => EvictionStrategy::LFU,
            Self::Lfuk(_) => EvictionStrategy::LFUK,
        }
    }
}
