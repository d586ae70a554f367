use bastion_dns_domain::RecordData;
use std::sync::Arc;

/// Negative answers keep their response kind so the wire layer can replay
/// the right RCODE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegativeKind {
    NxDomain,
    NoData,
}

/// Payload of one cache entry. The answer set is shared (`Arc`) between
/// tiers and responses; nothing is copied on a hit.
#[derive(Clone, Debug)]
pub enum CachedData {
    Answers(Arc<[RecordData]>),
    Negative(NegativeKind),
}

impl CachedData {
    pub fn is_negative(&self) -> bool {
        matches!(self, CachedData::Negative(_))
    }

    pub fn answers(&self) -> Option<&Arc<[RecordData]>> {
        match self {
            CachedData::Answers(records) => Some(records),
            CachedData::Negative(_) => None,
        }
    }
}
