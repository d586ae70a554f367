use compact_str::CompactString;
use bastion_dns_domain::{DnsClass, RecordType};
use std::hash::{Hash, Hasher};

/// Normalized cache identity: lowercase domain without trailing dot, record
/// type and class. Construction does not re-normalize — ingress decoding
/// already lowercases and strips the root dot.
#[derive(Clone, Debug, Eq)]
pub struct CacheKey {
    pub domain: CompactString,
    pub record_type: RecordType,
    pub class: DnsClass,
}

impl CacheKey {
    #[inline]
    pub fn new(domain: &str, record_type: RecordType, class: DnsClass) -> Self {
        Self {
            domain: CompactString::from(domain),
            record_type,
            class,
        }
    }
}

impl Hash for CacheKey {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.domain.as_str().hash(state);
        self.record_type.wire_code().hash(state);
        self.class.wire_code().hash(state);
    }
}

impl PartialEq for CacheKey {
    #[inline]
    fn eq(&self, other: &CacheKey) -> bool {
        self.record_type == other.record_type
            && self.class == other.class
            && self.domain == other.domain
    }
}

/// Borrowed view used for lookups without allocating a `CompactString`.
#[derive(Debug)]
pub struct BorrowedKey<'a> {
    pub domain: &'a str,
    pub record_type: RecordType,
    pub class: DnsClass,
}

impl<'a> BorrowedKey<'a> {
    #[inline]
    pub fn new(domain: &'a str, record_type: RecordType, class: DnsClass) -> Self {
        Self {
            domain,
            record_type,
            class,
        }
    }
}

impl<'a> Hash for BorrowedKey<'a> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.domain.hash(state);
        self.record_type.wire_code().hash(state);
        self.class.wire_code().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHasher;

    fn hash_of<T: Hash>(value: &T) -> u64 {
        let mut hasher = FxHasher::default();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn borrowed_and_owned_hash_identically() {
        let owned = CacheKey::new("example.com", RecordType::A, DnsClass::In);
        let borrowed = BorrowedKey::new("example.com", RecordType::A, DnsClass::In);
        assert_eq!(hash_of(&owned), hash_of(&borrowed));
    }

    #[test]
    fn record_type_distinguishes_keys() {
        let a = CacheKey::new("example.com", RecordType::A, DnsClass::In);
        let aaaa = CacheKey::new("example.com", RecordType::AAAA, DnsClass::In);
        assert_ne!(a, aaaa);
    }
}
