use super::coarse_clock::coarse_now_secs;
use bastion_dns_domain::{RecordData, RecordType};
use compact_str::CompactString;
use lru::LruCache;
use rustc_hash::FxBuildHasher;
use std::cell::RefCell;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Worker-exclusive recent-answer tier. One LRU per worker thread, keyed
/// `TYPE:domain`; never synchronized, never suspends. Allowed to lag the
/// shared tier — every read is validated against its stored expiry.
struct L1Entry {
    answers: Arc<[RecordData]>,
    expires_at_secs: u64,
    upstream_ttl: u32,
}

static L1_CAPACITY: AtomicUsize = AtomicUsize::new(512);

/// Set once at startup before any worker runs; threads created afterwards
/// size their tier from this.
pub fn configure_capacity(capacity: usize) {
    L1_CAPACITY.store(capacity.max(1), Ordering::Relaxed);
}

thread_local! {
    static L1_CACHE: RefCell<LruCache<CompactString, L1Entry, FxBuildHasher>> =
        RefCell::new(LruCache::with_hasher(
            NonZeroUsize::new(L1_CAPACITY.load(Ordering::Relaxed).max(1)).unwrap(),
            FxBuildHasher,
        ));
}

#[inline]
fn compose_key(domain: &str, record_type: &RecordType) -> CompactString {
    let type_str = record_type.as_str();
    let mut key = CompactString::with_capacity(type_str.len() + 1 + domain.len());
    key.push_str(type_str);
    key.push(':');
    key.push_str(domain);
    key
}

/// Hit returns the shared answer set, its remaining TTL and the TTL the
/// upstream originally returned. Expired entries are dropped in place.
#[inline]
pub fn get(domain: &str, record_type: &RecordType) -> Option<(Arc<[RecordData]>, u32, u32)> {
    let key = compose_key(domain, record_type);
    L1_CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();
        if let Some(entry) = cache.get(key.as_str()) {
            let now = coarse_now_secs();
            if now < entry.expires_at_secs {
                let remaining = (entry.expires_at_secs - now).min(entry.upstream_ttl as u64) as u32;
                return Some((Arc::clone(&entry.answers), remaining, entry.upstream_ttl));
            }
            cache.pop(key.as_str());
        }
        None
    })
}

#[inline]
pub fn insert(
    domain: &str,
    record_type: &RecordType,
    answers: Arc<[RecordData]>,
    expires_at_secs: u64,
    upstream_ttl: u32,
) {
    let key = compose_key(domain, record_type);
    L1_CACHE.with(|cache| {
        cache.borrow_mut().put(
            key,
            L1Entry {
                answers,
                expires_at_secs,
                upstream_ttl,
            },
        );
    });
}

pub fn remove(domain: &str, record_type: &RecordType) {
    let key = compose_key(domain, record_type);
    L1_CACHE.with(|cache| {
        cache.borrow_mut().pop(key.as_str());
    });
}

pub fn clear() {
    L1_CACHE.with(|cache| {
        cache.borrow_mut().clear();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answers(ip: &str) -> Arc<[RecordData]> {
        Arc::from(vec![RecordData::A(ip.parse().unwrap())])
    }

    #[test]
    fn hit_returns_decremented_ttl() {
        clear();
        let now = coarse_now_secs();
        insert("l1-hit.example", &RecordType::A, answers("192.0.2.10"), now + 120, 300);

        let (got, remaining, upstream_ttl) = get("l1-hit.example", &RecordType::A).unwrap();
        assert_eq!(got.len(), 1);
        assert!(remaining <= 120);
        assert_eq!(upstream_ttl, 300);
    }

    #[test]
    fn expired_entry_is_dropped_on_read() {
        clear();
        let now = coarse_now_secs();
        insert("l1-old.example", &RecordType::A, answers("192.0.2.11"), now.saturating_sub(1), 300);
        assert!(get("l1-old.example", &RecordType::A).is_none());
        // Lazily removed: a second read misses without re-checking expiry.
        assert!(get("l1-old.example", &RecordType::A).is_none());
    }

    #[test]
    fn keys_are_type_scoped() {
        clear();
        let now = coarse_now_secs();
        insert("l1-typed.example", &RecordType::A, answers("192.0.2.12"), now + 60, 60);
        assert!(get("l1-typed.example", &RecordType::AAAA).is_none());
    }
}
