mod helpers;

use bastion_dns_application::ports::DnsResolver;
use bastion_dns_domain::{DnsClass, DnsQuery, RecordType};
use bastion_dns_infrastructure::dns::cache::{
    coarse_clock, DnsCache, DnsCacheConfig, EvictionStrategy,
};
use bastion_dns_infrastructure::dns::resolver::{CachedResolver, CachedResolverConfig};
use helpers::{answers, small_cache_config, MockUpstream};
use std::net::IpAddr;
use std::sync::{Arc, Mutex};

/// Serializes tests that move the coarse clock.
static CLOCK: Mutex<()> = Mutex::new(());

fn ttl_config(min_ttl: u32, max_ttl: u32) -> DnsCacheConfig {
    DnsCacheConfig {
        min_ttl,
        max_ttl,
        ..small_cache_config(100, EvictionStrategy::LRU)
    }
}

#[tokio::test]
async fn cold_miss_then_hit_ten_seconds_later_decrements_ttl() {
    let _guard = CLOCK.lock().unwrap();
    coarse_clock::tick();

    let mock = Arc::new(MockUpstream::answering(&["93.184.216.34"], 300));
    let cache = Arc::new(DnsCache::new(ttl_config(1, 86_400)));
    let resolver = CachedResolver::new(
        mock.clone(),
        cache,
        CachedResolverConfig::default(),
    );

    let query = DnsQuery::new("example.com", RecordType::A);

    let first = resolver.resolve(&query).await.unwrap();
    assert_eq!(mock.call_count(), 1, "cold start goes upstream");
    assert_eq!(first.remaining_ttl, 300);
    let expected: IpAddr = "93.184.216.34".parse().unwrap();
    assert_eq!(first.answers[0].as_ip(), Some(expected));

    coarse_clock::set_for_test(coarse_clock::coarse_now_secs() + 10);

    let second = resolver.resolve(&query).await.unwrap();
    assert_eq!(mock.call_count(), 1, "second query is served from cache");
    assert_eq!(second.answers[0].as_ip(), Some(expected));
    assert_eq!(second.remaining_ttl, 290);

    coarse_clock::tick();
}

#[tokio::test]
async fn remaining_ttl_never_exceeds_upstream_ttl() {
    let _guard = CLOCK.lock().unwrap();
    coarse_clock::tick();

    let cache = DnsCache::new(ttl_config(1, 86_400));
    let base = coarse_clock::coarse_now_secs();
    cache.insert(
        "bounded.test",
        RecordType::A,
        DnsClass::In,
        answers(&["192.0.2.1"]),
        120,
    );

    for elapsed in [0u64, 30, 60, 119] {
        coarse_clock::set_for_test(base + elapsed);
        let hit = cache.get("bounded.test", RecordType::A, DnsClass::In).unwrap();
        assert!(
            hit.remaining_ttl <= 120,
            "remaining {} exceeds upstream ttl at elapsed {}",
            hit.remaining_ttl,
            elapsed
        );
    }

    coarse_clock::tick();
}

#[tokio::test]
async fn ttl_is_clamped_to_the_configured_ceiling() {
    let _guard = CLOCK.lock().unwrap();
    coarse_clock::tick();

    let cache = DnsCache::new(ttl_config(1, 3_600));
    cache.insert(
        "ceiling.test",
        RecordType::A,
        DnsClass::In,
        answers(&["192.0.2.2"]),
        604_800, // a week from upstream
    );

    let hit = cache.get("ceiling.test", RecordType::A, DnsClass::In).unwrap();
    assert!(hit.remaining_ttl <= 3_600);

    coarse_clock::tick();
}

#[tokio::test]
async fn expired_entry_reads_as_a_miss() {
    let _guard = CLOCK.lock().unwrap();
    coarse_clock::tick();

    let cache = DnsCache::new(ttl_config(1, 86_400));
    cache.insert(
        "expiring.test",
        RecordType::A,
        DnsClass::In,
        answers(&["192.0.2.3"]),
        60,
    );
    assert!(cache.get("expiring.test", RecordType::A, DnsClass::In).is_some());

    coarse_clock::set_for_test(coarse_clock::coarse_now_secs() + 61);
    assert!(
        cache.get("expiring.test", RecordType::A, DnsClass::In).is_none(),
        "past expiry the entry is treated as absent"
    );

    coarse_clock::tick();
}

#[tokio::test]
async fn serving_floor_applies_to_live_entries() {
    let _guard = CLOCK.lock().unwrap();
    coarse_clock::tick();

    let cache = DnsCache::new(ttl_config(10, 86_400));
    cache.insert(
        "floor.test",
        RecordType::A,
        DnsClass::In,
        answers(&["192.0.2.4"]),
        60,
    );

    coarse_clock::set_for_test(coarse_clock::coarse_now_secs() + 55);
    let hit = cache.get("floor.test", RecordType::A, DnsClass::In).unwrap();
    assert_eq!(hit.remaining_ttl, 10, "floored at the configured minimum");

    coarse_clock::tick();
}
