mod helpers;

use bastion_dns_application::ports::{DnsResolver, ResolutionSource};
use bastion_dns_domain::{DnsError, DnsQuery, RecordType};
use bastion_dns_infrastructure::dns::cache::{coarse_clock, DnsCache, EvictionStrategy};
use bastion_dns_infrastructure::dns::resolver::{CachedResolver, CachedResolverConfig};
use helpers::{small_cache_config, MockUpstream};
use std::net::IpAddr;
use std::sync::{Arc, Mutex};

static CLOCK: Mutex<()> = Mutex::new(());

fn resolver_with(
    mock: Arc<MockUpstream>,
    serve_stale: bool,
) -> CachedResolver {
    let cache = Arc::new(DnsCache::new(small_cache_config(100, EvictionStrategy::LRU)));
    CachedResolver::new(
        mock,
        cache,
        CachedResolverConfig {
            serve_stale,
            stale_ttl: 30,
            ..CachedResolverConfig::default()
        },
    )
}

#[tokio::test]
async fn expired_entry_is_served_when_all_upstreams_fail() {
    let _guard = CLOCK.lock().unwrap();
    coarse_clock::tick();

    // First resolution succeeds with TTL 60; everything after is exhaustion.
    let mock = Arc::new(MockUpstream::answering(&["198.51.100.20"], 60).exhausted_after(1));
    let resolver = resolver_with(Arc::clone(&mock), true);
    let query = DnsQuery::new("stale.test", RecordType::A);

    let fresh = resolver.resolve(&query).await.unwrap();
    assert_eq!(fresh.remaining_ttl, 60);

    // 5 seconds past expiry: inside the stale window, upstreams all dead.
    coarse_clock::set_for_test(coarse_clock::coarse_now_secs() + 65);

    let stale = resolver.resolve(&query).await.unwrap();
    assert_eq!(stale.source, ResolutionSource::StaleCache);
    assert_eq!(stale.remaining_ttl, 30, "stale answers carry the forced TTL");
    let expected: IpAddr = "198.51.100.20".parse().unwrap();
    assert_eq!(stale.answers[0].as_ip(), Some(expected));
    assert_eq!(mock.call_count(), 2, "the miss did try upstream first");

    coarse_clock::tick();
}

#[tokio::test]
async fn disabled_serve_stale_surfaces_the_failure() {
    let _guard = CLOCK.lock().unwrap();
    coarse_clock::tick();

    let mock = Arc::new(MockUpstream::answering(&["198.51.100.21"], 60).exhausted_after(1));
    let resolver = resolver_with(Arc::clone(&mock), false);
    let query = DnsQuery::new("no-stale.test", RecordType::A);

    resolver.resolve(&query).await.unwrap();
    coarse_clock::set_for_test(coarse_clock::coarse_now_secs() + 65);

    let err = resolver.resolve(&query).await.unwrap_err();
    assert!(matches!(err, DnsError::UpstreamExhausted));

    coarse_clock::tick();
}

#[tokio::test]
async fn entries_past_the_stale_window_are_not_served() {
    let _guard = CLOCK.lock().unwrap();
    coarse_clock::tick();

    let mock = Arc::new(MockUpstream::answering(&["198.51.100.22"], 60).exhausted_after(1));
    let resolver = resolver_with(Arc::clone(&mock), true);
    let query = DnsQuery::new("too-old.test", RecordType::A);

    resolver.resolve(&query).await.unwrap();

    // Stale window is 2x TTL past insertion; 130 seconds is beyond it.
    coarse_clock::set_for_test(coarse_clock::coarse_now_secs() + 130);

    let err = resolver.resolve(&query).await.unwrap_err();
    assert!(matches!(err, DnsError::UpstreamExhausted));

    coarse_clock::tick();
}

#[tokio::test]
async fn transient_failure_with_valid_cache_never_reaches_upstream() {
    let _guard = CLOCK.lock().unwrap();
    coarse_clock::tick();

    let mock = Arc::new(MockUpstream::answering(&["198.51.100.23"], 300).exhausted_after(1));
    let resolver = resolver_with(Arc::clone(&mock), true);
    let query = DnsQuery::new("still-fresh.test", RecordType::A);

    resolver.resolve(&query).await.unwrap();
    let hit = resolver.resolve(&query).await.unwrap();

    assert!(hit.source.is_cache_hit());
    assert_eq!(mock.call_count(), 1, "a live entry needs no upstream");

    coarse_clock::tick();
}
