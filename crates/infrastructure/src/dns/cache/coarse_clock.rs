use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::LazyLock;
use std::time::{SystemTime, UNIX_EPOCH};

static COARSE_CLOCK: LazyLock<AtomicU64> = LazyLock::new(|| AtomicU64::new(now_secs()));

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Coarse Unix timestamp in seconds. A relaxed atomic load (~3 ns) instead
/// of a clock syscall on every cache read.
#[inline]
pub fn coarse_now_secs() -> u64 {
    COARSE_CLOCK.load(Ordering::Relaxed)
}

/// Advances the coarse clock. Driven by the maintenance task once a second;
/// also callable from tests to simulate elapsed time indirectly.
pub fn tick() {
    COARSE_CLOCK.store(now_secs(), Ordering::Relaxed);
}

/// Test hook: pins the clock to an absolute value.
#[doc(hidden)]
pub fn set_for_test(secs: u64) {
    COARSE_CLOCK.store(secs, Ordering::Relaxed);
}
