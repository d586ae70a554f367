use bastion_dns_domain::DnsProtocol;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, LazyLock};
use std::time::Instant;

/// Process-relative millisecond clock for cooldown arithmetic.
static START: LazyLock<Instant> = LazyLock::new(Instant::now);

fn now_ms() -> u64 {
    START.elapsed().as_millis() as u64
}

/// Consecutive failures after which a server is considered unreachable
/// rather than merely degraded. It still gets retried once its (maxed-out)
/// cool-down expires.
const UNREACHABLE_THRESHOLD: u32 = 5;

/// Seed latency for servers that have never answered, microseconds.
const INITIAL_LATENCY_US: u64 = 20_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerStatus {
    Healthy,
    Degraded,
    Unreachable,
}

impl ServerStatus {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Healthy,
            1 => Self::Degraded,
            _ => Self::Unreachable,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Healthy => 0,
            Self::Degraded => 1,
            Self::Unreachable => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Unreachable => "unreachable",
        }
    }
}

/// One configured upstream endpoint with its rolling health and latency
/// estimate. All state is atomic — selection and outcome recording happen
/// concurrently from every worker.
pub struct UpstreamServer {
    pub protocol: Arc<DnsProtocol>,
    pub display: Arc<str>,
    status: AtomicU8,
    cooldown_until_ms: AtomicU64,
    consecutive_failures: AtomicU32,
    latency_ewma_us: AtomicU64,
}

impl UpstreamServer {
    pub fn new(protocol: DnsProtocol) -> Self {
        let display: Arc<str> = Arc::from(protocol.to_string());
        Self {
            protocol: Arc::new(protocol),
            display,
            status: AtomicU8::new(ServerStatus::Healthy.as_u8()),
            cooldown_until_ms: AtomicU64::new(0),
            consecutive_failures: AtomicU32::new(0),
            latency_ewma_us: AtomicU64::new(INITIAL_LATENCY_US),
        }
    }

    pub fn status(&self) -> ServerStatus {
        ServerStatus::from_u8(self.status.load(Ordering::Relaxed))
    }

    /// Eligible for selection: healthy, or past its cool-down expiry.
    pub fn is_available(&self) -> bool {
        match self.status() {
            ServerStatus::Healthy => true,
            ServerStatus::Degraded | ServerStatus::Unreachable => {
                now_ms() >= self.cooldown_until_ms.load(Ordering::Relaxed)
            }
        }
    }

    pub fn latency_estimate_us(&self) -> u64 {
        self.latency_ewma_us.load(Ordering::Relaxed)
    }

    /// Load-balancing weight: inverse of the recent latency estimate, so a
    /// 2 ms server is picked ~10x as often as a 20 ms one.
    pub fn selection_weight(&self) -> f64 {
        1.0 / (self.latency_estimate_us().max(100) as f64)
    }

    pub fn record_success(&self, latency_us: u64) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
        self.status
            .store(ServerStatus::Healthy.as_u8(), Ordering::Relaxed);
        self.cooldown_until_ms.store(0, Ordering::Relaxed);

        // EWMA, alpha = 1/4.
        let old = self.latency_ewma_us.load(Ordering::Relaxed);
        let new = (old * 3 + latency_us) / 4;
        self.latency_ewma_us.store(new.max(1), Ordering::Relaxed);
    }

    /// Marks the server degraded with an exponentially growing cool-down;
    /// past `UNREACHABLE_THRESHOLD` consecutive failures it becomes
    /// unreachable and sits at the maximum cool-down.
    pub fn record_failure(&self, cooldown_base_ms: u64, cooldown_max_ms: u64) {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;

        let shift = failures.saturating_sub(1).min(16);
        let cooldown = cooldown_base_ms
            .saturating_mul(1u64 << shift)
            .min(cooldown_max_ms);
        self.cooldown_until_ms
            .store(now_ms() + cooldown, Ordering::Relaxed);

        let status = if failures >= UNREACHABLE_THRESHOLD {
            ServerStatus::Unreachable
        } else {
            ServerStatus::Degraded
        };
        self.status.store(status.as_u8(), Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn server() -> UpstreamServer {
        UpstreamServer::new(DnsProtocol::from_str("udp://192.0.2.1:53").unwrap())
    }

    #[test]
    fn fresh_server_is_healthy_and_available() {
        let s = server();
        assert_eq!(s.status(), ServerStatus::Healthy);
        assert!(s.is_available());
    }

    #[test]
    fn failure_degrades_and_applies_cooldown() {
        let s = server();
        s.record_failure(60_000, 300_000);
        assert_eq!(s.status(), ServerStatus::Degraded);
        assert!(!s.is_available(), "must sit out its cool-down");
    }

    #[test]
    fn cooldown_grows_exponentially_to_unreachable() {
        let s = server();
        for _ in 0..UNREACHABLE_THRESHOLD {
            s.record_failure(100, 60_000);
        }
        assert_eq!(s.status(), ServerStatus::Unreachable);
    }

    #[test]
    fn success_resets_health_and_updates_latency() {
        let s = server();
        s.record_failure(100, 60_000);
        s.record_success(2_000);
        assert_eq!(s.status(), ServerStatus::Healthy);
        assert!(s.is_available());
        assert!(s.latency_estimate_us() < INITIAL_LATENCY_US);
    }

    #[test]
    fn lower_latency_means_higher_weight() {
        let fast = server();
        let slow = server();
        for _ in 0..8 {
            fast.record_success(1_000);
            slow.record_success(40_000);
        }
        assert!(fast.selection_weight() > slow.selection_weight());
    }
}
