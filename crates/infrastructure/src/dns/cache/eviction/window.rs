use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

struct WindowBucket {
    /// Absolute bucket index (now / width). A stale epoch means the bucket
    /// aged out and its count no longer contributes.
    epoch: AtomicU64,
    count: AtomicU32,
}

/// Bounded sliding window of per-bucket access counts. Each access lands in
/// the bucket for the current time slice; buckets are recycled in place once
/// their slice falls out of the window, so memory is fixed at construction.
///
/// The score is the age-decayed sum over live buckets: non-negative, and it
/// drifts to zero when the entry stops being accessed.
pub struct AccessWindow {
    buckets: Box<[WindowBucket]>,
    bucket_width_secs: u64,
}

impl AccessWindow {
    pub fn new(bucket_count: usize, bucket_width_secs: u64) -> Self {
        let buckets = (0..bucket_count.max(1))
            .map(|_| WindowBucket {
                epoch: AtomicU64::new(0),
                count: AtomicU32::new(0),
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            buckets,
            bucket_width_secs: bucket_width_secs.max(1),
        }
    }

    #[inline]
    pub fn record_access(&self, now_secs: u64) {
        let epoch = now_secs / self.bucket_width_secs;
        let bucket = &self.buckets[(epoch as usize) % self.buckets.len()];

        if bucket.epoch.load(Ordering::Relaxed) == epoch {
            bucket.count.fetch_add(1, Ordering::Relaxed);
        } else {
            // Recycled bucket: a concurrent access may race the reset and
            // lose a count. Scoring tolerates that.
            bucket.epoch.store(epoch, Ordering::Relaxed);
            bucket.count.store(1, Ordering::Relaxed);
        }
    }

    pub fn score(&self, now_secs: u64) -> f64 {
        let current_epoch = now_secs / self.bucket_width_secs;
        let window = self.buckets.len() as u64;
        let mut total = 0.0;

        for bucket in self.buckets.iter() {
            let epoch = bucket.epoch.load(Ordering::Relaxed);
            let age = current_epoch.saturating_sub(epoch);
            if age >= window {
                continue;
            }
            let count = bucket.count.load(Ordering::Relaxed) as f64;
            total += count / (age + 1) as f64;
        }

        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_is_zero_before_any_access() {
        let window = AccessWindow::new(8, 60);
        assert_eq!(window.score(10_000), 0.0);
    }

    #[test]
    fn accesses_in_current_bucket_count_fully() {
        let window = AccessWindow::new(8, 60);
        let now = 600_000;
        for _ in 0..5 {
            window.record_access(now);
        }
        assert_eq!(window.score(now), 5.0);
    }

    #[test]
    fn older_buckets_decay() {
        let window = AccessWindow::new(8, 60);
        let now = 600_000;
        window.record_access(now);
        window.record_access(now);

        let fresh = window.score(now);
        let later = window.score(now + 60);
        let much_later = window.score(now + 4 * 60);

        assert!(fresh > later, "score must decay as the bucket ages");
        assert!(later > much_later);
    }

    #[test]
    fn score_drops_to_zero_outside_window() {
        let window = AccessWindow::new(4, 60);
        let now = 600_000;
        window.record_access(now);
        assert_eq!(window.score(now + 4 * 60), 0.0);
    }

    #[test]
    fn buckets_are_recycled_in_place() {
        let window = AccessWindow::new(2, 60);
        let now = 600_000;
        window.record_access(now);
        // Same slot two windows later: old count must not leak through.
        window.record_access(now + 2 * 60);
        assert_eq!(window.score(now + 2 * 60), 1.0);
    }
}
