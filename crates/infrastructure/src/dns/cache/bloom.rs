use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering as AtomicOrdering};

/// Double-buffered lock-free Bloom filter used as the negative pre-filter.
///
/// `probe` consults both generations, so a key recorded before a rotation
/// keeps answering "maybe present" for one full grace generation — rotation
/// can produce false positives but never a false negative for a live key.
/// `record` writes only the active generation; `rotate` wipes the inactive
/// one and swaps, bounding false-positive growth as cache entries expire.
pub struct AtomicBloom {
    slots: [Vec<AtomicU64>; 2],
    active: AtomicUsize,
    mask: u64,
    num_hashes: usize,
    inserts_since_rotation: AtomicU64,
}

impl AtomicBloom {
    pub fn new(capacity: usize, fp_rate: f64) -> Self {
        let num_bits = Self::optimal_num_bits(capacity.max(1), fp_rate);
        let num_hashes = Self::optimal_num_hashes(capacity.max(1), num_bits);
        let num_words = num_bits.div_ceil(64);
        let make_slot = || (0..num_words).map(|_| AtomicU64::new(0)).collect::<Vec<_>>();

        Self {
            slots: [make_slot(), make_slot()],
            active: AtomicUsize::new(0),
            mask: (num_bits as u64) - 1,
            num_hashes,
            inserts_since_rotation: AtomicU64::new(0),
        }
    }

    /// `false` = definitely absent; `true` = maybe present.
    #[inline]
    pub fn probe<K: Hash>(&self, key: &K) -> bool {
        let a = self.active.load(AtomicOrdering::Relaxed);
        let b = 1 - a;
        let (h1, h2) = Self::double_hash(key);

        for i in 0..self.num_hashes as u64 {
            let idx = Self::nth_hash(h1, h2, i, self.mask);
            let bit = 1u64 << (idx % 64);
            let word = idx / 64;
            let in_active = self.slots[a][word].load(AtomicOrdering::Relaxed) & bit != 0;
            let in_previous = self.slots[b][word].load(AtomicOrdering::Relaxed) & bit != 0;
            if !in_active && !in_previous {
                return false;
            }
        }
        true
    }

    /// Insertion-only; called after any successful cache installation.
    #[inline]
    pub fn record<K: Hash>(&self, key: &K) {
        let a = self.active.load(AtomicOrdering::Relaxed);
        let (h1, h2) = Self::double_hash(key);

        for i in 0..self.num_hashes as u64 {
            let idx = Self::nth_hash(h1, h2, i, self.mask);
            self.slots[a][idx / 64].fetch_or(1u64 << (idx % 64), AtomicOrdering::Relaxed);
        }
        self.inserts_since_rotation
            .fetch_add(1, AtomicOrdering::Relaxed);
    }

    /// Begins a fresh generation: clears the previous one and makes it
    /// active. The old active generation stays probe-able as the grace copy.
    pub fn rotate(&self) {
        let old_active = self.active.load(AtomicOrdering::Relaxed);
        let new_active = 1 - old_active;
        for word in &self.slots[new_active] {
            word.store(0, AtomicOrdering::Relaxed);
        }
        self.active.store(new_active, AtomicOrdering::Relaxed);
        self.inserts_since_rotation.store(0, AtomicOrdering::Relaxed);
    }

    pub fn inserts_since_rotation(&self) -> u64 {
        self.inserts_since_rotation.load(AtomicOrdering::Relaxed)
    }

    pub fn clear(&self) {
        for slot in &self.slots {
            for word in slot {
                word.store(0, AtomicOrdering::Relaxed);
            }
        }
        self.inserts_since_rotation.store(0, AtomicOrdering::Relaxed);
    }

    #[inline]
    fn double_hash<K: Hash>(key: &K) -> (u64, u64) {
        let mut hasher = FxHasher::default();
        key.hash(&mut hasher);
        let h1 = hasher.finish();
        let h2 = h1.wrapping_mul(0x517cc1b727220a95).rotate_right(17);
        (h1, h2)
    }

    #[inline]
    fn nth_hash(h1: u64, h2: u64, n: u64, mask: u64) -> usize {
        (h1.wrapping_add(n.wrapping_mul(h2)) & mask) as usize
    }

    fn optimal_num_bits(capacity: usize, fp_rate: f64) -> usize {
        let n = capacity as f64;
        let m = (-(n * fp_rate.ln()) / (2.0_f64.ln().powi(2))).ceil() as usize;
        m.next_power_of_two()
    }

    fn optimal_num_hashes(capacity: usize, num_bits: usize) -> usize {
        let n = capacity as f64;
        let m = num_bits as f64;
        (((m / n) * 2.0_f64.ln()).ceil() as usize).max(1)
    }
}
