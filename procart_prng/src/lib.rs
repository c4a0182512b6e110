// Deterministic, portable pseudo-random number generator.
//
// Implements xoshiro256++ (Blackman & Vigna, 2019) with SplitMix64 seeding.
// Both procart generators draw from this crate: the terrain builder for noise
// offsets and amplitudes, the branching-tree builder for per-node branch
// counts. The same seed always reproduces the same terrain and the same tree.
//
// The `RandomSource` trait is the seam the generators actually consume. It
// exposes only the two sampling shapes they need (uniform float in a
// half-open range, uniform integer in a half-open range), so tests can feed
// scripted values instead of a real generator.
//
// **Critical constraint: determinism.** Every method on `ArtRng` must produce
// identical output given the same prior state, regardless of platform or
// optimization level. The core generator uses integer arithmetic only.

use serde::{Deserialize, Serialize};

/// Uniform sampling as consumed by the generators.
///
/// Both ranges are half-open: `low` is reachable, `high` is not.
pub trait RandomSource {
    /// Uniform float in `[low, high)`.
    fn range_f32(&mut self, low: f32, high: f32) -> f32;

    /// Uniform integer in `[low, high)`.
    fn range_i32(&mut self, low: i32, high: i32) -> i32;
}

/// Xoshiro256++ PRNG, the workspace's sole source of randomness.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtRng {
    s: [u64; 4],
}

impl ArtRng {
    /// Create a new PRNG seeded from a `u64`.
    ///
    /// SplitMix64 expands the seed into the 256-bit state, so nearby seeds
    /// still give unrelated streams.
    pub fn new(seed: u64) -> Self {
        let mut sm = seed;
        Self {
            s: [
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
            ],
        }
    }

    /// Generate the next `u64` in the sequence.
    pub fn next_u64(&mut self) -> u64 {
        let result = (self.s[0].wrapping_add(self.s[3]))
            .rotate_left(23)
            .wrapping_add(self.s[0]);

        let t = self.s[1] << 17;

        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];

        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);

        result
    }

    /// Uniform `f32` in [0, 1), built from the upper 24 bits.
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }

    /// Derive a 32-bit seed for a secondary generator (e.g. a noise field).
    pub fn next_seed_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    /// Uniform integer in `[low, high)` using rejection sampling.
    ///
    /// Panics if `low >= high`.
    pub fn range_u64(&mut self, low: u64, high: u64) -> u64 {
        assert!(low < high, "range_u64: low must be less than high");
        let range = high - low;
        if range.is_power_of_two() {
            return low + (self.next_u64() & (range - 1));
        }
        let threshold = range.wrapping_neg() % range;
        loop {
            let r = self.next_u64();
            if r >= threshold {
                return low + (r % range);
            }
        }
    }
}

impl RandomSource for ArtRng {
    /// Panics if `low >= high` or either bound is not finite.
    fn range_f32(&mut self, low: f32, high: f32) -> f32 {
        assert!(
            low.is_finite() && high.is_finite() && low < high,
            "range_f32: need finite low < high, got [{low}, {high})"
        );
        // `low + x * span` can round up to `high` for x just below 1.
        let v = low + self.next_f32() * (high - low);
        if v < high { v } else { low }
    }

    /// Panics if `low >= high`.
    fn range_i32(&mut self, low: i32, high: i32) -> i32 {
        assert!(low < high, "range_i32: low must be less than high");
        let span = (high as i64 - low as i64) as u64;
        (low as i64 + self.range_u64(0, span) as i64) as i32
    }
}

/// SplitMix64, used only for seeding.
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
