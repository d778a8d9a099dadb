// Deterministic, portable pseudo-random number generator.
//
// Implements xoshiro256++ (Blackman & Vigna, 2019) with SplitMix64 seeding.
// This is a hand-rolled implementation with zero external dependencies, chosen
// for portability and to guarantee identical output across all platforms.
//
// The battle engine makes exactly two kinds of random decisions: the
// first-round coin flip and the library shuffle. Both draw from a `GameRng`
// owned by the caller, so tests seed one and pin the outcome — there is no
// ambient entropy source anywhere in the engine.
//
// **Critical constraint: determinism.** Every method on `GameRng` must produce
// identical output given the same prior state, regardless of platform, compiler
// version, or optimization level. No stdlib PRNG, no OS entropy, no
// floating-point arithmetic in this module.

use serde::{Deserialize, Serialize};

/// Xoshiro256++ PRNG — the engine's sole source of randomness.
///
/// Each battle owns its own `GameRng`, seeded at match creation, so replaying
/// the same seed against the same move sequence reproduces the same game.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameRng {
    s: [u64; 4],
}

impl GameRng {
    /// Create a new PRNG seeded from a `u64`.
    ///
    /// Uses SplitMix64 to expand the seed into the 256-bit internal state.
    /// Two `GameRng` instances created with the same seed will produce
    /// identical output sequences.
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

    /// Generate a uniform random integer in `[low, high)`.
    ///
    /// Uses rejection sampling to avoid modulo bias.
    /// Panics if `low >= high`.
    pub fn range_u64(&mut self, low: u64, high: u64) -> u64 {
        assert!(low < high, "range_u64: low must be less than high");
        let range = high - low;
        if range.is_power_of_two() {
            return low + (self.next_u64() & (range - 1));
        }
        // Rejection sampling to avoid modulo bias.
        let threshold = range.wrapping_neg() % range; // = (2^64 - range) % range
        loop {
            let r = self.next_u64();
            if r >= threshold {
                return low + (r % range);
            }
        }
    }

    /// Generate a uniform random `usize` in `[low, high)`.
    ///
    /// Delegates to `range_u64` for the actual sampling.
    /// Panics if `low >= high`.
    pub fn range_usize(&mut self, low: usize, high: usize) -> usize {
        self.range_u64(low as u64, high as u64) as usize
    }

    /// Fair coin flip. Used for the first-round turn decision.
    pub fn coin_flip(&mut self) -> bool {
        self.next_u64() & 1 == 1
    }

    /// Uniform in-place Fisher–Yates shuffle. Used for library reshuffles.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.range_usize(0, i + 1);
            items.swap(i, j);
        }
    }
}

/// SplitMix64 — used only for seeding xoshiro256++ from a single `u64`.
///
/// This is the standard recommendation from the xoshiro authors for
/// expanding a small seed into a larger state.
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
