//! Deterministic per-edge carbon and cost factors.
//!
//! # Determinism strategy
//!
//! Every process that loads the same map must derive the same edge weights,
//! because vehicles price tasks independently and the coordinator compares
//! their bids.  No RNG state is shared.  Instead each undirected edge gets its
//! own `ChaCha8Rng` seeded by:
//!
//!   seed = salt XOR (edge_key(a, b) * MIXING_CONSTANT)
//!
//! `edge_key` is an FNV-1a hash of the two endpoint names in sorted order, so
//! `(a, b)` and `(b, a)` map to the same factors and the result does not
//! depend on the order edges were declared.
//!
//! ChaCha output is fixed by its definition and identical on every target,
//! unlike `SmallRng`.  Each factor takes the top 53 bits of one `next_u64`
//! as a unit fraction and scales it into its range with plain arithmetic,
//! so no sampling code from `rand` is involved either.

use std::ops::Range;

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// 64-bit fractional golden-ratio constant for seed mixing.
const MIXING_CONSTANT: u64 = 0x9e37_79b9_7f4a_7c15;

/// 2^-53: maps a 53-bit integer onto `[0, 1)` exactly.
const UNIT_SCALE: f64 = 1.0 / (1u64 << 53) as f64;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME:  u64 = 0x0000_0100_0000_01b3;

/// Salt used when a deployment does not configure one.
pub const DEFAULT_WEIGHT_SALT: u64 = 42;

/// Carbon emitted per unit distance is drawn from this range.
pub const CARBON_FACTOR_RANGE: Range<f64> = 0.1..2.0;

/// Monetary cost per unit distance is drawn from this range.
pub const COST_FACTOR_RANGE: Range<f64> = 0.5..3.0;

/// Order-independent hash of an undirected edge's endpoint names.
pub fn edge_key(a: &str, b: &str) -> u64 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let mut h = FNV_OFFSET;
    // 0xff never occurs in UTF-8, so it cannot collide with a name byte.
    for byte in lo.bytes().chain(std::iter::once(0xff)).chain(hi.bytes()) {
        h ^= byte as u64;
        h = h.wrapping_mul(FNV_PRIME);
    }
    h
}

/// Per-unit-distance multipliers for one undirected edge.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct EdgeFactors {
    pub carbon: f64,
    pub cost:   f64,
}

// ── EdgeRng ───────────────────────────────────────────────────────────────────

/// Single-use RNG bound to one edge.
pub struct EdgeRng(ChaCha8Rng);

impl EdgeRng {
    /// Seed deterministically from the weight salt and the edge endpoints.
    pub fn new(salt: u64, a: &str, b: &str) -> Self {
        let seed = salt ^ edge_key(a, b).wrapping_mul(MIXING_CONSTANT);
        EdgeRng(ChaCha8Rng::seed_from_u64(seed))
    }

    /// Draw the carbon factor, then the cost factor.  Draw order is part of
    /// the weight contract.
    pub fn factors(mut self) -> EdgeFactors {
        let carbon = self.draw(CARBON_FACTOR_RANGE);
        let cost   = self.draw(COST_FACTOR_RANGE);
        EdgeFactors { carbon, cost }
    }

    fn draw(&mut self, range: Range<f64>) -> f64 {
        let unit = (self.0.next_u64() >> 11) as f64 * UNIT_SCALE;
        range.start + unit * (range.end - range.start)
    }
}
