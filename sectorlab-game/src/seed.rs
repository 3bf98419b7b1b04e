//! Sector seed derivation.
//!
//! Every sector name maps to a stable numeric seed. The generator uses the
//! seed to bias its uniform variates so that one sector keeps a recognizable
//! distribution shape across calls without every draw being identical.

use num_traits::cast::cast;

use crate::constants::SEED_SECOND_VARIATE_SCALE;

const MIX_OFFSET: u64 = 0x9E37_79B9_7F4A_7C15;
const MIX_PRIME: u64 = 0x0100_0000_01b3;
const UNIT_SCALE: f64 = 9_007_199_254_740_992.0; // 2^53

/// Position-weighted, non-linear hash of a sector name.
#[must_use]
pub fn sector_seed(name: &str) -> u64 {
    let mut acc = MIX_OFFSET;
    for (position, ch) in name.trim().chars().enumerate() {
        let weight = u64::try_from(position).unwrap_or(u64::MAX).wrapping_add(1);
        let code = u64::from(u32::from(ch));
        acc = acc.wrapping_add(code.wrapping_mul(weight));
        acc ^= acc.rotate_left(13) ^ (acc >> 7);
        acc = acc.wrapping_mul(MIX_PRIME);
    }
    acc ^ (acc >> 29)
}

/// Map a 64-bit value onto `[0, 1)` using its top 53 bits.
#[must_use]
pub fn unit_interval(value: u64) -> f64 {
    cast::<u64, f64>(value >> 11).unwrap_or(0.0) / UNIT_SCALE
}

/// Deterministic biases for the two uniform variates consumed per draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectorBias {
    pub first: f64,
    pub second: f64,
}

impl SectorBias {
    /// Derive both variate biases from a sector name.
    #[must_use]
    pub fn for_sector(name: &str) -> Self {
        let first = unit_interval(sector_seed(name));
        let second = (first * SEED_SECOND_VARIATE_SCALE).fract();
        Self { first, second }
    }
}
