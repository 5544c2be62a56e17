//! Deterministic pseudo-random draws keyed by cell and purpose.
//!
//! Cache content is never stored up front: it is re-derived from the cell
//! address whenever a cell without a memento becomes active. That only works
//! if every draw is a pure function of its inputs, stable across runs,
//! processes, and machines.
//!
//! # Reproducibility contract
//!
//! A draw hashes the UTF-8 seed string `"{i},{j},{purpose}"` with SHA-256,
//! takes the first 8 digest bytes as a big-endian `u64`, keeps the top 53
//! bits, and divides by `2^53`, giving a value in `[0, 1)`.
//!
//! Two purpose tags are used, in this order:
//!
//! | Tag | Use |
//! |-----|-----|
//! | [`SPAWN_TAG`] (`"spawn"`) | cache exists iff draw `< probability` |
//! | [`INITIAL_VALUE_TAG`] (`"initialValue"`) | `floor(draw * scale)` tokens |
//!
//! Changing the seed layout, the hash, or either tag changes every cache in
//! the world and invalidates stored mementos' relationship to fresh content.

use std::collections::BTreeMap;

use geocoin_types::CellAddress;
use sha2::{Digest, Sha256};

use crate::error::WorldError;

/// Purpose tag for the spawn decision.
pub const SPAWN_TAG: &str = "spawn";

/// Purpose tag for the initial token count.
pub const INITIAL_VALUE_TAG: &str = "initialValue";

/// Default probability that a cell holds a cache.
pub const DEFAULT_SPAWN_PROBABILITY: f64 = 0.1;

/// Default multiplier turning an initial-value draw into a token count.
pub const DEFAULT_INITIAL_VALUE_SCALE: u32 = 100;

/// 2^53: every 53-bit integer converts to `f64` exactly.
const MANTISSA_SCALE: f64 = 9_007_199_254_740_992.0;

/// A source of reproducible draws in `[0, 1)`.
///
/// The production implementation is [`HashLuck`]. Tests substitute
/// [`FixedLuck`] to pin specific draws.
pub trait LuckSource {
    /// Draw a value in `[0, 1)` for `cell` and `purpose`.
    ///
    /// Must return the same value for the same arguments every time.
    fn luck(&self, cell: CellAddress, purpose: &str) -> f64;
}

/// SHA-256 based draws following the reproducibility contract above.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashLuck;

impl HashLuck {
    /// Create the hash-backed source.
    pub const fn new() -> Self {
        Self
    }
}

impl LuckSource for HashLuck {
    fn luck(&self, cell: CellAddress, purpose: &str) -> f64 {
        luck_value(cell, purpose)
    }
}

/// Hash `cell` and `purpose` into a value in `[0, 1)`.
pub fn luck_value(cell: CellAddress, purpose: &str) -> f64 {
    let seed = format!("{},{},{purpose}", cell.i, cell.j);
    let digest = Sha256::digest(seed.as_bytes());
    let head = digest.first_chunk::<8>().copied().unwrap_or_default();
    let bits = u64::from_be_bytes(head) >> 11;
    // `bits` < 2^53, so the conversion is exact.
    #[allow(clippy::cast_precision_loss)]
    let numerator = bits as f64;
    numerator / MANTISSA_SCALE
}

/// A luck source with pinned draws, for tests and scripted scenarios.
#[derive(Debug, Clone, Default)]
pub struct FixedLuck {
    fallback: f64,
    pinned: BTreeMap<(CellAddress, String), f64>,
}

impl FixedLuck {
    /// Every draw returns `fallback` unless pinned.
    pub const fn new(fallback: f64) -> Self {
        Self {
            fallback,
            pinned: BTreeMap::new(),
        }
    }

    /// Pin the draw for `cell` and `purpose`.
    #[must_use]
    pub fn with(mut self, cell: CellAddress, purpose: &str, value: f64) -> Self {
        self.pinned.insert((cell, purpose.to_owned()), value);
        self
    }
}

impl LuckSource for FixedLuck {
    fn luck(&self, cell: CellAddress, purpose: &str) -> f64 {
        self.pinned
            .get(&(cell, purpose.to_owned()))
            .copied()
            .unwrap_or(self.fallback)
    }
}

/// Spawn probability and initial value scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnRules {
    probability: f64,
    initial_value_scale: u32,
}

impl SpawnRules {
    /// Create validated spawn rules.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidSpawnProbability`] if `probability` is
    /// outside `[0, 1]`, or [`WorldError::InvalidValueScale`] if the scale
    /// is zero.
    pub fn new(probability: f64, initial_value_scale: u32) -> Result<Self, WorldError> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(WorldError::InvalidSpawnProbability(probability));
        }
        if initial_value_scale == 0 {
            return Err(WorldError::InvalidValueScale(initial_value_scale));
        }
        Ok(Self {
            probability,
            initial_value_scale,
        })
    }

    /// Probability that a cell holds a cache.
    pub const fn probability(&self) -> f64 {
        self.probability
    }

    /// Multiplier for the initial-value draw.
    pub const fn initial_value_scale(&self) -> u32 {
        self.initial_value_scale
    }

    /// Whether `cell` spawns a cache.
    pub fn should_spawn<L: LuckSource + ?Sized>(&self, luck: &L, cell: CellAddress) -> bool {
        luck.luck(cell, SPAWN_TAG) < self.probability
    }

    /// Initial token count for a freshly generated cache in `cell`.
    pub fn initial_value<L: LuckSource + ?Sized>(&self, luck: &L, cell: CellAddress) -> u32 {
        scale_draw(luck.luck(cell, INITIAL_VALUE_TAG), self.initial_value_scale)
    }
}

impl Default for SpawnRules {
    fn default() -> Self {
        Self {
            probability: DEFAULT_SPAWN_PROBABILITY,
            initial_value_scale: DEFAULT_INITIAL_VALUE_SCALE,
        }
    }
}

/// `floor(draw * scale)`, clamped to `[0, scale - 1]` for out-of-range draws.
pub fn scale_draw(draw: f64, scale: u32) -> u32 {
    let clamped = if draw.is_finite() { draw.clamp(0.0, 1.0) } else { 0.0 };
    let scaled = (clamped * f64::from(scale)).floor();
    let ceiling = scale.saturating_sub(1);
    // `scaled` lies in [0, scale], so it fits in u32.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let value = scaled as u32;
    value.min(ceiling)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draws_are_pure() {
        let cell = CellAddress::new(369_894, -1_220_628);
        let a = luck_value(cell, SPAWN_TAG);
        let b = luck_value(cell, SPAWN_TAG);
        assert!(a.to_bits() == b.to_bits());
    }

    #[test]
    fn draws_lie_in_unit_interval() {
        for i in -20..20 {
            for j in -20..20 {
                let v = luck_value(CellAddress::new(i, j), INITIAL_VALUE_TAG);
                assert!((0.0..1.0).contains(&v), "draw {v} out of range");
            }
        }
    }

    #[test]
    fn purpose_tags_give_independent_draws() {
        let differing = (0..50)
            .map(|k| CellAddress::new(k, -k))
            .filter(|&c| {
                luck_value(c, SPAWN_TAG).to_bits() != luck_value(c, INITIAL_VALUE_TAG).to_bits()
            })
            .count();
        assert_eq!(differing, 50);
    }

    #[test]
    fn coordinates_are_not_interchangeable() {
        let a = luck_value(CellAddress::new(1, 2), SPAWN_TAG);
        let b = luck_value(CellAddress::new(2, 1), SPAWN_TAG);
        let c = luck_value(CellAddress::new(12, 0), SPAWN_TAG);
        assert!(a.to_bits() != b.to_bits());
        assert!(a.to_bits() != c.to_bits());
    }

    #[test]
    fn spawn_rate_tracks_probability() {
        let rules = SpawnRules::default();
        let spawned = (0..100)
            .flat_map(|i| (0..100).map(move |j| CellAddress::new(i, j)))
            .filter(|&c| rules.should_spawn(&HashLuck, c))
            .count();
        // 10 000 cells at p = 0.1; six sigma is about 180.
        assert!((820..=1180).contains(&spawned), "spawned {spawned}");
    }

    #[test]
    fn fixed_luck_pins_the_scenario_cell() {
        let cell = CellAddress::new(10, 20);
        let luck = FixedLuck::new(0.99)
            .with(cell, SPAWN_TAG, 0.05)
            .with(cell, INITIAL_VALUE_TAG, 0.37);
        let rules = SpawnRules::default();
        assert!(rules.should_spawn(&luck, cell));
        assert_eq!(rules.initial_value(&luck, cell), 37);
        assert!(!rules.should_spawn(&luck, CellAddress::new(10, 21)));
    }

    #[test]
    fn scale_draw_floors_and_clamps() {
        assert_eq!(scale_draw(0.0, 100), 0);
        assert_eq!(scale_draw(0.999_999, 100), 99);
        assert_eq!(scale_draw(1.0, 100), 99);
        assert_eq!(scale_draw(-0.5, 100), 0);
        assert_eq!(scale_draw(f64::NAN, 100), 0);
    }

    #[test]
    fn rules_validate_inputs() {
        assert!(SpawnRules::new(1.5, 100).is_err());
        assert!(SpawnRules::new(-0.1, 100).is_err());
        assert!(SpawnRules::new(f64::NAN, 100).is_err());
        assert!(SpawnRules::new(0.1, 0).is_err());
        assert!(SpawnRules::new(0.0, 1).is_ok());
    }
}
