//! # Simplex Noise Primitive
//!
//! The raw 2D noise function every terrain field is built on. Generation
//! only depends on the [`NoisePrimitive`] trait; [`SimplexNoise`] is the
//! production implementation and [`ConstantNoise`] pins a field flat.
//!
//! ## Determinism Guarantee
//!
//! Given the same [`WorldSeed`], this implementation will produce
//! **exactly** the same values on any platform, any time.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// World seed for deterministic generation.
///
/// All procedural generation derives from this seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct WorldSeed(u64);

impl WorldSeed {
    /// Creates a new world seed.
    #[inline]
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self(seed)
    }

    /// Returns the raw seed value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Derives a sub-seed for a specific purpose (e.g., the climate field).
    ///
    /// Uses a hash function to create independent streams from one seed.
    #[inline]
    #[must_use]
    pub const fn derive(self, purpose: u64) -> Self {
        let mut hash = self.0;
        hash ^= purpose;
        hash = hash.wrapping_mul(0x517c_c1b7_2722_0a95);
        hash ^= hash >> 32;
        Self(hash)
    }

    /// Seed reduced to a 16-bit lattice offset, used to decorrelate octaves.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn lattice_offset(self) -> f64 {
        // Keeps `offset * octave` well inside the primitive's i32 lattice.
        f64::from((self.0 & 0xFFFF) as u16)
    }
}

impl Default for WorldSeed {
    fn default() -> Self {
        Self(0x8008_1E5 + 0xA55)
    }
}

/// Raw noise function `noise(x, y) -> [-1, 1]`.
pub trait NoisePrimitive: Send + Sync {
    /// Samples the field. Must be pure.
    fn noise(&self, x: f64, y: f64) -> f64;
}

/// Pre-computed permutation table for noise.
struct PermutationTable {
    /// 512-entry permutation table (256 entries, doubled for overflow handling).
    perm: [u8; 512],
}

impl PermutationTable {
    /// 12 gradient vectors for 2D simplex.
    const GRADIENTS: [[i8; 2]; 12] = [
        [1, 0], [1, 1], [0, 1], [-1, 1],
        [-1, 0], [-1, -1], [0, -1], [1, -1],
        [1, 0], [0, 1], [-1, 0], [0, -1],
    ];

    #[allow(clippy::cast_possible_truncation)]
    fn new(seed: WorldSeed) -> Self {
        let mut base: [u8; 256] = [0; 256];
        for (i, slot) in base.iter_mut().enumerate() {
            *slot = i as u8;
        }
        let mut rng = ChaCha8Rng::seed_from_u64(seed.value());
        base.shuffle(&mut rng);

        let mut perm = [0u8; 512];
        perm[..256].copy_from_slice(&base);
        perm[256..].copy_from_slice(&base);
        Self { perm }
    }

    #[inline]
    fn get(&self, index: usize) -> u8 {
        self.perm[index & 511]
    }

    #[inline]
    fn gradient(hash: u8) -> [i8; 2] {
        Self::GRADIENTS[(hash % 12) as usize]
    }
}

/// 2D Simplex noise generator.
///
/// Produces smooth, continuous noise values in the range [-1, 1].
pub struct SimplexNoise {
    perm_table: PermutationTable,
}

impl SimplexNoise {
    /// Skewing factor for 2D simplex grid.
    const F2: f64 = 0.366_025_403_784_439; // (sqrt(3) - 1) / 2
    /// Unskewing factor for 2D simplex grid.
    const G2: f64 = 0.211_324_865_405_187; // (3 - sqrt(3)) / 6

    /// Creates a new simplex noise generator from a seed.
    #[must_use]
    pub fn new(seed: WorldSeed) -> Self {
        Self {
            perm_table: PermutationTable::new(seed),
        }
    }

    /// Samples 2D simplex noise at the given coordinates.
    #[must_use]
    #[allow(clippy::cast_sign_loss, clippy::many_single_char_names)]
    pub fn sample(&self, x: f64, y: f64) -> f64 {
        // Skew input coordinates to simplex grid
        let skew = (x + y) * Self::F2;
        let i = fast_floor(x + skew);
        let j = fast_floor(y + skew);

        let unskew = f64::from(i.wrapping_add(j)) * Self::G2;
        let x0 = x - (f64::from(i) - unskew);
        let y0 = y - (f64::from(j) - unskew);

        // Upper or lower triangle
        let (i1, j1) = if x0 > y0 { (1usize, 0usize) } else { (0, 1) };

        let x1 = x0 - i1 as f64 + Self::G2;
        let y1 = y0 - j1 as f64 + Self::G2;
        let x2 = x0 - 1.0 + 2.0 * Self::G2;
        let y2 = y0 - 1.0 + 2.0 * Self::G2;

        let ii = (i & 255) as usize;
        let jj = (j & 255) as usize;
        let perm = &self.perm_table;

        let gi0 = perm.get(ii + perm.get(jj) as usize);
        let gi1 = perm.get(ii + i1 + perm.get(jj + j1) as usize);
        let gi2 = perm.get(ii + 1 + perm.get(jj + 1) as usize);

        let n0 = contribution(x0, y0, gi0);
        let n1 = contribution(x1, y1, gi1);
        let n2 = contribution(x2, y2, gi2);

        // 70.0 normalizes the sum to [-1, 1]
        (70.0 * (n0 + n1 + n2)).clamp(-1.0, 1.0)
    }
}

impl NoisePrimitive for SimplexNoise {
    #[inline]
    fn noise(&self, x: f64, y: f64) -> f64 {
        self.sample(x, y)
    }
}

#[inline]
fn contribution(x: f64, y: f64, gradient_index: u8) -> f64 {
    let t = 0.5 - x * x - y * y;
    if t < 0.0 {
        0.0
    } else {
        let grad = PermutationTable::gradient(gradient_index);
        let t2 = t * t;
        t2 * t2 * (x * f64::from(grad[0]) + y * f64::from(grad[1]))
    }
}

/// A flat field returning the same value everywhere.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConstantNoise(pub f64);

impl NoisePrimitive for ConstantNoise {
    #[inline]
    fn noise(&self, _x: f64, _y: f64) -> f64 {
        self.0
    }
}

/// Fast floor function.
#[inline]
#[allow(clippy::cast_possible_truncation)]
fn fast_floor(x: f64) -> i32 {
    let xi = x as i32;
    if x < f64::from(xi) {
        xi - 1
    } else {
        xi
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_determinism() {
        let seed = WorldSeed::new(12345);
        let noise1 = SimplexNoise::new(seed);
        let noise2 = SimplexNoise::new(seed);

        for i in 0..100 {
            let x = f64::from(i) * 0.1;
            let y = f64::from(i) * 0.17;
            assert_eq!(
                noise1.sample(x, y).to_bits(),
                noise2.sample(x, y).to_bits(),
                "Noise should be deterministic"
            );
        }
    }

    #[test]
    fn test_different_seeds_different_fields() {
        let noise1 = SimplexNoise::new(WorldSeed::new(1));
        let noise2 = SimplexNoise::new(WorldSeed::new(2));

        let differing = (0..64)
            .filter(|i| {
                let x = f64::from(*i) * 1.37 + 0.5;
                (noise1.sample(x, x * 0.61) - noise2.sample(x, x * 0.61)).abs() > 1e-9
            })
            .count();
        assert!(differing > 32, "Different seeds should produce different fields");
    }

    #[test]
    fn test_range() {
        let noise = SimplexNoise::new(WorldSeed::new(42));
        for i in 0..10_000 {
            let x = f64::from(i) * 0.1 - 500.0;
            let y = f64::from(i) * 0.13 - 650.0;
            let value = noise.noise(x, y);
            assert!((-1.0..=1.0).contains(&value), "Value {value} out of range");
        }
    }

    #[test]
    fn test_continuity() {
        let noise = SimplexNoise::new(WorldSeed::new(42));
        let v1 = noise.sample(100.0, 100.0);
        let v2 = noise.sample(100.001, 100.0);
        let v3 = noise.sample(100.0, 100.001);
        assert!((v1 - v2).abs() < 0.01);
        assert!((v1 - v3).abs() < 0.01);
    }

    #[test]
    fn test_seed_derivation() {
        let base = WorldSeed::new(42);
        assert_ne!(base.derive(1), base.derive(2));
        assert_eq!(base.derive(1), base.derive(1));
        assert_ne!(base.derive(1), base);
    }

    #[test]
    fn test_lattice_offset_fits_i32_lattice() {
        let seed = WorldSeed::new(u64::MAX);
        assert_eq!(seed.lattice_offset(), 65_535.0);
        // Large octave offsets must still land on distinct lattice cells.
        let noise = SimplexNoise::new(seed);
        let far = noise.sample(65_535.0 * 8.0 + 0.3, 65_535.0 * 8.0 + 0.7);
        assert!((-1.0..=1.0).contains(&far));
    }

    #[test]
    fn test_constant_noise() {
        let flat = ConstantNoise(-1.0);
        assert_eq!(flat.noise(1e6, -1e6), -1.0);
    }
}
