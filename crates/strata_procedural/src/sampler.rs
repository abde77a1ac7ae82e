//! # Noise Sampler
//!
//! Four independent fractal fields over one world seed:
//!
//! | Field    | Octaves | Frequency | Output                          |
//! |----------|---------|-----------|---------------------------------|
//! | Height   | 5       | 0.0072    | `amplitude * Σ + base_offset`   |
//! | Climate  | 2       | 0.00095   | remapped to [0, 1]              |
//! | Moisture | 1       | 0.001     | remapped to [0, 1]              |
//! | Tie      | 1       | 0.005     | remapped to [0, 1]              |
//!
//! Every field owns a seed derived from the world seed with its own purpose
//! constant, so the fields are uncorrelated even though they share the
//! same primitive.

use serde::{Deserialize, Serialize};

use crate::noise::{NoisePrimitive, SimplexNoise, WorldSeed};

/// Purpose constant for the height field.
pub const HEIGHT_PURPOSE: u64 = 0x8008_1E5 + 0xA55;
/// Purpose constant for the moisture field.
pub const MOISTURE_PURPOSE: u64 = 0x321_7893 + 0x2000;
/// Purpose constant for the climate field.
pub const CLIMATE_PURPOSE: u64 = 0x094_8605 + 0x2_1908_370A;
/// Purpose constant for the tie-breaker field.
pub const TIE_PURPOSE: u64 = 0x321_DDDE + 0xEEE1_239A;

/// Fractal summation parameters for one field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FractalParams {
    /// Amplitude of the first octave.
    pub amplitude: f64,
    /// Frequency of the first octave.
    pub frequency: f64,
    /// Number of octaves.
    pub octaves: u32,
    /// Amplitude multiplier per octave.
    pub persistence: f64,
    /// Frequency multiplier per octave.
    pub lacunarity: f64,
}

impl FractalParams {
    /// Climate field defaults.
    pub const CLIMATE: Self = Self {
        amplitude: 0.9,
        frequency: 0.000_95,
        octaves: 2,
        persistence: 0.6,
        lacunarity: 1.8,
    };

    /// Moisture field defaults.
    pub const MOISTURE: Self = Self::single(0.001);

    /// Tie-breaker field defaults.
    pub const TIE: Self = Self::single(0.005);

    /// One unit-amplitude octave at `frequency`.
    #[must_use]
    pub const fn single(frequency: f64) -> Self {
        Self {
            amplitude: 1.0,
            frequency,
            octaves: 1,
            persistence: 1.0,
            lacunarity: 1.0,
        }
    }
}

/// Fractal sum of `source` at `(x, y)`.
///
/// Each octave adds `amplitude * noise(x*frequency + off, y*frequency + off)`
/// with `off = octave_offset * octave_index`, then scales amplitude by
/// persistence and frequency by lacunarity.
#[must_use]
pub fn sample_fractal(
    source: &dyn NoisePrimitive,
    x: f64,
    y: f64,
    params: &FractalParams,
    octave_offset: f64,
) -> f64 {
    let mut total = 0.0;
    let mut amplitude = params.amplitude;
    let mut frequency = params.frequency;
    for octave in 0..params.octaves {
        let offset = octave_offset * f64::from(octave);
        total += amplitude * source.noise(x * frequency + offset, y * frequency + offset);
        amplitude *= params.persistence;
        frequency *= params.lacunarity;
    }
    total
}

/// Height field parameters, operator-tunable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainParams {
    /// Octave count.
    pub octaves: u32,
    /// Height amplitude in blocks.
    pub amplitude: f64,
    /// Base frequency.
    pub frequency: f64,
    /// Constant added to every height.
    pub base_offset: f64,
    /// Amplitude decay per octave.
    pub persistence: f64,
    /// Frequency growth per octave.
    pub lacunarity: f64,
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            octaves: 5,
            amplitude: 50.0,
            frequency: 0.0072,
            base_offset: 70.0,
            persistence: 0.5,
            lacunarity: 1.7,
        }
    }
}

impl TerrainParams {
    /// Upper terrain bound: `round(base + amplitude)`.
    #[must_use]
    pub fn height_max(&self) -> i16 {
        clamp_i16((self.base_offset + self.amplitude).round())
    }

    /// Lower terrain bound: `round(base - 1.1 * amplitude)`.
    #[must_use]
    pub fn height_min(&self) -> i16 {
        clamp_i16((self.base_offset - self.amplitude * 1.1).round())
    }

    fn fractal(&self) -> FractalParams {
        FractalParams {
            amplitude: self.amplitude,
            frequency: self.frequency,
            octaves: self.octaves,
            persistence: self.persistence,
            lacunarity: self.lacunarity,
        }
    }
}

#[inline]
#[allow(clippy::cast_possible_truncation)]
fn clamp_i16(value: f64) -> i16 {
    value.clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16
}

#[inline]
#[allow(clippy::cast_possible_truncation)]
fn remap_unit(value: f64) -> f32 {
    ((value + 1.0) * 0.5).clamp(0.0, 1.0) as f32
}

/// One seeded fractal field.
pub struct NoiseField {
    source: Box<dyn NoisePrimitive>,
    params: FractalParams,
    octave_offset: f64,
}

impl NoiseField {
    /// Simplex-backed field seeded from `seed`.
    #[must_use]
    pub fn simplex(seed: WorldSeed, params: FractalParams) -> Self {
        Self {
            source: Box::new(SimplexNoise::new(seed)),
            params,
            octave_offset: seed.lattice_offset(),
        }
    }

    /// Field over an arbitrary primitive.
    #[must_use]
    pub fn custom(source: Box<dyn NoisePrimitive>, params: FractalParams, octave_offset: f64) -> Self {
        Self {
            source,
            params,
            octave_offset,
        }
    }

    /// Raw fractal value at `(x, y)`.
    #[inline]
    #[must_use]
    pub fn sample(&self, x: f64, y: f64) -> f64 {
        sample_fractal(self.source.as_ref(), x, y, &self.params, self.octave_offset)
    }
}

/// Everything sampled for one column.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColumnSample {
    /// Floored world height.
    pub height: i16,
    /// Climate in [0, 1].
    pub climate: f32,
    /// Tie-breaker in [0, 1].
    pub tie: f32,
    /// Moisture in [0, 1].
    pub moisture: f32,
}

/// The four terrain fields.
pub struct NoiseSampler {
    height: NoiseField,
    climate: NoiseField,
    moisture: NoiseField,
    tie: NoiseField,
    base_offset: f64,
}

impl NoiseSampler {
    /// Simplex-backed sampler for `seed` and `terrain`.
    #[must_use]
    pub fn new(seed: WorldSeed, terrain: &TerrainParams) -> Self {
        Self {
            height: NoiseField::simplex(seed.derive(HEIGHT_PURPOSE), terrain.fractal()),
            climate: NoiseField::simplex(seed.derive(CLIMATE_PURPOSE), FractalParams::CLIMATE),
            moisture: NoiseField::simplex(seed.derive(MOISTURE_PURPOSE), FractalParams::MOISTURE),
            tie: NoiseField::simplex(seed.derive(TIE_PURPOSE), FractalParams::TIE),
            base_offset: terrain.base_offset,
        }
    }

    /// Sampler with explicitly supplied fields.
    #[must_use]
    pub fn from_fields(
        height: NoiseField,
        climate: NoiseField,
        moisture: NoiseField,
        tie: NoiseField,
        base_offset: f64,
    ) -> Self {
        Self {
            height,
            climate,
            moisture,
            tie,
            base_offset,
        }
    }

    /// Unfloored height at world `(x, z)`.
    #[inline]
    #[must_use]
    pub fn raw_height(&self, x: i32, z: i32) -> f64 {
        self.height.sample(f64::from(x), f64::from(z)) + self.base_offset
    }

    /// World height at `(x, z)`, floored.
    #[inline]
    #[must_use]
    pub fn height(&self, x: i32, z: i32) -> i16 {
        clamp_i16(self.raw_height(x, z).floor())
    }

    /// Climate at `(x, z)` in [0, 1].
    #[inline]
    #[must_use]
    pub fn climate(&self, x: i32, z: i32) -> f32 {
        remap_unit(self.climate.sample(f64::from(x), f64::from(z)))
    }

    /// Moisture at `(x, z)` in [0, 1].
    #[inline]
    #[must_use]
    pub fn moisture(&self, x: i32, z: i32) -> f32 {
        remap_unit(self.moisture.sample(f64::from(x), f64::from(z)))
    }

    /// Tie-breaker at `(x, z)` in [0, 1].
    #[inline]
    #[must_use]
    pub fn tie(&self, x: i32, z: i32) -> f32 {
        remap_unit(self.tie.sample(f64::from(x), f64::from(z)))
    }

    /// All four fields for one column.
    #[must_use]
    pub fn column(&self, x: i32, z: i32) -> ColumnSample {
        ColumnSample {
            height: self.height(x, z),
            climate: self.climate(x, z),
            tie: self.tie(x, z),
            moisture: self.moisture(x, z),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise::ConstantNoise;

    #[test]
    fn test_fractal_sum_with_constant_primitive() {
        let params = FractalParams {
            amplitude: 8.0,
            frequency: 1.0,
            octaves: 3,
            persistence: 0.5,
            lacunarity: 2.0,
        };
        // 8 + 4 + 2
        let total = sample_fractal(&ConstantNoise(1.0), 3.0, 4.0, &params, 17.0);
        assert!((total - 14.0).abs() < 1e-12);
    }

    #[test]
    fn test_height_bounds_from_params() {
        let terrain = TerrainParams::default();
        assert_eq!(terrain.height_max(), 120);
        assert_eq!(terrain.height_min(), 15);
    }

    #[test]
    fn test_fields_are_deterministic_and_in_range() {
        let a = NoiseSampler::new(WorldSeed::new(7), &TerrainParams::default());
        let b = NoiseSampler::new(WorldSeed::new(7), &TerrainParams::default());
        for i in -50..50 {
            let (x, z) = (i * 37, i * -53);
            let col = a.column(x, z);
            assert_eq!(col, b.column(x, z));
            for v in [col.climate, col.tie, col.moisture] {
                assert!((0.0..=1.0).contains(&v));
            }
        }
    }

    #[test]
    fn test_heights_stay_near_terrain_band() {
        let terrain = TerrainParams::default();
        let sampler = NoiseSampler::new(WorldSeed::default(), &terrain);
        // Σ amplitude * persistence^i over 5 octaves stays under 2 * amplitude.
        let lo = terrain.base_offset - terrain.amplitude * 2.0;
        let hi = terrain.base_offset + terrain.amplitude * 2.0;
        for x in (-2000..2000).step_by(97) {
            let h = f64::from(sampler.height(x, x / 3));
            assert!(h >= lo && h <= hi, "height {h} escaped [{lo}, {hi}]");
        }
    }

    #[test]
    fn test_fields_are_uncorrelated() {
        let sampler = NoiseSampler::new(WorldSeed::new(99), &TerrainParams::default());
        let same = (0..200)
            .filter(|i| {
                let x = i * 211;
                (sampler.moisture(x, -x) - sampler.tie(x, -x)).abs() < 1e-6
            })
            .count();
        assert!(same < 20);
    }

    #[test]
    fn test_custom_fields() {
        let flat = |v: f64| NoiseField::custom(Box::new(ConstantNoise(v)), FractalParams::single(1.0), 0.0);
        let sampler = NoiseSampler::from_fields(flat(0.5), flat(-1.0), flat(1.0), flat(0.0), 10.0);
        let col = sampler.column(123, -456);
        assert_eq!(col.height, 10);
        assert_eq!(col.climate, 0.0);
        assert_eq!(col.moisture, 1.0);
        assert_eq!(col.tie, 0.5);
    }
}
