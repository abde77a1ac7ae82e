//! # Biome Classifier
//!
//! Greedy weighted nearest neighbour over the registered biomes:
//!
//! 1. Height → band (low / normal / high / really-high) via cutoffs of
//!    `HEIGHT_MAX`.
//! 2. `d = wt·Δclimate² + wm·Δmoisture² + wh·Δband²` per biome.
//! 3. Every biome within `epsilon` of the best distance is a candidate.
//! 4. One candidate wins outright; otherwise the tie-breaker field picks
//!    `floor(tie * count)` among them, so equal-distance boundaries form
//!    contiguous patches instead of flickering per column.
//!
//! Classification is pure: cached columns must be reproducible after
//! eviction.

use serde::{Deserialize, Serialize};
use strata_core::{RegistryError, RegistryResult};

use crate::cache::MISSING_FIELD;
use crate::registry::Registry;

/// Classifier weights and thresholds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierParams {
    /// Weight of the climate term.
    pub climate_weight: f32,
    /// Weight of the moisture term.
    pub moisture_weight: f32,
    /// Weight of the height-band term.
    pub height_weight: f32,
    /// Candidate margin above the best distance.
    pub epsilon: f32,
    /// Band cutoffs as fractions of `HEIGHT_MAX`, ascending.
    pub band_cutoffs: [f32; 3],
}

impl Default for ClassifierParams {
    fn default() -> Self {
        Self {
            climate_weight: 1.0,
            moisture_weight: 1.0,
            height_weight: 1.1,
            epsilon: 1e-5,
            band_cutoffs: [0.5, 0.7, 0.85],
        }
    }
}

/// Coarse height classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HeightBand {
    /// Below the first cutoff.
    Low,
    /// Ordinary terrain.
    Normal,
    /// Hills.
    High,
    /// Peaks.
    ReallyHigh,
}

impl HeightBand {
    /// Band position in [0, 1], comparable with biome height biases.
    #[must_use]
    pub fn value(self) -> f32 {
        match self {
            Self::Low => 0.0,
            Self::Normal => 1.0 / 3.0,
            Self::High => 2.0 / 3.0,
            Self::ReallyHigh => 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Target {
    climate: f32,
    moisture: f32,
    height: f32,
}

/// Maps column samples to biome indices.
#[derive(Clone, Debug)]
pub struct BiomeClassifier {
    targets: Vec<Target>,
    params: ClassifierParams,
    thresholds: [f32; 3],
}

impl BiomeClassifier {
    /// Builds a classifier over the biomes of `registry`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Empty`] if no biome is registered.
    pub fn new(registry: &Registry, params: ClassifierParams, height_max: i16) -> RegistryResult<Self> {
        if registry.biome_count() == 0 {
            return Err(RegistryError::Empty);
        }
        let targets = registry
            .biomes()
            .iter()
            .map(|b| Target {
                climate: b.climate_bias,
                moisture: b.moisture_bias,
                height: b.height_bias,
            })
            .collect();
        let max = f32::from(height_max);
        let thresholds = params.band_cutoffs.map(|cutoff| max * cutoff);
        Ok(Self {
            targets,
            params,
            thresholds,
        })
    }

    /// Parameters in use.
    #[must_use]
    pub fn params(&self) -> &ClassifierParams {
        &self.params
    }

    /// Band of a raw world height.
    #[must_use]
    pub fn height_band(&self, height: i16) -> HeightBand {
        let h = f32::from(height);
        if h < self.thresholds[0] {
            HeightBand::Low
        } else if h < self.thresholds[1] {
            HeightBand::Normal
        } else if h < self.thresholds[2] {
            HeightBand::High
        } else {
            HeightBand::ReallyHigh
        }
    }

    fn distance(&self, target: &Target, climate: f32, moisture: f32, band: f32) -> f32 {
        let dc = climate - target.climate;
        let dm = moisture - target.moisture;
        let dh = band - target.height;
        self.params.climate_weight * dc * dc
            + self.params.moisture_weight * dm * dm
            + self.params.height_weight * dh * dh
    }

    /// Biome index for one column.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn classify(&self, climate: f32, height: i16, tie: f32, moisture: f32) -> u16 {
        let band = self.height_band(height).value();
        let tie = if tie.is_nan() { 0.0 } else { tie.clamp(0.0, 1.0) };
        let climate = if climate.is_nan() { MISSING_FIELD } else { climate };
        let moisture = if moisture.is_nan() { MISSING_FIELD } else { moisture };

        let mut ranked: Vec<(f32, u16)> = self
            .targets
            .iter()
            .enumerate()
            .map(|(i, t)| (self.distance(t, climate, moisture, band), i as u16))
            .collect();
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let best = ranked[0].0;
        let count = ranked
            .iter()
            .take_while(|(d, _)| *d <= best + self.params.epsilon)
            .count()
            .max(1);
        if count == 1 {
            return ranked[0].1;
        }
        let pick = ((tie * count as f32).floor() as usize).min(count - 1);
        ranked[pick].1
    }
}
