//! Per-room tuning parameters.

use serde::{Deserialize, Serialize};

use crate::error::{ControlError, ControlResult};

/// Compass orientation of a room's main glazing.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    South,
    West,
    East,
    North,
    /// Explicit compass bearing. No factor table exists for bearings, so it
    /// maps to the neutral factor.
    Azimuth { degrees: f64 },
}

impl Orientation {
    /// Solar exposure multiplier for this orientation.
    pub fn factor(&self) -> f64 {
        match self {
            Orientation::South => 1.0,
            Orientation::West | Orientation::East => 0.7,
            Orientation::North => 0.4,
            Orientation::Azimuth { .. } => 1.0,
        }
    }
}

/// Independent on/off switches for each correction and guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureToggles {
    pub solar: bool,
    pub wind: bool,
    pub outdoor: bool,
    pub flow_guard: bool,
}

impl Default for FeatureToggles {
    fn default() -> Self {
        Self {
            solar: true,
            wind: true,
            outdoor: true,
            flow_guard: true,
        }
    }
}

impl FeatureToggles {
    pub fn all_disabled() -> Self {
        Self {
            solar: false,
            wind: false,
            outdoor: false,
            flow_guard: false,
        }
    }
}

/// Numeric tuning of one room's controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlTuning {
    pub orientation: Orientation,
    /// Explicit solar exposure factor. Takes precedence over `orientation`.
    pub orientation_factor: Option<f64>,
    /// Share of the wind boost that applies to this room, 0..=100.
    pub wind_effect_percent: f64,
    pub max_cooling_degc: f64,
    pub max_wind_boost_degc: f64,
    pub max_outdoor_boost_degc: f64,
    pub wind_base_kmh: f64,
    pub wind_norm_kmh: f64,
    pub outdoor_base_c: f64,
    pub outdoor_norm_c: f64,
    pub solar_norm_kwh: f64,
    pub comfort_guard_delta: f64,
    pub flow_low_threshold: f64,
    pub hysteresis_degc: f64,
    pub min_on_minutes: u32,
    pub min_off_minutes: u32,
    pub features: FeatureToggles,
}

impl Default for ControlTuning {
    fn default() -> Self {
        Self {
            orientation: Orientation::South,
            orientation_factor: None,
            wind_effect_percent: 100.0,
            max_cooling_degc: 0.6,
            max_wind_boost_degc: 0.7,
            max_outdoor_boost_degc: 0.6,
            wind_base_kmh: 8.0,
            wind_norm_kmh: 35.0,
            outdoor_base_c: 10.0,
            outdoor_norm_c: -5.0,
            solar_norm_kwh: 2.5,
            comfort_guard_delta: 0.2,
            flow_low_threshold: 29.0,
            hysteresis_degc: 0.2,
            min_on_minutes: 8,
            min_off_minutes: 8,
            features: FeatureToggles::default(),
        }
    }
}

impl ControlTuning {
    /// Effective solar exposure multiplier.
    pub fn orientation_factor(&self) -> f64 {
        self.orientation_factor
            .unwrap_or_else(|| self.orientation.factor())
    }

    /// Set features.
    pub fn with_features(mut self, features: FeatureToggles) -> Self {
        self.features = features;
        self
    }

    /// Basic sanity checks the control math relies on.
    ///
    /// Range limits for user input are enforced by the configuration layer;
    /// this only rejects values that would make the arithmetic meaningless.
    pub fn check(&self) -> ControlResult<()> {
        let finite = [
            ("wind_effect_percent", self.wind_effect_percent),
            ("max_cooling_degc", self.max_cooling_degc),
            ("max_wind_boost_degc", self.max_wind_boost_degc),
            ("max_outdoor_boost_degc", self.max_outdoor_boost_degc),
            ("wind_base_kmh", self.wind_base_kmh),
            ("wind_norm_kmh", self.wind_norm_kmh),
            ("outdoor_base_c", self.outdoor_base_c),
            ("outdoor_norm_c", self.outdoor_norm_c),
            ("solar_norm_kwh", self.solar_norm_kwh),
            ("comfort_guard_delta", self.comfort_guard_delta),
            ("flow_low_threshold", self.flow_low_threshold),
            ("hysteresis_degc", self.hysteresis_degc),
            ("orientation_factor", self.orientation_factor()),
        ];
        for (what, value) in finite {
            if !value.is_finite() {
                return Err(ControlError::NonFinite { what, value });
            }
        }
        if self.hysteresis_degc < 0.0 {
            return Err(ControlError::InvalidArg {
                what: "hysteresis_degc must be non-negative",
            });
        }
        if self.max_cooling_degc < 0.0
            || self.max_wind_boost_degc < 0.0
            || self.max_outdoor_boost_degc < 0.0
        {
            return Err(ControlError::InvalidArg {
                what: "boost and cooling magnitudes must be non-negative",
            });
        }
        Ok(())
    }
}
