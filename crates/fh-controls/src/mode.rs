//! Comfort / Eco tuning profiles.

use serde::{Deserialize, Serialize};

use crate::tuning::ControlTuning;

/// Share of the comfort magnitudes kept in eco mode.
pub const ECO_MAGNITUDE_SCALE: f64 = 0.7;
/// Amount the comfort guard is tightened by in eco mode.
pub const ECO_GUARD_TIGHTENING: f64 = 0.05;
/// Eco mode never tightens the comfort guard below this.
pub const ECO_GUARD_FLOOR: f64 = 0.1;

/// Named tuning profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Comfort,
    Eco,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Comfort => "comfort",
            Mode::Eco => "eco",
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "comfort" => Ok(Mode::Comfort),
            "eco" => Ok(Mode::Eco),
            other => Err(format!("unknown mode '{other}' (expected comfort or eco)")),
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// The tuning fields a mode switch touches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModeTuning {
    pub max_cooling_degc: f64,
    pub max_wind_boost_degc: f64,
    pub max_outdoor_boost_degc: f64,
    pub comfort_guard_delta: f64,
}

impl ModeTuning {
    /// Snapshot the mode-dependent fields of `tuning`.
    pub fn capture(tuning: &ControlTuning) -> Self {
        Self {
            max_cooling_degc: tuning.max_cooling_degc,
            max_wind_boost_degc: tuning.max_wind_boost_degc,
            max_outdoor_boost_degc: tuning.max_outdoor_boost_degc,
            comfort_guard_delta: tuning.comfort_guard_delta,
        }
    }

    /// Eco profile derived from a comfort snapshot.
    pub fn eco(&self) -> Self {
        Self {
            max_cooling_degc: self.max_cooling_degc * ECO_MAGNITUDE_SCALE,
            max_wind_boost_degc: self.max_wind_boost_degc * ECO_MAGNITUDE_SCALE,
            max_outdoor_boost_degc: self.max_outdoor_boost_degc * ECO_MAGNITUDE_SCALE,
            comfort_guard_delta: (self.comfort_guard_delta - ECO_GUARD_TIGHTENING)
                .max(ECO_GUARD_FLOOR),
        }
    }

    /// Profile for `mode`, treating `self` as the comfort snapshot.
    pub fn for_mode(&self, mode: Mode) -> Self {
        match mode {
            Mode::Comfort => *self,
            Mode::Eco => self.eco(),
        }
    }

    /// Overwrite the mode-dependent fields of `tuning`.
    pub fn apply_to(&self, tuning: &mut ControlTuning) {
        tuning.max_cooling_degc = self.max_cooling_degc;
        tuning.max_wind_boost_degc = self.max_wind_boost_degc;
        tuning.max_outdoor_boost_degc = self.max_outdoor_boost_degc;
        tuning.comfort_guard_delta = self.comfort_guard_delta;
    }
}
