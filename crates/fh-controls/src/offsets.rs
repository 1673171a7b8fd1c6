//! Setpoint corrections from solar, wind and outdoor conditions.
//!
//! Each correction is `score * magnitude * gain`:
//! - **score** in `[0, 1]` says how strong the external driver is
//! - **magnitude** is the configured maximum correction in °C
//! - **gain** reacts to the measured trends
//!
//! Solar corrections are negative (pre-cooling ahead of free solar heat),
//! wind and outdoor corrections are positive.

use fh_core::clamp;
use serde::{Deserialize, Serialize};

use crate::tuning::ControlTuning;

/// Denominators never drop below this.
const MIN_SPAN: f64 = 0.1;

/// Solar forecast readings in kWh. Missing readings are zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SolarForecast {
    pub current_hour: f64,
    pub next_hour: f64,
    pub remaining_today: f64,
    pub tomorrow: f64,
}

impl SolarForecast {
    /// Weighted forecast energy; the next hour weighs the most.
    pub fn impulse(&self) -> f64 {
        self.current_hour * 1.0
            + self.next_hour * 1.2
            + self.remaining_today * 0.25
            + self.tomorrow * 0.1
    }
}

/// Everything the offset computation reads in one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OffsetInputs {
    /// Outdoor temperature in °C, if known.
    pub outdoor_temp: Option<f64>,
    /// Mean wind speed in km/h.
    pub wind_speed: f64,
    /// Gust speed in km/h.
    pub wind_gust: f64,
    pub solar: SolarForecast,
    /// Indoor trend in °C/h.
    pub indoor_trend: f64,
    /// Net outdoor change across the trend window in °C (negative = falling).
    pub outdoor_trend: f64,
}

/// The three corrections in °C.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Offsets {
    pub solar: f64,
    pub wind: f64,
    pub outdoor: f64,
}

impl Offsets {
    pub fn total(&self) -> f64 {
        self.solar + self.wind + self.outdoor
    }
}

/// All intermediates of one offset computation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OffsetBreakdown {
    pub solar_impulse: f64,
    pub solar_score: f64,
    pub wind_effective: f64,
    pub wind_score: f64,
    pub outdoor_score: f64,
    pub solar_gain: f64,
    pub wind_gain: f64,
    pub outdoor_gain: f64,
    pub orientation_factor: f64,
    pub offsets: Offsets,
}

/// Gain on solar pre-cooling; a warming room cools harder.
pub fn solar_gain(indoor_trend: f64) -> f64 {
    clamp(1.0 + indoor_trend / 1.5, 0.8, 1.4)
}

/// Gain on the wind boost; a cooling room boosts harder.
pub fn wind_gain(indoor_trend: f64) -> f64 {
    clamp(1.0 - indoor_trend / 1.2, 0.8, 1.5)
}

/// Gain on the outdoor boost; only a falling outdoor temperature raises it.
pub fn outdoor_gain(outdoor_trend: f64) -> f64 {
    clamp(1.0 + (-outdoor_trend).max(0.0) / 4.0, 1.0, 1.5)
}

/// Wind speed with a quarter of the gust excess added.
pub fn wind_effective(wind_speed: f64, wind_gust: f64) -> f64 {
    wind_speed + (wind_gust - wind_speed) * 0.25
}

/// Computes the solar, wind and outdoor corrections for one room.
#[derive(Debug, Clone, Copy)]
pub struct OffsetCalculator<'a> {
    tuning: &'a ControlTuning,
}

impl<'a> OffsetCalculator<'a> {
    pub fn new(tuning: &'a ControlTuning) -> Self {
        Self { tuning }
    }

    pub fn solar_score(&self, solar: &SolarForecast) -> f64 {
        clamp(
            solar.impulse() / self.tuning.solar_norm_kwh.max(MIN_SPAN),
            0.0,
            1.0,
        )
    }

    pub fn wind_score(&self, wind_effective: f64) -> f64 {
        let t = self.tuning;
        let span = (t.wind_norm_kmh - t.wind_base_kmh).max(MIN_SPAN);
        clamp((wind_effective - t.wind_base_kmh) / span, 0.0, 1.0)
    }

    pub fn outdoor_score(&self, outdoor_temp: Option<f64>) -> f64 {
        let t = self.tuning;
        match outdoor_temp {
            Some(outdoor) => {
                let span = (t.outdoor_base_c - t.outdoor_norm_c).max(MIN_SPAN);
                clamp((t.outdoor_base_c - outdoor) / span, 0.0, 1.0)
            }
            None => 0.0,
        }
    }

    /// Run the full computation. Disabled corrections are exactly zero.
    pub fn compute(&self, inputs: &OffsetInputs) -> OffsetBreakdown {
        let t = self.tuning;

        let solar_impulse = inputs.solar.impulse();
        let solar_score = self.solar_score(&inputs.solar);
        let wind_effective = wind_effective(inputs.wind_speed, inputs.wind_gust);
        let wind_score = self.wind_score(wind_effective);
        let outdoor_score = self.outdoor_score(inputs.outdoor_temp);

        let solar_gain = solar_gain(inputs.indoor_trend);
        let wind_gain = wind_gain(inputs.indoor_trend);
        let outdoor_gain = outdoor_gain(inputs.outdoor_trend);
        let orientation_factor = t.orientation_factor();

        let mut offsets = Offsets::default();
        if t.features.solar {
            offsets.solar = -solar_score * t.max_cooling_degc * solar_gain * orientation_factor;
        }
        if t.features.wind {
            offsets.wind = wind_score
                * t.max_wind_boost_degc
                * wind_gain
                * (t.wind_effect_percent / 100.0);
        }
        if t.features.outdoor {
            offsets.outdoor = outdoor_score * t.max_outdoor_boost_degc * outdoor_gain;
        }

        OffsetBreakdown {
            solar_impulse,
            solar_score,
            wind_effective,
            wind_score,
            outdoor_score,
            solar_gain,
            wind_gain,
            outdoor_gain,
            orientation_factor,
            offsets,
        }
    }
}
