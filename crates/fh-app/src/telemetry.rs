//! Per-room telemetry exported to the host.

use fh_controls::{Mode, OffsetBreakdown, Offsets, SetpointComposition};
use fh_core::round_to;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

const DEBUG_PLACES: u32 = 3;
const SETPOINT_PLACES: u32 = 2;

fn r3(value: f64) -> f64 {
    round_to(value, DEBUG_PLACES)
}

/// Readings that went into a cycle, as seen by the controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleReadings {
    pub base_setpoint: f64,
    pub indoor_temp: f64,
    pub outdoor_temp: Option<f64>,
    pub wind_speed: f64,
    pub wind_gust_speed: f64,
}

/// Intermediate values of the most recent completed cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugSnapshot {
    pub base_setpoint: f64,
    pub indoor_temp: f64,
    pub outdoor_temp: Option<f64>,
    pub wind_speed: f64,
    pub wind_gust_speed: f64,
    pub solar_impulse: f64,
    pub solar_score: f64,
    pub wind_score: f64,
    pub outdoor_score: f64,
    pub solar_gain: f64,
    pub wind_gain: f64,
    pub outdoor_gain: f64,
    pub orientation_factor: f64,
    pub offset_solar: f64,
    pub offset_wind: f64,
    pub offset_outdoor: f64,
    pub offset_total: f64,
    pub raw_setpoint: f64,
    pub final_setpoint: f64,
    pub trend_cph: f64,
    pub outdoor_drop_gain: f64,
    pub heating_request: bool,
}

impl DebugSnapshot {
    pub fn capture(
        readings: &CycleReadings,
        breakdown: &OffsetBreakdown,
        composition: &SetpointComposition,
        trend_cph: f64,
        outdoor_drop_gain: f64,
        heating_request: bool,
    ) -> Self {
        Self {
            base_setpoint: r3(readings.base_setpoint),
            indoor_temp: r3(readings.indoor_temp),
            outdoor_temp: readings.outdoor_temp.map(r3),
            wind_speed: r3(readings.wind_speed),
            wind_gust_speed: r3(readings.wind_gust_speed),
            solar_impulse: r3(breakdown.solar_impulse),
            solar_score: r3(breakdown.solar_score),
            wind_score: r3(breakdown.wind_score),
            outdoor_score: r3(breakdown.outdoor_score),
            solar_gain: r3(breakdown.solar_gain),
            wind_gain: r3(breakdown.wind_gain),
            outdoor_gain: r3(breakdown.outdoor_gain),
            orientation_factor: r3(breakdown.orientation_factor),
            offset_solar: r3(breakdown.offsets.solar),
            offset_wind: r3(breakdown.offsets.wind),
            offset_outdoor: r3(breakdown.offsets.outdoor),
            offset_total: r3(composition.total_offset),
            raw_setpoint: r3(composition.raw_setpoint),
            final_setpoint: r3(composition.final_setpoint),
            trend_cph: r3(trend_cph),
            outdoor_drop_gain: r3(outdoor_drop_gain),
            heating_request,
        }
    }

    /// Compact JSON with keys in sorted order.
    pub fn to_json(&self) -> AppResult<String> {
        // serde_json maps are BTreeMap-backed, so going through Value sorts keys.
        let value = serde_json::to_value(self)
            .map_err(|e| AppError::InvalidInput(format!("debug snapshot: {e}")))?;
        serde_json::to_string(&value)
            .map_err(|e| AppError::InvalidInput(format!("debug snapshot: {e}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OffsetAttributes {
    pub solar: f64,
    pub wind: f64,
    pub outdoor: f64,
    /// Guarded total actually applied to the base setpoint.
    pub total: f64,
}

impl OffsetAttributes {
    pub fn new(offsets: &Offsets, total: f64) -> Self {
        Self {
            solar: r3(offsets.solar),
            wind: r3(offsets.wind),
            outdoor: r3(offsets.outdoor),
            total: r3(total),
        }
    }
}

/// State attributes of a room, as published to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomAttributes {
    pub room: String,
    pub base_setpoint: f64,
    pub final_setpoint: f64,
    pub effective_target: f64,
    pub offsets: OffsetAttributes,
    pub trend_cph: f64,
    pub outdoor_drop_gain: f64,
    pub is_heating: bool,
    pub mode: Mode,
    pub last_switch_change: Option<String>,
    pub debug: Option<DebugSnapshot>,
}

impl RoomAttributes {
    pub fn round_setpoint(value: f64) -> f64 {
        round_to(value, SETPOINT_PLACES)
    }

    pub fn round_metric(value: f64) -> f64 {
        r3(value)
    }
}
