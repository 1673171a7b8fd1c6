//! Installation file schema.

use fh_core::RoomId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Installation {
    pub version: u32,
    pub name: String,
    #[serde(default)]
    pub rooms: Vec<RoomDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomDef {
    pub name: String,
    /// Stable id; derived from `name` when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub sources: SourcesDef,
    pub base_setpoint: BaseSetpointDef,
    #[serde(default)]
    pub tuning: TuningDef,
    #[serde(default)]
    pub features: FeaturesDef,
    #[serde(default = "default_update_interval_seconds")]
    pub update_interval_seconds: u64,
}

impl RoomDef {
    pub fn room_id(&self) -> RoomId {
        match &self.id {
            Some(id) if !id.trim().is_empty() => RoomId::new(id.trim()),
            _ => RoomId::from_name(&self.name),
        }
    }
}

/// Entity references resolved by the host at runtime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourcesDef {
    pub indoor_temp: String,
    pub weather: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outdoor_temp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_temp: Option<String>,
    pub heater_switch: String,
    pub solar: SolarSourcesDef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SolarSourcesDef {
    pub current_hour: String,
    pub next_hour: String,
    pub remaining_today: String,
    pub tomorrow: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BaseSetpointDef {
    /// `temperature` attribute of a thermostat-like entity.
    Climate { entity: String },
    /// State of a plain numeric entity.
    Number { entity: String },
    /// Fixed configured value.
    Virtual {
        #[serde(default = "default_virtual_temperature")]
        temperature: f64,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum OrientationDef {
    #[default]
    South,
    West,
    East,
    North,
    Azimuth {
        degrees: f64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TuningDef {
    pub orientation: OrientationDef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation_factor: Option<f64>,
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
    pub min_on_minutes: u32,
    pub min_off_minutes: u32,
    pub hysteresis_degc: f64,
}

impl Default for TuningDef {
    fn default() -> Self {
        Self {
            orientation: OrientationDef::South,
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
            min_on_minutes: 8,
            min_off_minutes: 8,
            hysteresis_degc: 0.2,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FeaturesDef {
    #[serde(default = "enabled")]
    pub solar: bool,
    #[serde(default = "enabled")]
    pub wind: bool,
    #[serde(default = "enabled")]
    pub outdoor: bool,
    #[serde(default = "enabled")]
    pub flow_guard: bool,
}

impl Default for FeaturesDef {
    fn default() -> Self {
        Self {
            solar: true,
            wind: true,
            outdoor: true,
            flow_guard: true,
        }
    }
}

fn enabled() -> bool {
    true
}

fn default_update_interval_seconds() -> u64 {
    600
}

fn default_virtual_temperature() -> f64 {
    20.0
}
