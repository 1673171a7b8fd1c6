//! Compilation of a `RoomDef` into runtime controller inputs.

use std::time::Duration;

use fh_controls::{ControlTuning, FeatureToggles, Orientation};
use fh_core::RoomId;
use fh_project::schema::{BaseSetpointDef, OrientationDef, RoomDef};

use crate::error::{AppError, AppResult};
use crate::provider::StateReader;

/// Attribute of a thermostat-like entity holding its target temperature.
pub const CLIMATE_TARGET_ATTRIBUTE: &str = "temperature";

/// Where the base setpoint comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum BaseSource {
    Climate { entity: String },
    Number { entity: String },
    Virtual { temperature: f64 },
}

impl BaseSource {
    /// Current value of the source, `None` if it yields nothing usable.
    pub fn resolve(&self, reader: &dyn StateReader) -> Option<f64> {
        match self {
            BaseSource::Climate { entity } => {
                reader.numeric_attribute(entity, CLIMATE_TARGET_ATTRIBUTE)
            }
            BaseSource::Number { entity } => reader.numeric(entity),
            BaseSource::Virtual { temperature } => Some(*temperature),
        }
    }

    /// Entity to watch for changes, if any.
    pub fn entity(&self) -> Option<&str> {
        match self {
            BaseSource::Climate { entity } | BaseSource::Number { entity } => Some(entity),
            BaseSource::Virtual { .. } => None,
        }
    }
}

/// Entity ids a room reads from and writes to.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomSources {
    pub indoor_temp: String,
    pub weather: String,
    pub outdoor_temp: Option<String>,
    pub flow_temp: Option<String>,
    pub heater_switch: String,
    pub solar_current_hour: String,
    pub solar_next_hour: String,
    pub solar_remaining_today: String,
    pub solar_tomorrow: String,
}

/// Everything needed to build a `RoomController`.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledRoom {
    pub id: RoomId,
    pub name: String,
    pub sources: RoomSources,
    pub base: BaseSource,
    pub tuning: ControlTuning,
    pub update_interval: Duration,
}

/// Compile a room definition into runtime structures.
pub fn compile_room(def: &RoomDef) -> AppResult<CompiledRoom> {
    let id = def.room_id();
    if id.as_str().is_empty() {
        return Err(AppError::Compile {
            room: def.name.clone(),
            message: "room name yields an empty id".to_string(),
        });
    }

    let tuning = build_tuning(def);
    tuning.check().map_err(|e| AppError::Compile {
        room: id.to_string(),
        message: e.to_string(),
    })?;

    let s = &def.sources;
    let sources = RoomSources {
        indoor_temp: s.indoor_temp.clone(),
        weather: s.weather.clone(),
        outdoor_temp: s.outdoor_temp.clone().filter(|e| !e.trim().is_empty()),
        flow_temp: s.flow_temp.clone().filter(|e| !e.trim().is_empty()),
        heater_switch: s.heater_switch.clone(),
        solar_current_hour: s.solar.current_hour.clone(),
        solar_next_hour: s.solar.next_hour.clone(),
        solar_remaining_today: s.solar.remaining_today.clone(),
        solar_tomorrow: s.solar.tomorrow.clone(),
    };

    let base = match &def.base_setpoint {
        BaseSetpointDef::Climate { entity } => BaseSource::Climate {
            entity: entity.clone(),
        },
        BaseSetpointDef::Number { entity } => BaseSource::Number {
            entity: entity.clone(),
        },
        BaseSetpointDef::Virtual { temperature } => BaseSource::Virtual {
            temperature: *temperature,
        },
    };

    Ok(CompiledRoom {
        id,
        name: def.name.clone(),
        sources,
        base,
        tuning,
        update_interval: Duration::from_secs(def.update_interval_seconds),
    })
}

fn build_tuning(def: &RoomDef) -> ControlTuning {
    let t = &def.tuning;
    let orientation = match t.orientation {
        OrientationDef::South => Orientation::South,
        OrientationDef::West => Orientation::West,
        OrientationDef::East => Orientation::East,
        OrientationDef::North => Orientation::North,
        OrientationDef::Azimuth { degrees } => Orientation::Azimuth { degrees },
    };
    ControlTuning {
        orientation,
        orientation_factor: t.orientation_factor,
        wind_effect_percent: t.wind_effect_percent,
        max_cooling_degc: t.max_cooling_degc,
        max_wind_boost_degc: t.max_wind_boost_degc,
        max_outdoor_boost_degc: t.max_outdoor_boost_degc,
        wind_base_kmh: t.wind_base_kmh,
        wind_norm_kmh: t.wind_norm_kmh,
        outdoor_base_c: t.outdoor_base_c,
        outdoor_norm_c: t.outdoor_norm_c,
        solar_norm_kwh: t.solar_norm_kwh,
        comfort_guard_delta: t.comfort_guard_delta,
        flow_low_threshold: t.flow_low_threshold,
        hysteresis_degc: t.hysteresis_degc,
        min_on_minutes: t.min_on_minutes,
        min_off_minutes: t.min_off_minutes,
        features: FeatureToggles {
            solar: def.features.solar,
            wind: def.features.wind,
            outdoor: def.features.outdoor,
            flow_guard: def.features.flow_guard,
        },
    }
}
