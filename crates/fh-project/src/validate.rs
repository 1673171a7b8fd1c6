//! Installation validation logic.

use crate::schema::{BaseSetpointDef, Installation, OrientationDef, RoomDef, TuningDef};
use std::collections::HashSet;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Duplicate ID: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Missing reference: {field} in {context}")]
    MissingReference { field: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

pub fn validate_installation(installation: &Installation) -> Result<(), ValidationError> {
    if installation.version > crate::LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: installation.version,
        });
    }

    let mut room_ids = HashSet::new();
    for room in &installation.rooms {
        let id = room.room_id();
        if id.as_str().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "name".to_string(),
                value: room.name.clone(),
                reason: "room name must contain letters or digits".to_string(),
            });
        }
        if !room_ids.insert(id.clone()) {
            return Err(ValidationError::DuplicateId {
                id: id.to_string(),
                context: "rooms".to_string(),
            });
        }
        validate_room(room)?;
    }

    Ok(())
}

fn validate_room(room: &RoomDef) -> Result<(), ValidationError> {
    let context = format!("room '{}'", room.name);

    let s = &room.sources;
    let required = [
        ("sources.indoor_temp", &s.indoor_temp),
        ("sources.weather", &s.weather),
        ("sources.heater_switch", &s.heater_switch),
        ("sources.solar.current_hour", &s.solar.current_hour),
        ("sources.solar.next_hour", &s.solar.next_hour),
        ("sources.solar.remaining_today", &s.solar.remaining_today),
        ("sources.solar.tomorrow", &s.solar.tomorrow),
    ];
    for (field, entity) in required {
        require_entity(field, entity, &context)?;
    }
    for (field, entity) in [
        ("sources.outdoor_temp", &s.outdoor_temp),
        ("sources.flow_temp", &s.flow_temp),
    ] {
        if let Some(entity) = entity {
            require_entity(field, entity, &context)?;
        }
    }

    match &room.base_setpoint {
        BaseSetpointDef::Climate { entity } | BaseSetpointDef::Number { entity } => {
            require_entity("base_setpoint.entity", entity, &context)?;
        }
        BaseSetpointDef::Virtual { temperature } => {
            check_range("base_setpoint.temperature", *temperature, 5.0, 35.0)?;
        }
    }

    validate_tuning(&room.tuning)?;

    check_range(
        "update_interval_seconds",
        room.update_interval_seconds as f64,
        30.0,
        3600.0,
    )?;

    Ok(())
}

fn validate_tuning(t: &TuningDef) -> Result<(), ValidationError> {
    if let OrientationDef::Azimuth { degrees } = t.orientation {
        check_range("tuning.orientation.degrees", degrees, 0.0, 359.0)?;
    }
    if let Some(factor) = t.orientation_factor {
        check_range("tuning.orientation_factor", factor, 0.0, 1.2)?;
    }

    let ranges = [
        ("tuning.wind_effect_percent", t.wind_effect_percent, 0.0, 100.0),
        ("tuning.max_cooling_degc", t.max_cooling_degc, 0.0, 3.0),
        ("tuning.max_wind_boost_degc", t.max_wind_boost_degc, 0.0, 3.0),
        ("tuning.max_outdoor_boost_degc", t.max_outdoor_boost_degc, 0.0, 3.0),
        ("tuning.wind_base_kmh", t.wind_base_kmh, 0.0, 60.0),
        ("tuning.wind_norm_kmh", t.wind_norm_kmh, 1.0, 120.0),
        ("tuning.outdoor_base_c", t.outdoor_base_c, -20.0, 30.0),
        ("tuning.outdoor_norm_c", t.outdoor_norm_c, -40.0, 20.0),
        ("tuning.solar_norm_kwh", t.solar_norm_kwh, 0.1, 20.0),
        ("tuning.comfort_guard_delta", t.comfort_guard_delta, 0.0, 2.0),
        ("tuning.flow_low_threshold", t.flow_low_threshold, 10.0, 50.0),
        ("tuning.min_on_minutes", f64::from(t.min_on_minutes), 1.0, 120.0),
        ("tuning.min_off_minutes", f64::from(t.min_off_minutes), 1.0, 120.0),
        ("tuning.hysteresis_degc", t.hysteresis_degc, 0.05, 2.0),
    ];
    for (field, value, min, max) in ranges {
        check_range(field, value, min, max)?;
    }
    Ok(())
}

fn require_entity(field: &str, entity: &str, context: &str) -> Result<(), ValidationError> {
    if entity.trim().is_empty() {
        return Err(ValidationError::MissingReference {
            field: field.to_string(),
            context: context.to_string(),
        });
    }
    Ok(())
}

fn check_range(field: &str, value: f64, min: f64, max: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value < min || value > max {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            reason: format!("must be within [{min}, {max}]"),
        });
    }
    Ok(())
}
