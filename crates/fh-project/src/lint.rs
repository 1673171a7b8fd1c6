//! Non-fatal configuration checks.
//!
//! These settings are accepted by [`crate::validate_installation`] but are
//! probably not what the user meant.

use std::fmt;

use crate::schema::{Installation, OrientationDef, RoomDef};

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigWarning {
    /// Both an orientation mode and an explicit factor are set; the factor wins.
    OrientationFactorOverridesMode {
        room: String,
        mode: OrientationDef,
        factor: f64,
    },
    /// `wind_norm_kmh <= wind_base_kmh` saturates the wind score immediately.
    WindSpanCollapsed { room: String, base: f64, norm: f64 },
    /// `outdoor_base_c <= outdoor_norm_c` saturates the outdoor score immediately.
    OutdoorSpanCollapsed { room: String, base: f64, norm: f64 },
    /// The flow guard is enabled but no flow sensor is configured.
    FlowGuardWithoutSensor { room: String },
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigWarning::OrientationFactorOverridesMode { room, mode, factor } => write!(
                f,
                "room '{room}': orientation_factor {factor} overrides orientation {mode:?}"
            ),
            ConfigWarning::WindSpanCollapsed { room, base, norm } => write!(
                f,
                "room '{room}': wind_norm_kmh ({norm}) is not above wind_base_kmh ({base})"
            ),
            ConfigWarning::OutdoorSpanCollapsed { room, base, norm } => write!(
                f,
                "room '{room}': outdoor_base_c ({base}) is not above outdoor_norm_c ({norm})"
            ),
            ConfigWarning::FlowGuardWithoutSensor { room } => write!(
                f,
                "room '{room}': flow guard enabled without a flow_temp source"
            ),
        }
    }
}

pub fn lint_installation(installation: &Installation) -> Vec<ConfigWarning> {
    let warnings: Vec<ConfigWarning> = installation.rooms.iter().flat_map(lint_room).collect();
    for warning in &warnings {
        tracing::warn!(%warning, "configuration warning");
    }
    warnings
}

fn lint_room(room: &RoomDef) -> Vec<ConfigWarning> {
    let mut out = Vec::new();
    let name = room.name.clone();
    let t = &room.tuning;

    if let Some(factor) = t.orientation_factor {
        if t.orientation != OrientationDef::South {
            out.push(ConfigWarning::OrientationFactorOverridesMode {
                room: name.clone(),
                mode: t.orientation,
                factor,
            });
        }
    }
    if t.wind_norm_kmh <= t.wind_base_kmh {
        out.push(ConfigWarning::WindSpanCollapsed {
            room: name.clone(),
            base: t.wind_base_kmh,
            norm: t.wind_norm_kmh,
        });
    }
    if t.outdoor_base_c <= t.outdoor_norm_c {
        out.push(ConfigWarning::OutdoorSpanCollapsed {
            room: name.clone(),
            base: t.outdoor_base_c,
            norm: t.outdoor_norm_c,
        });
    }
    if room.features.flow_guard && room.sources.flow_temp.is_none() {
        out.push(ConfigWarning::FlowGuardWithoutSensor { room: name });
    }
    out
}
