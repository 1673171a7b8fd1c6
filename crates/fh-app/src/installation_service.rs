//! Installation loading, validation, introspection and wiring.

use std::path::Path;
use std::sync::Arc;

use fh_core::Clock;
use fh_project::schema::{BaseSetpointDef, Installation, RoomDef};
use fh_project::{ConfigWarning, lint_installation};

use crate::error::{AppError, AppResult};
use crate::provider::{HeaterSwitch, StateReader};
use crate::room::RoomController;
use crate::room_compile::compile_room;
use crate::scheduler::Scheduler;

/// Summary of a room for listing.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomSummary {
    pub id: String,
    pub name: String,
    pub base_source: String,
    pub heater_switch: String,
    pub update_interval_seconds: u64,
    pub features: Vec<&'static str>,
}

/// Load an installation from a YAML or JSON file.
pub fn load_installation(path: &Path) -> AppResult<Installation> {
    let content = std::fs::read_to_string(path).map_err(|e| AppError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let installation: Installation = if is_json {
        serde_json::from_str(&content)
            .map_err(|e| AppError::Installation(format!("Failed to parse installation JSON: {e}")))?
    } else {
        serde_yaml::from_str(&content)
            .map_err(|e| AppError::Installation(format!("Failed to parse installation YAML: {e}")))?
    };

    Ok(installation)
}

/// Validate an installation and return its non-fatal warnings.
pub fn validate_installation(installation: &Installation) -> AppResult<Vec<ConfigWarning>> {
    if installation.rooms.is_empty() {
        return Err(AppError::Validation(
            "Installation must have at least one room".to_string(),
        ));
    }
    fh_project::validate_installation(installation)?;
    Ok(lint_installation(installation))
}

pub fn list_rooms(installation: &Installation) -> Vec<RoomSummary> {
    installation.rooms.iter().map(summarize).collect()
}

fn summarize(room: &RoomDef) -> RoomSummary {
    let base_source = match &room.base_setpoint {
        BaseSetpointDef::Climate { entity } => format!("climate {entity}"),
        BaseSetpointDef::Number { entity } => format!("number {entity}"),
        BaseSetpointDef::Virtual { temperature } => format!("virtual {temperature}"),
    };
    let f = &room.features;
    let features = [
        ("solar", f.solar),
        ("wind", f.wind),
        ("outdoor", f.outdoor),
        ("flow_guard", f.flow_guard),
    ]
    .into_iter()
    .filter_map(|(name, on)| on.then_some(name))
    .collect();

    RoomSummary {
        id: room.room_id().to_string(),
        name: room.name.clone(),
        base_source,
        heater_switch: room.sources.heater_switch.clone(),
        update_interval_seconds: room.update_interval_seconds,
        features,
    }
}

/// Validate, compile every room and wire them into a scheduler.
pub fn build_scheduler(
    installation: &Installation,
    reader: Arc<dyn StateReader>,
    switch: Arc<dyn HeaterSwitch>,
    clock: Arc<dyn Clock>,
) -> AppResult<Scheduler> {
    validate_installation(installation)?;
    let rooms = installation
        .rooms
        .iter()
        .map(|def| RoomController::new(compile_room(def)?))
        .collect::<AppResult<Vec<_>>>()?;
    tracing::info!(
        installation = %installation.name,
        rooms = rooms.len(),
        "installation loaded"
    );
    Scheduler::new(rooms, reader, switch, clock)
}
