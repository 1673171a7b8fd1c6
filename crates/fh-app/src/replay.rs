//! Deterministic replay of recorded or hand-written scenarios.
//!
//! A scenario is a list of steps at minute offsets from a start time. Each step
//! updates entity states, then either runs an operator command or, when there
//! is none, ticks every room. The clock is manual, so the same scenario always
//! yields the same frames.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use chrono::TimeDelta;
use fh_controls::{Mode, SwitchCommand};
use fh_core::{ManualClock, Timestamp};
use fh_project::schema::Installation;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::commands::{self, RoomResults};
use crate::error::{AppError, AppResult};
use crate::installation_service::build_scheduler;
use crate::memory::{RecordingSwitch, StateStore};
use crate::provider::EntityState;
use crate::scheduler::{Scheduler, TriggerOutcome};
use crate::telemetry::RoomAttributes;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub steps: Vec<ScenarioStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioStep {
    pub at_minutes: i64,
    #[serde(default)]
    pub states: BTreeMap<String, StateInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<ScenarioCommand>,
    /// Make the heater switch fail (or recover) from this step on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub switch_failing: Option<bool>,
}

/// Entity state in a scenario: a bare reading or a full state with attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateInput {
    Number(f64),
    Text(String),
    Entity(EntityState),
}

impl StateInput {
    fn into_entity(self) -> EntityState {
        match self {
            StateInput::Number(value) => EntityState::numeric(value),
            StateInput::Text(state) => EntityState::new(state),
            StateInput::Entity(entity) => entity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScenarioCommand {
    Recalculate {
        #[serde(default)]
        room: Option<String>,
    },
    SetMode {
        room: String,
        mode: Mode,
    },
    ResetLearning {
        #[serde(default)]
        room: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssuedCommand {
    pub entity: String,
    pub command: SwitchCommand,
}

/// State of the installation after one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayFrame {
    pub minute: i64,
    pub timestamp: String,
    pub rooms: Vec<RoomAttributes>,
    /// Switch commands acknowledged during this step.
    pub commands: Vec<IssuedCommand>,
    /// Recoverable failures during this step.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

pub fn load_scenario(path: &Path) -> AppResult<Scenario> {
    let content = std::fs::read_to_string(path).map_err(|e| AppError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_yaml::from_str(&content)
        .map_err(|e| AppError::Scenario(format!("Failed to parse scenario: {e}")))
}

/// Replay `scenario` against `installation`, starting at `start`.
pub fn replay(
    installation: &Installation,
    scenario: &Scenario,
    start: Timestamp,
) -> AppResult<Vec<ReplayFrame>> {
    let store = Arc::new(StateStore::new());
    let switch = Arc::new(RecordingSwitch::new());
    let clock = Arc::new(ManualClock::new(start));
    let scheduler = build_scheduler(installation, store.clone(), switch.clone(), clock.clone())?;

    let mut frames = Vec::with_capacity(scenario.steps.len());
    let mut previous_minute = i64::MIN;
    for step in &scenario.steps {
        if step.at_minutes < previous_minute {
            return Err(AppError::Scenario(format!(
                "step at minute {} comes after minute {previous_minute}",
                step.at_minutes
            )));
        }
        previous_minute = step.at_minutes;

        let now = start + TimeDelta::minutes(step.at_minutes);
        clock.set(now);
        for (entity, input) in &step.states {
            store.set(entity.clone(), input.clone().into_entity());
        }
        if let Some(failing) = step.switch_failing {
            switch.set_failing(failing);
        }

        let errors = run_step(&scheduler, step.command.as_ref())?;
        let commands = switch
            .take_commands()
            .into_iter()
            .map(|(entity, command)| IssuedCommand { entity, command })
            .collect();

        frames.push(ReplayFrame {
            minute: step.at_minutes,
            timestamp: now.to_rfc3339(),
            rooms: scheduler.attributes(),
            commands,
            errors,
        });
    }
    Ok(frames)
}

/// Run the step's command, or a tick. Recoverable errors are collected.
fn run_step(scheduler: &Scheduler, command: Option<&ScenarioCommand>) -> AppResult<Vec<String>> {
    let results: Vec<AppResult<TriggerOutcome>> = match command {
        None => into_results(scheduler.tick()),
        Some(ScenarioCommand::Recalculate { room }) => {
            into_results(commands::recalculate(scheduler, room.as_deref()))
        }
        Some(ScenarioCommand::SetMode { room, mode }) => {
            vec![commands::set_mode(scheduler, room, *mode)]
        }
        Some(ScenarioCommand::ResetLearning { room }) => {
            into_results(commands::reset_learning(scheduler, room.as_deref()))
        }
    };

    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok(_) => {}
            Err(err) if err.is_recoverable() => {
                warn!(%err, "replay step failed");
                errors.push(err.to_string());
            }
            Err(err) => return Err(err),
        }
    }
    Ok(errors)
}

fn into_results(results: RoomResults) -> Vec<AppResult<TriggerOutcome>> {
    results.into_iter().map(|(_, result)| result).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_parses_shorthand_states() {
        let yaml = r#"
steps:
  - at_minutes: 0
    states:
      sensor.indoor: 19.5
      sensor.flow: unavailable
      weather.home:
        state: cloudy
        attributes:
          wind_speed: 12
  - at_minutes: 10
    command:
      type: set_mode
      room: office
      mode: eco
"#;
        let scenario: Scenario = serde_yaml::from_str(yaml).unwrap();
        let states = &scenario.steps[0].states;
        assert_eq!(states["sensor.indoor"], StateInput::Number(19.5));
        assert_eq!(states["sensor.flow"], StateInput::Text("unavailable".to_string()));
        let weather = states["weather.home"].clone().into_entity();
        assert_eq!(weather.attribute_value("wind_speed"), Some(12.0));
        assert_eq!(
            scenario.steps[1].command,
            Some(ScenarioCommand::SetMode {
                room: "office".to_string(),
                mode: Mode::Eco
            })
        );
    }
}
