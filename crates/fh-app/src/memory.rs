//! In-memory collaborators for tests, replay and embedding.

use std::collections::HashMap;
use std::sync::Mutex;

use fh_controls::SwitchCommand;

use crate::provider::{EntityState, HeaterSwitch, StateReader, SwitchError};

/// Thread-safe map of entity states.
#[derive(Debug, Default)]
pub struct StateStore {
    states: Mutex<HashMap<String, EntityState>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, entity_id: impl Into<String>, state: EntityState) {
        let mut states = self.states.lock().unwrap_or_else(|p| p.into_inner());
        states.insert(entity_id.into(), state);
    }

    /// Set a plain numeric state.
    pub fn set_numeric(&self, entity_id: impl Into<String>, value: f64) {
        self.set(entity_id, EntityState::numeric(value));
    }

    pub fn remove(&self, entity_id: &str) -> Option<EntityState> {
        let mut states = self.states.lock().unwrap_or_else(|p| p.into_inner());
        states.remove(entity_id)
    }
}

impl StateReader for StateStore {
    fn state(&self, entity_id: &str) -> Option<EntityState> {
        let states = self.states.lock().unwrap_or_else(|p| p.into_inner());
        states.get(entity_id).cloned()
    }
}

/// Heater switch that records every successful command and can be told to fail.
#[derive(Debug, Default)]
pub struct RecordingSwitch {
    inner: Mutex<RecordingInner>,
}

#[derive(Debug, Default)]
struct RecordingInner {
    commands: Vec<(String, SwitchCommand)>,
    on: HashMap<String, bool>,
    failing: bool,
}

impl RecordingSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following command fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.lock().failing = failing;
    }

    /// All commands carried out so far, in order.
    pub fn commands(&self) -> Vec<(String, SwitchCommand)> {
        self.lock().commands.clone()
    }

    /// Commands carried out for one entity.
    pub fn commands_for(&self, entity_id: &str) -> Vec<SwitchCommand> {
        self.lock()
            .commands
            .iter()
            .filter(|(e, _)| e == entity_id)
            .map(|(_, c)| *c)
            .collect()
    }

    /// Drain and return the recorded commands.
    pub fn take_commands(&self) -> Vec<(String, SwitchCommand)> {
        std::mem::take(&mut self.lock().commands)
    }

    pub fn is_on(&self, entity_id: &str) -> bool {
        self.lock().on.get(entity_id).copied().unwrap_or(false)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RecordingInner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl HeaterSwitch for RecordingSwitch {
    fn switch(&self, entity_id: &str, command: SwitchCommand) -> Result<(), SwitchError> {
        let mut inner = self.lock();
        if inner.failing {
            return Err(SwitchError::Unavailable(entity_id.to_string()));
        }
        inner.commands.push((entity_id.to_string(), command));
        inner
            .on
            .insert(entity_id.to_string(), command.target().is_on());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_reads_back() {
        let store = StateStore::new();
        store.set_numeric("sensor.t", 20.5);
        assert_eq!(store.numeric("sensor.t"), Some(20.5));
        store.remove("sensor.t");
        assert_eq!(store.numeric("sensor.t"), None);
    }

    #[test]
    fn recording_switch_records_and_fails() {
        let switch = RecordingSwitch::new();
        switch.switch("switch.a", SwitchCommand::TurnOn).unwrap();
        assert!(switch.is_on("switch.a"));

        switch.set_failing(true);
        assert!(switch.switch("switch.a", SwitchCommand::TurnOff).is_err());
        assert!(switch.is_on("switch.a"));

        assert_eq!(
            switch.take_commands(),
            vec![("switch.a".to_string(), SwitchCommand::TurnOn)]
        );
        assert!(switch.commands().is_empty());
    }
}
