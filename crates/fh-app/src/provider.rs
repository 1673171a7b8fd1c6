//! Interfaces to the host that owns the sensors and the heater switch.
//!
//! The controller never talks to hardware directly. Each cycle it reads entity
//! states through a [`StateReader`] and issues at most one command through a
//! [`HeaterSwitch`].

use std::collections::BTreeMap;

use fh_controls::SwitchCommand;
use fh_core::parse_reading;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Snapshot of one host entity: a textual state plus loosely typed attributes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EntityState {
    #[serde(default)]
    pub state: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Value>,
}

impl EntityState {
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Entity whose state is a number.
    pub fn numeric(value: f64) -> Self {
        Self::new(value.to_string())
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// State parsed as a number; `None` when missing or malformed.
    pub fn state_value(&self) -> Option<f64> {
        parse_reading(&self.state)
    }

    /// Attribute parsed as a number; `None` when missing or malformed.
    pub fn attribute_value(&self, name: &str) -> Option<f64> {
        match self.attributes.get(name)? {
            Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
            Value::String(s) => parse_reading(s),
            _ => None,
        }
    }
}

/// Read-only access to the current host state.
pub trait StateReader: Send + Sync {
    /// Current state of `entity_id`, or `None` if the host does not know it.
    fn state(&self, entity_id: &str) -> Option<EntityState>;

    /// Numeric state of `entity_id`.
    fn numeric(&self, entity_id: &str) -> Option<f64> {
        self.state(entity_id)?.state_value()
    }

    /// Numeric attribute of `entity_id`.
    fn numeric_attribute(&self, entity_id: &str, attribute: &str) -> Option<f64> {
        self.state(entity_id)?.attribute_value(attribute)
    }
}

/// Failure reported by the heater switch.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SwitchError {
    #[error("switch entity '{0}' is unavailable")]
    Unavailable(String),

    #[error("{0}")]
    Failed(String),
}

/// The heater actuator. Commands are idempotent on the host side.
pub trait HeaterSwitch: Send + Sync {
    fn switch(&self, entity_id: &str, command: SwitchCommand) -> Result<(), SwitchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_parsing_of_state_and_attributes() {
        let weather = EntityState::new("cloudy")
            .with_attribute("temperature", 3.5)
            .with_attribute("wind_speed", "12.0")
            .with_attribute("wind_gust_speed", Value::Null)
            .with_attribute("forecast", serde_json::json!([1, 2]));

        assert_eq!(weather.state_value(), None);
        assert_eq!(weather.attribute_value("temperature"), Some(3.5));
        assert_eq!(weather.attribute_value("wind_speed"), Some(12.0));
        assert_eq!(weather.attribute_value("wind_gust_speed"), None);
        assert_eq!(weather.attribute_value("forecast"), None);
        assert_eq!(weather.attribute_value("missing"), None);
    }

    #[test]
    fn numeric_state() {
        assert_eq!(EntityState::numeric(21.25).state_value(), Some(21.25));
        assert_eq!(EntityState::new("unavailable").state_value(), None);
    }
}
