//! On/off heating actuator with hysteresis and minimum dwell times.
//!
//! The state machine has two states and no terminal state:
//!
//! ```text
//!        indoor <= sp - band, off for >= min_off
//!   Off ───────────────────────────────────────▶ On
//!    ▲                                           │
//!    └───────────────────────────────────────────┘
//!        indoor >= sp + band, on for >= min_on
//! ```
//!
//! The very first transition is never dwell-limited. Deciding and committing
//! are separate steps: the caller issues the returned command and commits only
//! after it succeeded, so a failed command is simply retried next cycle.

use chrono::TimeDelta;
use fh_core::Timestamp;
use serde::{Deserialize, Serialize};

/// Heater state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeatingState {
    #[default]
    Off,
    On,
}

impl HeatingState {
    pub fn is_on(self) -> bool {
        matches!(self, HeatingState::On)
    }

    pub fn from_bool(on: bool) -> Self {
        if on { HeatingState::On } else { HeatingState::Off }
    }
}

/// Command sent to the heater switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchCommand {
    TurnOn,
    TurnOff,
}

impl SwitchCommand {
    /// State the heater is in after this command.
    pub fn target(self) -> HeatingState {
        match self {
            SwitchCommand::TurnOn => HeatingState::On,
            SwitchCommand::TurnOff => HeatingState::Off,
        }
    }

    fn towards(state: HeatingState) -> Self {
        match state {
            HeatingState::On => SwitchCommand::TurnOn,
            HeatingState::Off => SwitchCommand::TurnOff,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SwitchCommand::TurnOn => "turn_on",
            SwitchCommand::TurnOff => "turn_off",
        }
    }
}

impl std::fmt::Display for SwitchCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Minimum time between transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DwellConfig {
    /// Minimum time spent on before turning off.
    pub min_on: TimeDelta,
    /// Minimum time spent off before turning on.
    pub min_off: TimeDelta,
}

impl DwellConfig {
    pub fn from_minutes(min_on_minutes: u32, min_off_minutes: u32) -> Self {
        Self {
            min_on: TimeDelta::minutes(i64::from(min_on_minutes)),
            min_off: TimeDelta::minutes(i64::from(min_off_minutes)),
        }
    }
}

/// Outcome of evaluating the state machine for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchDecision {
    /// State requested by the hysteresis rule.
    pub requested: HeatingState,
    /// Command to issue, if a transition is requested and allowed.
    pub command: Option<SwitchCommand>,
    /// A transition was requested but the dwell guard held it back.
    pub blocked_by_dwell: bool,
}

/// Two-state heater controller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActuatorStateMachine {
    state: HeatingState,
    last_change: Option<Timestamp>,
}

impl ActuatorStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> HeatingState {
        self.state
    }

    pub fn is_heating(&self) -> bool {
        self.state.is_on()
    }

    pub fn last_change(&self) -> Option<Timestamp> {
        self.last_change
    }

    /// Hysteresis request; inside the dead band the current state is kept.
    pub fn request(&self, indoor: f64, final_setpoint: f64, band: f64) -> HeatingState {
        if indoor <= final_setpoint - band {
            HeatingState::On
        } else if indoor >= final_setpoint + band {
            HeatingState::Off
        } else {
            self.state
        }
    }

    /// Whether the dwell guard lets the heater move to `target` at `now`.
    pub fn dwell_allows(&self, target: HeatingState, now: Timestamp, dwell: &DwellConfig) -> bool {
        let Some(last) = self.last_change else {
            return true;
        };
        let elapsed = now - last;
        match target {
            HeatingState::On => !self.state.is_on() && elapsed >= dwell.min_off,
            HeatingState::Off => self.state.is_on() && elapsed >= dwell.min_on,
        }
    }

    /// Evaluate hysteresis and dwell guard without changing state.
    pub fn decide(
        &self,
        indoor: f64,
        final_setpoint: f64,
        band: f64,
        dwell: &DwellConfig,
        now: Timestamp,
    ) -> SwitchDecision {
        let requested = self.request(indoor, final_setpoint, band);
        if requested == self.state {
            return SwitchDecision {
                requested,
                command: None,
                blocked_by_dwell: false,
            };
        }
        if self.dwell_allows(requested, now, dwell) {
            SwitchDecision {
                requested,
                command: Some(SwitchCommand::towards(requested)),
                blocked_by_dwell: false,
            }
        } else {
            SwitchDecision {
                requested,
                command: None,
                blocked_by_dwell: true,
            }
        }
    }

    /// Record that `command` was carried out at `now`.
    pub fn commit(&mut self, command: SwitchCommand, now: Timestamp) {
        self.state = command.target();
        self.last_change = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn t(minutes: i64) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 1, 15, 6, 0, 0).unwrap() + TimeDelta::minutes(minutes)
    }

    fn dwell() -> DwellConfig {
        DwellConfig::from_minutes(8, 8)
    }

    #[test]
    fn first_transition_is_always_allowed() {
        let sm = ActuatorStateMachine::new();
        let d = sm.decide(19.0, 20.0, 0.2, &dwell(), t(0));
        assert_eq!(d.requested, HeatingState::On);
        assert_eq!(d.command, Some(SwitchCommand::TurnOn));
        assert!(!d.blocked_by_dwell);
    }

    #[test]
    fn dead_band_keeps_state() {
        let mut sm = ActuatorStateMachine::new();
        assert_eq!(sm.request(19.9, 20.0, 0.2), HeatingState::Off);
        sm.commit(SwitchCommand::TurnOn, t(0));
        assert_eq!(sm.request(19.9, 20.0, 0.2), HeatingState::On);
        assert_eq!(sm.request(20.1, 20.0, 0.2), HeatingState::On);
        assert_eq!(sm.request(20.2, 20.0, 0.2), HeatingState::Off);
    }

    #[test]
    fn dwell_blocks_then_allows() {
        let mut sm = ActuatorStateMachine::new();
        sm.commit(SwitchCommand::TurnOn, t(0));

        let d = sm.decide(21.0, 20.0, 0.2, &dwell(), t(5));
        assert_eq!(d.requested, HeatingState::Off);
        assert_eq!(d.command, None);
        assert!(d.blocked_by_dwell);

        let d = sm.decide(21.0, 20.0, 0.2, &dwell(), t(8));
        assert_eq!(d.command, Some(SwitchCommand::TurnOff));
    }

    #[test]
    fn asymmetric_dwell_times() {
        let dwell = DwellConfig::from_minutes(30, 5);
        let mut sm = ActuatorStateMachine::new();
        sm.commit(SwitchCommand::TurnOff, t(0));
        // Off for 5 minutes is enough to turn on.
        assert_eq!(
            sm.decide(19.0, 20.0, 0.2, &dwell, t(5)).command,
            Some(SwitchCommand::TurnOn)
        );
        sm.commit(SwitchCommand::TurnOn, t(5));
        // On for 29 minutes is not enough to turn off.
        assert!(sm.decide(21.0, 20.0, 0.2, &dwell, t(34)).blocked_by_dwell);
        assert_eq!(
            sm.decide(21.0, 20.0, 0.2, &dwell, t(35)).command,
            Some(SwitchCommand::TurnOff)
        );
    }

    #[test]
    fn no_command_when_already_in_requested_state() {
        let mut sm = ActuatorStateMachine::new();
        sm.commit(SwitchCommand::TurnOn, t(0));
        let d = sm.decide(18.0, 20.0, 0.2, &dwell(), t(1));
        assert_eq!(d.command, None);
        assert!(!d.blocked_by_dwell);
    }

    #[test]
    fn decide_does_not_mutate() {
        let sm = ActuatorStateMachine::new();
        let _ = sm.decide(15.0, 20.0, 0.2, &dwell(), t(0));
        assert_eq!(sm.state(), HeatingState::Off);
        assert_eq!(sm.last_change(), None);
    }

    #[test]
    fn clock_going_backwards_blocks() {
        let mut sm = ActuatorStateMachine::new();
        sm.commit(SwitchCommand::TurnOn, t(60));
        assert!(sm.decide(21.0, 20.0, 0.2, &dwell(), t(0)).blocked_by_dwell);
    }
}
