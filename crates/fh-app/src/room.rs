//! Per-room controller: one recalculation cycle from readings to actuator.

use std::time::Duration;

use fh_controls::{
    ActuatorStateMachine, ControlTuning, DwellConfig, Mode, ModeTuning, OffsetCalculator,
    OffsetInputs, Offsets, SampleWindow, SetpointInputs, SolarForecast, SwitchCommand,
    SwitchDecision, compose_setpoint, offsets,
};
use fh_core::{RoomId, Timestamp};
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::provider::{HeaterSwitch, StateReader};
use crate::room_compile::{BaseSource, CompiledRoom, RoomSources};
use crate::telemetry::{CycleReadings, DebugSnapshot, OffsetAttributes, RoomAttributes};

/// Setpoint used until the first base source reading arrives.
pub const INITIAL_SETPOINT: f64 = 20.0;

/// Weather entity attributes.
pub const WEATHER_TEMPERATURE: &str = "temperature";
pub const WEATHER_WIND_SPEED: &str = "wind_speed";
pub const WEATHER_WIND_GUST: &str = "wind_gust_speed";

/// Mutable per-room control state.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlState {
    pub base_setpoint: f64,
    pub final_setpoint: f64,
    pub offsets: Offsets,
    /// Total offset after the comfort and flow guards.
    pub total_offset: f64,
    pub trend_cph: f64,
    pub outdoor_drop_gain: f64,
    pub actuator: ActuatorStateMachine,
    pub mode: Mode,
}

impl Default for ControlState {
    fn default() -> Self {
        Self {
            base_setpoint: INITIAL_SETPOINT,
            final_setpoint: INITIAL_SETPOINT,
            offsets: Offsets::default(),
            total_offset: 0.0,
            trend_cph: 0.0,
            outdoor_drop_gain: 1.0,
            actuator: ActuatorStateMachine::new(),
            mode: Mode::Comfort,
        }
    }
}

/// Why a cycle ended early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    IndoorUnavailable,
}

/// Result of a completed cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub timestamp: Timestamp,
    pub indoor_temp: f64,
    pub final_setpoint: f64,
    pub decision: SwitchDecision,
    /// Command that was issued and acknowledged by the switch.
    pub issued: Option<SwitchCommand>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Skipped(SkipReason),
    Completed(CycleReport),
}

impl CycleOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, CycleOutcome::Completed(_))
    }
}

pub struct RoomController {
    id: RoomId,
    name: String,
    sources: RoomSources,
    base: BaseSource,
    tuning: ControlTuning,
    comfort: ModeTuning,
    update_interval: Duration,
    state: ControlState,
    indoor_window: SampleWindow,
    outdoor_window: SampleWindow,
    debug: Option<DebugSnapshot>,
}

impl RoomController {
    /// Build a controller; the current tuning becomes the Comfort profile.
    pub fn new(room: CompiledRoom) -> AppResult<Self> {
        room.tuning.check()?;
        let comfort = ModeTuning::capture(&room.tuning);
        Ok(Self {
            id: room.id,
            name: room.name,
            sources: room.sources,
            base: room.base,
            tuning: room.tuning,
            comfort,
            update_interval: room.update_interval,
            state: ControlState::default(),
            indoor_window: SampleWindow::new(),
            outdoor_window: SampleWindow::new(),
            debug: None,
        })
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sources(&self) -> &RoomSources {
        &self.sources
    }

    pub fn tuning(&self) -> &ControlTuning {
        &self.tuning
    }

    pub fn state(&self) -> &ControlState {
        &self.state
    }

    pub fn mode(&self) -> Mode {
        self.state.mode
    }

    pub fn is_heating(&self) -> bool {
        self.state.actuator.is_heating()
    }

    pub fn indoor_window(&self) -> &SampleWindow {
        &self.indoor_window
    }

    pub fn outdoor_window(&self) -> &SampleWindow {
        &self.outdoor_window
    }

    pub fn debug(&self) -> Option<&DebugSnapshot> {
        self.debug.as_ref()
    }

    pub fn update_interval(&self) -> Duration {
        self.update_interval
    }

    /// Entities whose changes should trigger a recalculation of this room.
    pub fn watched_entities(&self) -> Vec<&str> {
        let s = &self.sources;
        let mut out = vec![
            s.indoor_temp.as_str(),
            s.weather.as_str(),
            s.heater_switch.as_str(),
            s.solar_current_hour.as_str(),
            s.solar_next_hour.as_str(),
            s.solar_remaining_today.as_str(),
            s.solar_tomorrow.as_str(),
        ];
        out.extend(s.outdoor_temp.as_deref());
        out.extend(s.flow_temp.as_deref());
        out.extend(self.base.entity());
        out
    }

    pub fn watches(&self, entity_id: &str) -> bool {
        self.watched_entities().contains(&entity_id)
    }

    /// Run one cycle at `now`.
    ///
    /// A missing indoor reading skips the cycle without touching any state.
    /// A switch failure is returned as [`AppError::Actuator`] after the
    /// setpoint has been updated. The heating state and the debug snapshot
    /// keep their previous values, and the transition is retried on the next
    /// cycle.
    pub fn recalculate(
        &mut self,
        now: Timestamp,
        reader: &dyn StateReader,
        switch: &dyn HeaterSwitch,
    ) -> AppResult<CycleOutcome> {
        let base = self.base.resolve(reader).unwrap_or_else(|| {
            debug!(room = %self.id, "base setpoint unavailable, keeping previous");
            self.state.base_setpoint
        });

        let Some(indoor) = reader.numeric(&self.sources.indoor_temp) else {
            debug!(room = %self.id, entity = %self.sources.indoor_temp, "indoor temperature unavailable, skipping cycle");
            return Ok(CycleOutcome::Skipped(SkipReason::IndoorUnavailable));
        };

        let weather = reader.state(&self.sources.weather);
        let attr = |name: &str| weather.as_ref().and_then(|w| w.attribute_value(name));
        let wind_speed = attr(WEATHER_WIND_SPEED).unwrap_or(0.0);
        let wind_gust = attr(WEATHER_WIND_GUST).unwrap_or(wind_speed);
        let outdoor = self
            .sources
            .outdoor_temp
            .as_deref()
            .and_then(|entity| reader.numeric(entity))
            .or_else(|| attr(WEATHER_TEMPERATURE));
        let flow = self
            .sources
            .flow_temp
            .as_deref()
            .and_then(|entity| reader.numeric(entity));
        let solar_reading = |entity: &str| reader.numeric(entity).unwrap_or(0.0);
        let solar = SolarForecast {
            current_hour: solar_reading(&self.sources.solar_current_hour),
            next_hour: solar_reading(&self.sources.solar_next_hour),
            remaining_today: solar_reading(&self.sources.solar_remaining_today),
            tomorrow: solar_reading(&self.sources.solar_tomorrow),
        };

        if let Err(err) = self.indoor_window.push(now, indoor) {
            warn!(room = %self.id, %err, "indoor sample rejected");
        }
        if let Some(value) = outdoor {
            if let Err(err) = self.outdoor_window.push(now, value) {
                warn!(room = %self.id, %err, "outdoor sample rejected");
            }
        }
        let trend = self.indoor_window.slope_per_hour();
        let outdoor_trend = self.outdoor_window.delta();
        let drop_gain = offsets::outdoor_gain(outdoor_trend);

        let breakdown = OffsetCalculator::new(&self.tuning).compute(&OffsetInputs {
            outdoor_temp: outdoor,
            wind_speed,
            wind_gust,
            solar,
            indoor_trend: trend,
            outdoor_trend,
        });
        let composition = compose_setpoint(
            &self.tuning,
            &breakdown.offsets,
            &SetpointInputs {
                base_setpoint: base,
                indoor_temp: indoor,
                flow_temp: flow,
            },
        );

        self.state.base_setpoint = base;
        self.state.final_setpoint = composition.final_setpoint;
        self.state.offsets = breakdown.offsets;
        self.state.total_offset = composition.total_offset;
        self.state.trend_cph = trend;
        self.state.outdoor_drop_gain = drop_gain;

        let dwell = DwellConfig::from_minutes(self.tuning.min_on_minutes, self.tuning.min_off_minutes);
        let decision = self.state.actuator.decide(
            indoor,
            composition.final_setpoint,
            self.tuning.hysteresis_degc,
            &dwell,
            now,
        );
        if decision.blocked_by_dwell {
            debug!(room = %self.id, requested = ?decision.requested, "transition held back by dwell time");
        }

        let snapshot = DebugSnapshot::capture(
            &CycleReadings {
                base_setpoint: base,
                indoor_temp: indoor,
                outdoor_temp: outdoor,
                wind_speed,
                wind_gust_speed: wind_gust,
            },
            &breakdown,
            &composition,
            trend,
            drop_gain,
            decision.requested.is_on(),
        );

        let mut issued = None;
        if let Some(command) = decision.command {
            let entity = &self.sources.heater_switch;
            if let Err(err) = switch.switch(entity, command) {
                warn!(room = %self.id, %entity, %command, %err, "heater switch command failed");
                return Err(AppError::Actuator {
                    room: self.id.to_string(),
                    entity: entity.clone(),
                    command,
                    message: err.to_string(),
                });
            }
            self.state.actuator.commit(command, now);
            info!(
                room = %self.id,
                %command,
                indoor,
                setpoint = composition.final_setpoint,
                "heater switched"
            );
            issued = Some(command);
        }
        self.debug = Some(snapshot);

        debug!(
            room = %self.id,
            indoor,
            base,
            final_setpoint = composition.final_setpoint,
            total_offset = composition.total_offset,
            trend,
            "cycle complete"
        );

        Ok(CycleOutcome::Completed(CycleReport {
            timestamp: now,
            indoor_temp: indoor,
            final_setpoint: composition.final_setpoint,
            decision,
            issued,
        }))
    }

    /// Switch tuning profile. Eco is always derived from the Comfort
    /// snapshot, so repeated switches never compound.
    pub fn set_mode(&mut self, mode: Mode) {
        self.comfort.for_mode(mode).apply_to(&mut self.tuning);
        if self.state.mode != mode {
            info!(room = %self.id, %mode, "mode changed");
        }
        self.state.mode = mode;
    }

    /// Forget trend history. Actuator state is kept.
    pub fn reset_learning(&mut self) {
        self.indoor_window.clear();
        self.outdoor_window.clear();
        self.state.trend_cph = 0.0;
        self.state.outdoor_drop_gain = 1.0;
        info!(room = %self.id, "learning reset");
    }

    pub fn attributes(&self) -> RoomAttributes {
        let s = &self.state;
        RoomAttributes {
            room: self.id.to_string(),
            base_setpoint: RoomAttributes::round_setpoint(s.base_setpoint),
            final_setpoint: RoomAttributes::round_setpoint(s.final_setpoint),
            effective_target: RoomAttributes::round_setpoint(s.final_setpoint),
            offsets: OffsetAttributes::new(&s.offsets, s.total_offset),
            trend_cph: RoomAttributes::round_metric(s.trend_cph),
            outdoor_drop_gain: RoomAttributes::round_metric(s.outdoor_drop_gain),
            is_heating: s.actuator.is_heating(),
            mode: s.mode,
            last_switch_change: s.actuator.last_change().map(|t| t.to_rfc3339()),
            debug: self.debug.clone(),
        }
    }
}

impl std::fmt::Debug for RoomController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomController")
            .field("id", &self.id)
            .field("mode", &self.state.mode)
            .field("final_setpoint", &self.state.final_setpoint)
            .field("is_heating", &self.state.actuator.is_heating())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{RecordingSwitch, StateStore};
    use crate::provider::EntityState;
    use chrono::{TimeDelta, TimeZone, Utc};
    use fh_controls::{FeatureToggles, HeatingState};

    fn t(minutes: i64) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 1, 15, 6, 0, 0).unwrap() + TimeDelta::minutes(minutes)
    }

    fn sources() -> RoomSources {
        RoomSources {
            indoor_temp: "sensor.indoor".to_string(),
            weather: "weather.home".to_string(),
            outdoor_temp: Some("sensor.outdoor".to_string()),
            flow_temp: None,
            heater_switch: "switch.floor".to_string(),
            solar_current_hour: "sensor.solar_now".to_string(),
            solar_next_hour: "sensor.solar_next".to_string(),
            solar_remaining_today: "sensor.solar_rest".to_string(),
            solar_tomorrow: "sensor.solar_tomorrow".to_string(),
        }
    }

    fn controller(tuning: ControlTuning, base: BaseSource) -> RoomController {
        RoomController::new(CompiledRoom {
            id: RoomId::new("office"),
            name: "Office".to_string(),
            sources: sources(),
            base,
            tuning,
            update_interval: Duration::from_secs(600),
        })
        .unwrap()
    }

    fn virtual_base(temperature: f64) -> BaseSource {
        BaseSource::Virtual { temperature }
    }

    #[test]
    fn initial_state() {
        let room = controller(ControlTuning::default(), virtual_base(20.0));
        let s = room.state();
        assert_eq!(s.base_setpoint, 20.0);
        assert_eq!(s.final_setpoint, 20.0);
        assert_eq!(s.trend_cph, 0.0);
        assert_eq!(s.outdoor_drop_gain, 1.0);
        assert_eq!(s.mode, Mode::Comfort);
        assert!(!room.is_heating());
        assert!(room.debug().is_none());
    }

    #[test]
    fn cold_room_with_boosts_disabled_turns_heating_on() {
        let tuning = ControlTuning::default().with_features(FeatureToggles::all_disabled());
        let mut room = controller(tuning, virtual_base(20.0));
        let store = StateStore::new();
        store.set_numeric("sensor.indoor", 19.0);
        let switch = RecordingSwitch::new();

        let outcome = room.recalculate(t(0), &store, &switch).unwrap();
        let CycleOutcome::Completed(report) = outcome else {
            panic!("cycle skipped");
        };
        assert_eq!(report.issued, Some(SwitchCommand::TurnOn));
        assert_eq!(room.state().total_offset, 0.0);
        assert_eq!(room.state().final_setpoint, 20.0);
        assert!(room.is_heating());
        assert_eq!(room.state().actuator.last_change(), Some(t(0)));
        assert_eq!(switch.commands_for("switch.floor"), vec![SwitchCommand::TurnOn]);
    }

    #[test]
    fn missing_indoor_skips_without_state_change() {
        let mut room = controller(ControlTuning::default(), virtual_base(22.0));
        let store = StateStore::new();
        store.set("sensor.indoor", EntityState::new("unavailable"));
        let switch = RecordingSwitch::new();

        let outcome = room.recalculate(t(0), &store, &switch).unwrap();
        assert_eq!(outcome, CycleOutcome::Skipped(SkipReason::IndoorUnavailable));
        assert_eq!(room.state(), &ControlState::default());
        assert!(room.indoor_window().is_empty());
        assert!(room.debug().is_none());
        assert!(switch.commands().is_empty());
    }

    #[test]
    fn base_falls_back_to_previous_value() {
        let base = BaseSource::Number {
            entity: "input_number.base".to_string(),
        };
        let mut room = controller(ControlTuning::default(), base);
        let store = StateStore::new();
        let switch = RecordingSwitch::new();
        store.set_numeric("sensor.indoor", 21.0);
        store.set_numeric("input_number.base", 21.5);
        room.recalculate(t(0), &store, &switch).unwrap();
        assert_eq!(room.state().base_setpoint, 21.5);

        store.set("input_number.base", EntityState::new("unknown"));
        room.recalculate(t(10), &store, &switch).unwrap();
        assert_eq!(room.state().base_setpoint, 21.5);
    }

    #[test]
    fn outdoor_falls_back_to_weather_attribute() {
        let mut room = controller(ControlTuning::default(), virtual_base(20.0));
        let store = StateStore::new();
        let switch = RecordingSwitch::new();
        store.set_numeric("sensor.indoor", 20.0);
        store.set(
            "weather.home",
            EntityState::new("cloudy")
                .with_attribute("temperature", -5.0)
                .with_attribute("wind_speed", 12.0),
        );

        room.recalculate(t(0), &store, &switch).unwrap();
        let debug = room.debug().unwrap();
        assert_eq!(debug.outdoor_temp, Some(-5.0));
        assert_eq!(debug.outdoor_score, 1.0);
        assert_eq!(debug.wind_speed, 12.0);
        // Gust defaults to the mean wind speed.
        assert_eq!(debug.wind_gust_speed, 12.0);

        store.set_numeric("sensor.outdoor", 2.5);
        room.recalculate(t(10), &store, &switch).unwrap();
        assert_eq!(room.debug().unwrap().outdoor_temp, Some(2.5));
    }

    #[test]
    fn falling_outdoor_raises_drop_gain() {
        let mut room = controller(ControlTuning::default(), virtual_base(20.0));
        let store = StateStore::new();
        let switch = RecordingSwitch::new();
        store.set_numeric("sensor.indoor", 20.0);
        store.set_numeric("sensor.outdoor", 4.0);
        room.recalculate(t(0), &store, &switch).unwrap();
        assert_eq!(room.state().outdoor_drop_gain, 1.0);

        store.set_numeric("sensor.outdoor", 2.0);
        room.recalculate(t(30), &store, &switch).unwrap();
        assert!((room.state().outdoor_drop_gain - 1.5).abs() < 1e-9);
    }

    #[test]
    fn indoor_trend_from_window() {
        let mut room = controller(ControlTuning::default(), virtual_base(20.0));
        let store = StateStore::new();
        let switch = RecordingSwitch::new();
        store.set_numeric("sensor.indoor", 20.0);
        room.recalculate(t(0), &store, &switch).unwrap();
        store.set_numeric("sensor.indoor", 20.5);
        room.recalculate(t(30), &store, &switch).unwrap();
        assert!((room.state().trend_cph - 1.0).abs() < 1e-9);
        assert_eq!(room.attributes().trend_cph, 1.0);
    }

    #[test]
    fn switch_failure_keeps_heating_state_and_retries() {
        let tuning = ControlTuning::default().with_features(FeatureToggles::all_disabled());
        let mut room = controller(tuning, virtual_base(20.0));
        let store = StateStore::new();
        store.set_numeric("sensor.indoor", 19.0);
        let switch = RecordingSwitch::new();
        switch.set_failing(true);

        let err = room.recalculate(t(0), &store, &switch).unwrap_err();
        assert!(err.is_recoverable());
        assert!(matches!(
            err,
            AppError::Actuator { command: SwitchCommand::TurnOn, .. }
        ));
        assert!(!room.is_heating());
        assert_eq!(room.state().actuator.last_change(), None);
        assert_eq!(room.state().final_setpoint, 20.0);
        assert!(room.debug().is_none());

        switch.set_failing(false);
        let outcome = room.recalculate(t(1), &store, &switch).unwrap();
        assert!(outcome.is_completed());
        assert!(room.is_heating());
        assert!(room.debug().unwrap().heating_request);
        assert_eq!(room.state().actuator.state(), HeatingState::On);
    }

    #[test]
    fn mode_round_trip_restores_comfort() {
        let mut room = controller(ControlTuning::default(), virtual_base(20.0));
        let comfort = room.tuning().clone();

        room.set_mode(Mode::Eco);
        room.set_mode(Mode::Eco);
        assert!((room.tuning().max_cooling_degc - 0.42).abs() < 1e-9);
        assert!((room.tuning().comfort_guard_delta - 0.15).abs() < 1e-9);
        assert_eq!(room.mode(), Mode::Eco);

        room.set_mode(Mode::Comfort);
        assert_eq!(room.tuning(), &comfort);
    }

    #[test]
    fn reset_learning_clears_history_only() {
        let tuning = ControlTuning::default().with_features(FeatureToggles::all_disabled());
        let mut room = controller(tuning, virtual_base(20.0));
        let store = StateStore::new();
        let switch = RecordingSwitch::new();
        store.set_numeric("sensor.outdoor", 5.0);
        store.set_numeric("sensor.indoor", 19.0);
        room.recalculate(t(0), &store, &switch).unwrap();
        store.set_numeric("sensor.outdoor", 1.0);
        store.set_numeric("sensor.indoor", 19.5);
        room.recalculate(t(20), &store, &switch).unwrap();
        assert!(room.state().trend_cph > 0.0);
        assert!(room.state().outdoor_drop_gain > 1.0);

        room.reset_learning();
        assert_eq!(room.state().trend_cph, 0.0);
        assert_eq!(room.state().outdoor_drop_gain, 1.0);
        assert!(room.indoor_window().is_empty());
        assert!(room.outdoor_window().is_empty());
        assert!(room.is_heating());
    }

    #[test]
    fn attributes_reflect_state() {
        let mut room = controller(ControlTuning::default(), virtual_base(21.0));
        let store = StateStore::new();
        let switch = RecordingSwitch::new();
        store.set_numeric("sensor.indoor", 21.0);
        for entity in [
            "sensor.solar_now",
            "sensor.solar_next",
            "sensor.solar_rest",
            "sensor.solar_tomorrow",
        ] {
            store.set_numeric(entity, 5.0);
        }
        room.recalculate(t(0), &store, &switch).unwrap();

        let attrs = room.attributes();
        assert_eq!(attrs.room, "office");
        assert_eq!(attrs.base_setpoint, 21.0);
        assert_eq!(attrs.offsets.solar, -0.6);
        assert_eq!(attrs.offsets.total, -0.6);
        // Clamped to base - 0.2.
        assert_eq!(attrs.final_setpoint, 20.8);
        assert_eq!(attrs.effective_target, attrs.final_setpoint);
        assert_eq!(attrs.last_switch_change, None);
        assert_eq!(attrs.debug.unwrap().solar_impulse, 12.75);
    }

    #[test]
    fn watched_entities_include_optional_sources() {
        let base = BaseSource::Climate {
            entity: "climate.office".to_string(),
        };
        let room = controller(ControlTuning::default(), base);
        let watched = room.watched_entities();
        assert!(watched.contains(&"sensor.outdoor"));
        assert!(watched.contains(&"climate.office"));
        assert!(room.watches("switch.floor"));
        assert!(!room.watches("sensor.flow"));
    }
}
