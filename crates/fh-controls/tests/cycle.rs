//! The control pipeline driven through the public API only.

use chrono::{TimeDelta, TimeZone, Utc};
use fh_controls::*;

#[test]
fn warming_room_backs_off_wind_boost() {
    let tuning = ControlTuning::default();
    let start = Utc.with_ymd_and_hms(2024, 1, 15, 6, 0, 0).unwrap();

    let mut indoor = SampleWindow::new();
    indoor.push(start, 20.0).unwrap();
    indoor.push(start + TimeDelta::minutes(30), 20.6).unwrap();
    let trend = indoor.slope_per_hour();
    assert!((trend - 1.2).abs() < 1e-9);

    let inputs = OffsetInputs {
        outdoor_temp: Some(10.0),
        wind_speed: 35.0,
        wind_gust: 35.0,
        solar: SolarForecast::default(),
        indoor_trend: trend,
        outdoor_trend: 0.0,
    };
    let breakdown = OffsetCalculator::new(&tuning).compute(&inputs);
    assert_eq!(breakdown.wind_score, 1.0);
    // clamp(1 - 1.2/1.2) hits the lower gain bound.
    assert!((breakdown.wind_gain - 0.8).abs() < 1e-9);
    assert!((breakdown.offsets.wind - 0.56).abs() < 1e-9);
    assert_eq!(breakdown.offsets.outdoor, 0.0);

    let composition = compose_setpoint(
        &tuning,
        &breakdown.offsets,
        &SetpointInputs {
            base_setpoint: 21.0,
            indoor_temp: 20.6,
            flow_temp: None,
        },
    );
    assert!((composition.final_setpoint - 21.56).abs() < 1e-9);

    let dwell = DwellConfig::from_minutes(tuning.min_on_minutes, tuning.min_off_minutes);
    let mut actuator = ActuatorStateMachine::new();
    let now = start + TimeDelta::minutes(30);
    let decision = actuator.decide(20.6, composition.final_setpoint, tuning.hysteresis_degc, &dwell, now);
    assert_eq!(decision.command, Some(SwitchCommand::TurnOn));
    actuator.commit(SwitchCommand::TurnOn, now);
    assert!(actuator.is_heating());
    assert_eq!(actuator.last_change(), Some(now));
}

#[test]
fn disabled_features_leave_only_the_base() {
    let tuning = ControlTuning::default().with_features(FeatureToggles::all_disabled());
    let inputs = OffsetInputs {
        outdoor_temp: Some(-20.0),
        wind_speed: 60.0,
        wind_gust: 90.0,
        solar: SolarForecast {
            current_hour: 5.0,
            next_hour: 5.0,
            remaining_today: 5.0,
            tomorrow: 5.0,
        },
        indoor_trend: -2.0,
        outdoor_trend: -5.0,
    };
    let breakdown = OffsetCalculator::new(&tuning).compute(&inputs);
    assert_eq!(breakdown.offsets, Offsets::default());

    let composition = compose_setpoint(
        &tuning,
        &breakdown.offsets,
        &SetpointInputs {
            base_setpoint: 20.0,
            indoor_temp: 19.0,
            flow_temp: Some(20.0),
        },
    );
    assert_eq!(composition.final_setpoint, 20.0);
    assert!(!composition.flow_guard_active);
}

#[test]
fn eco_profile_round_trip() {
    let mut tuning = ControlTuning::default();
    let comfort = ModeTuning::capture(&tuning);

    comfort.for_mode(Mode::Eco).apply_to(&mut tuning);
    assert!((tuning.max_wind_boost_degc - 0.49).abs() < 1e-9);
    comfort.for_mode(Mode::Eco).apply_to(&mut tuning);
    assert!((tuning.max_wind_boost_degc - 0.49).abs() < 1e-9);

    comfort.for_mode(Mode::Comfort).apply_to(&mut tuning);
    assert_eq!(tuning, ControlTuning::default());
}
