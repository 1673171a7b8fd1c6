//! Per-room heating control core for floorheat.
//!
//! One recalculation cycle flows strictly in one direction:
//!
//! readings → trend windows → offsets → setpoint → actuator decision
//!
//! # Architecture
//!
//! - [`SampleWindow`] keeps the last 60 minutes of a signal and yields its slope
//! - [`OffsetCalculator`] turns readings and trends into solar/wind/outdoor corrections
//! - [`compose_setpoint`] sums the corrections, applies the comfort and flow
//!   guards and clamps the result into the allowed band around the base setpoint
//! - [`ActuatorStateMachine`] applies hysteresis and minimum dwell times
//!
//! Everything here is synchronous and free of I/O. Time is always passed in by
//! the caller so the whole core can be driven by a manual clock.

pub mod actuator;
pub mod error;
pub mod mode;
pub mod offsets;
pub mod setpoint;
pub mod tuning;
pub mod window;

pub use actuator::{ActuatorStateMachine, DwellConfig, HeatingState, SwitchCommand, SwitchDecision};
pub use error::{ControlError, ControlResult};
pub use mode::{Mode, ModeTuning};
pub use offsets::{OffsetBreakdown, OffsetCalculator, OffsetInputs, Offsets, SolarForecast};
pub use setpoint::{SetpointComposition, SetpointInputs, compose_setpoint};
pub use tuning::{ControlTuning, FeatureToggles, Orientation};
pub use window::{Sample, SampleWindow};
