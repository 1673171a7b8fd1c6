//! Effective setpoint composition.
//!
//! The summed corrections may be overridden by two guards, both of which can
//! only raise the total (less cooling), never lower it. The result is clamped
//! into an asymmetric band around the base setpoint.

use fh_core::clamp;
use serde::{Deserialize, Serialize};

use crate::offsets::Offsets;
use crate::tuning::ControlTuning;

/// Lowest total offset allowed while a guard is active.
pub const GUARD_OFFSET_FLOOR: f64 = -0.1;
/// The effective setpoint never drops more than this below base.
pub const MAX_BELOW_BASE: f64 = 0.2;
/// The effective setpoint never rises more than this above base.
pub const MAX_ABOVE_BASE: f64 = 1.0;

/// Readings the composer needs besides the offsets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SetpointInputs {
    pub base_setpoint: f64,
    pub indoor_temp: f64,
    /// Heating supply temperature, if known.
    pub flow_temp: Option<f64>,
}

/// Result of composing the effective setpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SetpointComposition {
    /// Plain sum of the three offsets.
    pub offset_sum: f64,
    /// Sum after guard overrides.
    pub total_offset: f64,
    pub raw_setpoint: f64,
    pub final_setpoint: f64,
    pub comfort_guard_active: bool,
    pub flow_guard_active: bool,
}

/// Combine base setpoint and offsets into the clamped effective setpoint.
pub fn compose_setpoint(
    tuning: &ControlTuning,
    offsets: &Offsets,
    inputs: &SetpointInputs,
) -> SetpointComposition {
    let base = inputs.base_setpoint;
    let offset_sum = offsets.total();
    let mut total_offset = offset_sum;

    let comfort_guard_active = inputs.indoor_temp < base - tuning.comfort_guard_delta;
    if comfort_guard_active {
        total_offset = total_offset.max(GUARD_OFFSET_FLOOR);
    }

    let flow_guard_active = tuning.features.flow_guard
        && inputs
            .flow_temp
            .is_some_and(|flow| flow < tuning.flow_low_threshold);
    if flow_guard_active {
        total_offset = total_offset.max(GUARD_OFFSET_FLOOR);
    }

    let raw_setpoint = base + total_offset;
    let final_setpoint = clamp(raw_setpoint, base - MAX_BELOW_BASE, base + MAX_ABOVE_BASE);

    SetpointComposition {
        offset_sum,
        total_offset,
        raw_setpoint,
        final_setpoint,
        comfort_guard_active,
        flow_guard_active,
    }
}
