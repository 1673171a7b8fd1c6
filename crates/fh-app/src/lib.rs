//! Service layer for floorheat.
//!
//! Wires the control core to the outside world: reading collaborators,
//! per-room controllers, the serialized scheduler, operator commands and
//! scenario replay. Both the CLI and embedding hosts go through this crate.

pub mod commands;
pub mod error;
pub mod installation_service;
pub mod memory;
pub mod provider;
pub mod replay;
pub mod room;
pub mod room_compile;
pub mod scheduler;
pub mod telemetry;

// Re-export key types for convenience
pub use commands::RoomResults;
pub use error::{AppError, AppResult};
pub use installation_service::{
    RoomSummary, build_scheduler, list_rooms, load_installation, validate_installation,
};
pub use memory::{RecordingSwitch, StateStore};
pub use provider::{EntityState, HeaterSwitch, StateReader, SwitchError};
pub use replay::{
    IssuedCommand, ReplayFrame, Scenario, ScenarioCommand, ScenarioStep, StateInput, load_scenario,
    replay,
};
pub use room::{ControlState, CycleOutcome, CycleReport, RoomController, SkipReason};
pub use room_compile::{BaseSource, CompiledRoom, RoomSources, compile_room};
pub use scheduler::{EventPump, RoomTrigger, Scheduler, Ticker, TriggerOutcome};
pub use telemetry::{CycleReadings, DebugSnapshot, OffsetAttributes, RoomAttributes};
