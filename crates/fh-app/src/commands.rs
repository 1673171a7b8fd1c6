//! Operator commands. Each one ends with a recalculation of the affected rooms.
//!
//! Commands that may address several rooms report per room, like
//! [`Scheduler::tick`], so one failing heater does not hide the others.

use fh_controls::Mode;
use fh_core::RoomId;
use tracing::info;

use crate::error::AppResult;
use crate::scheduler::{Scheduler, TriggerOutcome};

pub type RoomResults = Vec<(RoomId, AppResult<TriggerOutcome>)>;

fn targets(scheduler: &Scheduler, room: Option<&str>) -> Vec<RoomId> {
    match room {
        Some(id) => vec![RoomId::from(id)],
        None => scheduler.room_ids(),
    }
}

/// Recalculate one room, or all rooms when `room` is `None`.
pub fn recalculate(scheduler: &Scheduler, room: Option<&str>) -> RoomResults {
    targets(scheduler, room)
        .into_iter()
        .map(|id| {
            let result = scheduler.trigger(id.as_str());
            (id, result)
        })
        .collect()
}

/// Switch a room's tuning profile and recalculate it.
pub fn set_mode(scheduler: &Scheduler, room: &str, mode: Mode) -> AppResult<TriggerOutcome> {
    scheduler.with_room_mut(room, |r| r.set_mode(mode))?;
    info!(room, %mode, "set_mode command");
    scheduler.trigger(room)
}

/// Clear trend history of one room, or all rooms, and recalculate.
pub fn reset_learning(scheduler: &Scheduler, room: Option<&str>) -> RoomResults {
    targets(scheduler, room)
        .into_iter()
        .map(|id| {
            let result = scheduler
                .with_room_mut(id.as_str(), |r| r.reset_learning())
                .and_then(|()| scheduler.trigger(id.as_str()));
            (id, result)
        })
        .collect()
}
