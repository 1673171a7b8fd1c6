//! Serialized, coalescing dispatch of recalculation triggers.
//!
//! Every room sits behind its own mutex, so a room is never recalculated
//! concurrently with itself while different rooms run in parallel. A trigger
//! that arrives while a cycle is in flight does not queue up: it only marks the
//! room pending, and the thread already holding the lock runs one more cycle.
//! Readers and commands that borrow a room hand its pending work off the same
//! way when they release it.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use fh_core::{Clock, RoomId};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::provider::{HeaterSwitch, StateReader};
use crate::room::{CycleOutcome, RoomController};
use crate::telemetry::RoomAttributes;

/// Tick interval used when there are no rooms.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(600);

/// What happened to a single trigger.
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerOutcome {
    /// This caller ran `cycles` cycles; `outcome` is the last one.
    Ran { cycles: usize, outcome: CycleOutcome },
    /// Another thread was mid-cycle and picked the trigger up.
    Coalesced,
}

struct RoomSlot {
    id: RoomId,
    room: Mutex<RoomController>,
    pending: AtomicBool,
    watched: BTreeSet<String>,
    update_interval: Duration,
}

impl RoomSlot {
    fn new(room: RoomController) -> Self {
        let watched = room
            .watched_entities()
            .into_iter()
            .map(str::to_string)
            .collect();
        let update_interval = room.update_interval();
        Self {
            id: room.id().clone(),
            room: Mutex::new(room),
            pending: AtomicBool::new(false),
            watched,
            update_interval,
        }
    }

    fn lock(&self) -> MutexGuard<'_, RoomController> {
        self.room.lock().unwrap_or_else(|p| p.into_inner())
    }
}

pub struct Scheduler {
    slots: BTreeMap<RoomId, RoomSlot>,
    reader: Arc<dyn StateReader>,
    switch: Arc<dyn HeaterSwitch>,
    clock: Arc<dyn Clock>,
}

impl Scheduler {
    pub fn new(
        rooms: Vec<RoomController>,
        reader: Arc<dyn StateReader>,
        switch: Arc<dyn HeaterSwitch>,
        clock: Arc<dyn Clock>,
    ) -> AppResult<Self> {
        let mut slots = BTreeMap::new();
        for room in rooms {
            let id = room.id().clone();
            if slots.contains_key(&id) {
                return Err(AppError::InvalidInput(format!("duplicate room id '{id}'")));
            }
            slots.insert(id, RoomSlot::new(room));
        }
        Ok(Self {
            slots,
            reader,
            switch,
            clock,
        })
    }

    pub fn room_ids(&self) -> Vec<RoomId> {
        self.slots.keys().cloned().collect()
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Shortest configured update interval across rooms.
    pub fn tick_interval(&self) -> Duration {
        self.slots
            .values()
            .map(|slot| slot.update_interval)
            .min()
            .unwrap_or(DEFAULT_TICK_INTERVAL)
    }

    fn slot(&self, room: &str) -> AppResult<&RoomSlot> {
        self.slots
            .get(&RoomId::from(room))
            .ok_or_else(|| AppError::RoomNotFound(room.to_string()))
    }

    /// Recalculate `room`, coalescing with a cycle already in flight.
    pub fn trigger(&self, room: &str) -> AppResult<TriggerOutcome> {
        let slot = self.slot(room)?;
        self.run_slot(slot)
    }

    fn run_slot(&self, slot: &RoomSlot) -> AppResult<TriggerOutcome> {
        slot.pending.store(true, Ordering::SeqCst);
        let mut cycles = 0;
        let mut last = None;

        loop {
            let mut room = match slot.room.try_lock() {
                Ok(guard) => guard,
                Err(TryLockError::WouldBlock) => {
                    debug!(room = %slot.id, "trigger coalesced");
                    break;
                }
                Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            };
            while slot.pending.swap(false, Ordering::SeqCst) {
                let now = self.clock.now();
                last = Some(room.recalculate(now, self.reader.as_ref(), self.switch.as_ref()));
                cycles += 1;
            }
            drop(room);
            // A trigger may have landed between the last swap and the unlock.
            if !slot.pending.load(Ordering::SeqCst) {
                break;
            }
        }

        match last {
            None => Ok(TriggerOutcome::Coalesced),
            Some(Ok(outcome)) => Ok(TriggerOutcome::Ran { cycles, outcome }),
            Some(Err(err)) => Err(err),
        }
    }

    /// Trigger every room in parallel.
    pub fn tick(&self) -> Vec<(RoomId, AppResult<TriggerOutcome>)> {
        self.slots
            .par_iter()
            .map(|(id, slot)| (id.clone(), self.run_slot(slot)))
            .collect()
    }

    /// Trigger every room that reads or drives `entity_id`.
    pub fn notify_entity_changed(
        &self,
        entity_id: &str,
    ) -> Vec<(RoomId, AppResult<TriggerOutcome>)> {
        self.slots
            .iter()
            .filter(|(_, slot)| slot.watched.contains(entity_id))
            .map(|(id, slot)| (id.clone(), self.run_slot(slot)))
            .collect()
    }

    pub fn rooms_watching(&self, entity_id: &str) -> Vec<RoomId> {
        self.slots
            .iter()
            .filter(|(_, slot)| slot.watched.contains(entity_id))
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Read access to a room, serialized with its cycles.
    pub fn with_room<R>(&self, room: &str, f: impl FnOnce(&RoomController) -> R) -> AppResult<R> {
        let slot = self.slot(room)?;
        let guard = slot.lock();
        let value = f(&guard);
        drop(guard);
        self.drain_pending(slot);
        Ok(value)
    }

    /// Write access to a room, serialized with its cycles.
    pub fn with_room_mut<R>(
        &self,
        room: &str,
        f: impl FnOnce(&mut RoomController) -> R,
    ) -> AppResult<R> {
        let slot = self.slot(room)?;
        let mut guard = slot.lock();
        let value = f(&mut guard);
        drop(guard);
        self.drain_pending(slot);
        Ok(value)
    }

    /// Attributes of every room, ordered by id.
    pub fn attributes(&self) -> Vec<RoomAttributes> {
        self.slots
            .values()
            .map(|slot| {
                let attributes = slot.lock().attributes();
                self.drain_pending(slot);
                attributes
            })
            .collect()
    }

    /// Run cycles for triggers that were coalesced while a reader or a
    /// command held the room.
    ///
    /// Must be called after the lock is released. A trigger sets the flag
    /// before it tries the lock, so either it wins the lock itself or the
    /// releasing caller sees the flag here.
    fn drain_pending(&self, slot: &RoomSlot) {
        if slot.pending.load(Ordering::SeqCst) {
            let result = self.run_slot(slot);
            log_results("deferred", vec![(slot.id.clone(), result)]);
        }
    }

    /// Tick on a background thread every `interval` until the handle is stopped.
    pub fn spawn_ticker(self: &Arc<Self>, interval: Duration) -> Ticker {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let scheduler = Arc::clone(self);
        let handle = thread::spawn(move || {
            loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => log_results("tick", scheduler.tick()),
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            debug!("ticker stopped");
        });
        Ticker {
            stop: Some(stop_tx),
            handle: Some(handle),
        }
    }

    /// Start a worker that turns [`RoomTrigger`]s into cycles.
    ///
    /// Triggers that arrive in a burst are de-duplicated so each affected room
    /// runs once per burst.
    pub fn spawn_event_pump(self: &Arc<Self>) -> EventPump {
        let (tx, rx) = mpsc::channel();
        let scheduler = Arc::clone(self);
        let handle = thread::spawn(move || pump(&scheduler, &rx));
        EventPump {
            sender: Some(tx),
            handle: Some(handle),
        }
    }
}

/// Inbound trigger event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomTrigger {
    Room(RoomId),
    EntityChanged(String),
    All,
}

fn pump(scheduler: &Scheduler, rx: &Receiver<RoomTrigger>) {
    while let Ok(first) = rx.recv() {
        let mut rooms = BTreeSet::new();
        let mut add = |trigger: RoomTrigger| match trigger {
            RoomTrigger::Room(id) => {
                rooms.insert(id);
            }
            RoomTrigger::EntityChanged(entity) => rooms.extend(scheduler.rooms_watching(&entity)),
            RoomTrigger::All => rooms.extend(scheduler.room_ids()),
        };
        add(first);
        while let Ok(next) = rx.try_recv() {
            add(next);
        }

        let results = rooms
            .into_iter()
            .map(|id| {
                let result = scheduler.trigger(id.as_str());
                (id, result)
            })
            .collect();
        log_results("event", results);
    }
    debug!("event pump stopped");
}

fn log_results(source: &str, results: Vec<(RoomId, AppResult<TriggerOutcome>)>) {
    for (room, result) in results {
        if let Err(err) = result {
            warn!(%room, source, %err, "recalculation failed");
        }
    }
}

/// Handle of a background ticker; stops the thread when dropped.
pub struct Ticker {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Handle of a running event pump.
pub struct EventPump {
    sender: Option<Sender<RoomTrigger>>,
    handle: Option<JoinHandle<()>>,
}

impl EventPump {
    /// A sender to feed triggers from any thread.
    pub fn sender(&self) -> Option<Sender<RoomTrigger>> {
        self.sender.clone()
    }

    pub fn send(&self, trigger: RoomTrigger) -> AppResult<()> {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| AppError::InvalidInput("event pump is shut down".to_string()))?;
        sender
            .send(trigger)
            .map_err(|_| AppError::InvalidInput("event pump is shut down".to_string()))
    }

    /// Stop accepting triggers and wait for queued ones to finish.
    ///
    /// Blocks until every sender handed out by [`EventPump::sender`] is dropped.
    pub fn shutdown(mut self) {
        self.close();
    }

    fn close(&mut self) {
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for EventPump {
    fn drop(&mut self) {
        self.close();
    }
}
