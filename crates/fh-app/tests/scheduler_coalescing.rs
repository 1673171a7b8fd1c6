//! Triggers that land while a cycle is in flight are folded into one extra cycle.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use fh_app::{
    BaseSource, CompiledRoom, EntityState, RecordingSwitch, RoomController, RoomSources,
    Scheduler, StateReader, StateStore, TriggerOutcome,
};
use fh_controls::ControlTuning;
use fh_core::{ManualClock, RoomId};

/// Reader that parks the first indoor read until released.
struct GatedReader {
    inner: StateStore,
    indoor_reads: AtomicUsize,
    entered: Mutex<Sender<()>>,
    release: Mutex<Receiver<()>>,
}

impl StateReader for GatedReader {
    fn state(&self, entity_id: &str) -> Option<EntityState> {
        if entity_id == "sensor.hall" && self.indoor_reads.fetch_add(1, Ordering::SeqCst) == 0 {
            self.entered.lock().unwrap().send(()).unwrap();
            self.release.lock().unwrap().recv().unwrap();
        }
        self.inner.state(entity_id)
    }
}

fn hall() -> RoomController {
    RoomController::new(CompiledRoom {
        id: RoomId::new("hall"),
        name: "Hall".to_string(),
        sources: RoomSources {
            indoor_temp: "sensor.hall".to_string(),
            weather: "weather.home".to_string(),
            outdoor_temp: None,
            flow_temp: None,
            heater_switch: "switch.hall".to_string(),
            solar_current_hour: "sensor.s1".to_string(),
            solar_next_hour: "sensor.s2".to_string(),
            solar_remaining_today: "sensor.s3".to_string(),
            solar_tomorrow: "sensor.s4".to_string(),
        },
        base: BaseSource::Virtual { temperature: 20.0 },
        tuning: ControlTuning::default(),
        update_interval: Duration::from_secs(60),
    })
    .unwrap()
}

#[test]
fn burst_during_cycle_runs_once_more() {
    let (entered_tx, entered_rx) = channel();
    let (release_tx, release_rx) = channel();
    let reader = Arc::new(GatedReader {
        inner: StateStore::new(),
        indoor_reads: AtomicUsize::new(0),
        entered: Mutex::new(entered_tx),
        release: Mutex::new(release_rx),
    });
    reader.inner.set_numeric("sensor.hall", 19.0);
    let switch = Arc::new(RecordingSwitch::new());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 1, 15, 6, 0, 0).unwrap(),
    ));
    let scheduler = Arc::new(
        Scheduler::new(vec![hall()], reader.clone(), switch.clone(), clock).unwrap(),
    );

    let first = {
        let scheduler = Arc::clone(&scheduler);
        thread::spawn(move || scheduler.trigger("hall"))
    };
    entered_rx.recv().unwrap();

    for _ in 0..5 {
        assert_eq!(scheduler.trigger("hall").unwrap(), TriggerOutcome::Coalesced);
    }
    release_tx.send(()).unwrap();

    let outcome = first.join().unwrap().unwrap();
    assert!(matches!(outcome, TriggerOutcome::Ran { cycles: 2, .. }));
    assert_eq!(reader.indoor_reads.load(Ordering::SeqCst), 2);
    // Only the first cycle switched; the second found the heater already on.
    assert_eq!(switch.commands().len(), 1);
}

#[test]
fn parallel_ticks_never_overlap_a_room() {
    let store = Arc::new(StateStore::new());
    store.set_numeric("sensor.hall", 19.0);
    let switch = Arc::new(RecordingSwitch::new());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 1, 15, 6, 0, 0).unwrap(),
    ));
    let scheduler = Arc::new(Scheduler::new(vec![hall()], store, switch.clone(), clock).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let scheduler = Arc::clone(&scheduler);
            thread::spawn(move || {
                for _ in 0..25 {
                    for (_, result) in scheduler.tick() {
                        result.unwrap();
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // The clock never moves, so only the very first transition can happen.
    assert_eq!(switch.commands().len(), 1);
    assert!(scheduler.with_room("hall", |r| r.is_heating()).unwrap());
}
