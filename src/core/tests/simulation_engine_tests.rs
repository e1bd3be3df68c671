use super::{new_log, ScriptedUnit};
use crate::core::builder::LabBuilder;
use crate::core::display::RecordingDisplay;
use crate::core::execution::config::SimulationConfig;
use crate::core::execution::{SimulationEngine, SimulationObserver};
use crate::core::types::UnitId;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Counts {
    ticks: AtomicUsize,
    changes: Mutex<Vec<bool>>,
}

struct CountingObserver(Arc<Counts>);

impl SimulationObserver for CountingObserver {
    fn on_tick(&mut self, _tick: u64, _sim_time: f64, _converged: bool) {
        self.0.ticks.fetch_add(1, Ordering::SeqCst);
    }

    fn on_convergence_change(&mut self, converged: bool, _sim_time: f64) {
        self.0.changes.lock().unwrap().push(converged);
    }
}

fn engine(max_frames: Option<u64>, throttle: u64) -> (SimulationEngine<RecordingDisplay>, Arc<AtomicBool>, Arc<Counts>) {
    let log = new_log();
    let unit = ScriptedUnit::new(UnitId(0), &log);
    let flag = Arc::clone(&unit.converged);
    let orchestrator = LabBuilder::new(SimulationConfig::new())
        .with_unit(Box::new(unit))
        .unwrap()
        .build(RecordingDisplay::new())
        .unwrap();
    let counts = Arc::new(Counts::default());
    let mut engine = SimulationEngine::new(orchestrator, max_frames, throttle);
    engine.add_observer(Box::new(CountingObserver(Arc::clone(&counts))));
    (engine, flag, counts)
}

#[test]
fn test_run_with_max_frames() {
    let (mut engine, _, counts) = engine(Some(10), 5);
    assert_eq!(engine.run().unwrap(), 10);
    assert_eq!(counts.ticks.load(Ordering::SeqCst), 10);
    assert_eq!(engine.orchestrator().clock().ticks(), 10);
}

#[test]
fn test_converged_system_is_throttled() {
    let (mut engine, flag, counts) = engine(Some(20), 5);
    flag.store(true, Ordering::SeqCst);
    engine.run().unwrap();
    // frame 1 ticks and converges; afterwards only frames 5, 10, 15, 20 tick
    assert_eq!(counts.ticks.load(Ordering::SeqCst), 5);
    assert_eq!(*counts.changes.lock().unwrap(), vec![true]);
}

#[test]
fn test_run_until_converged() {
    let (mut engine, flag, _) = engine(None, 5);
    assert_eq!(engine.run_until_converged(3).unwrap(), None);
    flag.store(true, Ordering::SeqCst);
    assert_eq!(engine.run_until_converged(3).unwrap(), Some(1));
}

#[test]
fn test_reset_restarts_frames() {
    let (mut engine, _, _) = engine(Some(3), 5);
    engine.run().unwrap();
    engine.reset();
    assert_eq!(engine.frame(), 0);
    assert_eq!(engine.orchestrator().clock().ticks(), 0);
}

#[test]
fn test_parameter_change_ends_throttling_at_once() {
    let (mut engine, flag, counts) = engine(Some(40), 20);
    flag.store(true, Ordering::SeqCst);
    for _ in 0..3 {
        engine.step().unwrap();
    }
    assert!(engine.orchestrator().is_converged());

    flag.store(false, Ordering::SeqCst);
    engine.orchestrator_mut().notify_parameter_changed(UnitId(0)).unwrap();
    let before = counts.ticks.load(Ordering::SeqCst);
    for _ in 0..5 {
        assert!(engine.step().unwrap(), "frame {} was skipped", engine.frame());
    }
    assert_eq!(counts.ticks.load(Ordering::SeqCst), before + 5);
    assert_eq!(*counts.changes.lock().unwrap(), vec![true]);
}
