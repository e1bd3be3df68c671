mod simulation_engine_tests;

use crate::core::clock::SimulationClock;
use crate::core::components::ProcessUnit;
use crate::core::display::{DisplayAdapter, ParameterSource};
use crate::core::errors::SimError;
use crate::core::parameters::{OutputVariable, ParameterDescriptor, ParameterSet};
use crate::core::snapshot::InputView;
use crate::core::types::{PortRef, UnitId};
use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub(crate) type CallLog = Arc<Mutex<Vec<String>>>;

/// Scriptable unit: its state counts update_state calls and it records what it read
pub(crate) struct ScriptedUnit {
    id: UnitId,
    params: ParameterSet,
    outputs: Vec<OutputVariable>,
    inputs: Vec<PortRef>,
    pub value: f64,
    pub cached: Vec<f64>,
    /// Cached inputs as seen by each update_state call
    pub history: Vec<Vec<f64>>,
    log: CallLog,
    pub converged: Arc<AtomicBool>,
    pub checks: Arc<AtomicUsize>,
    pub ui_updates: Arc<AtomicUsize>,
    /// Port read in update_inputs without being declared, while set
    pub rogue_read: Option<(PortRef, Arc<AtomicBool>)>,
    /// When false the "value" field is listed but never published
    pub publishes_value: bool,
}

impl ScriptedUnit {
    pub fn new(id: UnitId, log: &CallLog) -> Self {
        Self {
            id,
            params: ParameterSet::new(),
            outputs: Vec::new(),
            inputs: Vec::new(),
            value: 0.0,
            cached: Vec::new(),
            history: Vec::new(),
            log: Arc::clone(log),
            converged: Arc::new(AtomicBool::new(false)),
            checks: Arc::new(AtomicUsize::new(0)),
            ui_updates: Arc::new(AtomicUsize::new(0)),
            rogue_read: None,
            publishes_value: true,
        }
    }

    pub fn reading(mut self, port: PortRef) -> Self {
        self.inputs.push(port);
        self
    }

    fn record(&self, phase: &str) {
        if let Ok(mut log) = self.log.lock() {
            log.push(format!("{}:{}", phase, self.id));
        }
    }
}

impl ProcessUnit for ScriptedUnit {
    fn unit_id(&self) -> UnitId {
        self.id
    }

    fn name(&self) -> &str {
        "Scripted"
    }

    fn initialize(&mut self) {
        self.params = ParameterSet::new();
        self.params.declare(ParameterDescriptor::new("Gain", "", 0.0, 10.0, 1.0));
        self.outputs = vec![OutputVariable::new("Value", "", 0.0, f64::MAX)];
        self.record("initialize");
    }

    fn parameters(&self) -> &ParameterSet {
        &self.params
    }

    fn outputs(&self) -> &[OutputVariable] {
        &self.outputs
    }

    fn input_ports(&self) -> Vec<PortRef> {
        self.inputs.clone()
    }

    fn exposed_fields(&self) -> Vec<&'static str> {
        vec!["value"]
    }

    fn exposed_value(&self, field: &str) -> Option<f64> {
        match field {
            "value" if self.publishes_value => Some(self.value),
            _ => None,
        }
    }

    fn reset(&mut self, _clock: &SimulationClock, display: &mut dyn DisplayAdapter) {
        self.params.refresh_from(self.id, &*display);
        self.value = 0.0;
        self.cached = vec![0.0; self.inputs.len()];
        self.history.clear();
        self.record("reset");
    }

    fn update_ui_params(&mut self, _clock: &SimulationClock, params: &dyn ParameterSource) {
        self.params.refresh_from(self.id, params);
        self.converged.store(false, Ordering::SeqCst);
        self.ui_updates.fetch_add(1, Ordering::SeqCst);
    }

    fn update_inputs(&mut self, _clock: &SimulationClock, inputs: &InputView<'_>) -> Result<(), SimError> {
        self.record("inputs");
        if let Some((port, active)) = &self.rogue_read {
            if active.load(Ordering::SeqCst) {
                inputs.read(port)?;
            }
        }
        for (slot, port) in self.cached.iter_mut().zip(&self.inputs) {
            *slot = inputs.read(port)?;
        }
        Ok(())
    }

    fn update_state(&mut self, _clock: &SimulationClock) {
        self.record("state");
        self.history.push(self.cached.clone());
        self.value += self.params.value(0);
    }

    fn update_display(&mut self, _clock: &SimulationClock, _display: &mut dyn DisplayAdapter) {
        self.record("display");
    }

    fn check_for_steady_state(&mut self, _clock: &SimulationClock) -> bool {
        self.record("check");
        self.checks.fetch_add(1, Ordering::SeqCst);
        self.converged.load(Ordering::SeqCst)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub(crate) fn new_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub(crate) fn drain(log: &CallLog) -> Vec<String> {
    log.lock().map(|mut l| std::mem::take(&mut *l)).unwrap_or_default()
}
