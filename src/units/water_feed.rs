use crate::core::clock::SimulationClock;
use crate::core::components::ProcessUnit;
use crate::core::display::{DisplayAdapter, ParameterSource, StripChart};
use crate::core::parameters::{OutputVariable, ParameterDescriptor, ParameterSet};
use crate::core::steady_state::{Precision, SteadyStateDetector, TrackedQuantity};
use crate::core::types::UnitId;
use crate::units::STRIP_POINTS;
use log::debug;
use std::any::Any;

const FLOW_RATE: usize = 0;

/// Water supply whose flow rate is set externally
pub struct WaterFeed {
    id: UnitId,
    params: ParameterSet,
    outputs: Vec<OutputVariable>,
    flow_rate: f64,
    chart: StripChart,
    detector: SteadyStateDetector,
}

impl WaterFeed {
    pub const FLOW_RATE: &'static str = "flow_rate";

    pub fn new(id: UnitId) -> Self {
        Self {
            id,
            params: ParameterSet::new(),
            outputs: Vec::new(),
            flow_rate: 0.0,
            chart: StripChart::new("flow_rate", STRIP_POINTS, 0.0),
            // a pure input reaches steady state as soon as it stops changing
            detector: SteadyStateDetector::new(
                vec![TrackedQuantity::new("flow_rate", Precision::Decimals(3))],
                0.0,
            ),
        }
    }

    pub fn flow_rate(&self) -> f64 {
        self.flow_rate
    }

    fn apply_params<S: ParameterSource + ?Sized>(&mut self, source: &S) {
        self.params.refresh_from(self.id, source);
        self.detector.invalidate();
        debug!("[WaterFeed {}] Flow rate {}", self.id, self.params.value(FLOW_RATE));
    }
}

impl ProcessUnit for WaterFeed {
    fn unit_id(&self) -> UnitId {
        self.id
    }

    fn name(&self) -> &str {
        "Water Feed"
    }

    fn initialize(&mut self) {
        self.params = ParameterSet::new();
        self.params.declare(
            ParameterDescriptor::new("Flow Rate", "m3/s", 0.0, 3.0, 2.0)
                .with_field_id("input_field_enterFlowRate"),
        );
        self.outputs = vec![OutputVariable::new("Flow Rate", "m3/s", 0.0, 3.0)];
    }

    fn parameters(&self) -> &ParameterSet {
        &self.params
    }

    fn outputs(&self) -> &[OutputVariable] {
        &self.outputs
    }

    fn exposed_fields(&self) -> Vec<&'static str> {
        vec![Self::FLOW_RATE]
    }

    fn exposed_value(&self, field: &str) -> Option<f64> {
        match field {
            Self::FLOW_RATE => Some(self.flow_rate),
            _ => None,
        }
    }

    fn reset(&mut self, clock: &SimulationClock, display: &mut dyn DisplayAdapter) {
        self.apply_params(&*display);
        self.flow_rate = self.params.value(FLOW_RATE);
        self.chart = StripChart::new("flow_rate", STRIP_POINTS, self.flow_rate);
        self.update_display(clock, display);
    }

    fn update_ui_params(&mut self, _clock: &SimulationClock, params: &dyn ParameterSource) {
        self.apply_params(params);
    }

    fn update_state(&mut self, _clock: &SimulationClock) {
        self.flow_rate = self.params.value(FLOW_RATE);
    }

    fn update_display(&mut self, clock: &SimulationClock, display: &mut dyn DisplayAdapter) {
        self.chart.push(self.flow_rate);
        display.publish(self.id, self.chart.series(clock.display_time_step()));
    }

    fn check_for_steady_state(&mut self, clock: &SimulationClock) -> bool {
        self.detector.check(clock.sim_time(), &[self.flow_rate])
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
