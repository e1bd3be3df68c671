use crate::core::clock::SimulationClock;
use crate::core::components::ProcessUnit;
use crate::core::display::{DisplayAdapter, ParameterSource, StripChart};
use crate::core::parameters::{OutputVariable, ParameterDescriptor, ParameterSet};
use crate::core::steady_state::{Precision, SteadyStateDetector, TrackedQuantity};
use crate::core::types::UnitId;
use crate::units::STRIP_POINTS;
use log::debug;
use std::any::Any;

const FEED_FLOW: usize = 0;
const FEED_SUBSTRATE: usize = 1;

/// Largest feed flow a control may set (m3/h)
pub const FEED_FLOW_MAX: f64 = 1.0;

/// Substrate feed stream of the bioreactor lab
pub struct SubstrateFeed {
    id: UnitId,
    params: ParameterSet,
    outputs: Vec<OutputVariable>,
    flow_rate: f64,
    substrate: f64,
    flow_chart: StripChart,
    substrate_chart: StripChart,
    detector: SteadyStateDetector,
}

impl SubstrateFeed {
    pub const FLOW_RATE: &'static str = "flow_rate";
    pub const SUBSTRATE: &'static str = "substrate";

    pub fn new(id: UnitId) -> Self {
        Self {
            id,
            params: ParameterSet::new(),
            outputs: Vec::new(),
            flow_rate: 0.0,
            substrate: 0.0,
            flow_chart: StripChart::new("feed_flow", STRIP_POINTS, 0.0),
            substrate_chart: StripChart::new("feed_substrate", STRIP_POINTS, 0.0),
            detector: SteadyStateDetector::new(
                vec![
                    TrackedQuantity::new("flow_rate", Precision::Decimals(3)),
                    TrackedQuantity::new("substrate", Precision::Decimals(3)),
                ],
                0.0,
            ),
        }
    }

    pub fn flow_rate(&self) -> f64 {
        self.flow_rate
    }

    pub fn substrate(&self) -> f64 {
        self.substrate
    }

    fn apply_params<S: ParameterSource + ?Sized>(&mut self, source: &S) {
        self.params.refresh_from(self.id, source);
        self.detector.invalidate();
        debug!(
            "[SubstrateFeed {}] Flow {} m3/h at {} kg/m3",
            self.id,
            self.params.value(FEED_FLOW),
            self.params.value(FEED_SUBSTRATE)
        );
    }
}

impl ProcessUnit for SubstrateFeed {
    fn unit_id(&self) -> UnitId {
        self.id
    }

    fn name(&self) -> &str {
        "Substrate Feed"
    }

    fn initialize(&mut self) {
        self.params = ParameterSet::new();
        self.params
            .declare(ParameterDescriptor::new("Feed Flow", "m3/h", 0.0, FEED_FLOW_MAX, 0.2));
        self.params
            .declare(ParameterDescriptor::new("Feed Substrate", "kg/m3", 0.0, 40.0, 20.0));
        self.outputs = vec![
            OutputVariable::new("Feed Flow", "m3/h", 0.0, FEED_FLOW_MAX),
            OutputVariable::new("Feed Substrate", "kg/m3", 0.0, 40.0),
        ];
    }

    fn parameters(&self) -> &ParameterSet {
        &self.params
    }

    fn outputs(&self) -> &[OutputVariable] {
        &self.outputs
    }

    fn exposed_fields(&self) -> Vec<&'static str> {
        vec![Self::FLOW_RATE, Self::SUBSTRATE]
    }

    fn exposed_value(&self, field: &str) -> Option<f64> {
        match field {
            Self::FLOW_RATE => Some(self.flow_rate),
            Self::SUBSTRATE => Some(self.substrate),
            _ => None,
        }
    }

    fn reset(&mut self, clock: &SimulationClock, display: &mut dyn DisplayAdapter) {
        self.apply_params(&*display);
        self.flow_rate = self.params.value(FEED_FLOW);
        self.substrate = self.params.value(FEED_SUBSTRATE);
        self.flow_chart = StripChart::new("feed_flow", STRIP_POINTS, self.flow_rate);
        self.substrate_chart = StripChart::new("feed_substrate", STRIP_POINTS, self.substrate);
        self.update_display(clock, display);
    }

    fn update_ui_params(&mut self, _clock: &SimulationClock, params: &dyn ParameterSource) {
        self.apply_params(params);
    }

    fn update_state(&mut self, _clock: &SimulationClock) {
        self.flow_rate = self.params.value(FEED_FLOW);
        self.substrate = self.params.value(FEED_SUBSTRATE);
    }

    fn update_display(&mut self, clock: &SimulationClock, display: &mut dyn DisplayAdapter) {
        let dt = clock.display_time_step();
        self.flow_chart.push(self.flow_rate);
        self.substrate_chart.push(self.substrate);
        display.publish(self.id, self.flow_chart.series(dt));
        display.publish(self.id, self.substrate_chart.series(dt));
    }

    fn check_for_steady_state(&mut self, clock: &SimulationClock) -> bool {
        self.detector
            .check(clock.sim_time(), &[self.flow_rate, self.substrate])
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
