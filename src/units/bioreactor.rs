use crate::core::clock::{LocalStep, SimulationClock};
use crate::core::components::ProcessUnit;
use crate::core::display::{DisplayAdapter, ParameterSource, StripChart};
use crate::core::errors::SimError;
use crate::core::parameters::{OutputVariable, ParameterDescriptor, ParameterSet};
use crate::core::snapshot::InputView;
use crate::core::steady_state::{Precision, SteadyStateDetector, TrackedQuantity};
use crate::core::types::{PortRef, UnitId};
use crate::units::substrate_feed::FEED_FLOW_MAX;
use crate::units::{SubstrateFeed, STRIP_POINTS};
use log::debug;
use std::any::Any;

const MAX_GROWTH_RATE: usize = 0;
const HALF_SATURATION: usize = 1;
const YIELD: usize = 2;
const VOLUME: usize = 3;

const BIOMASS_OUTPUT: usize = 0;
const SUBSTRATE_OUTPUT: usize = 1;

/// Declared upper bound of biomass and substrate concentrations (kg/m3)
const CONC_MAX: f64 = 40.0;
const INITIAL_BIOMASS: f64 = 1.0;
const INITIAL_SUBSTRATE: f64 = 0.0;
/// Local steps per fastest time constant
const STEPS_PER_TIME_CONSTANT: f64 = 15.0;

/// Continuous stirred bioreactor (chemostat) with Monod growth kinetics.
///
/// ```text
/// mu    = mu_max * S / (Ks + S)
/// dX/dt = (mu - D) * X
/// dS/dt = D * (Sf - S) - mu * X / Y        with D = F / V
/// ```
pub struct Bioreactor {
    id: UnitId,
    flow_port: PortRef,
    substrate_port: PortRef,
    params: ParameterSet,
    outputs: Vec<OutputVariable>,
    step: LocalStep,
    feed_flow: f64,
    feed_substrate: f64,
    biomass: f64,
    substrate: f64,
    biomass_chart: StripChart,
    substrate_chart: StripChart,
    detector: SteadyStateDetector,
}

impl Bioreactor {
    pub const BIOMASS: &'static str = "biomass";
    pub const SUBSTRATE: &'static str = "substrate";

    pub fn new(id: UnitId, feed: UnitId) -> Self {
        Self {
            id,
            flow_port: feed.output(SubstrateFeed::FLOW_RATE),
            substrate_port: feed.output(SubstrateFeed::SUBSTRATE),
            params: ParameterSet::new(),
            outputs: Vec::new(),
            step: LocalStep::single(0.0),
            feed_flow: 0.0,
            feed_substrate: 0.0,
            biomass: INITIAL_BIOMASS,
            substrate: INITIAL_SUBSTRATE,
            biomass_chart: StripChart::new("biomass", STRIP_POINTS, INITIAL_BIOMASS),
            substrate_chart: StripChart::new("substrate", STRIP_POINTS, INITIAL_SUBSTRATE),
            detector: SteadyStateDetector::new(
                vec![
                    TrackedQuantity::new("biomass", Precision::SignificantFigures(4)),
                    TrackedQuantity::new("substrate", Precision::SignificantFigures(4)),
                ],
                0.0,
            ),
        }
    }

    pub fn biomass(&self) -> f64 {
        self.biomass
    }

    pub fn substrate(&self) -> f64 {
        self.substrate
    }

    pub fn local_step(&self) -> LocalStep {
        self.step
    }

    /// Bound on the largest eigenvalue magnitude of the linearised model (1/h).
    ///
    /// Uptake sensitivity peaks at S = 0 with X at its upper bound; dilution is
    /// bounded by the largest feed flow a control can set.
    fn stiffness_bound(&self) -> f64 {
        let mu_max = self.params.value(MAX_GROWTH_RATE);
        let ks = self.params.value(HALF_SATURATION);
        let yield_coef = self.params.value(YIELD);
        let x_max = self.outputs[BIOMASS_OUTPUT].max;
        mu_max * (1.0 + x_max / (yield_coef * ks)) + FEED_FLOW_MAX / self.params.value(VOLUME)
    }

    fn apply_params<S: ParameterSource + ?Sized>(&mut self, clock: &SimulationClock, source: &S) {
        self.params.refresh_from(self.id, source);
        let rate = self.stiffness_bound();
        self.step = LocalStep::derive(clock.base_time_step(), 1.0 / rate, STEPS_PER_TIME_CONSTANT);
        self.detector.set_window(1.0 / self.params.value(MAX_GROWTH_RATE));
        self.detector.invalidate();
        debug!(
            "[Bioreactor {}] Stiffness bound {:.1} 1/h, {} sub-steps of {:.2e} h",
            self.id, rate, self.step.repeats, self.step.time_step
        );
    }

    fn growth_rate(&self, substrate: f64) -> f64 {
        let mu_max = self.params.value(MAX_GROWTH_RATE);
        mu_max * substrate / (self.params.value(HALF_SATURATION) + substrate)
    }
}

impl ProcessUnit for Bioreactor {
    fn unit_id(&self) -> UnitId {
        self.id
    }

    fn name(&self) -> &str {
        "Bioreactor"
    }

    fn initialize(&mut self) {
        let mut params = ParameterSet::new();
        params.declare(ParameterDescriptor::new("Max Growth Rate", "1/h", 0.1, 1.0, 0.5));
        params.declare(ParameterDescriptor::new("Half Saturation", "kg/m3", 0.01, 5.0, 0.2));
        params.declare(ParameterDescriptor::new("Yield", "", 0.1, 1.0, 0.5));
        params.declare(ParameterDescriptor::new("Volume", "m3", 0.1, 10.0, 1.0));
        self.params = params;
        self.outputs = vec![
            OutputVariable::new("Biomass", "kg/m3", 0.0, CONC_MAX),
            OutputVariable::new("Substrate", "kg/m3", 0.0, CONC_MAX),
        ];
    }

    fn parameters(&self) -> &ParameterSet {
        &self.params
    }

    fn outputs(&self) -> &[OutputVariable] {
        &self.outputs
    }

    fn input_ports(&self) -> Vec<PortRef> {
        vec![self.flow_port.clone(), self.substrate_port.clone()]
    }

    fn exposed_fields(&self) -> Vec<&'static str> {
        vec![Self::BIOMASS, Self::SUBSTRATE]
    }

    fn exposed_value(&self, field: &str) -> Option<f64> {
        match field {
            Self::BIOMASS => Some(self.biomass),
            Self::SUBSTRATE => Some(self.substrate),
            _ => None,
        }
    }

    fn reset(&mut self, clock: &SimulationClock, display: &mut dyn DisplayAdapter) {
        self.apply_params(clock, &*display);
        self.feed_flow = 0.0;
        self.feed_substrate = 0.0;
        self.biomass = INITIAL_BIOMASS;
        self.substrate = INITIAL_SUBSTRATE;
        self.biomass_chart = StripChart::new("biomass", STRIP_POINTS, self.biomass);
        self.substrate_chart = StripChart::new("substrate", STRIP_POINTS, self.substrate);
        self.update_display(clock, display);
    }

    fn update_ui_params(&mut self, clock: &SimulationClock, params: &dyn ParameterSource) {
        self.apply_params(clock, params);
    }

    fn update_inputs(&mut self, _clock: &SimulationClock, inputs: &InputView<'_>) -> Result<(), SimError> {
        self.feed_flow = inputs.read(&self.flow_port)?;
        self.feed_substrate = inputs.read(&self.substrate_port)?;
        Ok(())
    }

    fn update_state(&mut self, _clock: &SimulationClock) {
        let dilution = self.feed_flow / self.params.value(VOLUME);
        let yield_coef = self.params.value(YIELD);
        let dt = self.step.time_step;

        let (x_bounds, s_bounds) = (&self.outputs[BIOMASS_OUTPUT], &self.outputs[SUBSTRATE_OUTPUT]);
        let (mut x, mut s) = (self.biomass, self.substrate);
        for _ in 0..self.step.repeats {
            let mu = self.growth_rate(s);
            let dx = (mu - dilution) * x;
            let ds = dilution * (self.feed_substrate - s) - mu * x / yield_coef;
            x = x_bounds.clamp(x + dx * dt);
            s = s_bounds.clamp(s + ds * dt);
        }
        self.biomass = x;
        self.substrate = s;
    }

    fn update_display(&mut self, clock: &SimulationClock, display: &mut dyn DisplayAdapter) {
        let dt = clock.display_time_step();
        self.biomass_chart.push(self.biomass);
        self.substrate_chart.push(self.substrate);
        display.publish(self.id, self.biomass_chart.series(dt));
        display.publish(self.id, self.substrate_chart.series(dt));
    }

    fn check_for_steady_state(&mut self, clock: &SimulationClock) -> bool {
        self.detector
            .check(clock.sim_time(), &[self.biomass, self.substrate])
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
