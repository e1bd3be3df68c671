use crate::core::clock::{LocalStep, SimulationClock};
use crate::core::components::ProcessUnit;
use crate::core::display::{DisplayAdapter, ParameterSource, StripChart};
use crate::core::errors::SimError;
use crate::core::parameters::{OutputVariable, ParameterSet};
use crate::core::snapshot::InputView;
use crate::core::steady_state::{Precision, SteadyStateDetector, TrackedQuantity};
use crate::core::types::{PortRef, UnitId};
use crate::units::{LevelController, WaterFeed, STRIP_POINTS};
use std::any::Any;

/// Tank cross-sectional area (m2)
const AREA: f64 = 10.0;
/// Valve coefficient with the valve fully open (m2.5/s)
const MAX_VALVE_COEF: f64 = 3.0;
/// Time after which a level change must have shown up (s)
const CHECK_WINDOW: f64 = 10.0;
const LEVEL_OUTPUT: usize = 0;

/// Gravity-drained tank fed by a [`WaterFeed`] with a normally open outlet valve
/// driven by a [`LevelController`]
pub struct WaterTank {
    id: UnitId,
    feed_port: PortRef,
    command_port: PortRef,
    params: ParameterSet,
    outputs: Vec<OutputVariable>,
    step: LocalStep,
    flow_rate: f64,
    command: f64,
    level: f64,
    chart: StripChart,
    detector: SteadyStateDetector,
}

impl WaterTank {
    pub const LEVEL: &'static str = "level";

    pub fn new(id: UnitId, feed: UnitId, controller: UnitId) -> Self {
        Self {
            id,
            feed_port: feed.output(WaterFeed::FLOW_RATE),
            command_port: controller.output(LevelController::COMMAND),
            params: ParameterSet::new(),
            outputs: Vec::new(),
            step: LocalStep::single(0.0),
            flow_rate: 0.0,
            command: 0.0,
            level: 0.0,
            chart: StripChart::new("level", STRIP_POINTS, 0.0),
            detector: SteadyStateDetector::new(
                vec![
                    TrackedQuantity::new("flow_rate", Precision::Decimals(3)),
                    TrackedQuantity::new("command", Precision::Decimals(3)),
                    TrackedQuantity::new("level", Precision::Decimals(3)),
                ],
                CHECK_WINDOW,
            ),
        }
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    /// Cached (flow rate, command) from the previous tick
    pub fn cached_inputs(&self) -> (f64, f64) {
        (self.flow_rate, self.command)
    }

    fn valve_coefficient(command: f64) -> f64 {
        (MAX_VALVE_COEF * (1.0 - command)).clamp(0.0, MAX_VALVE_COEF)
    }
}

impl ProcessUnit for WaterTank {
    fn unit_id(&self) -> UnitId {
        self.id
    }

    fn name(&self) -> &str {
        "Water Tank"
    }

    fn initialize(&mut self) {
        // no external controls; inputs come from the feed and the controller
        self.outputs = vec![OutputVariable::new("Level", "m", 0.0, 2.0)];
    }

    fn parameters(&self) -> &ParameterSet {
        &self.params
    }

    fn outputs(&self) -> &[OutputVariable] {
        &self.outputs
    }

    fn input_ports(&self) -> Vec<PortRef> {
        vec![self.feed_port.clone(), self.command_port.clone()]
    }

    fn exposed_fields(&self) -> Vec<&'static str> {
        vec![Self::LEVEL]
    }

    fn exposed_value(&self, field: &str) -> Option<f64> {
        match field {
            Self::LEVEL => Some(self.level),
            _ => None,
        }
    }

    fn reset(&mut self, clock: &SimulationClock, display: &mut dyn DisplayAdapter) {
        self.update_ui_params(clock, &NoControls);
        self.flow_rate = 0.0;
        self.command = 0.0;
        self.level = 0.0;
        self.chart = StripChart::new("level", STRIP_POINTS, self.level);
        self.update_display(clock, display);
    }

    fn update_ui_params(&mut self, clock: &SimulationClock, _params: &dyn ParameterSource) {
        self.step = LocalStep::single(clock.base_time_step());
        self.detector.invalidate();
    }

    fn update_inputs(&mut self, _clock: &SimulationClock, inputs: &InputView<'_>) -> Result<(), SimError> {
        self.flow_rate = inputs.read(&self.feed_port)?;
        self.command = inputs.read(&self.command_port)?;
        Ok(())
    }

    fn update_state(&mut self, _clock: &SimulationClock) {
        let coef = Self::valve_coefficient(self.command);
        let level = self.level
            + self.step.time_step / AREA * (self.flow_rate - coef * self.level.max(0.0).sqrt());
        self.level = self.outputs[LEVEL_OUTPUT].clamp(level);
    }

    fn update_display(&mut self, clock: &SimulationClock, display: &mut dyn DisplayAdapter) {
        self.chart.push(self.level);
        display.publish(self.id, self.chart.series(clock.display_time_step()));
    }

    fn check_for_steady_state(&mut self, clock: &SimulationClock) -> bool {
        self.detector
            .check(clock.sim_time(), &[self.flow_rate, self.command, self.level])
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Parameter source with no controls, for units that only need derived constants
struct NoControls;

impl ParameterSource for NoControls {
    fn parameter_value(&self, _unit: UnitId, _name: &str) -> Option<f64> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::display::RecordingDisplay;
    use crate::core::snapshot::OutputSnapshot;
    use approx::assert_relative_eq;

    fn tank() -> (WaterTank, SimulationClock) {
        let clock = SimulationClock::new(0.1, 1).unwrap();
        let mut tank = WaterTank::new(UnitId(1), UnitId(0), UnitId(2));
        tank.initialize();
        tank.reset(&clock, &mut RecordingDisplay::new());
        (tank, clock)
    }

    #[test]
    fn test_tank_reads_declared_inputs() {
        let (mut tank, clock) = tank();
        let mut snapshot = OutputSnapshot::new();
        snapshot.insert(UnitId(0).output("flow_rate"), 2.0);
        snapshot.insert(UnitId(2).output("command"), 0.25);
        let declared = tank.input_ports();
        let view = InputView::new(UnitId(1), &declared, &snapshot);

        tank.update_inputs(&clock, &view).unwrap();
        assert_eq!(tank.cached_inputs(), (2.0, 0.25));
    }

    #[test]
    fn test_tank_fills_with_closed_valve() {
        let (mut tank, clock) = tank();
        tank.flow_rate = 2.0;
        tank.command = 1.0;
        tank.update_state(&clock);
        assert_relative_eq!(tank.level(), 0.1 / AREA * 2.0);
    }

    #[test]
    fn test_level_clamped_to_tank_height() {
        let (mut tank, clock) = tank();
        tank.flow_rate = 3.0;
        tank.command = 1.0;
        for _ in 0..1000 {
            tank.update_state(&clock);
        }
        assert_eq!(tank.level(), tank.outputs()[LEVEL_OUTPUT].max);

        tank.flow_rate = 0.0;
        tank.command = 0.0;
        for _ in 0..1000 {
            tank.update_state(&clock);
        }
        assert_eq!(tank.level(), tank.outputs()[LEVEL_OUTPUT].min);
    }

    #[test]
    fn test_valve_coefficient_bounds() {
        assert_eq!(WaterTank::valve_coefficient(-1.0), 3.0);
        assert_eq!(WaterTank::valve_coefficient(2.0), 0.0);
        assert_relative_eq!(WaterTank::valve_coefficient(1.0 / 3.0), 2.0);
    }
}
