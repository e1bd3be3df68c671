use crate::core::clock::{LocalStep, SimulationClock};
use crate::core::components::ProcessUnit;
use crate::core::display::{DisplayAdapter, ParameterSource, StripChart};
use crate::core::errors::SimError;
use crate::core::parameters::{OutputVariable, ParameterDescriptor, ParameterSet};
use crate::core::snapshot::InputView;
use crate::core::steady_state::{Precision, SteadyStateDetector, TrackedQuantity};
use crate::core::types::{PortRef, UnitId};
use crate::units::{WaterTank, STRIP_POINTS};
use log::debug;
use std::any::Any;

const SETPOINT: usize = 0;
const GAIN: usize = 1;
const RESET_TIME: usize = 2;

const CHECK_WINDOW: f64 = 10.0;

/// PI level controller driving the tank's outlet valve.
///
/// Raising the command closes the normally open valve, so the controller acts
/// directly on `setpoint - level`. Integration is suspended while the command
/// is saturated in the direction the error pushes it.
pub struct LevelController {
    id: UnitId,
    level_port: PortRef,
    params: ParameterSet,
    outputs: Vec<OutputVariable>,
    step: LocalStep,
    level: f64,
    integral: f64,
    command: f64,
    chart: StripChart,
    detector: SteadyStateDetector,
}

impl LevelController {
    pub const COMMAND: &'static str = "command";

    pub fn new(id: UnitId, tank: UnitId) -> Self {
        Self {
            id,
            level_port: tank.output(WaterTank::LEVEL),
            params: ParameterSet::new(),
            outputs: Vec::new(),
            step: LocalStep::single(0.0),
            level: 0.0,
            integral: 0.0,
            command: 0.0,
            chart: StripChart::new("command", STRIP_POINTS, 0.0),
            detector: SteadyStateDetector::new(
                vec![
                    TrackedQuantity::new("level", Precision::Decimals(3)),
                    TrackedQuantity::new("command", Precision::Decimals(3)),
                ],
                CHECK_WINDOW,
            ),
        }
    }

    pub fn command(&self) -> f64 {
        self.command
    }

    pub fn setpoint(&self) -> f64 {
        self.params.value(SETPOINT)
    }

    fn apply_params<S: ParameterSource + ?Sized>(&mut self, clock: &SimulationClock, source: &S) {
        self.params.refresh_from(self.id, source);
        self.step = LocalStep::single(clock.base_time_step());
        self.detector.invalidate();
        debug!(
            "[LevelController {}] Setpoint {} m, gain {}, reset time {} s",
            self.id,
            self.params.value(SETPOINT),
            self.params.value(GAIN),
            self.params.value(RESET_TIME)
        );
    }
}

impl ProcessUnit for LevelController {
    fn unit_id(&self) -> UnitId {
        self.id
    }

    fn name(&self) -> &str {
        "Level Controller"
    }

    fn initialize(&mut self) {
        self.params = ParameterSet::new();
        self.params.declare(ParameterDescriptor::new("Setpoint", "m", 0.0, 2.0, 1.0));
        self.params.declare(ParameterDescriptor::new("Gain", "1/m", 0.0, 5.0, 0.5));
        self.params.declare(ParameterDescriptor::new("Reset Time", "s", 1.0, 1000.0, 20.0));
        self.outputs = vec![OutputVariable::new("Command", "", 0.0, 1.0)];
    }

    fn parameters(&self) -> &ParameterSet {
        &self.params
    }

    fn outputs(&self) -> &[OutputVariable] {
        &self.outputs
    }

    fn input_ports(&self) -> Vec<PortRef> {
        vec![self.level_port.clone()]
    }

    fn exposed_fields(&self) -> Vec<&'static str> {
        vec![Self::COMMAND]
    }

    fn exposed_value(&self, field: &str) -> Option<f64> {
        match field {
            Self::COMMAND => Some(self.command),
            _ => None,
        }
    }

    fn reset(&mut self, clock: &SimulationClock, display: &mut dyn DisplayAdapter) {
        self.apply_params(clock, &*display);
        self.level = 0.0;
        self.integral = 0.0;
        self.command = 0.0;
        self.chart = StripChart::new("command", STRIP_POINTS, self.command);
        self.update_display(clock, display);
    }

    fn update_ui_params(&mut self, clock: &SimulationClock, params: &dyn ParameterSource) {
        self.apply_params(clock, params);
    }

    fn update_inputs(&mut self, _clock: &SimulationClock, inputs: &InputView<'_>) -> Result<(), SimError> {
        self.level = inputs.read(&self.level_port)?;
        Ok(())
    }

    fn update_state(&mut self, _clock: &SimulationClock) {
        let gain = self.params.value(GAIN);
        let reset_time = self.params.value(RESET_TIME);
        let error = self.params.value(SETPOINT) - self.level;

        let candidate = self.integral + self.step.time_step * error / reset_time;
        let raw = gain * (error + candidate);
        let winding_up = (raw > 1.0 && error > 0.0) || (raw < 0.0 && error < 0.0);
        if !winding_up {
            self.integral = candidate;
        }
        self.command = (gain * (error + self.integral)).clamp(0.0, 1.0);
    }

    fn update_display(&mut self, clock: &SimulationClock, display: &mut dyn DisplayAdapter) {
        self.chart.push(self.command);
        display.publish(self.id, self.chart.series(clock.display_time_step()));
    }

    fn check_for_steady_state(&mut self, clock: &SimulationClock) -> bool {
        self.detector.check(clock.sim_time(), &[self.level, self.command])
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::display::RecordingDisplay;
    use approx::assert_relative_eq;

    fn controller() -> (LevelController, SimulationClock) {
        let clock = SimulationClock::new(0.1, 1).unwrap();
        let mut controller = LevelController::new(UnitId(2), UnitId(1));
        controller.initialize();
        controller.reset(&clock, &mut RecordingDisplay::new());
        (controller, clock)
    }

    #[test]
    fn test_command_saturates_when_level_low() {
        let (mut controller, clock) = controller();
        controller.params.set("Gain", 5.0);
        controller.level = 0.0;
        controller.update_state(&clock);
        assert_eq!(controller.command(), 1.0);
    }

    #[test]
    fn test_integral_does_not_wind_up() {
        let (mut controller, clock) = controller();
        controller.level = 0.0;
        for _ in 0..10_000 {
            controller.update_state(&clock);
        }
        // error 1 m, gain 0.5: integral stops once the command reaches 1
        assert!(controller.integral <= 1.0 / 0.5, "integral {}", controller.integral);

        controller.level = 1.5;
        controller.update_state(&clock);
        assert!(controller.command() < 1.0, "command should leave saturation immediately");
    }

    #[test]
    fn test_proportional_action_at_setpoint_offset() {
        let (mut controller, clock) = controller();
        controller.level = 0.8;
        controller.update_state(&clock);
        // 0.5 * (0.2 + 0.1 * 0.2 / 20)
        assert_relative_eq!(controller.command(), 0.5 * (0.2 + 0.001), epsilon = 1e-12);
    }

    #[test]
    fn test_parameters_are_clamped() {
        let (mut controller, clock) = controller();
        let mut display = RecordingDisplay::new();
        display.set_parameter(UnitId(2), "Setpoint", 5.0);
        display.set_parameter(UnitId(2), "Reset Time", 0.0);
        controller.update_ui_params(&clock, &display);
        assert_eq!(controller.setpoint(), 2.0);
        assert_eq!(controller.parameters().get("Reset Time"), Some(1.0));
    }
}
