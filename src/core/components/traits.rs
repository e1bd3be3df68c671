use crate::core::clock::SimulationClock;
use crate::core::display::{DisplayAdapter, ParameterSource};
use crate::core::errors::SimError;
use crate::core::parameters::{OutputVariable, ParameterSet};
use crate::core::snapshot::InputView;
use crate::core::types::{PortRef, UnitId};
use std::any::Any;

/// Lifecycle every simulated process unit implements.
///
/// Per tick the orchestrator calls `update_inputs` on every unit, then
/// `update_state` on every unit (both repeated `step_repeats` times), then
/// `update_display`, then `check_for_steady_state`.
pub trait ProcessUnit: Send {
    /// Position of this unit in the lab registry
    fn unit_id(&self) -> UnitId;

    fn name(&self) -> &str;

    /// Declare parameter and output metadata. Called once, before any reset.
    fn initialize(&mut self);

    fn parameters(&self) -> &ParameterSet;

    fn outputs(&self) -> &[OutputVariable];

    /// Ports of other units this unit reads in `update_inputs`
    fn input_ports(&self) -> Vec<PortRef> {
        Vec::new()
    }

    /// Fields other units may read from this one
    fn exposed_fields(&self) -> Vec<&'static str> {
        Vec::new()
    }

    fn exposed_value(&self, _field: &str) -> Option<f64> {
        None
    }

    /// Pull parameters, rebuild all state from defaults and push a first display update
    fn reset(&mut self, clock: &SimulationClock, display: &mut dyn DisplayAdapter);

    /// Pull external parameter values, recompute derived constants and
    /// invalidate steady-state status
    fn update_ui_params(&mut self, clock: &SimulationClock, params: &dyn ParameterSource);

    /// Cache other units' previous-tick outputs
    fn update_inputs(&mut self, _clock: &SimulationClock, _inputs: &InputView<'_>) -> Result<(), SimError> {
        Ok(())
    }

    /// Advance state by one base step using only cached inputs and own state
    fn update_state(&mut self, clock: &SimulationClock);

    /// Project state into display series; physics state is left untouched
    fn update_display(&mut self, clock: &SimulationClock, display: &mut dyn DisplayAdapter);

    fn check_for_steady_state(&mut self, clock: &SimulationClock) -> bool;

    /// Returns a reference to the unit as Any for downcasting
    fn as_any(&self) -> &dyn Any;
}

/// Helper function to safely downcast a unit to its concrete type
pub fn downcast_unit<T: ProcessUnit + 'static>(unit: &dyn ProcessUnit) -> Result<&T, String> {
    unit.as_any().downcast_ref::<T>().ok_or_else(|| {
        format!(
            "Cannot downcast unit '{}' to {}",
            unit.unit_id(),
            std::any::type_name::<T>()
        )
    })
}
