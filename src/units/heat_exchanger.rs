//! Double-pipe heat exchanger with switchable co-current / counter-current flow.
//!
//! Hot fluid always enters at node 0. Cold fluid enters at node 0 in
//! co-current mode and at node N in counter-current mode. Both temperatures
//! follow upwind advection, axial dispersion and a linear exchange term on a
//! shared [`FiniteDifferenceField`].

use crate::core::clock::{LocalStep, SimulationClock};
use crate::core::components::ProcessUnit;
use crate::core::display::{canvas_row, profile_series, DisplayAdapter, ParameterSource};
use crate::core::execution::config::ConcurrencyMode;
use crate::core::field::{FiniteDifferenceField, FlowDirection, Transport};
use crate::core::parameters::{OutputVariable, ParameterDescriptor, ParameterSet};
use crate::core::steady_state::{Precision, SteadyStateDetector, TrackedQuantity};
use crate::core::types::UnitId;
use log::debug;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::f64::consts::PI;

const TIN_HOT: usize = 0;
const TIN_COLD: usize = 1;
const FLOW_HOT: usize = 2;
const FLOW_COLD: usize = 3;
const CP_HOT: usize = 4;
const CP_COLD: usize = 5;
const U_COEF: usize = 6;
const AREA: usize = 7;
const DIAM: usize = 8;
const FLOW_MODE: usize = 9;

const HOT: usize = 0;
const COLD: usize = 1;

pub const NUM_NODES: usize = 200;
/// Fluid density, water (kg/m3)
pub const FLUID_DENSITY: f64 = 1000.0;
/// Kinematic viscosity of water near 330 K (m2/s)
pub const KINEMATIC_VISCOSITY: f64 = 5.0e-7;
/// Local steps per characteristic cell time
const STEPS_PER_CELL_TIME: f64 = 15.0;
/// Largest fraction of the explicit stability limit a sub-step may use
const STABILITY_MARGIN: f64 = 0.9;
/// Declared temperature range of inlets and profiles (K)
const T_MIN: f64 = 300.0;
const T_MAX: f64 = 370.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowMode {
    CoCurrent,
    CounterCurrent,
}

impl FlowMode {
    fn from_parameter(value: f64) -> Self {
        if value >= 0.5 {
            FlowMode::CounterCurrent
        } else {
            FlowMode::CoCurrent
        }
    }

    fn cold_direction(&self) -> FlowDirection {
        match self {
            FlowMode::CoCurrent => FlowDirection::Forward,
            FlowMode::CounterCurrent => FlowDirection::Reverse,
        }
    }
}

/// Quantities derived from parameters, recomputed only on parameter changes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedConstants {
    pub length: f64,
    pub cross_section: f64,
    pub velocity_hot: f64,
    pub velocity_cold: f64,
    pub reynolds_hot: f64,
    pub dispersion_hot: f64,
    pub dispersion_cold: f64,
    pub xfer_coef_hot: f64,
    pub xfer_coef_cold: f64,
    /// Time for the slower fluid to pass the whole length
    pub residence_time: f64,
    pub step: LocalStep,
}

impl DerivedConstants {
    fn compute(params: &ParameterSet, base_time_step: f64) -> Self {
        let diam = params.value(DIAM);
        let length = params.value(AREA) / diam / PI;
        let cross_section = PI * diam.powi(2) / 4.0;
        let velocity_hot = params.value(FLOW_HOT) / FLUID_DENSITY / cross_section;
        let velocity_cold = params.value(FLOW_COLD) / FLUID_DENSITY / cross_section;
        let reynolds_hot = reynolds(params.value(FLOW_HOT), diam);
        let dispersion_hot = dispersion(velocity_hot, reynolds_hot, diam);
        let dispersion_cold = dispersion(velocity_cold, reynolds(params.value(FLOW_COLD), diam), diam);
        let xfer = params.value(U_COEF) * PI * diam / FLUID_DENSITY / cross_section;
        let xfer_coef_hot = xfer / params.value(CP_HOT);
        let xfer_coef_cold = xfer / params.value(CP_COLD);

        let dz = length / NUM_NODES as f64;
        let mut step = LocalStep::derive(
            base_time_step,
            dz / velocity_hot.max(velocity_cold),
            STEPS_PER_CELL_TIME,
        );
        // explicit update stays stable while dt * rate <= 1
        let rate = velocity_hot.max(velocity_cold) / dz
            + 2.0 * dispersion_hot.max(dispersion_cold) / (dz * dz)
            + xfer_coef_hot.max(xfer_coef_cold);
        let stable_repeats = (base_time_step * rate / STABILITY_MARGIN).ceil();
        if stable_repeats.is_finite() && stable_repeats > step.repeats as f64 {
            debug!(
                "Sub-steps raised from {} to {} for stability",
                step.repeats, stable_repeats
            );
            let repeats = stable_repeats as u32;
            step = LocalStep {
                repeats,
                time_step: base_time_step / repeats as f64,
            };
        }

        Self {
            length,
            cross_section,
            velocity_hot,
            velocity_cold,
            reynolds_hot,
            dispersion_hot,
            dispersion_cold,
            xfer_coef_hot,
            xfer_coef_cold,
            residence_time: length / velocity_hot.min(velocity_cold),
            step,
        }
    }

    fn idle() -> Self {
        Self {
            length: 0.0,
            cross_section: 0.0,
            velocity_hot: 0.0,
            velocity_cold: 0.0,
            reynolds_hot: 0.0,
            dispersion_hot: 0.0,
            dispersion_cold: 0.0,
            xfer_coef_hot: 0.0,
            xfer_coef_cold: 0.0,
            residence_time: 0.0,
            step: LocalStep::single(0.0),
        }
    }

    pub fn node_spacing(&self) -> f64 {
        self.length / NUM_NODES as f64
    }
}

/// Tube-side Reynolds number for a mass flow (kg/s) through diameter `diam` (m)
pub fn reynolds(mass_flow: f64, diam: f64) -> f64 {
    mass_flow / FLUID_DENSITY / KINEMATIC_VISCOSITY * 4.0 / PI / diam
}

/// Axial dispersion coefficient for turbulent pipe flow (m2/s), Wen & Fan
pub fn dispersion(velocity: f64, reynolds: f64, diam: f64) -> f64 {
    velocity * diam * (3.0e7 / reynolds.powf(2.1) + 1.35 / reynolds.powf(0.125))
}

pub struct CoCounterHeatExchanger {
    id: UnitId,
    params: ParameterSet,
    outputs: Vec<OutputVariable>,
    mode: ConcurrencyMode,
    flow_mode: FlowMode,
    derived: DerivedConstants,
    transports: [Transport; 2],
    field: FiniteDifferenceField,
    detector: SteadyStateDetector,
}

impl CoCounterHeatExchanger {
    pub const HOT_OUTLET: &'static str = "hot_outlet";
    pub const COLD_OUTLET: &'static str = "cold_outlet";
    pub const HOT_INLET: &'static str = "hot_inlet";
    pub const COLD_INLET: &'static str = "cold_inlet";
    pub const REYNOLDS: &'static str = "reynolds";

    pub fn new(id: UnitId) -> Self {
        let idle = Transport {
            velocity_over_dz: 0.0,
            dispersion_over_dz2: 0.0,
            exchange_coef: 0.0,
            exchange_partner: None,
            direction: FlowDirection::Forward,
            inlet_value: T_MIN,
            bounds: (f64::NEG_INFINITY, f64::INFINITY),
        };
        Self {
            id,
            params: ParameterSet::new(),
            outputs: Vec::new(),
            mode: ConcurrencyMode::Sequential,
            flow_mode: FlowMode::CounterCurrent,
            derived: DerivedConstants::idle(),
            transports: [idle, idle],
            field: FiniteDifferenceField::new(&["Thot", "Tcold"], NUM_NODES, T_MIN),
            detector: SteadyStateDetector::new(
                vec![
                    TrackedQuantity::new("Thot[N]", Precision::Decimals(1)),
                    TrackedQuantity::new("Thot[0]", Precision::Decimals(1)),
                    TrackedQuantity::new("Tcold[N]", Precision::Decimals(1)),
                    TrackedQuantity::new("Tcold[0]", Precision::Decimals(1)),
                ],
                0.0,
            ),
        }
    }

    /// Update interior nodes with rayon when `mode` is [`ConcurrencyMode::Rayon`]
    pub fn with_concurrency(mut self, mode: ConcurrencyMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn flow_mode(&self) -> FlowMode {
        self.flow_mode
    }

    pub fn derived(&self) -> &DerivedConstants {
        &self.derived
    }

    pub fn hot_temperatures(&self) -> &[f64] {
        self.field.values(HOT)
    }

    pub fn cold_temperatures(&self) -> &[f64] {
        self.field.values(COLD)
    }

    pub fn hot_outlet(&self) -> f64 {
        self.field.value(HOT, NUM_NODES)
    }

    pub fn cold_outlet(&self) -> f64 {
        let node = self.flow_mode.cold_direction().outlet_node(NUM_NODES);
        self.field.value(COLD, node)
    }

    pub fn cold_inlet(&self) -> f64 {
        let node = self.flow_mode.cold_direction().inlet_node(NUM_NODES);
        self.field.value(COLD, node)
    }

    fn apply_params<S: ParameterSource + ?Sized>(&mut self, clock: &SimulationClock, source: &S) {
        self.params.refresh_from(self.id, source);
        self.flow_mode = FlowMode::from_parameter(self.params.value(FLOW_MODE));
        self.derived = DerivedConstants::compute(&self.params, clock.base_time_step());

        let dz = self.derived.node_spacing();
        self.transports[HOT] = Transport {
            velocity_over_dz: self.derived.velocity_hot / dz,
            dispersion_over_dz2: self.derived.dispersion_hot / (dz * dz),
            exchange_coef: self.derived.xfer_coef_hot,
            exchange_partner: Some(COLD),
            direction: FlowDirection::Forward,
            inlet_value: self.params.value(TIN_HOT),
            bounds: self.output_bounds(HOT),
        };
        self.transports[COLD] = Transport {
            velocity_over_dz: self.derived.velocity_cold / dz,
            dispersion_over_dz2: self.derived.dispersion_cold / (dz * dz),
            exchange_coef: self.derived.xfer_coef_cold,
            exchange_partner: Some(HOT),
            direction: self.flow_mode.cold_direction(),
            inlet_value: self.params.value(TIN_COLD),
            bounds: self.output_bounds(COLD),
        };

        self.detector.set_window(self.derived.residence_time);
        self.detector.invalidate();
        debug!(
            "[HeatExchanger {}] {:?}, L = {:.2} m, Re = {:.0}, {} sub-steps of {:.4} s",
            self.id,
            self.flow_mode,
            self.derived.length,
            self.derived.reynolds_hot,
            self.derived.step.repeats,
            self.derived.step.time_step
        );
    }

    /// Node bounds of one stream, as declared for its profile output
    fn output_bounds(&self, stream: usize) -> (f64, f64) {
        let declared = &self.outputs[stream];
        (declared.min, declared.max)
    }

    fn end_temperatures(&self) -> [f64; 4] {
        [
            self.field.value(HOT, NUM_NODES),
            self.field.value(HOT, 0),
            self.field.value(COLD, NUM_NODES),
            self.field.value(COLD, 0),
        ]
    }
}

impl ProcessUnit for CoCounterHeatExchanger {
    fn unit_id(&self) -> UnitId {
        self.id
    }

    fn name(&self) -> &str {
        "Heat Exchanger"
    }

    fn initialize(&mut self) {
        let mut params = ParameterSet::new();
        params.declare(ParameterDescriptor::new("TinHot", "K", T_MIN, T_MAX, 360.0));
        params.declare(ParameterDescriptor::new("TinCold", "K", T_MIN, T_MAX, 310.0));
        params.declare(ParameterDescriptor::new("FlowHot", "kg/s", 0.15, 4.0, 0.5));
        params.declare(ParameterDescriptor::new("FlowCold", "kg/s", 0.15, 4.0, 0.75));
        params.declare(ParameterDescriptor::new("CpHot", "kJ/kg/K", 1.0, 10.0, 4.2));
        params.declare(ParameterDescriptor::new("CpCold", "kJ/kg/K", 1.0, 10.0, 4.2));
        params.declare(ParameterDescriptor::new("Ucoef", "kW/m2/K", 0.0, 10.0, 0.6));
        params.declare(ParameterDescriptor::new("Area", "m2", 1.0, 10.0, 4.0));
        params.declare(ParameterDescriptor::new("Diam", "m", 0.02, 0.2, 0.15));
        params.declare(
            ParameterDescriptor::new("Flow Mode", "", 0.0, 1.0, 1.0).with_field_id("radio_Model"),
        );
        self.params = params;
        self.outputs = vec![
            OutputVariable::new("Thot", "K", T_MIN, T_MAX),
            OutputVariable::new("Tcold", "K", T_MIN, T_MAX),
        ];
    }

    fn parameters(&self) -> &ParameterSet {
        &self.params
    }

    fn outputs(&self) -> &[OutputVariable] {
        &self.outputs
    }

    fn exposed_fields(&self) -> Vec<&'static str> {
        vec![
            Self::HOT_OUTLET,
            Self::COLD_OUTLET,
            Self::HOT_INLET,
            Self::COLD_INLET,
            Self::REYNOLDS,
        ]
    }

    fn exposed_value(&self, field: &str) -> Option<f64> {
        match field {
            Self::HOT_OUTLET => Some(self.hot_outlet()),
            Self::COLD_OUTLET => Some(self.cold_outlet()),
            Self::HOT_INLET => Some(self.field.value(HOT, 0)),
            Self::COLD_INLET => Some(self.cold_inlet()),
            Self::REYNOLDS => Some(self.derived.reynolds_hot),
            _ => None,
        }
    }

    fn reset(&mut self, clock: &SimulationClock, display: &mut dyn DisplayAdapter) {
        self.apply_params(clock, &*display);
        // whole exchanger starts full of cold-inlet fluid
        self.field.reset(self.params.value(TIN_COLD));
        self.update_display(clock, display);
    }

    fn update_ui_params(&mut self, clock: &SimulationClock, params: &dyn ParameterSource) {
        self.apply_params(clock, params);
    }

    fn update_state(&mut self, _clock: &SimulationClock) {
        let step = self.derived.step;
        for _ in 0..step.repeats {
            self.field.step(&self.transports, step.time_step, self.mode);
        }
    }

    fn update_display(&mut self, _clock: &SimulationClock, display: &mut dyn DisplayAdapter) {
        for stream in [HOT, COLD] {
            let label = self.field.label(stream);
            let values = self.field.values(stream);
            display.publish(self.id, profile_series(label, values));
        }
        for stream in [HOT, COLD] {
            let label = format!("{} canvas", self.field.label(stream));
            let (min, max) = self.output_bounds(stream);
            display.publish(self.id, canvas_row(&label, self.field.values(stream), min, max));
        }
    }

    fn check_for_steady_state(&mut self, clock: &SimulationClock) -> bool {
        let ends = self.end_temperatures();
        self.detector.check(clock.sim_time(), &ends)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
