use crate::core::components::ProcessUnit;
use crate::core::display::DisplayAdapter;
use crate::core::errors::SimError;
use crate::core::execution::config::SimulationConfig;
use crate::core::execution::orchestrator::Orchestrator;
use crate::core::registry::UnitRegistry;
use crate::core::types::UnitId;

/// Imperative API for assembling a lab from process units
///
/// Units are added in fixed index order; the id a unit reports must match
/// the position it is added at.
pub struct LabBuilder {
    config: SimulationConfig,
    registry: UnitRegistry,
}

impl LabBuilder {
    /// Create a new builder for the given configuration
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            registry: UnitRegistry::new(),
        }
    }

    /// Add a unit at the next registry position
    pub fn add_unit(&mut self, unit: Box<dyn ProcessUnit>) -> Result<UnitId, SimError> {
        self.registry.register(unit)
    }

    /// Chaining form of [`LabBuilder::add_unit`]
    pub fn with_unit(mut self, unit: Box<dyn ProcessUnit>) -> Result<Self, SimError> {
        self.add_unit(unit)?;
        Ok(self)
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn unit_count(&self) -> usize {
        self.registry.len()
    }

    /// Validate wiring and configuration and build the orchestrator
    pub fn build<D: DisplayAdapter + Send>(self, display: D) -> Result<Orchestrator<D>, SimError> {
        Orchestrator::new(self.registry, &self.config, display)
    }
}
