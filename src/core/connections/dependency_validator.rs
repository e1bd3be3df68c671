use crate::core::errors::SimError;
use crate::core::registry::UnitRegistry;
use crate::core::types::PortRef;

/// Wiring-time validation of declared cross-unit reads
pub struct DependencyValidator;

impl DependencyValidator {
    /// Validate every unit's declared inputs against the registry.
    ///
    /// Returns the declared ports per unit, in registry order.
    pub fn validate(registry: &UnitRegistry) -> Result<Vec<Vec<PortRef>>, SimError> {
        let mut declared = Vec::with_capacity(registry.len());
        for unit in registry.iter() {
            let ports = unit.input_ports();
            for port in &ports {
                Self::validate_source_port(registry, port)?;
            }
            declared.push(ports);
        }
        Ok(declared)
    }

    /// Validate that the source unit exists and exposes the field
    pub fn validate_source_port(registry: &UnitRegistry, port: &PortRef) -> Result<(), SimError> {
        let source = registry
            .get(port.unit())
            .ok_or(SimError::UnknownUnit(port.unit()))?;

        let exposed = source.exposed_fields();
        if !exposed.contains(&port.field()) {
            return Err(SimError::UnknownOutput {
                port: port.clone(),
                available: exposed.iter().map(|f| f.to_string()).collect(),
            });
        }
        Ok(())
    }
}
