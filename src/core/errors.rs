use super::types::{PortRef, UnitId};

/// Errors raised while wiring or running a lab
#[derive(Debug, Clone, PartialEq)]
pub enum SimError {
    /// A unit id that is not present in the registry
    UnknownUnit(UnitId),
    /// A declared input names a field the source unit does not expose
    UnknownOutput { port: PortRef, available: Vec<String> },
    /// A unit was registered out of its fixed index position
    UnitIndexMismatch { expected: usize, found: UnitId },
    /// A unit tried to read a port it never declared
    UndeclaredInput { unit: UnitId, port: PortRef },
    /// A declared port had no value in the previous-tick snapshot
    MissingInput { unit: UnitId, port: PortRef },
    /// Simulation configuration rejected by validation
    InvalidConfig(String),
    /// The orchestrator stopped after a failed tick and needs a reset
    Halted,
}

impl std::fmt::Display for SimError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimError::UnknownUnit(id) => write!(f, "Unit '{}' not found in registry", id),
            SimError::UnknownOutput { port, available } => write!(
                f,
                "Output '{}' not exposed by '{}'. Valid outputs: {:?}",
                port.field(),
                port.unit(),
                available
            ),
            SimError::UnitIndexMismatch { expected, found } => write!(
                f,
                "Unit '{}' registered at position {}; units must be added in index order",
                found, expected
            ),
            SimError::UndeclaredInput { unit, port } => write!(
                f,
                "Unit '{}' read undeclared input '{}'",
                unit, port
            ),
            SimError::MissingInput { unit, port } => write!(
                f,
                "Input '{}' of unit '{}' missing from previous-tick snapshot",
                port, unit
            ),
            SimError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            SimError::Halted => write!(f, "Orchestrator halted; reset the lab to continue"),
        }
    }
}

impl std::error::Error for SimError {}
