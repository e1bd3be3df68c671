use serde::{Deserialize, Serialize};

/// Index of a process unit in a lab's fixed-order registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub usize);

impl UnitId {
    /// Get the registry index
    pub fn index(&self) -> usize {
        self.0
    }

    /// Create a handle to one of this unit's exposed output fields
    pub fn output(&self, field: &str) -> PortRef {
        PortRef {
            unit: *self,
            field: field.to_string(),
        }
    }
}

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unit{}", self.0)
    }
}

/// Handle for an exposed output field of a unit, used to declare cross-unit reads
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortRef {
    pub(crate) unit: UnitId,
    pub(crate) field: String,
}

impl PortRef {
    pub fn unit(&self) -> UnitId {
        self.unit
    }

    pub fn field(&self) -> &str {
        &self.field
    }
}

impl std::fmt::Display for PortRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.unit, self.field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_ref_display() {
        let port = UnitId(2).output("command");
        assert_eq!(port.unit(), UnitId(2));
        assert_eq!(port.field(), "command");
        assert_eq!(port.to_string(), "unit2.command");
    }
}
