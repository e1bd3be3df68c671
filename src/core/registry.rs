use crate::core::components::ProcessUnit;
use crate::core::errors::SimError;
use crate::core::types::UnitId;

/// Fixed-order registry of the units that make up one lab
pub struct UnitRegistry {
    units: Vec<Box<dyn ProcessUnit>>,
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self { units: Vec::new() }
    }

    /// Register a unit; its id must equal its position in the registry
    pub fn register(&mut self, unit: Box<dyn ProcessUnit>) -> Result<UnitId, SimError> {
        let id = unit.unit_id();
        if id.index() != self.units.len() {
            return Err(SimError::UnitIndexMismatch {
                expected: self.units.len(),
                found: id,
            });
        }
        self.units.push(unit);
        Ok(id)
    }

    pub fn get(&self, id: UnitId) -> Option<&dyn ProcessUnit> {
        self.units.get(id.index()).map(|u| u.as_ref())
    }

    pub fn get_mut(&mut self, id: UnitId) -> Option<&mut Box<dyn ProcessUnit>> {
        self.units.get_mut(id.index())
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Box<dyn ProcessUnit>> {
        self.units.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Box<dyn ProcessUnit>> {
        self.units.iter_mut()
    }
}

impl Default for UnitRegistry {
    fn default() -> Self {
        Self::new()
    }
}
