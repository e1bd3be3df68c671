use super::components::ProcessUnit;
use super::errors::SimError;
use super::types::{PortRef, UnitId};
use std::collections::HashMap;

/// Exposed unit outputs frozen at the end of a state phase.
///
/// Units read this during `update_inputs` of the following step; it is
/// replaced wholesale after every state phase and never mutated in between.
#[derive(Debug, Clone, Default)]
pub struct OutputSnapshot {
    values: HashMap<PortRef, f64>,
}

impl OutputSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture every exposed field of every unit
    pub fn capture<'a, I>(units: I) -> Self
    where
        I: IntoIterator<Item = &'a Box<dyn ProcessUnit>>,
    {
        let mut values = HashMap::new();
        for unit in units {
            let id = unit.unit_id();
            for field in unit.exposed_fields() {
                if let Some(value) = unit.exposed_value(field) {
                    values.insert(id.output(field), value);
                }
            }
        }
        Self { values }
    }

    pub fn get(&self, port: &PortRef) -> Option<f64> {
        self.values.get(port).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Insert a value directly; used to seed snapshots in tests
    pub fn insert(&mut self, port: PortRef, value: f64) {
        self.values.insert(port, value);
    }
}

/// Read-only view of the previous-tick snapshot restricted to a unit's declared inputs
pub struct InputView<'a> {
    unit: UnitId,
    declared: &'a [PortRef],
    snapshot: &'a OutputSnapshot,
}

impl<'a> InputView<'a> {
    pub fn new(unit: UnitId, declared: &'a [PortRef], snapshot: &'a OutputSnapshot) -> Self {
        Self {
            unit,
            declared,
            snapshot,
        }
    }

    /// Read a declared input from the previous tick
    pub fn read(&self, port: &PortRef) -> Result<f64, SimError> {
        if !self.declared.contains(port) {
            return Err(SimError::UndeclaredInput {
                unit: self.unit,
                port: port.clone(),
            });
        }
        self.snapshot.get(port).ok_or_else(|| SimError::MissingInput {
            unit: self.unit,
            port: port.clone(),
        })
    }

    pub fn declared(&self) -> &[PortRef] {
        self.declared
    }
}
