use super::display::ParameterSource;
use super::types::UnitId;
use serde::{Deserialize, Serialize};

/// Metadata and current value of one externally adjustable unit parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    pub name: String,
    /// Identifier of the bound UI control; not used by the simulation itself
    pub field_id: String,
    pub unit: String,
    pub min: f64,
    pub max: f64,
    pub default: f64,
    pub current: f64,
}

impl ParameterDescriptor {
    /// Create a descriptor whose current value starts at the default
    pub fn new(name: &str, unit: &str, min: f64, max: f64, default: f64) -> Self {
        let mut descriptor = Self {
            name: name.to_string(),
            field_id: format!("input_field_{}", name.replace(' ', "")),
            unit: unit.to_string(),
            min,
            max,
            default,
            current: default,
        };
        descriptor.current = descriptor.clamp(default);
        descriptor
    }

    /// Override the UI control identifier
    pub fn with_field_id(mut self, field_id: &str) -> Self {
        self.field_id = field_id.to_string();
        self
    }

    /// Clamp a value into [min, max]; non-finite values fall back to the default
    pub fn clamp(&self, value: f64) -> f64 {
        if !value.is_finite() {
            return self.default.clamp(self.min, self.max);
        }
        value.clamp(self.min, self.max)
    }

    /// Set the current value, returning what was actually stored
    pub fn set(&mut self, value: f64) -> f64 {
        self.current = self.clamp(value);
        self.current
    }
}

/// Ordered set of parameter descriptors owned by one unit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    descriptors: Vec<ParameterDescriptor>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self {
            descriptors: Vec::new(),
        }
    }

    /// Append a descriptor and return its index
    pub fn declare(&mut self, descriptor: ParameterDescriptor) -> usize {
        self.descriptors.push(descriptor);
        self.descriptors.len() - 1
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Current value by index
    ///
    /// Panics if the index was never declared; unit code indexes with its own
    /// constants so this is a programming error.
    pub fn value(&self, index: usize) -> f64 {
        self.descriptors[index].current
    }

    /// Current value by name
    pub fn get(&self, name: &str) -> Option<f64> {
        self.descriptor(name).map(|d| d.current)
    }

    pub fn descriptor(&self, name: &str) -> Option<&ParameterDescriptor> {
        self.descriptors.iter().find(|d| d.name == name)
    }

    /// Set a value by name, returning the clamped value stored
    pub fn set(&mut self, name: &str, value: f64) -> Option<f64> {
        self.descriptors
            .iter_mut()
            .find(|d| d.name == name)
            .map(|d| d.set(value))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParameterDescriptor> {
        self.descriptors.iter()
    }

    /// Pull every parameter from an external source, clamping as it goes.
    ///
    /// Parameters the source does not know keep their current value.
    pub fn refresh_from<S: ParameterSource + ?Sized>(&mut self, unit: UnitId, source: &S) {
        for descriptor in &mut self.descriptors {
            if let Some(value) = source.parameter_value(unit, &descriptor.name) {
                descriptor.set(value);
            }
        }
    }
}

/// Metadata of a unit output variable, including its physical bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputVariable {
    pub name: String,
    pub unit: String,
    pub min: f64,
    pub max: f64,
}

impl OutputVariable {
    pub fn new(name: &str, unit: &str, min: f64, max: f64) -> Self {
        Self {
            name: name.to_string(),
            unit: unit.to_string(),
            min,
            max,
        }
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}
