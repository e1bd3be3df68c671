pub mod core;
pub mod labs;
pub mod units;

// Re-export commonly used types
pub use crate::core::builder::LabBuilder;
pub use crate::core::clock::{LocalStep, SimulationClock};
pub use crate::core::components::ProcessUnit;
pub use crate::core::display::{DisplayAdapter, ParameterSource, RecordingDisplay, Series};
pub use crate::core::errors::SimError;
pub use crate::core::execution::{
    ConcurrencyMode, Orchestrator, SimulationConfig, SimulationEngine, SimulationObserver,
};
pub use crate::core::types::{PortRef, UnitId};
pub use crate::labs::LabKind;
