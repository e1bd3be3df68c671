pub mod config;
pub mod orchestrator;
pub mod simulation_engine;

// Re-export commonly used types
pub use config::{ConcurrencyMode, SimulationConfig};
pub use orchestrator::Orchestrator;
pub use simulation_engine::{SimulationEngine, SimulationObserver};
