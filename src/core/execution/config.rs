//! Configuration for lab execution
//!
//! This module provides the time base and concurrency settings an
//! orchestrator is built from.

use crate::core::errors::SimError;
use serde::{Deserialize, Serialize};

/// Enumeration of supported concurrency modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConcurrencyMode {
    /// Sequential execution mode - field nodes are updated in order within a single thread
    Sequential,
    /// Parallel execution mode using Rayon - interior field nodes are updated concurrently
    Rayon,
}

impl Default for ConcurrencyMode {
    fn default() -> Self {
        ConcurrencyMode::Sequential
    }
}

/// Configuration for lab execution
///
/// Holds the global time base shared by every unit of a lab, plus the
/// concurrency and pacing options of the driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Global base time step in simulated seconds (or hours, for the bioreactor lab)
    pub base_time_step: f64,
    /// Base steps taken per orchestrator tick
    pub step_repeats: u32,
    /// The concurrency mode to use for distributed units
    pub concurrency_mode: ConcurrencyMode,
    /// The size of the thread pool ticks run in
    /// Only relevant when set; None runs on the caller's thread
    pub thread_pool_size: Option<usize>,
    /// Frames between ticks once every unit reports steady state
    pub throttle_interval: u64,
}

impl SimulationConfig {
    /// Create a new configuration with default values
    ///
    /// Default configuration uses a 0.1 s base step, one repeat per tick and
    /// Sequential mode with no thread pool
    pub fn new() -> Self {
        Self {
            base_time_step: 0.1,
            step_repeats: 1,
            concurrency_mode: ConcurrencyMode::default(),
            thread_pool_size: None,
            throttle_interval: 20,
        }
    }

    pub fn with_base_time_step(mut self, base_time_step: f64) -> Self {
        self.base_time_step = base_time_step;
        self
    }

    pub fn with_step_repeats(mut self, step_repeats: u32) -> Self {
        self.step_repeats = step_repeats;
        self
    }

    /// Set the concurrency mode for the simulation
    ///
    /// # Arguments
    /// * `mode` - The concurrency mode to use
    pub fn with_concurrency(mut self, mode: ConcurrencyMode) -> Self {
        self.concurrency_mode = mode;
        self
    }

    /// Set the thread pool size for tick execution
    ///
    /// # Arguments
    /// * `size` - The number of threads to use in the thread pool
    pub fn with_thread_pool_size(mut self, size: usize) -> Self {
        self.thread_pool_size = Some(size);
        self
    }

    pub fn with_throttle_interval(mut self, frames: u64) -> Self {
        self.throttle_interval = frames;
        self
    }

    /// Reject configurations the orchestrator cannot run
    pub fn validate(&self) -> Result<(), SimError> {
        if !self.base_time_step.is_finite() || self.base_time_step <= 0.0 {
            return Err(SimError::InvalidConfig(format!(
                "base_time_step must be positive, got {}",
                self.base_time_step
            )));
        }
        if self.step_repeats == 0 {
            return Err(SimError::InvalidConfig(
                "step_repeats must be at least 1".to_string(),
            ));
        }
        if self.throttle_interval == 0 {
            return Err(SimError::InvalidConfig(
                "throttle_interval must be at least 1".to_string(),
            ));
        }
        if self.thread_pool_size == Some(0) {
            return Err(SimError::InvalidConfig(
                "thread_pool_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::new()
    }
}
