use super::errors::SimError;

/// Global time base shared by every unit of a lab.
///
/// One orchestrator tick runs `step_repeats` base steps followed by a single
/// display refresh, so the display-level time step is
/// `base_time_step * step_repeats`.
#[derive(Debug, Clone)]
pub struct SimulationClock {
    base_time_step: f64,
    step_repeats: u32,
    sim_time: f64,
    ticks: u64,
}

impl SimulationClock {
    /// Create a new clock, rejecting non-positive steps and zero repeats
    pub fn new(base_time_step: f64, step_repeats: u32) -> Result<Self, SimError> {
        Self::check_base_time_step(base_time_step)?;
        if step_repeats == 0 {
            return Err(SimError::InvalidConfig(
                "step_repeats must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            base_time_step,
            step_repeats,
            sim_time: 0.0,
            ticks: 0,
        })
    }

    fn check_base_time_step(base_time_step: f64) -> Result<(), SimError> {
        if !base_time_step.is_finite() || base_time_step <= 0.0 {
            return Err(SimError::InvalidConfig(format!(
                "base_time_step must be positive, got {}",
                base_time_step
            )));
        }
        Ok(())
    }

    pub fn base_time_step(&self) -> f64 {
        self.base_time_step
    }

    pub fn step_repeats(&self) -> u32 {
        self.step_repeats
    }

    /// Simulated time between two display refreshes
    pub fn display_time_step(&self) -> f64 {
        self.base_time_step * self.step_repeats as f64
    }

    /// Simulated time since the last reset
    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    /// Completed orchestrator ticks since the last reset
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub(crate) fn set_base_time_step(&mut self, base_time_step: f64) -> Result<(), SimError> {
        Self::check_base_time_step(base_time_step)?;
        self.base_time_step = base_time_step;
        Ok(())
    }

    /// Advance simulated time by one base step
    pub(crate) fn advance(&mut self) {
        self.sim_time += self.base_time_step;
    }

    pub(crate) fn complete_tick(&mut self) {
        self.ticks += 1;
    }

    pub(crate) fn reset(&mut self) {
        self.sim_time = 0.0;
        self.ticks = 0;
    }
}

/// Unit-local subdivision of the global base step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalStep {
    pub repeats: u32,
    pub time_step: f64,
}

impl LocalStep {
    /// A single local step spanning the whole base step
    pub fn single(base_time_step: f64) -> Self {
        Self {
            repeats: 1,
            time_step: base_time_step,
        }
    }

    /// Derive the number of local sub-steps from a characteristic time.
    ///
    /// Targets `steps_per_characteristic` local steps per characteristic time,
    /// rounds `base / target` to the nearest integer and never goes below one
    /// sub-step. A characteristic time that is zero, negative or not finite
    /// (zero flow, for instance) falls back to a single sub-step.
    pub fn derive(base_time_step: f64, characteristic_time: f64, steps_per_characteristic: f64) -> Self {
        if !characteristic_time.is_finite() || characteristic_time <= 0.0 || steps_per_characteristic <= 0.0 {
            return Self::single(base_time_step);
        }
        let target = characteristic_time / steps_per_characteristic;
        let rounded = (base_time_step / target).round();
        // float -> int casts saturate, so huge ratios stay representable
        let repeats = if rounded < 1.0 { 1 } else { rounded as u32 };
        if rounded < 1.0 {
            log::debug!(
                "Derived step count {} clamped to 1 (base {} s, target {} s)",
                rounded,
                base_time_step,
                target
            );
        }
        Self {
            repeats,
            time_step: base_time_step / repeats as f64,
        }
    }
}
