use crate::core::display::DisplayAdapter;
use crate::core::errors::SimError;
use crate::core::execution::orchestrator::Orchestrator;
use log::debug;

/// Observer trait for simulation events
pub trait SimulationObserver {
    /// Called after every tick the engine actually ran
    fn on_tick(&mut self, tick: u64, sim_time: f64, converged: bool);

    /// Called when global steady state is reached or lost
    fn on_convergence_change(&mut self, converged: bool, sim_time: f64);
}

/// Clock driver: calls the orchestrator once per frame and throttles once
/// every unit reports steady state.
pub struct SimulationEngine<D: DisplayAdapter> {
    orchestrator: Orchestrator<D>,
    max_frames: Option<u64>,
    throttle_interval: u64,
    frame: u64,
    observers: Vec<Box<dyn SimulationObserver>>,
}

impl<D: DisplayAdapter + Send> SimulationEngine<D> {
    pub fn new(orchestrator: Orchestrator<D>, max_frames: Option<u64>, throttle_interval: u64) -> Self {
        Self {
            orchestrator,
            max_frames,
            throttle_interval: throttle_interval.max(1),
            frame: 0,
            observers: Vec::new(),
        }
    }

    /// Add an observer to the simulation
    pub fn add_observer(&mut self, observer: Box<dyn SimulationObserver>) {
        self.observers.push(observer);
    }

    /// Run until `max_frames`, returns the final frame count
    pub fn run(&mut self) -> Result<u64, SimError> {
        while self.max_frames.map_or(true, |max| self.frame < max) {
            self.step()?;
        }
        Ok(self.frame)
    }

    /// Run full-rate ticks until global steady state or `limit` ticks.
    ///
    /// Returns the number of ticks taken, or `None` if the limit was hit first.
    pub fn run_until_converged(&mut self, limit: u64) -> Result<Option<u64>, SimError> {
        for n in 1..=limit {
            if self.tick_and_notify()? {
                return Ok(Some(n));
            }
        }
        Ok(None)
    }

    /// Process one frame, returns true if a tick ran
    pub fn step(&mut self) -> Result<bool, SimError> {
        self.frame += 1;
        if self.orchestrator.is_converged() && self.frame % self.throttle_interval != 0 {
            debug!("Frame {} skipped (converged)", self.frame);
            return Ok(false);
        }
        self.tick_and_notify()?;
        Ok(true)
    }

    fn tick_and_notify(&mut self) -> Result<bool, SimError> {
        let was_converged = self.orchestrator.is_converged();
        let converged = self.orchestrator.tick()?;
        let clock = self.orchestrator.clock();
        let (ticks, sim_time) = (clock.ticks(), clock.sim_time());

        for observer in &mut self.observers {
            observer.on_tick(ticks, sim_time, converged);
        }
        if converged != was_converged {
            for observer in &mut self.observers {
                observer.on_convergence_change(converged, sim_time);
            }
        }
        Ok(converged)
    }

    /// Reset the lab and the frame counter
    pub fn reset(&mut self) {
        self.orchestrator.reset();
        self.frame = 0;
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn orchestrator(&self) -> &Orchestrator<D> {
        &self.orchestrator
    }

    pub fn orchestrator_mut(&mut self) -> &mut Orchestrator<D> {
        &mut self.orchestrator
    }
}
