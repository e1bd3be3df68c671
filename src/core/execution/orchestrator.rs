use crate::core::clock::SimulationClock;
use crate::core::components::ProcessUnit;
use crate::core::connections::DependencyValidator;
use crate::core::display::DisplayAdapter;
use crate::core::errors::SimError;
use crate::core::execution::config::SimulationConfig;
use crate::core::registry::UnitRegistry;
use crate::core::snapshot::{InputView, OutputSnapshot};
use crate::core::types::{PortRef, UnitId};
use log::{debug, error, info};
use uuid::Uuid;

/// Drives the fixed four-phase tick over an ordered unit registry.
///
/// Each tick runs `step_repeats` rounds of `update_inputs` on every unit
/// followed by `update_state` on every unit, then one `update_display` pass
/// and finally steady-state aggregation. A unit only ever sees other units'
/// outputs through the snapshot captured at the end of the previous round.
pub struct Orchestrator<D: DisplayAdapter> {
    registry: UnitRegistry,
    /// Declared input ports per unit, in registry order
    declared: Vec<Vec<PortRef>>,
    clock: SimulationClock,
    display: D,
    snapshot: OutputSnapshot,
    system_converged: bool,
    halted: bool,
    run_id: Uuid,
    pool: Option<rayon::ThreadPool>,
}

impl<D: DisplayAdapter + Send> Orchestrator<D> {
    /// Validate the wiring, initialize every unit once and reset the lab
    pub fn new(
        mut registry: UnitRegistry,
        config: &SimulationConfig,
        display: D,
    ) -> Result<Self, SimError> {
        config.validate()?;
        let clock = SimulationClock::new(config.base_time_step, config.step_repeats)?;

        for unit in registry.iter_mut() {
            unit.initialize();
        }
        let declared = DependencyValidator::validate(&registry)?;

        let pool = match config.thread_pool_size {
            Some(threads) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|e| SimError::InvalidConfig(format!("thread pool: {}", e)))?,
            ),
            None => None,
        };

        let mut orchestrator = Self {
            registry,
            declared,
            clock,
            display,
            snapshot: OutputSnapshot::new(),
            system_converged: false,
            halted: false,
            run_id: Uuid::nil(),
            pool,
        };
        orchestrator.reset();

        info!(
            "[Orchestrator {}] Lab built with {} units",
            orchestrator.run_id,
            orchestrator.registry.len()
        );
        Ok(orchestrator)
    }

    /// Return every unit to its default state; safe between any two ticks
    pub fn reset(&mut self) {
        self.clock.reset();
        self.run_id = Uuid::new_v4();
        self.halted = false;
        self.system_converged = false;

        for unit in self.registry.iter_mut() {
            unit.reset(&self.clock, &mut self.display);
        }
        self.snapshot = OutputSnapshot::capture(self.registry.iter());
        info!("[Orchestrator {}] Reset {} units", self.run_id, self.registry.len());
    }

    /// Run one tick and return whether every unit reports steady state
    pub fn tick(&mut self) -> Result<bool, SimError> {
        if self.halted {
            return Err(SimError::Halted);
        }
        match self.pool.take() {
            Some(pool) => {
                let result = pool.install(|| self.run_tick());
                self.pool = Some(pool);
                result
            }
            None => self.run_tick(),
        }
    }

    fn run_tick(&mut self) -> Result<bool, SimError> {
        for _ in 0..self.clock.step_repeats() {
            for (index, unit) in self.registry.iter_mut().enumerate() {
                let view = InputView::new(unit.unit_id(), &self.declared[index], &self.snapshot);
                if let Err(e) = unit.update_inputs(&self.clock, &view) {
                    self.halted = true;
                    error!("[Orchestrator {}] Halting: {}", self.run_id, e);
                    return Err(e);
                }
            }
            for unit in self.registry.iter_mut() {
                unit.update_state(&self.clock);
            }
            self.snapshot = OutputSnapshot::capture(self.registry.iter());
            self.clock.advance();
        }

        for unit in self.registry.iter_mut() {
            unit.update_display(&self.clock, &mut self.display);
        }

        // every unit is checked so each detector keeps its own window current
        let mut all_converged = true;
        for unit in self.registry.iter_mut() {
            let converged = unit.check_for_steady_state(&self.clock);
            all_converged &= converged;
        }
        self.clock.complete_tick();

        if all_converged != self.system_converged {
            info!(
                "[Orchestrator {}] System {} at t = {:.3}",
                self.run_id,
                if all_converged { "converged" } else { "active" },
                self.clock.sim_time()
            );
        }
        self.system_converged = all_converged;
        Ok(all_converged)
    }

    /// Forward an external parameter change to one unit
    pub fn notify_parameter_changed(&mut self, id: UnitId) -> Result<(), SimError> {
        let unit = self.registry.get_mut(id).ok_or(SimError::UnknownUnit(id))?;
        unit.update_ui_params(&self.clock, &self.display);
        self.system_converged = false;
        debug!("[Orchestrator {}] Parameters changed on {}", self.run_id, id);
        Ok(())
    }

    /// Re-read parameters on every unit
    pub fn refresh_all_parameters(&mut self) {
        for unit in self.registry.iter_mut() {
            unit.update_ui_params(&self.clock, &self.display);
        }
        self.system_converged = false;
    }

    /// Change the global base step; units re-derive their local steps
    pub fn set_base_time_step(&mut self, base_time_step: f64) -> Result<(), SimError> {
        self.clock.set_base_time_step(base_time_step)?;
        self.refresh_all_parameters();
        debug!(
            "[Orchestrator {}] Base time step set to {}",
            self.run_id, base_time_step
        );
        Ok(())
    }
}

impl<D: DisplayAdapter> Orchestrator<D> {
    pub fn is_converged(&self) -> bool {
        self.system_converged
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    /// Mutable access to the adapter, e.g. to change parameter values
    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    pub fn unit(&self, id: UnitId) -> Option<&dyn ProcessUnit> {
        self.registry.get(id)
    }

    pub fn unit_count(&self) -> usize {
        self.registry.len()
    }

    /// Outputs captured at the end of the last completed state phase
    pub fn snapshot(&self) -> &OutputSnapshot {
        &self.snapshot
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }
}
