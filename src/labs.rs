//! Ready-made labs: unit sets in their fixed registry order plus a default time base.

use crate::core::builder::LabBuilder;
use crate::core::errors::SimError;
use crate::core::execution::config::SimulationConfig;
use crate::core::types::UnitId;
use crate::units::{
    Bioreactor, CoCounterHeatExchanger, LevelController, SubstrateFeed, WaterFeed, WaterTank,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabKind {
    WaterTank,
    HeatExchanger,
    Bioreactor,
}

impl LabKind {
    pub const ALL: [LabKind; 3] = [LabKind::WaterTank, LabKind::HeatExchanger, LabKind::Bioreactor];

    /// Time base the lab was tuned for
    pub fn default_config(&self) -> SimulationConfig {
        match self {
            LabKind::WaterTank => SimulationConfig::new()
                .with_base_time_step(0.1)
                .with_step_repeats(10),
            LabKind::HeatExchanger => SimulationConfig::new()
                .with_base_time_step(1.0)
                .with_step_repeats(2),
            // hours
            LabKind::Bioreactor => SimulationConfig::new()
                .with_base_time_step(0.05)
                .with_step_repeats(2),
        }
    }

    /// Builder holding this lab's units for `config`
    pub fn builder(&self, config: SimulationConfig) -> Result<LabBuilder, SimError> {
        match self {
            LabKind::WaterTank => water_tank_lab(config),
            LabKind::HeatExchanger => heat_exchanger_lab(config),
            LabKind::Bioreactor => bioreactor_lab(config),
        }
    }
}

impl fmt::Display for LabKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LabKind::WaterTank => "water-tank",
            LabKind::HeatExchanger => "heat-exchanger",
            LabKind::Bioreactor => "bioreactor",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for LabKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "water-tank" | "tank" => Ok(LabKind::WaterTank),
            "heat-exchanger" | "hx" => Ok(LabKind::HeatExchanger),
            "bioreactor" => Ok(LabKind::Bioreactor),
            other => Err(format!(
                "Unknown lab '{}'. Valid labs: water-tank, heat-exchanger, bioreactor",
                other
            )),
        }
    }
}

/// Feed (0) -> tank (1) <-> level controller (2)
pub fn water_tank_lab(config: SimulationConfig) -> Result<LabBuilder, SimError> {
    let (feed, tank, controller) = (UnitId(0), UnitId(1), UnitId(2));
    LabBuilder::new(config)
        .with_unit(Box::new(WaterFeed::new(feed)))?
        .with_unit(Box::new(WaterTank::new(tank, feed, controller)))?
        .with_unit(Box::new(LevelController::new(controller, tank)))
}

/// Single co-/counter-current heat exchanger (0)
pub fn heat_exchanger_lab(config: SimulationConfig) -> Result<LabBuilder, SimError> {
    let mode = config.concurrency_mode;
    LabBuilder::new(config)
        .with_unit(Box::new(CoCounterHeatExchanger::new(UnitId(0)).with_concurrency(mode)))
}

/// Substrate feed (0) -> bioreactor (1)
pub fn bioreactor_lab(config: SimulationConfig) -> Result<LabBuilder, SimError> {
    let (feed, reactor) = (UnitId(0), UnitId(1));
    LabBuilder::new(config)
        .with_unit(Box::new(SubstrateFeed::new(feed)))?
        .with_unit(Box::new(Bioreactor::new(reactor, feed)))
}
