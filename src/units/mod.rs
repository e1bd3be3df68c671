//! Concrete process units the labs are assembled from.

pub mod bioreactor;
pub mod heat_exchanger;
pub mod level_controller;
pub mod substrate_feed;
pub mod water_feed;
pub mod water_tank;

pub use bioreactor::Bioreactor;
pub use heat_exchanger::CoCounterHeatExchanger;
pub use level_controller::LevelController;
pub use substrate_feed::SubstrateFeed;
pub use water_feed::WaterFeed;
pub use water_tank::WaterTank;

/// Points per strip chart window; the chart itself holds one more
pub const STRIP_POINTS: usize = 250;
