//! Boundary between the simulation core and whatever renders it.
//!
//! Units push display-ready series through a [`DisplayAdapter`] and read
//! externally set parameter values through its [`ParameterSource`] half.

use super::types::UnitId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Source of externally set parameter values
pub trait ParameterSource {
    /// Current value for a unit parameter, or `None` when no control exists
    fn parameter_value(&self, unit: UnitId, name: &str) -> Option<f64>;
}

/// Consumer of display series produced by units
pub trait DisplayAdapter: ParameterSource {
    fn publish(&mut self, unit: UnitId, series: Series);
}

/// Value vs. spatial position snapshot, one point per node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSeries {
    pub label: String,
    pub points: Vec<(f64, f64)>,
}

/// Value vs. time scrolling window, oldest point first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StripSeries {
    pub label: String,
    pub points: Vec<(f64, f64)>,
}

/// 2-D grid of values with the range used for color mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasSeries {
    pub label: String,
    /// Indexed as `grid[x][y]`
    pub grid: Vec<Vec<f64>>,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Series {
    Profile(ProfileSeries),
    Strip(StripSeries),
    Canvas(CanvasSeries),
}

impl Series {
    pub fn label(&self) -> &str {
        match self {
            Series::Profile(s) => &s.label,
            Series::Strip(s) => &s.label,
            Series::Canvas(s) => &s.label,
        }
    }

    pub fn as_profile(&self) -> Option<&ProfileSeries> {
        match self {
            Series::Profile(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_strip(&self) -> Option<&StripSeries> {
        match self {
            Series::Strip(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_canvas(&self) -> Option<&CanvasSeries> {
        match self {
            Series::Canvas(s) => Some(s),
            _ => None,
        }
    }
}

/// Fixed-capacity strip chart buffer with drop-oldest, append-newest semantics.
///
/// Holds `number_points + 1` values. The time axis is not stored; it is
/// recomputed on every projection as `p * display_time_step`.
#[derive(Debug, Clone)]
pub struct StripChart {
    label: String,
    capacity: usize,
    values: VecDeque<f64>,
}

impl StripChart {
    pub fn new(label: &str, number_points: usize, initial_value: f64) -> Self {
        let capacity = number_points + 1;
        Self {
            label: label.to_string(),
            capacity,
            values: std::iter::repeat(initial_value).take(capacity).collect(),
        }
    }

    pub fn push(&mut self, value: f64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn latest(&self) -> Option<f64> {
        self.values.back().copied()
    }

    pub fn series(&self, display_time_step: f64) -> Series {
        let points = self
            .values
            .iter()
            .enumerate()
            .map(|(p, &v)| (p as f64 * display_time_step, v))
            .collect();
        Series::Strip(StripSeries {
            label: self.label.clone(),
            points,
        })
    }
}

/// Build a profile series from node values, positions normalised to [0, 1]
pub fn profile_series(label: &str, values: &[f64]) -> Series {
    let last = values.len().saturating_sub(1).max(1) as f64;
    Series::Profile(ProfileSeries {
        label: label.to_string(),
        points: values
            .iter()
            .enumerate()
            .map(|(k, &v)| (k as f64 / last, v))
            .collect(),
    })
}

/// Build a one-row canvas (space along x, a single y cell) from node values
pub fn canvas_row(label: &str, values: &[f64], min: f64, max: f64) -> Series {
    Series::Canvas(CanvasSeries {
        label: label.to_string(),
        grid: values.iter().map(|&v| vec![v]).collect(),
        min,
        max,
    })
}

/// In-memory display adapter keeping the latest series per unit and label
#[derive(Debug, Default)]
pub struct RecordingDisplay {
    parameters: HashMap<(UnitId, String), f64>,
    latest: HashMap<(UnitId, String), Series>,
    publish_count: u64,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an externally set parameter value, as a UI control would
    pub fn set_parameter(&mut self, unit: UnitId, name: &str, value: f64) {
        self.parameters.insert((unit, name.to_string()), value);
    }

    pub fn latest(&self, unit: UnitId, label: &str) -> Option<&Series> {
        self.latest.get(&(unit, label.to_string()))
    }

    pub fn labels(&self, unit: UnitId) -> Vec<&str> {
        let mut labels: Vec<&str> = self
            .latest
            .keys()
            .filter(|(id, _)| *id == unit)
            .map(|(_, label)| label.as_str())
            .collect();
        labels.sort();
        labels
    }

    pub fn publish_count(&self) -> u64 {
        self.publish_count
    }
}

impl ParameterSource for RecordingDisplay {
    fn parameter_value(&self, unit: UnitId, name: &str) -> Option<f64> {
        self.parameters.get(&(unit, name.to_string())).copied()
    }
}

impl DisplayAdapter for RecordingDisplay {
    fn publish(&mut self, unit: UnitId, series: Series) {
        self.publish_count += 1;
        self.latest.insert((unit, series.label().to_string()), series);
    }
}
