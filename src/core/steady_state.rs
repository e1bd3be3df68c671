//! Steady-state detection from windowed, reduced-precision fingerprints.
//!
//! A unit tracks a few observable quantities, each with its own rounding
//! [`Precision`]. Every check rounds the current values into a
//! [`Fingerprint`]. A fingerprint that holds for a characteristic time
//! window means the unit has converged; any change, or any parameter
//! update, sends it back to active.

use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConvergenceStatus {
    Active,
    Converged,
}

/// How much of a tracked value survives into a fingerprint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Precision {
    /// Fixed number of digits after the decimal point
    Decimals(u32),
    /// Fixed number of significant figures, independent of magnitude
    SignificantFigures(u32),
}

impl Precision {
    /// Round a value to `(mantissa, exponent)` with `value ~= mantissa * 10^exponent`
    pub fn quantize(&self, value: f64) -> (i64, i32) {
        if !value.is_finite() {
            return (i64::MAX, i32::MAX);
        }
        match *self {
            Precision::Decimals(d) => {
                let scaled = (value * 10f64.powi(d as i32)).round();
                (scaled as i64, -(d as i32))
            }
            Precision::SignificantFigures(s) => {
                let s = s.max(1) as i32;
                if value == 0.0 {
                    return (0, 0);
                }
                let magnitude = value.abs().log10().floor() as i32;
                let mut exponent = magnitude - (s - 1);
                let mut mantissa = (value / 10f64.powi(exponent)).round();
                // rounding 9.99.. up adds a digit
                if mantissa.abs() >= 10f64.powi(s) {
                    mantissa = (mantissa / 10.0).round();
                    exponent += 1;
                }
                (mantissa as i64, exponent)
            }
        }
    }
}

/// One quantity that participates in a unit's fingerprint
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedQuantity {
    pub name: &'static str,
    pub precision: Precision,
}

impl TrackedQuantity {
    pub const fn new(name: &'static str, precision: Precision) -> Self {
        Self { name, precision }
    }
}

/// Deterministic, lossy digest of tracked quantities
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(Vec<(i64, i32)>);

impl Fingerprint {
    pub fn compute(quantities: &[TrackedQuantity], values: &[f64]) -> Self {
        Self(
            quantities
                .iter()
                .zip(values)
                .map(|(q, &v)| q.precision.quantize(v))
                .collect(),
        )
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(m, e)| format!("{}e{}", m, e)).collect();
        write!(f, "{}", parts.join("|"))
    }
}

/// Per-unit ACTIVE/CONVERGED state machine.
///
/// The fingerprint is recomputed on every check. A CONVERGED unit drops to
/// ACTIVE on the first check whose fingerprint differs from the reference.
/// An ACTIVE unit is promoted only once the fingerprint has stayed equal to
/// the reference for at least one window; any change restarts the window.
#[derive(Debug, Clone)]
pub struct SteadyStateDetector {
    quantities: Vec<TrackedQuantity>,
    window: f64,
    status: ConvergenceStatus,
    reference: Option<Fingerprint>,
    /// Sim time at which `reference` was first seen
    reference_time: f64,
}

impl SteadyStateDetector {
    /// `window` is the characteristic time a fingerprint must hold before promotion
    pub fn new(quantities: Vec<TrackedQuantity>, window: f64) -> Self {
        Self {
            quantities,
            window: Self::sanitize_window(window),
            status: ConvergenceStatus::Active,
            reference: None,
            reference_time: 0.0,
        }
    }

    fn sanitize_window(window: f64) -> f64 {
        if window.is_finite() && window > 0.0 {
            window
        } else {
            0.0
        }
    }

    pub fn set_window(&mut self, window: f64) {
        self.window = Self::sanitize_window(window);
    }

    pub fn status(&self) -> ConvergenceStatus {
        self.status
    }

    pub fn is_converged(&self) -> bool {
        self.status == ConvergenceStatus::Converged
    }

    /// Drop back to ACTIVE and forget the reference fingerprint
    pub fn invalidate(&mut self) {
        self.status = ConvergenceStatus::Active;
        self.reference = None;
    }

    /// Fingerprint the current values and update the status
    pub fn check(&mut self, sim_time: f64, values: &[f64]) -> bool {
        debug_assert_eq!(values.len(), self.quantities.len());
        let fingerprint = Fingerprint::compute(&self.quantities, values);

        match &self.reference {
            Some(reference) if *reference == fingerprint => {
                if sim_time >= self.reference_time + self.window {
                    self.status = ConvergenceStatus::Converged;
                }
            }
            Some(reference) => {
                if self.is_converged() {
                    debug!(
                        "Steady state lost at t = {:.3}: {} moved ({} -> {})",
                        sim_time,
                        self.first_changed(reference, &fingerprint),
                        reference,
                        fingerprint
                    );
                }
                self.restart(sim_time, fingerprint);
            }
            None => self.restart(sim_time, fingerprint),
        }
        self.is_converged()
    }

    fn restart(&mut self, sim_time: f64, fingerprint: Fingerprint) {
        self.status = ConvergenceStatus::Active;
        self.reference = Some(fingerprint);
        self.reference_time = sim_time;
    }

    fn first_changed(&self, a: &Fingerprint, b: &Fingerprint) -> &'static str {
        a.0.iter()
            .zip(&b.0)
            .zip(&self.quantities)
            .find(|((x, y), _)| x != y)
            .map_or("?", |(_, q)| q.name)
    }
}
