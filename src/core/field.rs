//! 1-D finite-difference field for distributed-parameter units.
//!
//! A field holds `N + 1` nodes for each of its quantities. Interior nodes
//! follow an explicit upwind advection + central dispersion + linear exchange
//! update; the inlet node is pinned to the inlet value and the outlet node
//! copies its upstream neighbour (zero-gradient outflow). Which end is the
//! inlet depends on the quantity's [`FlowDirection`].
//!
//! Updates are double-buffered: every sub-step reads only `current`, writes
//! only `next`, and swaps the two when all quantities are done.

use crate::core::execution::config::ConcurrencyMode;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Direction of flow along the node axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowDirection {
    /// Enters at node 0, leaves at node N
    Forward,
    /// Enters at node N, leaves at node 0
    Reverse,
}

impl FlowDirection {
    pub fn inlet_node(&self, num_nodes: usize) -> usize {
        match self {
            FlowDirection::Forward => 0,
            FlowDirection::Reverse => num_nodes,
        }
    }

    pub fn outlet_node(&self, num_nodes: usize) -> usize {
        match self {
            FlowDirection::Forward => num_nodes,
            FlowDirection::Reverse => 0,
        }
    }
}

/// Per-quantity coefficients for one sub-step, precomputed by the owning unit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transport {
    /// velocity / dz (1/s)
    pub velocity_over_dz: f64,
    /// dispersion coefficient / dz^2 (1/s)
    pub dispersion_over_dz2: f64,
    /// linear exchange coefficient towards `exchange_partner` (1/s)
    pub exchange_coef: f64,
    /// Index of the quantity this one exchanges with, if any
    pub exchange_partner: Option<usize>,
    pub direction: FlowDirection,
    /// Dirichlet value at the inlet node
    pub inlet_value: f64,
    /// Physical bounds every node is clamped to after each sub-step
    pub bounds: (f64, f64),
}

#[derive(Debug, Clone)]
pub struct FiniteDifferenceField {
    num_nodes: usize,
    labels: Vec<String>,
    current: Vec<Vec<f64>>,
    next: Vec<Vec<f64>>,
}

impl FiniteDifferenceField {
    /// Create a field of `num_nodes + 1` nodes per quantity, all set to `initial`
    pub fn new(labels: &[&str], num_nodes: usize, initial: f64) -> Self {
        assert!(num_nodes >= 2, "a field needs at least one interior node");
        let labels: Vec<String> = labels.iter().map(|l| l.to_string()).collect();
        let count = labels.len();
        Self {
            num_nodes,
            labels,
            current: vec![vec![initial; num_nodes + 1]; count],
            next: vec![vec![initial; num_nodes + 1]; count],
        }
    }

    /// Number of node intervals N; the field stores N + 1 nodes
    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    pub fn quantity_count(&self) -> usize {
        self.labels.len()
    }

    pub fn label(&self, quantity: usize) -> &str {
        &self.labels[quantity]
    }

    pub fn values(&self, quantity: usize) -> &[f64] {
        &self.current[quantity]
    }

    pub fn value(&self, quantity: usize, node: usize) -> f64 {
        self.current[quantity][node]
    }

    /// Replace every quantity's buffers with fresh arrays filled with `value`
    pub fn reset(&mut self, value: f64) {
        let len = self.num_nodes + 1;
        let count = self.labels.len();
        self.current = vec![vec![value; len]; count];
        self.next = vec![vec![value; len]; count];
    }

    /// Advance the field by one explicit sub-step of length `dt`.
    ///
    /// `transports` must hold one entry per quantity.
    pub fn step(&mut self, transports: &[Transport], dt: f64, mode: ConcurrencyMode) {
        assert_eq!(transports.len(), self.quantity_count(), "one transport per quantity");
        let n_last = self.num_nodes;
        let Self { current, next, .. } = self;
        let current: &Vec<Vec<f64>> = current;

        for (q, (out, transport)) in next.iter_mut().zip(transports).enumerate() {
            let own = &current[q];
            let partner = transport.exchange_partner.map(|p| &current[p][..]);
            let (lo, hi) = transport.bounds;

            let interior = &mut out[1..n_last];
            match mode {
                ConcurrencyMode::Sequential => {
                    for (i, slot) in interior.iter_mut().enumerate() {
                        *slot = interior_update(own, partner, transport, i + 1, dt).clamp(lo, hi);
                    }
                }
                ConcurrencyMode::Rayon => {
                    interior.par_iter_mut().enumerate().for_each(|(i, slot)| {
                        *slot = interior_update(own, partner, transport, i + 1, dt).clamp(lo, hi);
                    });
                }
            }

            let inlet = transport.direction.inlet_node(n_last);
            let outlet = transport.direction.outlet_node(n_last);
            let upstream_of_outlet = match transport.direction {
                FlowDirection::Forward => n_last - 1,
                FlowDirection::Reverse => 1,
            };
            out[inlet] = transport.inlet_value.clamp(lo, hi);
            out[outlet] = own[upstream_of_outlet].clamp(lo, hi);
        }

        std::mem::swap(&mut self.current, &mut self.next);
    }
}

/// Explicit update of interior node `n` from the frozen `own`/`partner` arrays
fn interior_update(
    own: &[f64],
    partner: Option<&[f64]>,
    transport: &Transport,
    n: usize,
    dt: f64,
) -> f64 {
    let t = own[n];
    let upstream = match transport.direction {
        FlowDirection::Forward => own[n - 1],
        FlowDirection::Reverse => own[n + 1],
    };
    let advection = transport.velocity_over_dz * (upstream - t);
    let dispersion = transport.dispersion_over_dz2 * (own[n + 1] - 2.0 * t + own[n - 1]);
    let exchange = match partner {
        Some(other) => transport.exchange_coef * (other[n] - t),
        None => 0.0,
    };
    t + (advection + exchange + dispersion) * dt
}
