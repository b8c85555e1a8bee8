//! Nonlinear refinement built on the `levenberg-marquardt` crate.
//!
//! Linear estimators minimize algebraic errors. The problems here take their output as a
//! starting point and minimize the geometric error that actually matters, the distance in
//! pixels between observed and reprojected points.

mod single_point;

pub use single_point::*;

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// When to stop an iterative solver.
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Termination {
    /// Bounds the work of the solver. For Levenberg-Marquardt this is the patience, so at most
    /// `max_iterations * (parameters + 1)` residual evaluations are made.
    #[cfg_attr(
        feature = "serde-serialize",
        serde(default = "default_max_iterations")
    )]
    pub max_iterations: usize,
    /// Relative reduction of the cost and of the parameter step below which the solver
    /// considers itself converged.
    #[cfg_attr(feature = "serde-serialize", serde(default = "default_tolerance"))]
    pub tolerance: f64,
}

impl Termination {
    pub fn new(max_iterations: usize, tolerance: f64) -> Self {
        Self {
            max_iterations,
            tolerance,
        }
    }

    #[must_use]
    pub fn max_iterations(self, max_iterations: usize) -> Self {
        Self {
            max_iterations,
            ..self
        }
    }

    #[must_use]
    pub fn tolerance(self, tolerance: f64) -> Self {
        Self { tolerance, ..self }
    }
}

impl Default for Termination {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
        }
    }
}

fn default_max_iterations() -> usize {
    200
}

fn default_tolerance() -> f64 {
    1e-6
}
