use calib_optimize::Termination;
#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// The settings for 3d point reconstruction.
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ReconstructionSettings {
    /// The epsilon of the singular value decompositions in linear triangulation
    #[cfg_attr(feature = "serde-serialize", serde(default = "default_epsilon"))]
    pub epsilon: f64,
    /// The maximum iterations of the singular value decompositions in linear triangulation
    #[cfg_attr(
        feature = "serde-serialize",
        serde(default = "default_max_iterations")
    )]
    pub max_iterations: usize,
    /// When to stop nonlinear refinement
    #[cfg_attr(feature = "serde-serialize", serde(default))]
    pub termination: Termination,
    /// The largest squared epipolar distance, in pixels, of a pair that is triangulated
    /// after correspondence search; `None` keeps every matched pair
    #[cfg_attr(feature = "serde-serialize", serde(default))]
    pub max_epipolar_distance: Option<f64>,
}

impl Default for ReconstructionSettings {
    fn default() -> Self {
        Self {
            epsilon: default_epsilon(),
            max_iterations: default_max_iterations(),
            termination: Termination::default(),
            max_epipolar_distance: None,
        }
    }
}

fn default_epsilon() -> f64 {
    1e-12
}

fn default_max_iterations() -> usize {
    1000
}
