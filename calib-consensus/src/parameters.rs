#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// When the engine stops iterating.
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Termination {
    /// Run every iteration (subject to the confidence bound) and keep the best model.
    Exhaustive,
    /// Stop as soon as some model reaches the minimum inlier count.
    FirstConsensus,
}

impl Default for Termination {
    fn default() -> Self {
        Self::Exhaustive
    }
}

/// The settings of one RANSAC run. They are read-only for the duration of the run.
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RansacParameters {
    /// A datum whose residual is at most this value is an inlier.
    #[cfg_attr(
        feature = "serde-serialize",
        serde(default = "default_inlier_threshold")
    )]
    pub inlier_threshold: f64,
    /// The number of data points drawn per iteration.
    ///
    /// Raised to the estimator's own minimum if smaller.
    #[cfg_attr(feature = "serde-serialize", serde(default))]
    pub min_samples: usize,
    /// The number of inliers a model needs to be reported.
    #[cfg_attr(feature = "serde-serialize", serde(default))]
    pub min_inliers: usize,
    /// The hard cap on iterations.
    #[cfg_attr(
        feature = "serde-serialize",
        serde(default = "default_max_iterations")
    )]
    pub max_iterations: usize,
    /// If set, the iteration count is lowered adaptively so that an all-inlier sample
    /// is drawn with this probability, given the best inlier ratio seen so far.
    #[cfg_attr(feature = "serde-serialize", serde(default))]
    pub confidence: Option<f64>,
    /// Whether to keep searching for a better model once one reaches `min_inliers`.
    ///
    /// Default is [`Termination::Exhaustive`].
    #[cfg_attr(feature = "serde-serialize", serde(default))]
    pub termination: Termination,
    /// Re-estimate the winning model from all of its inliers.
    #[cfg_attr(
        feature = "serde-serialize",
        serde(default = "default_refit_consensus")
    )]
    pub refit_consensus: bool,
    /// Seed used by [`crate::Ransac::seeded`].
    #[cfg_attr(feature = "serde-serialize", serde(default))]
    pub seed: u64,
}

impl RansacParameters {
    /// Parameters with the given thresholds and counts, defaults elsewhere.
    pub fn new(
        inlier_threshold: f64,
        min_samples: usize,
        min_inliers: usize,
        max_iterations: usize,
    ) -> Self {
        Self {
            inlier_threshold,
            min_samples,
            min_inliers,
            max_iterations,
            ..Default::default()
        }
    }

    /// Set the largest residual an inlier may have.
    ///
    /// Default is `1.0`.
    #[must_use]
    pub fn inlier_threshold(self, inlier_threshold: f64) -> Self {
        Self {
            inlier_threshold,
            ..self
        }
    }

    /// Set the sample size. Values below the estimator's minimum are raised to it.
    #[must_use]
    pub fn min_samples(self, min_samples: usize) -> Self {
        Self {
            min_samples,
            ..self
        }
    }

    /// Set the inlier count a model needs to be reported.
    #[must_use]
    pub fn min_inliers(self, min_inliers: usize) -> Self {
        Self {
            min_inliers,
            ..self
        }
    }

    /// Set the hard cap on iterations.
    ///
    /// Default is `1000`.
    #[must_use]
    pub fn max_iterations(self, max_iterations: usize) -> Self {
        Self {
            max_iterations,
            ..self
        }
    }

    /// Enables the adaptive iteration bound. `confidence` is a probability in `(0, 1)`.
    #[must_use]
    pub fn confidence(self, confidence: f64) -> Self {
        Self {
            confidence: Some(confidence),
            ..self
        }
    }

    /// Set when the engine stops iterating.
    #[must_use]
    pub fn termination(self, termination: Termination) -> Self {
        Self {
            termination,
            ..self
        }
    }

    /// Set whether the winning model is re-estimated from all of its inliers.
    ///
    /// Default is `true`.
    #[must_use]
    pub fn refit_consensus(self, refit_consensus: bool) -> Self {
        Self {
            refit_consensus,
            ..self
        }
    }

    /// Set the seed of [`crate::Ransac::seeded`].
    ///
    /// Default is `0`.
    #[must_use]
    pub fn seed(self, seed: u64) -> Self {
        Self { seed, ..self }
    }
}

impl Default for RansacParameters {
    fn default() -> Self {
        Self {
            inlier_threshold: default_inlier_threshold(),
            min_samples: 0,
            min_inliers: 0,
            max_iterations: default_max_iterations(),
            confidence: None,
            termination: Termination::default(),
            refit_consensus: default_refit_consensus(),
            seed: 0,
        }
    }
}

fn default_inlier_threshold() -> f64 {
    1.0
}

fn default_max_iterations() -> usize {
    1000
}

fn default_refit_consensus() -> bool {
    true
}
