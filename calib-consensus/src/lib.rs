//! Random sample consensus (RANSAC) over pluggable strategies.
//!
//! The engine in [`Ransac`] knows nothing about the models it fits. It is parameterized by
//! two capabilities:
//!
//! * a [`ModelEstimator`], which computes a candidate model from a small random sample
//!   and may refuse (degenerate sample)
//! * a [`ModelEvaluator`], which scores one datum against a model with a nonnegative residual
//!
//! Each iteration draws [`RansacParameters::min_samples`] distinct data points, estimates a
//! model, and counts the data whose residual is at most [`RansacParameters::inlier_threshold`].
//! The model with the most inliers wins; ties keep the model found first, so a run is fully
//! determined by the random source. If the winner has fewer than
//! [`RansacParameters::min_inliers`] inliers the result carries no model.
//!
//! [`Ransac`] also implements [`sample_consensus::Consensus`], so any
//! [`sample_consensus::Estimator`] from the rust-cv ecosystem can be run through it, with
//! [`sample_consensus::Model::residual`] acting as the evaluator.

mod bridge;
mod parameters;
mod ransac;

pub use bridge::*;
pub use parameters::*;
pub use ransac::*;
pub use sample_consensus;

/// Computes a model from a sample of data.
pub trait ModelEstimator<Data> {
    /// The model produced by the estimator.
    type Model;

    /// The smallest sample from which a model can be estimated.
    ///
    /// The engine never draws fewer samples than this, even if the parameters ask for it.
    const MIN_SAMPLES: usize;

    /// Estimates a model from `data`, or returns `None` if the sample is degenerate.
    ///
    /// `data` has at least [`ModelEstimator::MIN_SAMPLES`] elements. It has more when the
    /// engine refits the winning model to its whole consensus set.
    fn estimate(&self, data: &[Data]) -> Option<Self::Model>;
}

/// Scores a single datum against a model.
pub trait ModelEvaluator<Model, Data> {
    /// The nonnegative residual of `datum` under `model`.
    fn evaluate(&self, model: &Model, datum: &Data) -> f64;
}

impl<Model, Data, F> ModelEvaluator<Model, Data> for F
where
    F: Fn(&Model, &Data) -> f64,
{
    fn evaluate(&self, model: &Model, datum: &Data) -> f64 {
        self(model, datum)
    }
}
