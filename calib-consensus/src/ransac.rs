use crate::{ModelEstimator, ModelEvaluator, RansacParameters, Termination};
use log::*;
use rand::{seq::index, RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

/// The outcome of a RANSAC run.
#[derive(Debug, Clone, PartialEq)]
pub struct RansacResult<M> {
    /// The winning model, or `None` if no model reached the minimum inlier count.
    pub model: Option<M>,
    /// Indices into the input data of the winner's inliers, in ascending order.
    pub inliers: Vec<usize>,
    /// Sum of the inlier residuals of the winner.
    pub residual: f64,
    /// How many hypotheses were drawn.
    pub iterations: usize,
}

impl<M> RansacResult<M> {
    fn rejected(iterations: usize) -> Self {
        Self {
            model: None,
            inliers: Vec::new(),
            residual: 0.0,
            iterations,
        }
    }

    pub fn inlier_count(&self) -> usize {
        self.inliers.len()
    }

    /// Maps the model while keeping the consensus information.
    pub fn map<N>(self, f: impl FnOnce(M) -> N) -> RansacResult<N> {
        RansacResult {
            model: self.model.map(f),
            inliers: self.inliers,
            residual: self.residual,
            iterations: self.iterations,
        }
    }
}

/// A scored hypothesis.
struct Hypothesis<M> {
    model: M,
    inliers: Vec<usize>,
    residual: f64,
}

impl<M> Hypothesis<M> {
    fn score<Data, V>(model: M, evaluator: &V, data: &[Data], threshold: f64) -> Self
    where
        V: ModelEvaluator<M, Data>,
    {
        let mut inliers = Vec::new();
        let mut residual = 0.0;
        for (ix, datum) in data.iter().enumerate() {
            let r = evaluator.evaluate(&model, datum);
            // NaN never passes.
            if r <= threshold {
                inliers.push(ix);
                residual += r;
            }
        }
        Self {
            model,
            inliers,
            residual,
        }
    }
}

/// The RANSAC engine.
///
/// The engine owns its random source. Two engines built with equal parameters and equally
/// seeded sources produce identical results on identical input.
#[derive(Debug, Clone)]
pub struct Ransac<R> {
    parameters: RansacParameters,
    rng: R,
}

impl Ransac<Xoshiro256PlusPlus> {
    /// Creates an engine whose random source is seeded from [`RansacParameters::seed`].
    pub fn seeded(parameters: RansacParameters) -> Self {
        Self::new(
            parameters,
            Xoshiro256PlusPlus::seed_from_u64(parameters.seed),
        )
    }
}

impl<R> Ransac<R>
where
    R: RngCore,
{
    pub fn new(parameters: RansacParameters, rng: R) -> Self {
        Self { parameters, rng }
    }

    pub fn parameters(&self) -> &RansacParameters {
        &self.parameters
    }

    /// Runs RANSAC over `data`.
    ///
    /// Never fails: too little data, an estimator that rejects every sample, or a best
    /// model below the inlier minimum all produce a result with no model.
    pub fn run<Data, E, V>(
        &mut self,
        estimator: &E,
        evaluator: &V,
        data: &[Data],
    ) -> RansacResult<E::Model>
    where
        Data: Clone,
        E: ModelEstimator<Data>,
        V: ModelEvaluator<E::Model, Data>,
    {
        let parameters = self.parameters;
        let sample_size = parameters.min_samples.max(E::MIN_SAMPLES).max(1);
        let required_inliers = parameters.min_inliers.max(1);

        if data.len() < sample_size {
            debug!(
                "RANSAC needs {} samples per hypothesis but only {} data points were given",
                sample_size,
                data.len()
            );
            return RansacResult::rejected(0);
        }

        let mut best: Option<Hypothesis<E::Model>> = None;
        let mut limit = parameters.max_iterations;
        let mut sample = Vec::with_capacity(sample_size);
        let mut iterations = 0;

        while iterations < limit {
            iterations += 1;
            sample.clear();
            sample.extend(
                index::sample(&mut self.rng, data.len(), sample_size)
                    .into_iter()
                    .map(|ix| data[ix].clone()),
            );

            let model = match estimator.estimate(&sample) {
                Some(model) => model,
                None => {
                    trace!("iteration {}: degenerate sample", iterations);
                    continue;
                }
            };
            let hypothesis =
                Hypothesis::score(model, evaluator, data, parameters.inlier_threshold);
            trace!(
                "iteration {}: hypothesis with {} inliers",
                iterations,
                hypothesis.inliers.len()
            );

            let improves = best
                .as_ref()
                .map_or(true, |best| hypothesis.inliers.len() > best.inliers.len());
            if improves {
                if let Some(confidence) = parameters.confidence {
                    let ratio = hypothesis.inliers.len() as f64 / data.len() as f64;
                    let bound = required_iterations(confidence, ratio, sample_size);
                    limit = limit.min(bound.max(iterations));
                    trace!("iteration bound lowered to {}", limit);
                }
                best = Some(hypothesis);
            }

            if parameters.termination == Termination::FirstConsensus
                && best
                    .as_ref()
                    .map_or(false, |best| best.inliers.len() >= required_inliers)
            {
                debug!("first consensus reached after {} iterations", iterations);
                break;
            }
        }

        let best = match best {
            Some(best) if best.inliers.len() >= required_inliers => best,
            best => {
                debug!(
                    "no consensus after {} iterations: best model had {} of {} required inliers",
                    iterations,
                    best.map_or(0, |best| best.inliers.len()),
                    required_inliers
                );
                return RansacResult::rejected(iterations);
            }
        };

        let best = if parameters.refit_consensus {
            refit(estimator, evaluator, data, best, parameters.inlier_threshold)
        } else {
            best
        };

        info!(
            "RANSAC consensus with {} of {} inliers after {} iterations",
            best.inliers.len(),
            data.len(),
            iterations
        );
        RansacResult {
            model: Some(best.model),
            inliers: best.inliers,
            residual: best.residual,
            iterations,
        }
    }
}

/// Re-estimates the model from its consensus set and keeps it unless it loses inliers.
fn refit<Data, E, V>(
    estimator: &E,
    evaluator: &V,
    data: &[Data],
    best: Hypothesis<E::Model>,
    threshold: f64,
) -> Hypothesis<E::Model>
where
    Data: Clone,
    E: ModelEstimator<Data>,
    V: ModelEvaluator<E::Model, Data>,
{
    if best.inliers.len() < E::MIN_SAMPLES {
        return best;
    }
    let consensus: Vec<Data> = best.inliers.iter().map(|&ix| data[ix].clone()).collect();
    match estimator.estimate(&consensus) {
        Some(model) => {
            let refit = Hypothesis::score(model, evaluator, data, threshold);
            if refit.inliers.len() >= best.inliers.len() {
                debug!(
                    "refit on consensus set: {} -> {} inliers",
                    best.inliers.len(),
                    refit.inliers.len()
                );
                refit
            } else {
                best
            }
        }
        None => best,
    }
}

/// The number of iterations needed to draw at least one all-inlier sample with probability
/// `confidence` when a fraction `inlier_ratio` of the data are inliers.
pub fn required_iterations(confidence: f64, inlier_ratio: f64, sample_size: usize) -> usize {
    let clean_sample = inlier_ratio.powi(sample_size as i32);
    if clean_sample >= 1.0 {
        return 1;
    }
    if clean_sample <= 0.0 {
        return usize::MAX;
    }
    let iterations = (1.0 - confidence).ln() / (1.0 - clean_sample).ln();
    if iterations.is_finite() {
        iterations.ceil().max(1.0) as usize
    } else {
        usize::MAX
    }
}
