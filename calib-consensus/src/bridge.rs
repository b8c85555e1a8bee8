use crate::{ModelEstimator, ModelEvaluator, Ransac, RansacResult};
use float_ord::FloatOrd;
use rand::RngCore;
use sample_consensus::{Consensus, Estimator, Model};

/// Evaluates data with [`Model::residual`].
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ModelResidual;

impl<M, Data> ModelEvaluator<M, Data> for ModelResidual
where
    M: Model<Data>,
{
    fn evaluate(&self, model: &M, datum: &Data) -> f64 {
        model.residual(datum)
    }
}

/// Runs a [`sample_consensus::Estimator`] as a [`ModelEstimator`].
///
/// An estimator may return several models for one sample. The one with the smallest
/// summed residual over the sample is kept.
#[derive(Debug, Copy, Clone)]
pub struct ConsensusEstimator<'a, E>(pub &'a E);

impl<'a, E, Data> ModelEstimator<Data> for ConsensusEstimator<'a, E>
where
    E: Estimator<Data>,
    Data: Clone,
{
    type Model = E::Model;
    const MIN_SAMPLES: usize = E::MIN_SAMPLES;

    fn estimate(&self, data: &[Data]) -> Option<E::Model> {
        self.0
            .estimate(data.iter().cloned())
            .into_iter()
            .map(|model| {
                let cost: f64 = data.iter().map(|datum| model.residual(datum)).sum();
                (model, cost)
            })
            .min_by_key(|&(_, cost)| FloatOrd(cost))
            .map(|(model, _)| model)
    }
}

impl<E, Data, R> Consensus<E, Data> for Ransac<R>
where
    E: Estimator<Data>,
    Data: Clone,
    R: RngCore,
{
    type Inliers = Vec<usize>;

    fn model<I>(&mut self, estimator: &E, data: I) -> Option<E::Model>
    where
        I: Iterator<Item = Data> + Clone,
    {
        <Self as Consensus<E, Data>>::model_inliers(self, estimator, data).map(|(model, _)| model)
    }

    fn model_inliers<I>(&mut self, estimator: &E, data: I) -> Option<(E::Model, Self::Inliers)>
    where
        I: Iterator<Item = Data> + Clone,
    {
        let data: Vec<Data> = data.collect();
        let RansacResult { model, inliers, .. } =
            self.run(&ConsensusEstimator(estimator), &ModelResidual, &data);
        model.map(|model| (model, inliers))
    }
}
