use calib_consensus::{
    sample_consensus::{Consensus, Estimator, Model},
    ModelEstimator, Ransac, RansacParameters, Termination,
};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

#[derive(Debug, Copy, Clone, PartialEq)]
struct Line {
    slope: f64,
    intercept: f64,
}

impl Model<(f64, f64)> for Line {
    fn residual(&self, &(x, y): &(f64, f64)) -> f64 {
        (self.slope * x + self.intercept - y).abs()
    }
}

/// Least squares line through the sample.
struct LineEstimator;

impl ModelEstimator<(f64, f64)> for LineEstimator {
    type Model = Line;
    const MIN_SAMPLES: usize = 2;

    fn estimate(&self, data: &[(f64, f64)]) -> Option<Line> {
        let n = data.len() as f64;
        let (sx, sy) = data
            .iter()
            .fold((0.0, 0.0), |(sx, sy), &(x, y)| (sx + x, sy + y));
        let (mx, my) = (sx / n, sy / n);
        let (sxx, sxy) = data.iter().fold((0.0, 0.0), |(sxx, sxy), &(x, y)| {
            (sxx + (x - mx) * (x - mx), sxy + (x - mx) * (y - my))
        });
        if sxx < 1e-12 {
            return None;
        }
        let slope = sxy / sxx;
        Some(Line {
            slope,
            intercept: my - slope * mx,
        })
    }
}

impl Estimator<(f64, f64)> for LineEstimator {
    type Model = Line;
    type ModelIter = Option<Line>;
    const MIN_SAMPLES: usize = 2;

    fn estimate<I>(&self, data: I) -> Self::ModelIter
    where
        I: Iterator<Item = (f64, f64)> + Clone,
    {
        let data: Vec<_> = data.collect();
        ModelEstimator::estimate(self, &data)
    }
}

fn residual(line: &Line, datum: &(f64, f64)) -> f64 {
    line.residual(datum)
}

/// 30 points on `y = 2x + 1` followed by 20 points scattered far from it.
fn contaminated() -> Vec<(f64, f64)> {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
    let mut data: Vec<(f64, f64)> = (0..30)
        .map(|i| {
            let x = i as f64 * 0.5;
            (x, 2.0 * x + 1.0)
        })
        .collect();
    data.extend((0..20).map(|_| {
        let x = rng.gen_range(0.0..15.0);
        (x, 2.0 * x + 1.0 + rng.gen_range(5.0..50.0))
    }));
    data
}

#[test]
fn finds_line_among_outliers() {
    let _ = pretty_env_logger::try_init();
    let data = contaminated();
    let parameters = RansacParameters::new(1e-6, 2, 10, 200).seed(3);
    let result = Ransac::seeded(parameters).run(&LineEstimator, &residual, &data);
    let line = result.model.expect("consensus");
    assert!((line.slope - 2.0).abs() < 1e-9);
    assert!((line.intercept - 1.0).abs() < 1e-9);
    assert_eq!(result.inliers, (0..30).collect::<Vec<_>>());
}

#[test]
fn same_seed_same_result() {
    let data = contaminated();
    let parameters = RansacParameters::new(0.5, 2, 5, 50)
        .seed(11)
        .refit_consensus(false);
    let a = Ransac::seeded(parameters).run(&LineEstimator, &residual, &data);
    let b = Ransac::seeded(parameters).run(&LineEstimator, &residual, &data);
    assert_eq!(a, b);
}

#[test]
fn not_enough_data_gives_no_model() {
    let data = [(0.0, 1.0)];
    let result = Ransac::seeded(RansacParameters::default()).run(&LineEstimator, &residual, &data);
    assert!(result.model.is_none());
    assert_eq!(result.iterations, 0);
}

#[test]
fn estimator_minimum_overrides_parameters() {
    // Asking for single-point samples still draws two.
    let data = contaminated();
    let parameters = RansacParameters::new(1e-6, 1, 10, 100);
    let result = Ransac::seeded(parameters).run(&LineEstimator, &residual, &data);
    assert!(result.model.is_some());
}

#[test]
fn degenerate_samples_give_no_model() {
    let data: Vec<(f64, f64)> = (0..10).map(|i| (1.0, i as f64)).collect();
    let parameters = RansacParameters::new(0.1, 2, 2, 20);
    let result = Ransac::seeded(parameters).run(&LineEstimator, &residual, &data);
    assert!(result.model.is_none());
    assert_eq!(result.iterations, 20);
}

#[test]
fn minimum_inliers_not_reached() {
    let data = contaminated();
    let parameters = RansacParameters::new(1e-6, 2, 40, 100);
    let result = Ransac::seeded(parameters).run(&LineEstimator, &residual, &data);
    assert!(result.model.is_none());
    assert!(result.inliers.is_empty());
}

#[test]
fn first_consensus_stops_early() {
    let data = contaminated();
    let parameters = RansacParameters::new(1e-6, 2, 2, 1000)
        .termination(Termination::FirstConsensus)
        .refit_consensus(false);
    let result = Ransac::seeded(parameters).run(&LineEstimator, &residual, &data);
    assert!(result.model.is_some());
    assert!(result.iterations < 1000);
}

#[test]
fn confidence_bounds_iterations() {
    let data = contaminated();
    let parameters = RansacParameters::new(1e-6, 2, 10, 10_000).confidence(0.99);
    let result = Ransac::seeded(parameters).run(&LineEstimator, &residual, &data);
    assert!(result.model.is_some());
    assert!(result.iterations < 10_000);
}

#[test]
fn sample_consensus_bridge() {
    let data = contaminated();
    let mut ransac = Ransac::seeded(RansacParameters::new(1e-6, 2, 10, 200));
    let (line, inliers) = ransac
        .model_inliers(&LineEstimator, data.iter().copied())
        .expect("consensus");
    assert!((line.slope - 2.0).abs() < 1e-9);
    assert_eq!(inliers.len(), 30);
}
