use ndarray::{Array1, Array2, Axis};
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
  error::{check_width, RbmError, Result},
  evaluate::cross_entropy,
  gibbs::{run_chain, GibbsStep},
  inference::{sample_hidden_given_visible, LayerSample},
  params::RbmParameters,
};

#[derive(Debug, Clone)]
pub struct TrainingParams {
  pub epochs: usize,
  pub learning_rate: f64,
  /// Gibbs steps per update
  pub k: usize,
  /// Log the cost every this many epochs (0 = only the last one).
  pub log_every: usize,
}

impl Default for TrainingParams {
  fn default() -> Self {
    Self {
      epochs: 200,
      learning_rate: 0.1,
      k: 1,
      log_every: 10,
    }
  }
}

/// Everything one CD-k update is computed from, plus the resulting deltas.
#[derive(Debug, Clone)]
pub struct CdGradient {
  /// hidden layer driven by the data; its sample is the start of the chain
  pub positive: LayerSample,
  /// last transition of the chain
  pub negative: GibbsStep,
  pub delta_w: Array2<f64>,
  pub delta_hidden_bias: Array1<f64>,
  pub delta_visible_bias: Array1<f64>,
}

/// CD-k estimate for one batch. Does not touch `params`.
///
/// ```text
/// dW     = lr * (x^T h0 - v_k^T E[h_k])
/// dvbias = lr * mean_rows(x - v_k)
/// dhbias = lr * mean_rows(h0 - E[h_k])
/// ```
pub fn estimate_gradient<R: Rng + ?Sized>(
  params: &RbmParameters,
  input: &Array2<f64>,
  k: usize,
  learning_rate: f64,
  rng: &mut R,
) -> Result<CdGradient> {
  check_width("input batch", params.n_visible(), input.ncols())?;
  if input.nrows() == 0 {
    return Err(RbmError::DimensionMismatch {
      what: "batch rows",
      expected: 1,
      found: 0,
    });
  }
  if k == 0 {
    return Err(RbmError::InvalidDimension(
      "contrastive divergence needs at least one Gibbs step".to_string(),
    ));
  }

  let positive = sample_hidden_given_visible(input, params, rng)?;
  let negative = run_chain(&positive.sample, k, params, rng)?
    .ok_or_else(|| RbmError::InvalidDimension("empty Gibbs chain".to_string()))?;

  let nv_samples = &negative.visible.sample;
  let nh_means = &negative.hidden.mean;

  let delta_w = (input.t().dot(&positive.sample) - nv_samples.t().dot(nh_means)) * learning_rate;
  let delta_visible_bias = mean_rows(&(input - nv_samples))? * learning_rate;
  let delta_hidden_bias = mean_rows(&(&positive.sample - nh_means))? * learning_rate;

  Ok(CdGradient {
    positive,
    negative,
    delta_w,
    delta_hidden_bias,
    delta_visible_bias,
  })
}

/// One CD-k update applied in place. Returns what it was computed from.
///
/// Any error leaves `params` untouched: the whole gradient is built before the update.
pub fn train_step<R: Rng + ?Sized>(
  params: &mut RbmParameters,
  input: &Array2<f64>,
  k: usize,
  learning_rate: f64,
  rng: &mut R,
) -> Result<CdGradient> {
  let gradient = estimate_gradient(params, input, k, learning_rate, rng)?;
  params.apply_gradient(
    &gradient.delta_w,
    &gradient.delta_hidden_bias,
    &gradient.delta_visible_bias,
  )?;
  Ok(gradient)
}

fn mean_rows(m: &Array2<f64>) -> Result<Array1<f64>> {
  m.mean_axis(Axis(0)).ok_or(RbmError::DimensionMismatch {
    what: "batch rows",
    expected: 1,
    found: 0,
  })
}

/// Per-epoch reconstruction cost of one training pass.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
  pub n_hidden: usize,
  /// NaN marks epochs where the cost was degenerate
  pub costs: Vec<f64>,
  pub smoothed_cost: f64,
  pub degenerate_epochs: usize,
}

impl TrainingReport {
  pub fn first_cost(&self) -> Option<f64> {
    self.costs.first().copied()
  }

  pub fn last_cost(&self) -> Option<f64> {
    self.costs.last().copied()
  }
}

/// Full-batch training: `epochs` CD-k updates, with the reconstruction cost after each.
#[tracing::instrument(level = "debug", skip_all, fields(n_hidden = params.n_hidden()))]
pub fn train<R: Rng + ?Sized>(
  params: &mut RbmParameters,
  input: &Array2<f64>,
  training: &TrainingParams,
  rng: &mut R,
) -> Result<TrainingReport> {
  let mut costs = Vec::with_capacity(training.epochs);
  let mut smoothed = ExponentialAverage::new(f64::NAN);
  let mut degenerate_epochs = 0;

  for epoch in 0..training.epochs {
    train_step(params, input, training.k, training.learning_rate, rng)?;
    let cost = cross_entropy(params, input)?;
    if cost.is_degenerate() {
      degenerate_epochs += 1;
      warn!(epoch, ?cost, "reconstruction saturated, cost undefined");
    } else {
      smoothed.update(cost.value());
    }
    costs.push(cost.value());

    let last = epoch + 1 == training.epochs;
    if last || (training.log_every > 0 && epoch % training.log_every == 0) {
      info!("Training epoch {}, cost is {:.6}", epoch, cost.value());
    } else {
      debug!("Training epoch {}, cost is {:.6}", epoch, cost.value());
    }
  }

  Ok(TrainingReport {
    n_hidden: params.n_hidden(),
    costs,
    smoothed_cost: smoothed.value,
    degenerate_epochs,
  })
}

/// Bias-corrected exponential moving average of the cost.
pub struct ExponentialAverage {
  beta: f64,
  moment: f64,
  pub value: f64,
  t: i32,
}

impl ExponentialAverage {
  pub fn new(initial: f64) -> Self {
    ExponentialAverage {
      beta: 0.9,
      moment: 0.,
      value: initial,
      t: 0,
    }
  }

  pub fn update(&mut self, value: f64) {
    self.t += 1;
    self.moment = self.beta * self.moment + (1. - self.beta) * value;
    // bias correction
    self.value = self.moment / (1. - f64::powi(self.beta, self.t));
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{evaluate::cross_entropy, rng::seeded};
  use ndarray::array;

  fn toy_batch() -> Array2<f64> {
    // none of the column sums is an integer, so x - v_k never averages to exactly zero
    array![[0.9, 0.2, 0.7, 0.1], [0.35, 0.85, 0.6, 0.45]]
  }

  #[test]
  fn one_step_on_toy_problem() {
    let seed = 123;
    let mut rng = seeded(seed);
    let mut params = RbmParameters::create(4, 3, &mut rng).unwrap();
    let initial = RbmParameters::create(4, 3, &mut seeded(seed)).unwrap();
    assert_eq!(params, initial);

    let g = train_step(&mut params, &toy_batch(), 1, 0.1, &mut rng).unwrap();

    assert_eq!(params.weights().dim(), (4, 3));
    assert_eq!(params.hidden_bias().len(), 3);
    assert_eq!(params.visible_bias().len(), 4);
    assert_eq!(g.positive.sample.dim(), (2, 3));
    assert_eq!(g.negative.visible.sample.dim(), (2, 4));
    assert_ne!(params.weights(), initial.weights());
    assert!(params.visible_bias().iter().all(|&b| b != 0.0));
    assert!(params.hidden_bias().iter().all(|&b| b != 0.0));
  }

  #[test]
  fn update_matches_closed_form() {
    let x = toy_batch();
    let mut params = RbmParameters::create(4, 3, &mut seeded(1)).unwrap();
    let before = params.clone();
    let lr = 0.05;
    let g = train_step(&mut params, &x, 2, lr, &mut seeded(77)).unwrap();

    let h0 = &g.positive.sample;
    let vk = &g.negative.visible.sample;
    let hk = &g.negative.hidden.mean;
    let n = x.nrows() as f64;
    for i in 0..4 {
      for j in 0..3 {
        let pos: f64 = (0..2).map(|s| x[[s, i]] * h0[[s, j]]).sum();
        let neg: f64 = (0..2).map(|s| vk[[s, i]] * hk[[s, j]]).sum();
        let expected = before.weights()[[i, j]] + lr * (pos - neg);
        assert!((params.weights()[[i, j]] - expected).abs() < 1e-12);
      }
      let dv: f64 = (0..2).map(|s| x[[s, i]] - vk[[s, i]]).sum::<f64>() / n;
      assert!((params.visible_bias()[i] - (before.visible_bias()[i] + lr * dv)).abs() < 1e-12);
    }
    for j in 0..3 {
      let dh: f64 = (0..2).map(|s| h0[[s, j]] - hk[[s, j]]).sum::<f64>() / n;
      assert!((params.hidden_bias()[j] - (before.hidden_bias()[j] + lr * dh)).abs() < 1e-12);
    }
  }

  #[test]
  fn estimate_is_reproducible_and_pure() {
    let params = RbmParameters::create(4, 3, &mut seeded(2)).unwrap();
    let a = estimate_gradient(&params, &toy_batch(), 1, 0.1, &mut seeded(5)).unwrap();
    let b = estimate_gradient(&params, &toy_batch(), 1, 0.1, &mut seeded(5)).unwrap();
    assert_eq!(a.delta_w, b.delta_w);
    assert_eq!(a.negative, b.negative);
    assert_eq!(params, RbmParameters::create(4, 3, &mut seeded(2)).unwrap());
  }

  #[test]
  fn bad_batch_leaves_parameters_alone() {
    let mut params = RbmParameters::create(4, 3, &mut seeded(2)).unwrap();
    let before = params.clone();
    let err = train_step(&mut params, &Array2::zeros((2, 5)), 1, 0.1, &mut seeded(0));
    assert!(matches!(err, Err(RbmError::DimensionMismatch { .. })));
    assert!(train_step(&mut params, &toy_batch(), 0, 0.1, &mut seeded(0)).is_err());
    assert!(train_step(&mut params, &Array2::zeros((0, 4)), 1, 0.1, &mut seeded(0)).is_err());
    assert_eq!(params, before);
  }

  #[test]
  fn training_lowers_reconstruction_cost() {
    let x = array![
      [1., 1., 1., 1., 0., 0., 0., 0., 1., 1., 1., 1., 0., 0., 0., 0.],
      [0., 0., 0., 0., 1., 1., 1., 1., 0., 0., 0., 0., 1., 1., 1., 1.]
    ];
    let mut rng = seeded(42);
    let mut params = RbmParameters::create(16, 8, &mut rng).unwrap();
    let initial = cross_entropy(&params, &x).unwrap().into_result().unwrap();

    let training = TrainingParams {
      epochs: 200,
      ..TrainingParams::default()
    };
    let report = train(&mut params, &x, &training, &mut rng).unwrap();
    assert_eq!(report.costs.len(), 200);
    let last = report
      .costs
      .iter()
      .rev()
      .copied()
      .find(|c| c.is_finite())
      .unwrap();
    assert!(last < initial, "cost went from {} to {}", initial, last);
    assert!(report.smoothed_cost < initial);
  }

  #[test]
  fn saturated_epochs_are_counted_and_training_goes_on() {
    // visible unit 0 reconstructs to exactly 1.0 whatever the hidden layer does
    let mut params = RbmParameters::from_parts(
      Array2::zeros((2, 1)),
      Array1::zeros(1),
      array![1000.0, 0.0],
    )
    .unwrap();
    let x = array![[1.0, 0.5], [1.0, 0.25]];
    let training = TrainingParams {
      epochs: 10,
      ..TrainingParams::default()
    };
    let report = train(&mut params, &x, &training, &mut seeded(3)).unwrap();
    assert_eq!(report.costs.len(), 10);
    assert!(report.costs.iter().all(|c| c.is_nan()));
    assert_eq!(report.degenerate_epochs, 10);
    assert!(report.smoothed_cost.is_nan());
  }

  #[test]
  fn exponential_average_is_bias_corrected() {
    let mut avg = ExponentialAverage::new(0.0);
    avg.update(3.0);
    assert!((avg.value - 3.0).abs() < 1e-12);
    avg.update(3.0);
    assert!((avg.value - 3.0).abs() < 1e-12);
  }
}
