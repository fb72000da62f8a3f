use ndarray::Array2;
use tracing::info;

use crate::{
  dataset::{Dataset, PixelScaling, IMAGE_PIXELS, IMAGE_WIDTH},
  error::{check_width, RbmError, Result},
  evaluate::reconstruct,
  params::RbmParameters,
  rng::seeded,
  trainer::{train, TrainingParams, TrainingReport},
};

/// Everything a training run is parameterised with.
#[derive(Debug, Clone)]
pub struct SessionConfig {
  pub n_visible: usize,
  /// hidden units of the first pass
  pub n_hidden: usize,
  /// hidden units of the second pass; `None` skips it
  pub grow_hidden: Option<usize>,
  pub training: TrainingParams,
  pub seed: u64,
  pub scaling: PixelScaling,
  pub image_width: usize,
}

impl Default for SessionConfig {
  fn default() -> Self {
    Self {
      n_visible: IMAGE_PIXELS,
      n_hidden: 400,
      grow_hidden: Some(IMAGE_PIXELS),
      training: TrainingParams::default(),
      seed: 123,
      scaling: PixelScaling::default(),
      image_width: IMAGE_WIDTH,
    }
  }
}

#[derive(Debug, Clone)]
pub struct SessionOutcome {
  pub params: RbmParameters,
  /// one report per training pass
  pub passes: Vec<TrainingReport>,
  /// the batch the model was trained on, after pixel scaling
  pub inputs: Array2<f64>,
  /// up-down reconstruction of `inputs` by the final model
  pub reconstruction: Array2<f64>,
}

/// Train on the whole dataset, optionally grow the hidden layer and train again,
/// then reconstruct the training batch.
///
/// A single generator seeded from `config.seed` drives initialisation and every
/// sampling call of both passes.
#[tracing::instrument(skip_all, fields(samples = dataset.n_samples()))]
pub fn run_session(dataset: &Dataset, config: &SessionConfig) -> Result<SessionOutcome> {
  check_width("dataset", config.n_visible, dataset.n_visible())?;
  if dataset.n_samples() == 0 {
    return Err(RbmError::DimensionMismatch {
      what: "dataset samples",
      expected: 1,
      found: 0,
    });
  }
  let inputs = dataset.activations(config.scaling);
  let mut rng = seeded(config.seed);

  let mut params = RbmParameters::create(config.n_visible, config.n_hidden, &mut rng)?;
  info!(
    "First pass: {} visible, {} hidden, {} epochs",
    config.n_visible, config.n_hidden, config.training.epochs
  );
  let mut passes = vec![train(&mut params, &inputs, &config.training, &mut rng)?];

  if let Some(grow_hidden) = config.grow_hidden {
    params = RbmParameters::grow(&params, grow_hidden, params.n_hidden())?;
    info!("Second pass: grew hidden layer to {}", grow_hidden);
    passes.push(train(&mut params, &inputs, &config.training, &mut rng)?);
  }

  for (i, pass) in passes.iter().enumerate() {
    info!(
      "Pass {} ({} hidden): cost {:.6} -> {:.6}, {} degenerate epochs",
      i + 1,
      pass.n_hidden,
      pass.first_cost().unwrap_or(f64::NAN),
      pass.last_cost().unwrap_or(f64::NAN),
      pass.degenerate_epochs
    );
  }

  let reconstruction = reconstruct(&params, &inputs)?;
  Ok(SessionOutcome {
    params,
    passes,
    inputs,
    reconstruction,
  })
}
