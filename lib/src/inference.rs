//! Layer-to-layer activation probabilities and stochastic unit sampling.
//!
//! All functions work on whole batches: one row per sample. None of them keep
//! state; the random generator is always passed in by the caller.

use ndarray::Array2;
use rand::Rng;

use crate::{error::check_width, error::Result, params::RbmParameters, rng::bernoulli_matrix};

/// Mean activations of a layer together with one binary draw from them.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSample {
  pub mean: Array2<f64>,
  pub sample: Array2<f64>,
}

/// Logistic function. Overflow in `exp` just saturates the result to 0 or 1.
pub fn sigmoid(x: f64) -> f64 {
  1. / (1. + (-x).exp())
}

/// sigmoid(visible . W + hidden_bias)
pub fn propagate_up(visible: &Array2<f64>, params: &RbmParameters) -> Result<Array2<f64>> {
  check_width("visible batch", params.n_visible(), visible.ncols())?;
  let pre_sigmoid = visible.dot(params.weights()) + params.hidden_bias();
  Ok(pre_sigmoid.mapv_into(sigmoid))
}

/// sigmoid(hidden . W^T + visible_bias)
pub fn propagate_down(hidden: &Array2<f64>, params: &RbmParameters) -> Result<Array2<f64>> {
  check_width("hidden batch", params.n_hidden(), hidden.ncols())?;
  let pre_sigmoid = hidden.dot(&params.weights().t()) + params.visible_bias();
  Ok(pre_sigmoid.mapv_into(sigmoid))
}

pub fn sample_hidden_given_visible<R: Rng + ?Sized>(
  visible: &Array2<f64>,
  params: &RbmParameters,
  rng: &mut R,
) -> Result<LayerSample> {
  let mean = propagate_up(visible, params)?;
  let sample = bernoulli_matrix(rng, &mean);
  Ok(LayerSample { mean, sample })
}

pub fn sample_visible_given_hidden<R: Rng + ?Sized>(
  hidden: &Array2<f64>,
  params: &RbmParameters,
  rng: &mut R,
) -> Result<LayerSample> {
  let mean = propagate_down(hidden, params)?;
  let sample = bernoulli_matrix(rng, &mean);
  Ok(LayerSample { mean, sample })
}
