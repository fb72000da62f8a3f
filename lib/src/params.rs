use ndarray::{concatenate, s, Array1, Array2, Axis};
use rand::Rng;
use tracing::debug;

use crate::{
  error::{check_width, RbmError, Result},
  rng::uniform_matrix,
};

/// Weights and biases of the model.
///
/// `weights` is (n_visible x n_hidden): `weights[[i, j]]` connects visible unit `i`
/// with hidden unit `j`. The shapes always agree with the bias lengths.
#[derive(Debug, Clone, PartialEq)]
pub struct RbmParameters {
  weights: Array2<f64>,
  hidden_bias: Array1<f64>,
  visible_bias: Array1<f64>,
}

impl RbmParameters {
  /// Random weights in [-1/n_visible, 1/n_visible], zero biases.
  pub fn create<R: Rng + ?Sized>(n_visible: usize, n_hidden: usize, rng: &mut R) -> Result<Self> {
    check_counts(n_visible, n_hidden)?;
    let a = 1. / n_visible as f64;
    Ok(Self {
      weights: uniform_matrix(rng, (n_visible, n_hidden), -a, a),
      hidden_bias: Array1::zeros(n_hidden),
      visible_bias: Array1::zeros(n_visible),
    })
  }

  pub fn zeros(n_visible: usize, n_hidden: usize) -> Result<Self> {
    check_counts(n_visible, n_hidden)?;
    Ok(Self {
      weights: Array2::zeros((n_visible, n_hidden)),
      hidden_bias: Array1::zeros(n_hidden),
      visible_bias: Array1::zeros(n_visible),
    })
  }

  pub fn from_parts(
    weights: Array2<f64>,
    hidden_bias: Array1<f64>,
    visible_bias: Array1<f64>,
  ) -> Result<Self> {
    let (rows, cols) = weights.dim();
    check_counts(rows, cols)?;
    if rows != visible_bias.len() || cols != hidden_bias.len() {
      return Err(RbmError::InvalidDimension(format!(
        "weights are {}x{} but biases are visible={} hidden={}",
        rows,
        cols,
        visible_bias.len(),
        hidden_bias.len()
      )));
    }
    Ok(Self {
      weights,
      hidden_bias,
      visible_bias,
    })
  }

  /// Enlarge the hidden layer from `initial_n_hidden` to `new_n_hidden` units.
  ///
  /// New units get zero weight columns and zero bias, so the enlarged model starts out
  /// computing exactly what the old one did on the old units. Equal counts give a copy.
  pub fn grow(existing: &Self, new_n_hidden: usize, initial_n_hidden: usize) -> Result<Self> {
    if initial_n_hidden != existing.n_hidden() {
      return Err(RbmError::InvalidDimension(format!(
        "grow expected a model with {} hidden units, got {}",
        initial_n_hidden,
        existing.n_hidden()
      )));
    }
    if new_n_hidden < initial_n_hidden {
      return Err(RbmError::InvalidDimension(format!(
        "cannot shrink hidden layer from {} to {}",
        initial_n_hidden, new_n_hidden
      )));
    }
    let extra = new_n_hidden - initial_n_hidden;
    debug!(from = initial_n_hidden, to = new_n_hidden, "growing hidden layer");

    let new_columns = Array2::zeros((existing.n_visible(), extra));
    let weights = concatenate(Axis(1), &[existing.weights.view(), new_columns.view()])
      .map_err(|e| RbmError::InvalidDimension(e.to_string()))?;
    let new_bias = Array1::<f64>::zeros(extra);
    let hidden_bias = concatenate(Axis(0), &[existing.hidden_bias.view(), new_bias.view()])
      .map_err(|e| RbmError::InvalidDimension(e.to_string()))?;

    Ok(Self {
      weights,
      hidden_bias,
      visible_bias: existing.visible_bias.clone(),
    })
  }

  /// Adds the deltas in place. Shapes are checked before anything is touched.
  pub fn apply_gradient(
    &mut self,
    delta_w: &Array2<f64>,
    delta_hidden_bias: &Array1<f64>,
    delta_visible_bias: &Array1<f64>,
  ) -> Result<()> {
    check_width("weight delta rows", self.n_visible(), delta_w.nrows())?;
    check_width("weight delta cols", self.n_hidden(), delta_w.ncols())?;
    check_width("hidden bias delta", self.n_hidden(), delta_hidden_bias.len())?;
    check_width("visible bias delta", self.n_visible(), delta_visible_bias.len())?;

    self.weights += delta_w;
    self.hidden_bias += delta_hidden_bias;
    self.visible_bias += delta_visible_bias;
    Ok(())
  }

  pub fn n_visible(&self) -> usize {
    self.visible_bias.len()
  }

  pub fn n_hidden(&self) -> usize {
    self.hidden_bias.len()
  }

  pub fn weights(&self) -> &Array2<f64> {
    &self.weights
  }

  pub fn hidden_bias(&self) -> &Array1<f64> {
    &self.hidden_bias
  }

  pub fn visible_bias(&self) -> &Array1<f64> {
    &self.visible_bias
  }

  /// The weight columns of the first `n` hidden units.
  #[cfg(test)]
  pub(crate) fn hidden_prefix(&self, n: usize) -> ndarray::ArrayView2<'_, f64> {
    self.weights.slice(s![.., ..n.min(self.n_hidden())])
  }
}

fn check_counts(n_visible: usize, n_hidden: usize) -> Result<()> {
  if n_visible == 0 || n_hidden == 0 {
    return Err(RbmError::InvalidDimension(format!(
      "layer sizes must be positive, got n_visible={} n_hidden={}",
      n_visible, n_hidden
    )));
  }
  Ok(())
}
