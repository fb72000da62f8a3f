use ndarray::{Array2, Zip};

use crate::{
  error::{RbmError, Result},
  inference::{propagate_down, propagate_up},
  params::RbmParameters,
};

/// Reconstruction cross-entropy of a batch.
///
/// When a reconstructed probability lands on exactly 0 or 1 one of the logarithms is
/// infinite and the metric is undefined. That case is reported as `Degenerate`, the
/// probabilities are never clamped to force a finite number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CrossEntropy {
  Finite(f64),
  Degenerate { saturated: usize },
}

impl CrossEntropy {
  /// The metric as a plain number, NaN when degenerate.
  pub fn value(&self) -> f64 {
    match self {
      CrossEntropy::Finite(v) => *v,
      CrossEntropy::Degenerate { .. } => f64::NAN,
    }
  }

  pub fn is_degenerate(&self) -> bool {
    matches!(self, CrossEntropy::Degenerate { .. })
  }

  pub fn into_result(self) -> Result<f64> {
    match self {
      CrossEntropy::Finite(v) => Ok(v),
      CrossEntropy::Degenerate { saturated } => Err(RbmError::NumericDegeneracy { saturated }),
    }
  }
}

/// -mean over samples of sum over visible units of x ln p + (1 - x) ln(1 - p),
/// where p is the up-down reconstruction of x.
pub fn cross_entropy(params: &RbmParameters, input: &Array2<f64>) -> Result<CrossEntropy> {
  if input.nrows() == 0 {
    return Err(RbmError::DimensionMismatch {
      what: "batch rows",
      expected: 1,
      found: 0,
    });
  }
  let reconstructed = reconstruct(params, input)?;

  let saturated = reconstructed.iter().filter(|&&p| p <= 0.0 || p >= 1.0).count();
  if saturated > 0 {
    return Ok(CrossEntropy::Degenerate { saturated });
  }

  let mut total = 0.0;
  Zip::from(input).and(&reconstructed).for_each(|&x, &p| {
    total += x * p.ln() + (1. - x) * (1. - p).ln();
  });
  Ok(CrossEntropy::Finite(-total / input.nrows() as f64))
}

/// One deterministic up-down pass; returns visible probabilities.
pub fn reconstruct(params: &RbmParameters, visible: &Array2<f64>) -> Result<Array2<f64>> {
  let hidden = propagate_up(visible, params)?;
  propagate_down(&hidden, params)
}
