use thiserror::Error;

/// Everything that can go wrong while building, training or evaluating the model.
#[derive(Error, Debug)]
pub enum RbmError {
  /// Non-positive or inconsistent layer sizes.
  #[error("invalid dimension: {0}")]
  InvalidDimension(String),

  /// A batch (or update) is not as wide as the layer it is fed into.
  #[error("dimension mismatch in {what}: expected {expected}, found {found}")]
  DimensionMismatch {
    what: &'static str,
    expected: usize,
    found: usize,
  },

  /// Reconstruction probability hit exactly 0 or 1, cross-entropy is undefined.
  #[error("numeric degeneracy: {saturated} reconstructed probabilities saturated to 0 or 1")]
  NumericDegeneracy { saturated: usize },

  #[error("dataset line {line}: {reason}")]
  Dataset { line: usize, reason: String },

  #[error("config error: {0}")]
  Config(String),

  #[error(transparent)]
  Io(#[from] std::io::Error),

  #[error(transparent)]
  Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RbmError>;

pub(crate) fn check_width(what: &'static str, expected: usize, found: usize) -> Result<()> {
  if expected != found {
    return Err(RbmError::DimensionMismatch {
      what,
      expected,
      found,
    });
  }
  Ok(())
}
