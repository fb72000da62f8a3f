use std::{fmt, path::Path, str::FromStr};

use ndarray::Array2;
use tracing::info;

use crate::error::{RbmError, Result};

/// Width of the 28x28 images the tool was written for.
pub const IMAGE_WIDTH: usize = 28;
pub const IMAGE_PIXELS: usize = IMAGE_WIDTH * IMAGE_WIDTH;

/// How integer pixel intensities become visible-unit activations.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub enum PixelScaling {
  /// intensity taken as is
  Raw,
  /// intensity / 255
  #[default]
  Unit,
  /// 1 when intensity >= threshold, 0 otherwise
  Binary { threshold: u8 },
}

impl PixelScaling {
  pub fn apply(&self, pixel: u8) -> f64 {
    match self {
      PixelScaling::Raw => pixel as f64,
      PixelScaling::Unit => pixel as f64 / 255.,
      PixelScaling::Binary { threshold } => {
        if pixel >= *threshold {
          1.
        } else {
          0.
        }
      }
    }
  }
}

/// Accepts `raw`, `unit` and `binary:<threshold>`.
impl FromStr for PixelScaling {
  type Err = RbmError;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "raw" => Ok(PixelScaling::Raw),
      "unit" => Ok(PixelScaling::Unit),
      _ => match s.strip_prefix("binary:") {
        Some(t) => t
          .parse::<u8>()
          .map(|threshold| PixelScaling::Binary { threshold })
          .map_err(|e| RbmError::Config(format!("bad binary threshold {:?}: {}", t, e))),
        None => Err(RbmError::Config(format!("unknown pixel scaling {:?}", s))),
      },
    }
  }
}

impl fmt::Display for PixelScaling {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PixelScaling::Raw => write!(f, "raw"),
      PixelScaling::Unit => write!(f, "unit"),
      PixelScaling::Binary { threshold } => write!(f, "binary:{}", threshold),
    }
  }
}

/// Images as loaded from disk, one row per sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
  pixels: Array2<u8>,
}

impl Dataset {
  pub fn new(pixels: Array2<u8>) -> Self {
    Self { pixels }
  }

  pub fn n_samples(&self) -> usize {
    self.pixels.nrows()
  }

  pub fn n_visible(&self) -> usize {
    self.pixels.ncols()
  }

  pub fn pixels(&self) -> &Array2<u8> {
    &self.pixels
  }

  /// The batch the model is trained on.
  pub fn activations(&self, scaling: PixelScaling) -> Array2<f64> {
    self.pixels.mapv(|p| scaling.apply(p))
  }
}

/// One sample per line, `n_visible` integers in [0, 255] separated by whitespace.
/// Blank lines are skipped; `limit` keeps only the first samples.
pub fn parse_dataset(content: &str, n_visible: usize, limit: Option<usize>) -> Result<Dataset> {
  let mut values: Vec<u8> = Vec::new();
  let mut rows = 0;
  for (idx, line) in content.lines().enumerate() {
    if limit.map_or(false, |l| rows >= l) {
      break;
    }
    if line.trim().is_empty() {
      continue;
    }
    let before = values.len();
    for token in line.split_whitespace() {
      let v = token.parse::<u8>().map_err(|e| RbmError::Dataset {
        line: idx + 1,
        reason: format!("{:?} is not a pixel value in 0..=255 ({})", token, e),
      })?;
      values.push(v);
    }
    let found = values.len() - before;
    if found != n_visible {
      return Err(RbmError::Dataset {
        line: idx + 1,
        reason: format!("expected {} values, found {}", n_visible, found),
      });
    }
    rows += 1;
  }
  let pixels = Array2::from_shape_vec((rows, n_visible), values).map_err(|e| RbmError::Dataset {
    line: 0,
    reason: e.to_string(),
  })?;
  Ok(Dataset::new(pixels))
}

pub fn read_dataset(path: &Path, n_visible: usize, limit: Option<usize>) -> Result<Dataset> {
  let content = std::fs::read_to_string(path)?;
  let ds = parse_dataset(&content, n_visible, limit)?;
  info!(
    "Loaded {} samples of {} pixels from {}",
    ds.n_samples(),
    ds.n_visible(),
    path.display()
  );
  Ok(ds)
}

#[cfg(test)]
mod tests {
  use super::*;
  use ndarray::array;

  #[test]
  fn parses_rows_and_skips_blank_lines() {
    let ds = parse_dataset("0 255 12\n\n7 8 9\n", 3, None).unwrap();
    assert_eq!(ds.pixels(), &array![[0u8, 255, 12], [7, 8, 9]]);
    assert_eq!(ds.n_samples(), 2);
    assert_eq!(ds.n_visible(), 3);
  }

  #[test]
  fn limit_keeps_leading_samples() {
    let ds = parse_dataset("1 2\n3 4\n5 6\n", 2, Some(2)).unwrap();
    assert_eq!(ds.pixels(), &array![[1u8, 2], [3, 4]]);
  }

  #[test]
  fn ragged_line_is_reported_with_its_number() {
    let err = parse_dataset("1 2 3\n4 5\n", 3, None).unwrap_err();
    assert!(matches!(err, RbmError::Dataset { line: 2, .. }));
  }

  #[test]
  fn out_of_range_pixel_is_rejected() {
    assert!(matches!(
      parse_dataset("1 256\n", 2, None),
      Err(RbmError::Dataset { line: 1, .. })
    ));
    assert!(parse_dataset("1 x\n", 2, None).is_err());
  }

  #[test]
  fn scaling_policies() {
    let ds = Dataset::new(array![[0u8, 128, 255]]);
    assert_eq!(ds.activations(PixelScaling::Raw), array![[0., 128., 255.]]);
    assert_eq!(ds.activations(PixelScaling::Unit), array![[0., 128. / 255., 1.]]);
    assert_eq!(
      ds.activations(PixelScaling::Binary { threshold: 128 }),
      array![[0., 1., 1.]]
    );
  }

  #[test]
  fn unit_scaling_is_the_default() {
    assert_eq!(PixelScaling::default(), PixelScaling::Unit);
  }

  #[test]
  fn scaling_from_str_round_trips_display() {
    for s in ["raw", "unit", "binary:40"] {
      assert_eq!(s.parse::<PixelScaling>().unwrap().to_string(), s);
    }
    assert!("binary:300".parse::<PixelScaling>().is_err());
    assert!("gamma".parse::<PixelScaling>().is_err());
  }

  #[test]
  fn missing_file_is_an_io_error() {
    let err = read_dataset(Path::new("/definitely/not/here.txt"), 4, None).unwrap_err();
    assert!(matches!(err, RbmError::Io(_)));
  }
}
