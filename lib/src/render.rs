//! Turning flat visible vectors back into pictures.
//!
//! Output is a binary PGM (P5) file per image plus a shaded text preview for the
//! terminal; there is no interactive window.

use std::{fmt::Write as _, path::Path};

use itertools::Itertools;
use ndarray::{Array2, ArrayView1};
use tracing::info;

use crate::error::{RbmError, Result};

/// What the values of a grid mean, to map them onto 0..=255 gray levels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GrayScale {
  /// values in [0, 1], e.g. reconstructed probabilities
  Probability,
  /// raw pixel intensities in [0, 255]
  Intensity,
}

impl GrayScale {
  fn level(&self, v: f64) -> u8 {
    let scaled = match self {
      GrayScale::Probability => v.clamp(0., 1.) * 255.,
      GrayScale::Intensity => v.clamp(0., 255.),
    };
    if scaled.is_nan() {
      0
    } else {
      scaled.round() as u8
    }
  }
}

/// Row-major reshape of a flat image, `width` pixels per row.
pub fn reshape_grid(flat: ArrayView1<'_, f64>, width: usize) -> Result<Array2<f64>> {
  if width == 0 || flat.len() % width != 0 {
    return Err(RbmError::InvalidDimension(format!(
      "{} pixels do not form rows of width {}",
      flat.len(),
      width
    )));
  }
  let height = flat.len() / width;
  Array2::from_shape_vec((height, width), flat.to_vec())
    .map_err(|e| RbmError::InvalidDimension(e.to_string()))
}

/// Encodes the grid as a binary portable graymap.
pub fn to_pgm(grid: &Array2<f64>, scale: GrayScale) -> Vec<u8> {
  let (height, width) = grid.dim();
  let mut buff = format!("P5\n{} {}\n255\n", width, height).into_bytes();
  buff.extend(grid.iter().map(|&v| scale.level(v)));
  buff
}

pub fn write_pgm(path: &Path, grid: &Array2<f64>, scale: GrayScale) -> Result<()> {
  std::fs::write(path, to_pgm(grid, scale))?;
  info!("Wrote {}x{} image to {}", grid.ncols(), grid.nrows(), path.display());
  Ok(())
}

const SHADES: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Text rendering, one character per pixel, darker characters for brighter pixels.
pub fn ascii_preview(grid: &Array2<f64>, scale: GrayScale) -> String {
  let mut out = String::new();
  for row in grid.rows() {
    let line: String = row
      .iter()
      .map(|&v| SHADES[scale.level(v) as usize * (SHADES.len() - 1) / 255])
      .collect();
    let _ = writeln!(out, "{}", line.trim_end());
  }
  out
}

/// Original and reconstruction next to each other, separated by a bar.
pub fn side_by_side(left: &str, right: &str, width: usize) -> String {
  left
    .lines()
    .zip_longest(right.lines())
    .map(|pair| {
      let (l, r) = pair.or("", "");
      format!("{:<width$} | {}", l, r, width = width)
    })
    .join("\n")
}
