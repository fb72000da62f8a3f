//! The random source threaded through every stochastic call.
//!
//! Nothing here keeps state of its own: callers own a single generator and pass
//! `&mut` to it everywhere, so the order of draws is fixed by the call order.

use ndarray::Array2;
use rand::{
  distributions::{Distribution, Uniform},
  rngs::StdRng,
  Rng, SeedableRng,
};

pub fn seeded(seed: u64) -> StdRng {
  StdRng::seed_from_u64(seed)
}

/// Matrix of i.i.d. draws from uniform(low, high), filled row by row.
pub fn uniform_matrix<R: Rng + ?Sized>(
  rng: &mut R,
  (rows, cols): (usize, usize),
  low: f64,
  high: f64,
) -> Array2<f64> {
  let dist = Uniform::new(low, high);
  Array2::from_shape_fn((rows, cols), |_| dist.sample(rng))
}

/// One Bernoulli draw per entry with success probability equal to the entry.
/// Draws happen in row-major order regardless of the memory layout of `probabilities`.
pub fn bernoulli_matrix<R: Rng + ?Sized>(rng: &mut R, probabilities: &Array2<f64>) -> Array2<f64> {
  Array2::from_shape_fn(probabilities.dim(), |idx| {
    if rng.gen::<f64>() < probabilities[idx] {
      1.0
    } else {
      0.0
    }
  })
}
