use ndarray::Array2;
use rand::Rng;

use crate::{
  error::Result,
  inference::{sample_hidden_given_visible, sample_visible_given_hidden, LayerSample},
  params::RbmParameters,
};

/// Result of one hidden -> visible -> hidden transition.
#[derive(Debug, Clone, PartialEq)]
pub struct GibbsStep {
  pub visible: LayerSample,
  pub hidden: LayerSample,
}

/// One full transition of the chain starting from a hidden sample.
pub fn step<R: Rng + ?Sized>(
  hidden_sample: &Array2<f64>,
  params: &RbmParameters,
  rng: &mut R,
) -> Result<GibbsStep> {
  let visible = sample_visible_given_hidden(hidden_sample, params, rng)?;
  let hidden = sample_hidden_given_visible(&visible.sample, params, rng)?;
  Ok(GibbsStep { visible, hidden })
}

/// `k` chained transitions, each fed with the previous hidden sample. Only the last one is kept.
pub fn run_chain<R: Rng + ?Sized>(
  chain_start: &Array2<f64>,
  k: usize,
  params: &RbmParameters,
  rng: &mut R,
) -> Result<Option<GibbsStep>> {
  let mut last: Option<GibbsStep> = None;
  for _ in 0..k {
    let input = last.as_ref().map_or(chain_start, |s| &s.hidden.sample);
    last = Some(step(input, params, rng)?);
  }
  Ok(last)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{inference::propagate_up, rng::seeded};
  use ndarray::array;

  fn params() -> RbmParameters {
    RbmParameters::create(4, 3, &mut seeded(5)).unwrap()
  }

  #[test]
  fn step_shapes_follow_layers() {
    let p = params();
    let h = array![[1., 0., 1.], [0., 0., 1.]];
    let s = step(&h, &p, &mut seeded(9)).unwrap();
    assert_eq!(s.visible.mean.dim(), (2, 4));
    assert_eq!(s.visible.sample.dim(), (2, 4));
    assert_eq!(s.hidden.mean.dim(), (2, 3));
    assert_eq!(s.hidden.sample.dim(), (2, 3));
  }

  #[test]
  fn hidden_mean_comes_from_visible_sample() {
    let p = params();
    let h = array![[1., 1., 0.]];
    let s = step(&h, &p, &mut seeded(1)).unwrap();
    assert_eq!(s.hidden.mean, propagate_up(&s.visible.sample, &p).unwrap());
  }

  #[test]
  fn chain_of_two_equals_two_manual_steps() {
    let p = params();
    let h = array![[0., 1., 1.]];
    let chained = run_chain(&h, 2, &p, &mut seeded(4)).unwrap().unwrap();

    let mut rng = seeded(4);
    let first = step(&h, &p, &mut rng).unwrap();
    let second = step(&first.hidden.sample, &p, &mut rng).unwrap();
    assert_eq!(chained, second);
  }

  #[test]
  fn empty_chain_yields_nothing() {
    let p = params();
    assert!(run_chain(&array![[0., 0., 0.]], 0, &p, &mut seeded(0)).unwrap().is_none());
  }
}
