use std::path::Path;

use rbm::{dataset::PixelScaling, error::RbmError, SessionConfig, TrainingParams};
use serde::Deserialize;

/// Training settings as read from a YAML file or the command line.
/// Also defines the config file format (every field can be omitted).
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
  /// Step size of the gradient updates
  pub learning_rate: Option<f64>,
  /// Gibbs steps per contrastive divergence update
  pub k: Option<usize>,
  /// Epochs of each training pass
  pub epochs: Option<usize>,
  pub n_visible: Option<usize>,
  /// Hidden units of the first pass
  pub n_hidden: Option<usize>,
  /// Hidden units of the second pass
  pub grow_hidden: Option<usize>,
  /// Whether to run the second, grown pass at all
  pub second_pass: Option<bool>,
  pub seed: Option<u64>,
  /// How many leading samples of the dataset to use, 0 for all
  pub samples: Option<usize>,
  pub image_width: Option<usize>,
  /// `raw`, `unit` or `binary:<threshold>`
  pub scaling: Option<String>,
  pub log_every: Option<usize>,
}

const DEFAULT_SAMPLES: usize = 2;

impl AppConfig {
  pub fn from_file(path: &Path) -> Result<Self, RbmError> {
    let content = std::fs::read_to_string(path)?;
    Self::from_yaml(&content)
  }

  pub fn from_yaml(content: &str) -> Result<Self, RbmError> {
    serde_yaml::from_str(content).map_err(|e| RbmError::Config(e.to_string()))
  }

  // merge configs where the second overwrites the first
  pub fn merge(self, other: Self) -> Self {
    Self {
      learning_rate: other.learning_rate.or(self.learning_rate),
      k: other.k.or(self.k),
      epochs: other.epochs.or(self.epochs),
      n_visible: other.n_visible.or(self.n_visible),
      n_hidden: other.n_hidden.or(self.n_hidden),
      grow_hidden: other.grow_hidden.or(self.grow_hidden),
      second_pass: other.second_pass.or(self.second_pass),
      seed: other.seed.or(self.seed),
      samples: other.samples.or(self.samples),
      image_width: other.image_width.or(self.image_width),
      scaling: other.scaling.or(self.scaling),
      log_every: other.log_every.or(self.log_every),
    }
  }

  /// Sample limit for the dataset reader.
  pub fn sample_limit(&self) -> Option<usize> {
    match self.samples.unwrap_or(DEFAULT_SAMPLES) {
      0 => None,
      n => Some(n),
    }
  }

  /// Fills the gaps with the defaults of the original two-pass run.
  pub fn session(&self) -> Result<SessionConfig, RbmError> {
    let defaults = SessionConfig::default();
    let training_defaults = TrainingParams::default();
    let scaling = match &self.scaling {
      Some(s) => s.parse::<PixelScaling>()?,
      None => defaults.scaling,
    };
    let grow_hidden = if self.second_pass.unwrap_or(true) {
      Some(self.grow_hidden.or(defaults.grow_hidden).unwrap_or(defaults.n_visible))
    } else {
      None
    };
    Ok(SessionConfig {
      n_visible: self.n_visible.unwrap_or(defaults.n_visible),
      n_hidden: self.n_hidden.unwrap_or(defaults.n_hidden),
      grow_hidden,
      training: TrainingParams {
        epochs: self.epochs.unwrap_or(training_defaults.epochs),
        learning_rate: self.learning_rate.unwrap_or(training_defaults.learning_rate),
        k: self.k.unwrap_or(training_defaults.k),
        log_every: self.log_every.unwrap_or(training_defaults.log_every),
      },
      seed: self.seed.unwrap_or(defaults.seed),
      scaling,
      image_width: self.image_width.unwrap_or(defaults.image_width),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_reproduce_the_two_pass_run() {
    let s = AppConfig::default().session().unwrap();
    assert_eq!(s.n_visible, 784);
    assert_eq!(s.n_hidden, 400);
    assert_eq!(s.grow_hidden, Some(784));
    assert_eq!(s.training.epochs, 200);
    assert_eq!(s.training.k, 1);
    assert_eq!(s.seed, 123);
    assert_eq!(AppConfig::default().sample_limit(), Some(2));
  }

  #[test]
  fn later_config_wins() {
    let file = AppConfig::from_yaml("epochs: 50\nseed: 7\nscaling: binary:100\n").unwrap();
    let flags = AppConfig {
      seed: Some(8),
      ..AppConfig::default()
    };
    let merged = file.merge(flags);
    let s = merged.session().unwrap();
    assert_eq!(s.training.epochs, 50);
    assert_eq!(s.seed, 8);
    assert_eq!(s.scaling, PixelScaling::Binary { threshold: 100 });
  }

  #[test]
  fn second_pass_can_be_disabled() {
    let c = AppConfig::from_yaml("second_pass: false\nsamples: 0\n").unwrap();
    assert_eq!(c.session().unwrap().grow_hidden, None);
    assert_eq!(c.sample_limit(), None);
  }

  #[test]
  fn bad_files_are_config_errors() {
    assert!(matches!(AppConfig::from_yaml("epoch: 3\n"), Err(RbmError::Config(_))));
    let bad_scaling = AppConfig {
      scaling: Some("sepia".to_string()),
      ..AppConfig::default()
    };
    assert!(bad_scaling.session().is_err());
  }
}
