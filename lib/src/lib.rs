//! Restricted Boltzmann Machine trained with contrastive divergence (CD-k).
//!
//! The model lives in [`params`]; [`inference`] and [`gibbs`] sample from it,
//! [`trainer`] updates it and [`evaluate`] scores reconstructions. [`session`] wires
//! those into the grow-and-retrain run driven by the `rbm-train` binary.

pub mod dataset;
pub mod error;
pub mod evaluate;
pub mod gibbs;
pub mod inference;
pub mod params;
pub mod render;
pub mod rng;
pub mod session;
pub mod trainer;
pub mod utils;

pub use error::{RbmError, Result};
pub use evaluate::{cross_entropy, reconstruct, CrossEntropy};
pub use params::RbmParameters;
pub use session::{run_session, SessionConfig, SessionOutcome};
pub use trainer::{train, train_step, TrainingParams, TrainingReport};
