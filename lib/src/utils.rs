use serde::Serialize;
use std::path::Path;

#[cfg(not(debug_assertions))]
use human_panic::setup_panic;
use tracing::subscriber::{DefaultGuard, SetGlobalDefaultError};

#[cfg(debug_assertions)]
extern crate better_panic;

use tracing_subscriber::filter::LevelFilter;

use crate::error::Result;

// [NOTE] tracing
//
// Library code only emits events (info! per pass and periodic epochs, debug! per step,
// warn! on degenerate costs). Installing a subscriber is up to the binary or the test.

pub fn install_logger(level: LevelFilter) -> std::result::Result<(), SetGlobalDefaultError> {
  let subscriber = tracing_subscriber::fmt()
    .compact()
    .with_max_level(level)
    .finish();
  tracing::subscriber::set_global_default(subscriber)
}

pub fn init_logging(level: LevelFilter) -> std::result::Result<(), SetGlobalDefaultError> {
  // Human Panic. Only enabled when *not* debugging.
  #[cfg(not(debug_assertions))]
  {
    setup_panic!();
  }

  // Better Panic. Only enabled *when* debugging.
  #[cfg(debug_assertions)]
  {
    better_panic::Settings::debug()
      .most_recent_first(false)
      .lineno_suffix(true)
      .verbosity(better_panic::Verbosity::Full)
      .install();
  }

  install_logger(level)?;

  Ok(())
}

/// Thread-local subscriber for tests, dropped with the guard.
pub fn init_logging_tests() -> DefaultGuard {
  let subscriber = tracing_subscriber::fmt()
    .compact()
    .with_test_writer()
    .with_max_level(LevelFilter::DEBUG)
    .finish();
  tracing::subscriber::set_default(subscriber)
}

pub fn serialize_to_file<T: Serialize>(path: &Path, obj: &T) -> Result<()> {
  let buff = serde_json::to_string_pretty(obj)?;
  std::fs::write(path, buff)?;
  Ok(())
}
