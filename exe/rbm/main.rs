mod app_config;

use rbm::{
  dataset::{read_dataset, PixelScaling},
  render::{ascii_preview, reshape_grid, side_by_side, write_pgm, GrayScale},
  run_session, utils, SessionOutcome,
};

use app_config::AppConfig;
use clap::{Parser, Subcommand};
use std::{error::Error, path::PathBuf};
use tracing::{info, level_filters::LevelFilter};

#[derive(Parser)]
#[command(version, about = "Restricted Boltzmann Machine trained with contrastive divergence")]
struct Cli {
  /// Log every training step
  #[arg(short, long, global = true)]
  verbose: bool,
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Train, grow the hidden layer, train again and show a reconstruction
  Train {
    /// Text file with one image per line
    #[arg(short, long, value_name = "PATH")]
    data: PathBuf,
    /// YAML file with training settings, overridden by the flags below
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,
    #[arg(short, long, value_name = "INT")]
    epochs: Option<usize>,
    #[arg(long, value_name = "FLOAT")]
    learning_rate: Option<f64>,
    /// Gibbs steps per update
    #[arg(short, value_name = "INT")]
    k: Option<usize>,
    #[arg(long, value_name = "INT")]
    visible: Option<usize>,
    /// Hidden units of the first pass
    #[arg(long, value_name = "INT")]
    hidden: Option<usize>,
    /// Hidden units of the second pass
    #[arg(long, value_name = "INT")]
    grow_hidden: Option<usize>,
    /// Skip the second pass
    #[arg(long)]
    no_grow: bool,
    #[arg(short, long, value_name = "INT")]
    seed: Option<u64>,
    /// Leading samples to train on, 0 for all
    #[arg(long, value_name = "INT")]
    samples: Option<usize>,
    #[arg(long, value_name = "INT")]
    width: Option<usize>,
    /// raw, unit or binary:<threshold>
    #[arg(long)]
    scaling: Option<String>,
    #[arg(long, value_name = "INT")]
    log_every: Option<usize>,
    /// Sample to render
    #[arg(long, value_name = "INT", default_value_t = 0)]
    show: usize,
    /// Directory for PGM images of the shown sample and its reconstruction
    #[arg(long, value_name = "DIR")]
    out_dir: Option<PathBuf>,
    /// Where to write the per-epoch cost history as JSON
    #[arg(long, value_name = "PATH")]
    history: Option<PathBuf>,
  },
}

struct Outputs {
  show: usize,
  /// how to read the trained-on batch as gray levels
  input_scale: GrayScale,
  out_dir: Option<PathBuf>,
  history: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn Error>> {
  let args = Cli::parse();
  let level = if args.verbose {
    LevelFilter::DEBUG
  } else {
    LevelFilter::INFO
  };
  utils::init_logging(level)?;

  match args.command {
    Command::Train {
      data,
      config,
      epochs,
      learning_rate,
      k,
      visible,
      hidden,
      grow_hidden,
      no_grow,
      seed,
      samples,
      width,
      scaling,
      log_every,
      show,
      out_dir,
      history,
    } => {
      let file_config = match config {
        Some(path) => AppConfig::from_file(&path)?,
        None => AppConfig::default(),
      };
      let flags = AppConfig {
        learning_rate,
        k,
        epochs,
        n_visible: visible,
        n_hidden: hidden,
        grow_hidden,
        second_pass: if no_grow { Some(false) } else { None },
        seed,
        samples,
        image_width: width,
        scaling,
        log_every,
      };
      let app_config = file_config.merge(flags);
      let session = app_config.session()?;

      let dataset = read_dataset(&data, session.n_visible, app_config.sample_limit())?;
      let outcome = run_session(&dataset, &session)?;
      report(
        &outcome,
        session.image_width,
        &Outputs {
          show,
          input_scale: match session.scaling {
            PixelScaling::Raw => GrayScale::Intensity,
            _ => GrayScale::Probability,
          },
          out_dir,
          history,
        },
      )?;
    }
  }
  Ok(())
}

fn report(outcome: &SessionOutcome, width: usize, outputs: &Outputs) -> Result<(), Box<dyn Error>> {
  let n = outcome.inputs.nrows();
  if outputs.show >= n {
    return Err(format!("--show {} but only {} samples were loaded", outputs.show, n).into());
  }
  let original = reshape_grid(outcome.inputs.row(outputs.show), width)?;
  let reconstructed = reshape_grid(outcome.reconstruction.row(outputs.show), width)?;

  println!(
    "{}",
    side_by_side(
      &ascii_preview(&original, outputs.input_scale),
      &ascii_preview(&reconstructed, GrayScale::Probability),
      width,
    )
  );

  if let Some(dir) = &outputs.out_dir {
    std::fs::create_dir_all(dir)?;
    write_pgm(
      &dir.join(format!("sample_{}_original.pgm", outputs.show)),
      &original,
      outputs.input_scale,
    )?;
    write_pgm(
      &dir.join(format!("sample_{}_reconstructed.pgm", outputs.show)),
      &reconstructed,
      GrayScale::Probability,
    )?;
  }

  if let Some(path) = &outputs.history {
    utils::serialize_to_file(path, &outcome.passes)?;
    info!("Wrote cost history to {}", path.display());
  }
  Ok(())
}
