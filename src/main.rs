mod demo;

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use benchtoolz::{
  output, run, skip_flagged, Config, Emphasis, Report, Runner, Suite, TableFormat, TableOptions, TablePresenter,
};
use clap::{ArgAction, Parser, Subcommand};
use env_logger::{Builder, Target};
use log::LevelFilter;

#[derive(Parser)]
#[command(version, about)]
struct Args {
  #[command(subcommand)]
  command: Command,
  #[command(flatten)]
  options: Options,
}

#[derive(clap::Args)]
struct Options {
  /// Shortest accepted trial, in seconds.
  #[arg(long, global = true, default_value_t = 0.25)]
  min_time: f64,
  /// Trials timed at the calibrated iteration count; the fastest is kept.
  #[arg(long, global = true, default_value_t = 3)]
  repeat: u32,
  /// Table style: markdown, plain or csv.
  #[arg(long, global = true, default_value = "markdown")]
  format: TableFormat,
  /// Highlighted cells: best-and-second, best or none.
  #[arg(long, global = true, default_value = "best-and-second")]
  emphasis: Emphasis,
  /// Candidates to leave out.
  #[arg(long, global = true)]
  skip: Vec<String>,
  /// Write the tables to this file instead of stdout.
  #[arg(short, long, global = true)]
  output: Option<PathBuf>,
  /// More logging; repeat for more detail. `RUST_LOG` takes precedence.
  #[arg(short, long, global = true, action = ArgAction::Count)]
  verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Compare four ways of building a vector of zeros.
  Demo {
    /// Length of the larger vector.
    #[arg(long, default_value_t = 100_000)]
    size: usize,
  },
  /// Compare external programs: each candidate is run with each benchmark's
  /// arguments.
  Exec {
    /// NAME=PROGRAM
    #[arg(short, long = "candidate", required = true, value_parser = run::parse_named)]
    candidates: Vec<(String, String)>,
    /// NAME=ARGS, arguments separated by whitespace.
    #[arg(short, long = "bench", required = true, value_parser = run::parse_named)]
    benches: Vec<(String, String)>,
    /// Seconds a single program run may take before it counts as failed.
    #[arg(long, default_value_t = 10.0)]
    timeout: f64,
  },
}

impl Options {
  fn config(&self) -> Result<Config> {
    let config = Config::default()
      .with_min_time_secs(self.min_time)?
      .with_repeat(self.repeat)?
      .with_table(TableOptions {
        format: self.format,
        emphasis: self.emphasis,
      });

    Ok(config)
  }
}

fn init_logging(verbose: u8) {
  let level = match verbose {
    0 => LevelFilter::Info,
    1 => LevelFilter::Debug,
    _ => LevelFilter::Trace,
  };

  if Builder::new()
    .filter_level(level)
    .parse_default_env()
    .target(Target::Stderr)
    .try_init()
    .is_err()
  {
    log::debug!("logger already installed");
  }
}

fn bench<C>(config: &Config, skip: &[String], suite: &Suite<C>) -> Result<Report> {
  let mut runner = Runner::new(config.clone())
    .context("Runner::new")?
    .hook(|trial| skip_flagged(trial) && !skip.iter().any(|name| name == trial.candidate));

  Ok(runner.run(suite))
}

fn main() -> Result<()> {
  let Args { command, options } = Args::parse();
  init_logging(options.verbose);

  let config = options.config().context("config")?;

  let report = match command {
    Command::Demo { size } => bench(&config, &options.skip, &demo::suite(size)).context("demo")?,
    Command::Exec {
      candidates,
      benches,
      timeout,
    } => {
      if timeout <= 0.0 {
        anyhow::bail!("timeout must be a positive number of seconds, got {timeout}");
      }
      let timeout = Duration::try_from_secs_f64(timeout).context("timeout")?;

      let suite = run::program_suite(&candidates, &benches, timeout);
      bench(&config, &options.skip, &suite).context("exec")?
    }
  };

  let presenter = TablePresenter::new(config.table);
  let text = presenter.render_all(&report.matrix) + &presenter.render_failures(&report.failures);

  match &options.output {
    Some(path) => output::write_atomic(path, &text).context("write output")?,
    None => print!("{text}"),
  }

  Ok(())
}
