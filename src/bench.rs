use std::{
  any::Any,
  ops::ControlFlow,
  panic::{self, AssertUnwindSafe},
  time::Duration,
};

use anyhow::{Context, Result};

use crate::{
  config::{Config, ConfigError},
  ext::FloatExt,
  measure::{Calibrator, Measurer, WallClock},
  stats::{Measurement, ResultMatrix},
  suite::{Attr, Attrs, Suite, SKIP},
};

/// A pair about to be timed, as seen by the trial hook.
pub struct Trial<'a> {
  pub benchmark: &'a str,
  pub benchmark_index: usize,
  pub candidate: &'a str,
  pub candidate_index: usize,
  /// A copy of the candidate's attributes; changes stay with this trial.
  pub attrs: Attrs,
  /// Calibration threshold for this pair only.
  pub min_time: Duration,
  /// The benchmark body bound to the candidate, ready to call.
  pub callable: &'a mut dyn FnMut() -> Result<()>,
}

/// Why a pair has no measurement.
#[derive(Debug, thiserror::Error)]
pub enum TrialError {
  #[error("{0:#}")]
  Failed(anyhow::Error),
  #[error("panicked: {0}")]
  Panicked(String),
}

#[derive(Debug)]
pub struct Failure {
  pub benchmark: String,
  pub candidate: String,
  pub error: TrialError,
}

/// Everything a run produced. Skipped pairs appear nowhere; failed pairs only
/// in `failures`.
#[derive(Debug, Default)]
pub struct Report {
  pub matrix: ResultMatrix,
  pub failures: Vec<Failure>,
  /// Set when the measurement callback ended the run early.
  pub stopped: bool,
}

type Hook<'a> = Box<dyn FnMut(&mut Trial<'_>) -> bool + 'a>;
type Callback<'a> = Box<dyn FnMut(&Measurement) -> ControlFlow<()> + 'a>;

/// Times every (benchmark, candidate) pair of a [`Suite`], one at a time, in
/// suite order.
pub struct Runner<'a, M = WallClock> {
  config: Config,
  measurer: M,
  hook: Option<Hook<'a>>,
  callback: Option<Callback<'a>>,
}

impl<'a> Runner<'a, WallClock> {
  /// Fails if `config` is invalid, before anything is timed.
  pub fn new(config: Config) -> Result<Self, ConfigError> {
    config.validate()?;

    Ok(Self {
      config,
      measurer: WallClock,
      hook: None,
      callback: None,
    })
  }
}

impl<'a, M: Measurer> Runner<'a, M> {
  pub fn with_measurer<N: Measurer>(self, measurer: N) -> Runner<'a, N> {
    Runner {
      config: self.config,
      measurer,
      hook: self.hook,
      callback: self.callback,
    }
  }

  /// Called before each pair; returning `false` skips it.
  pub fn hook(mut self, hook: impl FnMut(&mut Trial<'_>) -> bool + 'a) -> Self {
    self.hook = Some(Box::new(hook));
    self
  }

  /// Called after each completed pair; `ControlFlow::Break` ends the run.
  pub fn on_measurement(mut self, callback: impl FnMut(&Measurement) -> ControlFlow<()> + 'a) -> Self {
    self.callback = Some(Box::new(callback));
    self
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  pub fn run<C>(&mut self, suite: &Suite<C>) -> Report {
    let mut report = Report {
      matrix: ResultMatrix::new(
        suite.benchmarks().iter().map(|b| b.name.as_str()),
        suite.candidates().iter().map(|c| c.name.as_str()),
      ),
      ..Report::default()
    };

    log::debug!(
      "running {} benchmarks against {} candidates",
      suite.benchmarks().len(),
      suite.candidates().len()
    );

    'benchmarks: for (benchmark_index, benchmark) in suite.benchmarks().iter().enumerate() {
      for (candidate_index, candidate) in suite.candidates().iter().enumerate() {
        let mut bound = || benchmark.call(&candidate.func);
        let mut min_time = self.config.min_time;

        if let Some(hook) = self.hook.as_mut() {
          let mut trial = Trial {
            benchmark: &benchmark.name,
            benchmark_index,
            candidate: &candidate.name,
            candidate_index,
            attrs: candidate.attrs.clone(),
            min_time,
            callable: &mut bound,
          };

          let keep = match panic::catch_unwind(AssertUnwindSafe(|| hook(&mut trial))) {
            Ok(keep) => keep,
            Err(payload) => {
              let error = TrialError::Panicked(panic_message(payload));
              log::warn!("{} / {}: hook {error}", benchmark.name, candidate.name);
              report.failures.push(Failure {
                benchmark: benchmark.name.clone(),
                candidate: candidate.name.clone(),
                error,
              });
              continue;
            }
          };

          if !keep {
            log::debug!("{} / {}: skipped", benchmark.name, candidate.name);
            continue;
          }

          if trial.min_time.is_zero() {
            log::warn!(
              "{} / {}: hook set a zero min_time, keeping {:?}",
              benchmark.name,
              candidate.name,
              min_time
            );
          } else {
            min_time = trial.min_time;
          }
        }

        let (iterations, samples) = match self.sample(&mut bound, min_time) {
          Ok(sampled) => sampled,
          Err(error) => {
            log::warn!("{} / {}: {error}", benchmark.name, candidate.name);
            report.failures.push(Failure {
              benchmark: benchmark.name.clone(),
              candidate: candidate.name.clone(),
              error,
            });
            continue;
          }
        };

        let measurement = Measurement {
          benchmark: benchmark.name.clone(),
          candidate: candidate.name.clone(),
          iterations,
          elapsed: samples.iter().copied().min().unwrap_or_default(),
          samples,
        };
        log_measurement(&measurement);

        if !report.matrix.record(measurement.clone()) {
          log::warn!(
            "{} / {}: duplicate name, measurement dropped",
            benchmark.name,
            candidate.name
          );
          continue;
        }

        let flow = match self.callback.as_mut() {
          Some(callback) => callback(&measurement),
          None => ControlFlow::Continue(()),
        };

        if flow.is_break() {
          report.stopped = true;
          break 'benchmarks;
        }
      }
    }

    report
  }

  /// Calibrates, then repeats the calibrated count until `repeat` trials
  /// exist. Errors and panics from the callable end the pair.
  fn sample(
    &mut self,
    f: &mut dyn FnMut() -> Result<()>,
    min_time: Duration,
  ) -> Result<(u64, Vec<Duration>), TrialError> {
    let calibrator = Calibrator::new(min_time);
    let repeat = self.config.repeat;
    let measurer = &mut self.measurer;

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| -> Result<(u64, Vec<Duration>)> {
      let calibration = calibrator.calibrate(&mut *measurer, &mut *f).context("calibrate")?;

      let mut samples = vec![calibration.elapsed];
      for _ in 1..repeat {
        let elapsed = measurer
          .measure(&mut *f, calibration.iterations)
          .context("repeat")?;
        samples.push(elapsed);
      }

      Ok((calibration.iterations, samples))
    }));

    match outcome {
      Ok(Ok(sampled)) => Ok(sampled),
      Ok(Err(error)) => Err(TrialError::Failed(error)),
      Err(payload) => Err(TrialError::Panicked(panic_message(payload))),
    }
  }
}

/// A hook that skips candidates carrying `skip = true`.
pub fn skip_flagged(trial: &mut Trial<'_>) -> bool {
  !matches!(trial.attrs.get(SKIP), Some(Attr::Flag(true)))
}

fn log_measurement(measurement: &Measurement) {
  let per_iteration = measurement.per_iteration();
  let unit = per_iteration.best_unit();

  log::info!(
    "{} / {}: {} {} (2^{} = {} loops)",
    measurement.benchmark,
    measurement.candidate,
    (per_iteration * unit.scale).to_sig(3),
    unit.symbol(),
    measurement.iterations.trailing_zeros(),
    measurement.iterations,
  );
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
  if let Some(message) = payload.downcast_ref::<&str>() {
    message.to_string()
  } else if let Some(message) = payload.downcast_ref::<String>() {
    message.clone()
  } else {
    "non-string panic payload".to_string()
  }
}
