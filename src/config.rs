use std::time::Duration;

use crate::format::TableOptions;

pub const DEFAULT_MIN_TIME: Duration = Duration::from_millis(250);
pub const DEFAULT_REPEAT: u32 = 3;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
  #[error("min_time must be a positive number of seconds, got {0}")]
  MinTime(f64),
  #[error("repeat must be at least 1")]
  Repeat,
  #[error("unknown table format {0:?} (expected markdown, plain or csv)")]
  TableFormat(String),
  #[error("unknown emphasis {0:?} (expected best-and-second, best or none)")]
  Emphasis(String),
}

/// Settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
  /// The shortest trial the calibrator accepts.
  pub min_time: Duration,
  /// Trials timed at the calibrated iteration count, the calibration trial
  /// included. The fastest one is kept.
  pub repeat: u32,
  pub table: TableOptions,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      min_time: DEFAULT_MIN_TIME,
      repeat: DEFAULT_REPEAT,
      table: TableOptions::default(),
    }
  }
}

impl Config {
  pub fn with_min_time_secs(mut self, secs: f64) -> Result<Self, ConfigError> {
    if !secs.is_finite() || secs <= 0.0 {
      return Err(ConfigError::MinTime(secs));
    }

    self.min_time = Duration::try_from_secs_f64(secs).map_err(|_| ConfigError::MinTime(secs))?;
    self.validate()?;

    Ok(self)
  }

  pub fn with_repeat(mut self, repeat: u32) -> Result<Self, ConfigError> {
    self.repeat = repeat;
    self.validate()?;

    Ok(self)
  }

  pub fn with_table(mut self, table: TableOptions) -> Self {
    self.table = table;
    self
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.min_time.is_zero() {
      return Err(ConfigError::MinTime(0.0));
    }
    if self.repeat == 0 {
      return Err(ConfigError::Repeat);
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults() {
    let config = Config::default();
    assert_eq!(config.min_time, Duration::from_secs_f64(0.25));
    assert_eq!(config.repeat, 3);
    assert!(config.validate().is_ok());
  }

  #[test]
  fn rejects_bad_min_time() {
    for secs in [0.0, -1.0, f64::NAN, f64::INFINITY, 1e-12] {
      assert!(Config::default().with_min_time_secs(secs).is_err(), "{secs}");
    }
    assert_eq!(
      Config::default().with_min_time_secs(0.1).unwrap().min_time,
      Duration::from_millis(100)
    );
  }

  #[test]
  fn rejects_zero_repeat() {
    assert_eq!(Config::default().with_repeat(0), Err(ConfigError::Repeat));

    let config = Config {
      min_time: Duration::ZERO,
      ..Config::default()
    };
    assert_eq!(config.validate(), Err(ConfigError::MinTime(0.0)));
  }
}
