use std::{
  process::{Child, ExitStatus},
  time::Duration,
};

use anyhow::{Context, Result};
use wait_timeout::ChildExt as WaitExt;

use crate::stats::Unit;

#[extend::ext(name = FloatExt)]
pub impl f64 {
  /// Formats with `digits` significant digits, switching to exponent notation
  /// for very large or very small magnitudes (the `%g` rules).
  fn to_sig(self, digits: usize) -> String {
    if self == 0.0 {
      return "0".to_string();
    }
    if !self.is_finite() {
      return self.to_string();
    }

    let digits = digits.max(1);
    let sci = format!("{self:.prec$e}", prec = digits - 1);
    let Some((mantissa, exp)) = sci.split_once('e') else {
      return sci;
    };
    let Ok(exp) = exp.parse::<i32>() else {
      return sci;
    };

    if exp < -4 || exp >= digits as i32 {
      let sign = if exp < 0 { '-' } else { '+' };
      format!("{}e{sign}{:02}", trim_zeros(mantissa), exp.abs())
    } else {
      let decimals = (digits as i32 - 1 - exp).max(0) as usize;
      trim_zeros(&format!("{self:.decimals$}")).to_string()
    }
  }

  /// Picks the SI prefix that puts a number of seconds in `[1, 1000)`.
  fn best_unit(self) -> Unit {
    let (scale, prefix) = match self {
      n if n < 1e-12 => (1e15, "f"),
      n if n < 1e-9 => (1e12, "p"),
      n if n < 1e-6 => (1e9, "n"),
      n if n < 1e-3 => (1e6, "u"),
      n if n < 1.0 => (1e3, "m"),
      n if n < 1e3 => (1.0, ""),
      n if n < 1e6 => (1e-3, "k"),
      n if n < 1e9 => (1e-6, "M"),
      n if n < 1e12 => (1e-9, "G"),
      _ => (1e-12, "T"),
    };

    Unit { scale, prefix }
  }
}

fn trim_zeros(number: &str) -> &str {
  if number.contains('.') {
    number.trim_end_matches('0').trim_end_matches('.')
  } else {
    number
  }
}

#[extend::ext(name = StatusExt)]
pub impl ExitStatus {
  fn check_success(&self) -> Result<()> {
    if !self.success() {
      anyhow::bail!("exited with non-zero status {self}");
    }

    Ok(())
  }
}

#[extend::ext(name = ChildTimeoutExt)]
pub impl Child {
  /// Returns an error if the exit status was non-zero or if the child is
  /// still running after `timeout`, in which case it is killed.
  fn check_success_timeout(&mut self, timeout: Duration) -> Result<()> {
    let Some(status) = self.wait_timeout(timeout).context("wait")? else {
      self.kill().context("kill after timeout")?;
      self.wait().context("reap after kill")?;

      anyhow::bail!("timed out after {timeout:?}");
    };

    status.check_success()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn significant_digits() {
    assert_eq!(0.0_f64.to_sig(3), "0");
    assert_eq!(1.0_f64.to_sig(3), "1");
    assert_eq!(0.5_f64.to_sig(3), "0.5");
    assert_eq!(12.345_f64.to_sig(3), "12.3");
    assert_eq!((2.0_f64 / 3.0).to_sig(3), "0.667");
    assert_eq!(0.000123_f64.to_sig(3), "0.000123");
    assert_eq!(1234.5_f64.to_sig(3), "1.23e+03");
    assert_eq!(999.6_f64.to_sig(3), "1e+03");
    assert_eq!(0.00001_f64.to_sig(3), "1e-05");
    assert_eq!(f64::INFINITY.to_sig(3), "inf");
  }

  #[test]
  fn unit_selection() {
    assert_eq!(2.5e-7_f64.best_unit().prefix, "n");
    assert_eq!(2.5e-4_f64.best_unit().prefix, "u");
    assert_eq!(0.25_f64.best_unit().prefix, "m");
    assert_eq!(3.0_f64.best_unit().prefix, "");
    assert_eq!(1e-13_f64.best_unit().prefix, "f");
    assert_eq!(2e13_f64.best_unit().prefix, "T");

    let unit = 0.004_f64.best_unit();
    assert!((0.004 * unit.scale - 4.0).abs() < 1e-9);
  }

  #[test]
  fn child_exit_status() {
    let mut ok = std::process::Command::new("true").spawn().unwrap();
    assert!(ok.check_success_timeout(Duration::from_secs(5)).is_ok());

    let mut failed = std::process::Command::new("false").spawn().unwrap();
    assert!(failed.check_success_timeout(Duration::from_secs(5)).is_err());
  }
}
