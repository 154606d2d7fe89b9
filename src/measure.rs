use std::{
  hint::black_box,
  time::{Duration, Instant},
};

use anyhow::{Context, Result};

/// Times a fixed number of back-to-back calls.
pub trait Measurer {
  /// Calls `f` exactly `iterations` times and returns the total elapsed time.
  /// The first error returned by `f` ends the trial and is passed through.
  fn measure(&mut self, f: &mut dyn FnMut() -> Result<()>, iterations: u64) -> Result<Duration>;
}

/// Measures with the monotonic [`Instant`] clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct WallClock;

impl Measurer for WallClock {
  fn measure(&mut self, f: &mut dyn FnMut() -> Result<()>, iterations: u64) -> Result<Duration> {
    let start = Instant::now();
    for _ in 0..iterations {
      black_box(f()?);
    }

    Ok(start.elapsed())
  }
}

/// The iteration count and duration of the trial that reached the minimum
/// time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calibration {
  pub iterations: u64,
  pub elapsed: Duration,
}

/// Finds the smallest power-of-two iteration count whose trial lasts at least
/// `min_time`. Each trial starts from scratch; earlier trials are never used
/// to predict the next count.
#[derive(Debug, Clone, Copy)]
pub struct Calibrator {
  pub min_time: Duration,
}

impl Calibrator {
  pub fn new(min_time: Duration) -> Self {
    Self { min_time }
  }

  pub fn calibrate<M: Measurer + ?Sized>(
    &self,
    measurer: &mut M,
    f: &mut dyn FnMut() -> Result<()>,
  ) -> Result<Calibration> {
    let mut iterations: u64 = 1;

    loop {
      let elapsed = measurer
        .measure(f, iterations)
        .with_context(|| format!("trial of {iterations} iterations"))?;

      log::trace!("{iterations} iterations took {elapsed:?}");

      if elapsed >= self.min_time {
        return Ok(Calibration { iterations, elapsed });
      }

      iterations = iterations
        .checked_mul(2)
        .with_context(|| format!("no trial reached {:?} before the iteration count overflowed", self.min_time))?;
    }
  }
}

#[cfg(test)]
mod tests {
  use std::{cell::Cell, rc::Rc};

  use super::*;

  /// Reads a clock that only moves when the measured callable advances it.
  struct FakeClock(Rc<Cell<Duration>>);

  impl Measurer for FakeClock {
    fn measure(&mut self, f: &mut dyn FnMut() -> Result<()>, iterations: u64) -> Result<Duration> {
      let start = self.0.get();
      for _ in 0..iterations {
        f()?;
      }

      Ok(self.0.get() - start)
    }
  }

  fn costing(clock: &Rc<Cell<Duration>>, cost: Duration) -> impl FnMut() -> Result<()> {
    let clock = clock.clone();
    move || {
      clock.set(clock.get() + cost);
      Ok(())
    }
  }

  #[test]
  fn doubles_until_min_time() {
    let clock = Rc::new(Cell::new(Duration::ZERO));
    let mut f = costing(&clock, Duration::from_micros(3));

    let calibration = Calibrator::new(Duration::from_millis(1))
      .calibrate(&mut FakeClock(clock), &mut f)
      .unwrap();

    // 3us * 512 = 1.536ms is the first power of two over 1ms.
    assert_eq!(calibration.iterations, 512);
    assert_eq!(calibration.elapsed, Duration::from_micros(1536));
  }

  #[test]
  fn elapsed_within_twice_min_time() {
    for micros in [1, 7, 13, 250, 999] {
      let clock = Rc::new(Cell::new(Duration::ZERO));
      let mut f = costing(&clock, Duration::from_micros(micros));
      let min_time = Duration::from_millis(10);

      let calibration = Calibrator::new(min_time)
        .calibrate(&mut FakeClock(clock), &mut f)
        .unwrap();

      assert!(calibration.iterations.is_power_of_two());
      assert!(calibration.elapsed >= min_time);
      assert!(calibration.elapsed < min_time * 2);
    }
  }

  #[test]
  fn single_slow_call_is_accepted() {
    let clock = Rc::new(Cell::new(Duration::ZERO));
    let mut f = costing(&clock, Duration::from_millis(30));

    let calibration = Calibrator::new(Duration::from_millis(10))
      .calibrate(&mut FakeClock(clock), &mut f)
      .unwrap();

    assert_eq!(calibration.iterations, 1);
    assert_eq!(calibration.elapsed, Duration::from_millis(30));
  }

  #[test]
  fn errors_propagate() {
    let mut calls = 0;
    let mut f = || -> Result<()> {
      calls += 1;
      if calls == 3 {
        anyhow::bail!("boom");
      }
      Ok(())
    };

    let error = Calibrator::new(Duration::from_secs(60))
      .calibrate(&mut WallClock, &mut f)
      .unwrap_err();

    assert_eq!(error.root_cause().to_string(), "boom");
    assert_eq!(calls, 3);
  }

  #[test]
  fn wall_clock_calls_exactly_n_times() {
    let mut calls = 0;
    let mut f = || -> Result<()> {
      calls += 1;
      Ok(())
    };

    WallClock.measure(&mut f, 37).unwrap();
    assert_eq!(calls, 37);
  }
}
