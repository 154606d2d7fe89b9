use std::{
  cell::Cell,
  hint::black_box,
  rc::Rc,
  time::{Duration, Instant},
};

use anyhow::Result;
use benchtoolz::{
  BenchmarkCase, Candidate, Config, Measurement, Measurer, Runner, Suite, TableFormat, TableOptions, TablePresenter,
  TrialError, ViewKind,
};

/// A clock that only moves when a benchmark body advances it, so runs are
/// exactly reproducible.
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

/// Candidates are a cost per unit of work in nanoseconds; each benchmark does
/// a fixed number of units.
fn fake_suite(clock: &Rc<Cell<Duration>>) -> Suite<u64> {
  let suite = Suite::new()
    .candidate(Candidate::new("baseline", 100))
    .candidate(Candidate::new("slow_variant", 900))
    .candidate(Candidate::new("tuned", 40))
    .candidate(Candidate::new("also_tuned", 40));

  [("small", 1), ("medium", 10), ("large", 100)]
    .into_iter()
    .fold(suite, |suite, (name, units)| {
      let clock = clock.clone();
      suite.benchmark(BenchmarkCase::new(name, move |nanos: &u64| {
        clock.set(clock.get() + Duration::from_nanos(nanos * units));
      }))
    })
}

fn fast_config() -> Config {
  Config::default().with_min_time_secs(0.001).unwrap()
}

fn spin(duration: Duration) {
  let start = Instant::now();
  while start.elapsed() < duration {
    black_box(());
  }
}

#[test]
fn identical_runs_give_identical_matrices() {
  let run = || {
    let clock = Rc::new(Cell::new(Duration::ZERO));
    let suite = fake_suite(&clock);
    Runner::new(fast_config())
      .unwrap()
      .with_measurer(FakeClock(clock))
      .run(&suite)
  };

  let first = run();
  let second = run();

  let first_measurements: Vec<&Measurement> = first.matrix.measurements().collect();
  let second_measurements: Vec<&Measurement> = second.matrix.measurements().collect();
  assert_eq!(first_measurements.len(), 12);
  assert_eq!(first_measurements, second_measurements);

  for kind in ViewKind::ALL {
    assert_eq!(first.matrix.view(kind), second.matrix.view(kind));
  }
}

#[test]
fn ties_share_rank_and_emphasis() {
  let clock = Rc::new(Cell::new(Duration::ZERO));
  let suite = fake_suite(&clock);
  let report = Runner::new(fast_config())
    .unwrap()
    .with_measurer(FakeClock(clock))
    .run(&suite);

  let rank = report.matrix.view(ViewKind::Rank);
  assert_eq!(rank.columns, ["baseline", "slow_variant", "tuned", "also_tuned"]);
  for row in &rank.rows {
    let ranks: Vec<usize> = row.cells.iter().map(|c| c.unwrap().rank).collect();
    assert_eq!(ranks, [2, 3, 1, 1], "{}", row.benchmark);
  }

  let csv = TablePresenter::new(TableOptions {
    format: TableFormat::Csv,
    ..TableOptions::default()
  })
  .render(&rank);
  assert_eq!(csv.lines().nth(1), Some("small,2,3,1,1"));

  let relative = report.matrix.view(ViewKind::Relative);
  let values: Vec<f64> = relative.rows[0].cells.iter().map(|c| c.unwrap().value).collect();
  assert!((values[0] - 2.5).abs() < 1e-9);
  assert!((values[1] - 22.5).abs() < 1e-9);
  assert_eq!(&values[2..], [1.0, 1.0]);

  let markdown = TablePresenter::default().render(&rank);
  assert_eq!(markdown.matches("__1__").count(), 6);
  assert_eq!(markdown.matches("*2*").count(), 3);
}

#[test]
fn hook_skips_a_whole_column() {
  let clock = Rc::new(Cell::new(Duration::ZERO));
  let suite = fake_suite(&clock);

  let report = Runner::new(fast_config())
    .unwrap()
    .with_measurer(FakeClock(clock))
    .hook(|trial| trial.candidate != "slow_variant")
    .run(&suite);

  for benchmark in ["small", "medium", "large"] {
    assert!(report.matrix.get(benchmark, "slow_variant").is_none());
    assert!(report.matrix.get(benchmark, "baseline").is_some());
  }
  assert!(report.failures.is_empty());
  assert!(!report.matrix.candidates().contains(&"slow_variant"));
  assert_eq!(report.matrix.len(), 9);
}

#[test]
fn failing_candidate_is_reported_and_others_complete() {
  let suite = Suite::new()
    .candidate(Candidate::new("ok", 1u64))
    .candidate(Candidate::new("zero_division", 0u64))
    .candidate(Candidate::new("also_ok", 3u64))
    .benchmark(BenchmarkCase::new("divide", |d: &u64| 1000 / black_box(*d)))
    .benchmark(BenchmarkCase::new("modulo", |d: &u64| 1000 % black_box(*d)));

  let report = Runner::new(fast_config()).unwrap().run(&suite);

  assert_eq!(report.failures.len(), 2);
  for failure in &report.failures {
    assert_eq!(failure.candidate, "zero_division");
    assert!(matches!(failure.error, TrialError::Panicked(_)));
  }

  for benchmark in ["divide", "modulo"] {
    assert!(report.matrix.get(benchmark, "ok").is_some());
    assert!(report.matrix.get(benchmark, "also_ok").is_some());
    assert!(report.matrix.get(benchmark, "zero_division").is_none());
  }

  let text = TablePresenter::default().render_failures(&report.failures);
  assert!(text.contains("`zero_division`"));
}

#[test]
fn twice_the_cost_is_twice_the_time() {
  let suite = Suite::new()
    .candidate(Candidate::new("A", Duration::from_micros(1)))
    .candidate(Candidate::new("B", Duration::from_micros(2)))
    .benchmark(BenchmarkCase::new("spin", |cost: &Duration| spin(*cost)));

  let config = Config::default().with_min_time_secs(0.1).unwrap().with_repeat(1).unwrap();
  let report = Runner::new(config).unwrap().run(&suite);
  assert!(report.failures.is_empty());

  let a = report.matrix.get("spin", "A").unwrap();
  let b = report.matrix.get("spin", "B").unwrap();
  assert!(a.iterations > b.iterations, "{} vs {}", a.iterations, b.iterations);
  for m in [a, b] {
    assert!(m.iterations.is_power_of_two());
    assert!(m.elapsed >= Duration::from_millis(100));
  }

  let relative = report.matrix.view(ViewKind::Relative);
  let values: Vec<f64> = relative.rows[0].cells.iter().map(|c| c.unwrap().value).collect();
  assert_eq!(values[0], 1.0);
  assert!((1.5..2.6).contains(&values[1]), "{}", values[1]);

  let rank = report.matrix.view(ViewKind::Rank);
  let ranks: Vec<usize> = rank.rows[0].cells.iter().map(|c| c.unwrap().rank).collect();
  assert_eq!(ranks, [1, 2]);
}
