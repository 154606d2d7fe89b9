//! Compare interchangeable implementations of a function.
//!
//! A [`Suite`] pairs candidates (the implementations) with benchmark cases
//! (workloads that call a candidate). The [`Runner`] times every pair, picking
//! a power-of-two iteration count per pair so each timed trial lasts at least
//! `min_time`, and collects per-call times into a [`ResultMatrix`]. The matrix
//! can be viewed as absolute time, time relative to the fastest candidate, or
//! rank, and a [`TablePresenter`] turns any view into text.
//!
//! ```no_run
//! use benchtoolz::{BenchmarkCase, Candidate, Config, Runner, Suite, TablePresenter};
//!
//! fn zeros_macro(n: usize) -> Vec<u64> {
//!   vec![0; n]
//! }
//!
//! fn zeros_push(n: usize) -> Vec<u64> {
//!   let mut v = Vec::new();
//!   for _ in 0..n {
//!     v.push(0);
//!   }
//!   v
//! }
//!
//! let suite = Suite::new()
//!   .candidate(Candidate::new("macro", zeros_macro as fn(usize) -> Vec<u64>))
//!   .candidate(Candidate::new("push", zeros_push as fn(usize) -> Vec<u64>))
//!   .benchmark(BenchmarkCase::new("1000", |f: &fn(usize) -> Vec<u64>| f(1000)));
//!
//! let report = Runner::new(Config::default())?.run(&suite);
//! println!("{}", TablePresenter::default().render_all(&report.matrix));
//! # Ok::<(), benchtoolz::ConfigError>(())
//! ```

pub mod bench;
pub mod config;
pub mod ext;
pub mod format;
pub mod measure;
pub mod output;
pub mod run;
pub mod stats;
pub mod suite;

pub use self::{
  bench::{skip_flagged, Failure, Report, Runner, Trial, TrialError},
  config::{Config, ConfigError},
  format::{render, Emphasis, TableFormat, TableOptions, TablePresenter},
  measure::{Calibration, Calibrator, Measurer, WallClock},
  stats::{Measurement, ResultMatrix, View, ViewKind},
  suite::{Attr, Attrs, BenchmarkCase, Candidate, Suite},
};
