use std::{collections::BTreeMap, fmt, hint::black_box};

use anyhow::Result;

/// Attribute key that [`crate::bench::skip_flagged`] looks for.
pub const SKIP: &str = "skip";

/// Free-form metadata attached to a candidate and handed to the trial hook.
#[derive(Debug, Clone, PartialEq)]
pub enum Attr {
  Flag(bool),
  Number(f64),
  Text(String),
}

pub type Attrs = BTreeMap<String, Attr>;

impl From<bool> for Attr {
  fn from(flag: bool) -> Self {
    Attr::Flag(flag)
  }
}

impl From<f64> for Attr {
  fn from(number: f64) -> Self {
    Attr::Number(number)
  }
}

impl From<&str> for Attr {
  fn from(text: &str) -> Self {
    Attr::Text(text.to_string())
  }
}

impl From<String> for Attr {
  fn from(text: String) -> Self {
    Attr::Text(text)
  }
}

/// One implementation under comparison. `C` is whatever the benchmark bodies
/// know how to call, typically a function pointer or a boxed closure.
#[derive(Debug, Clone)]
pub struct Candidate<C> {
  pub name: String,
  pub func: C,
  pub attrs: Attrs,
}

impl<C> Candidate<C> {
  pub fn new(name: impl Into<String>, func: C) -> Self {
    Self {
      name: name.into(),
      func,
      attrs: Attrs::new(),
    }
  }

  pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<Attr>) -> Self {
    self.attrs.insert(key.into(), value.into());
    self
  }

  /// Marks the candidate with the [`SKIP`] flag.
  pub fn skipped(self) -> Self {
    self.with_attr(SKIP, true)
  }
}

type Body<C> = Box<dyn Fn(&C) -> Result<()>>;

/// A named workload that receives the candidate to exercise as an argument.
pub struct BenchmarkCase<C> {
  pub name: String,
  body: Body<C>,
}

impl<C> BenchmarkCase<C> {
  /// A workload that cannot fail. Its return value is passed through
  /// [`black_box`] so the call is not optimised away.
  pub fn new<F, R>(name: impl Into<String>, body: F) -> Self
  where
    C: 'static,
    F: Fn(&C) -> R + 'static,
    R: 'static,
  {
    Self {
      name: name.into(),
      body: Box::new(move |candidate: &C| {
        black_box(body(candidate));
        Ok(())
      }),
    }
  }

  pub fn fallible<F>(name: impl Into<String>, body: F) -> Self
  where
    F: Fn(&C) -> Result<()> + 'static,
  {
    Self {
      name: name.into(),
      body: Box::new(body),
    }
  }

  pub fn call(&self, candidate: &C) -> Result<()> {
    (self.body)(candidate)
  }
}

impl<C> fmt::Debug for BenchmarkCase<C> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("BenchmarkCase").field("name", &self.name).finish_non_exhaustive()
  }
}

/// The ordered candidates and benchmarks of one run. Names identify rows and
/// columns of the results, so they should be unique within their list.
#[derive(Debug)]
pub struct Suite<C> {
  candidates: Vec<Candidate<C>>,
  benchmarks: Vec<BenchmarkCase<C>>,
}

impl<C> Default for Suite<C> {
  fn default() -> Self {
    Self {
      candidates: Vec::new(),
      benchmarks: Vec::new(),
    }
  }
}

impl<C> Suite<C> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn candidate(mut self, candidate: Candidate<C>) -> Self {
    self.candidates.push(candidate);
    self
  }

  pub fn benchmark(mut self, benchmark: BenchmarkCase<C>) -> Self {
    self.benchmarks.push(benchmark);
    self
  }

  pub fn candidates(&self) -> &[Candidate<C>] {
    &self.candidates
  }

  pub fn benchmarks(&self) -> &[BenchmarkCase<C>] {
    &self.benchmarks
  }
}
