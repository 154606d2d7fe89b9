use std::{collections::BTreeMap, time::Duration};

use crate::ext::FloatExt;

/// One completed timing of a (benchmark, candidate) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
  pub benchmark: String,
  pub candidate: String,
  /// Repetitions per timed trial, always a power of two.
  pub iterations: u64,
  /// Best (shortest) trial at `iterations` repetitions.
  pub elapsed: Duration,
  /// Every trial run at `iterations` repetitions, in the order they ran.
  pub samples: Vec<Duration>,
}

impl Measurement {
  /// Seconds per call of the timed callable.
  pub fn per_iteration(&self) -> f64 {
    self.elapsed.as_secs_f64() / self.iterations as f64
  }
}

/// A display scale for seconds, e.g. `scale = 1e6, prefix = "u"` for
/// microseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Unit {
  pub scale: f64,
  pub prefix: &'static str,
}

impl Unit {
  pub fn symbol(&self) -> String {
    format!("{}s", self.prefix)
  }
}

/// Per-iteration times of every completed pair, with rows in benchmark
/// registration order and columns in candidate registration order.
#[derive(Debug, Clone, Default)]
pub struct ResultMatrix {
  benchmarks: Vec<String>,
  candidates: Vec<String>,
  cells: BTreeMap<(usize, usize), Measurement>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
  Time,
  Relative,
  Rank,
}

impl ViewKind {
  pub const ALL: [ViewKind; 3] = [ViewKind::Time, ViewKind::Relative, ViewKind::Rank];

  pub fn title(self) -> &'static str {
    match self {
      ViewKind::Time => "Time",
      ViewKind::Relative => "Relative time",
      ViewKind::Rank => "Rank",
    }
  }
}

/// A derived, read-only table over a [`ResultMatrix`]. Only benchmarks and
/// candidates with at least one completed cell appear.
#[derive(Debug, Clone, PartialEq)]
pub struct View {
  pub kind: ViewKind,
  pub columns: Vec<String>,
  pub rows: Vec<ViewRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewRow {
  pub benchmark: String,
  /// Display unit of the row, set for [`ViewKind::Time`] only.
  pub unit: Option<Unit>,
  /// One entry per column of the view; `None` for absent pairs.
  pub cells: Vec<Option<ViewCell>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewCell {
  /// Seconds, a ratio to the row minimum, or the rank, depending on the view.
  pub value: f64,
  pub rank: usize,
}

impl ViewRow {
  pub fn present(&self) -> usize {
    self.cells.iter().flatten().count()
  }
}

impl ResultMatrix {
  pub fn new<B, C>(benchmarks: B, candidates: C) -> Self
  where
    B: IntoIterator,
    B::Item: Into<String>,
    C: IntoIterator,
    C::Item: Into<String>,
  {
    Self {
      benchmarks: benchmarks.into_iter().map(Into::into).collect(),
      candidates: candidates.into_iter().map(Into::into).collect(),
      cells: BTreeMap::new(),
    }
  }

  /// Stores a measurement, registering unseen benchmark or candidate ids at
  /// the end of their axis. Returns `false` and leaves the matrix unchanged if
  /// the pair already has a cell.
  pub fn record(&mut self, measurement: Measurement) -> bool {
    let row = index_of(&mut self.benchmarks, &measurement.benchmark);
    let column = index_of(&mut self.candidates, &measurement.candidate);

    if self.cells.contains_key(&(row, column)) {
      return false;
    }

    self.cells.insert((row, column), measurement);
    true
  }

  pub fn get(&self, benchmark: &str, candidate: &str) -> Option<&Measurement> {
    let row = self.benchmarks.iter().position(|b| b == benchmark)?;
    let column = self.candidates.iter().position(|c| c == candidate)?;

    self.cells.get(&(row, column))
  }

  pub fn per_iteration(&self, benchmark: &str, candidate: &str) -> Option<f64> {
    self.get(benchmark, candidate).map(Measurement::per_iteration)
  }

  pub fn len(&self) -> usize {
    self.cells.len()
  }

  pub fn is_empty(&self) -> bool {
    self.cells.is_empty()
  }

  /// Every measurement, row by row.
  pub fn measurements(&self) -> impl Iterator<Item = &Measurement> {
    self.cells.values()
  }

  /// Benchmark ids with at least one cell.
  pub fn benchmarks(&self) -> Vec<&str> {
    self.live_ids(&self.benchmarks, |(row, _)| row)
  }

  /// Candidate ids with at least one cell.
  pub fn candidates(&self) -> Vec<&str> {
    self.live_ids(&self.candidates, |(_, column)| column)
  }

  fn live_ids<'a>(&'a self, ids: &'a [String], axis: fn((usize, usize)) -> usize) -> Vec<&'a str> {
    ids
      .iter()
      .enumerate()
      .filter(|(i, _)| self.cells.keys().any(|&key| axis(key) == *i))
      .map(|(_, id)| id.as_str())
      .collect()
  }

  pub fn view(&self, kind: ViewKind) -> View {
    let live_columns: Vec<usize> = (0..self.candidates.len())
      .filter(|&column| self.cells.keys().any(|&(_, c)| c == column))
      .collect();

    let mut rows = Vec::new();
    for (row, benchmark) in self.benchmarks.iter().enumerate() {
      let times: Vec<Option<f64>> = live_columns
        .iter()
        .map(|&column| self.cells.get(&(row, column)).map(Measurement::per_iteration))
        .collect();

      let present: Vec<f64> = times.iter().flatten().copied().collect();
      if present.is_empty() {
        continue;
      }

      let min = present.iter().copied().fold(f64::INFINITY, f64::min);
      let max = present.iter().copied().fold(f64::NEG_INFINITY, f64::max);
      let ranks = dense_ranks(&present);

      let mut next = 0;
      let cells = times
        .iter()
        .map(|time| {
          let seconds = (*time)?;
          let rank = ranks[next];
          next += 1;

          let value = match kind {
            ViewKind::Time => seconds,
            ViewKind::Relative => relative(seconds, min),
            ViewKind::Rank => rank as f64,
          };

          Some(ViewCell { value, rank })
        })
        .collect();

      rows.push(ViewRow {
        benchmark: benchmark.clone(),
        unit: (kind == ViewKind::Time).then(|| max.best_unit()),
        cells,
      });
    }

    View {
      kind,
      columns: live_columns.iter().map(|&c| self.candidates[c].clone()).collect(),
      rows,
    }
  }
}

fn index_of(ids: &mut Vec<String>, id: &str) -> usize {
  match ids.iter().position(|existing| existing == id) {
    Some(i) => i,
    None => {
      ids.push(id.to_string());
      ids.len() - 1
    }
  }
}

/// A zero row minimum only happens with a clock too coarse to see the call;
/// zero cells then count as the best and everything else as infinitely slower.
fn relative(seconds: f64, min: f64) -> f64 {
  if min > 0.0 {
    seconds / min
  } else if seconds == min {
    1.0
  } else {
    f64::INFINITY
  }
}

/// Ranks starting at 1 with no gaps; exactly equal values share a rank.
fn dense_ranks(values: &[f64]) -> Vec<usize> {
  let mut order: Vec<usize> = (0..values.len()).collect();
  order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

  let mut ranks = vec![0; values.len()];
  let mut rank = 0;
  let mut previous = None;
  for i in order {
    if previous != Some(values[i]) {
      rank += 1;
      previous = Some(values[i]);
    }
    ranks[i] = rank;
  }

  ranks
}
