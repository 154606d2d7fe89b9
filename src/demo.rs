use benchtoolz::{BenchmarkCase, Candidate, Suite};

/// Builds a vector of `n` zeros.
pub type Zeros = fn(usize) -> Vec<u64>;

fn zeros_macro(n: usize) -> Vec<u64> {
  vec![0; n]
}

fn zeros_resize(n: usize) -> Vec<u64> {
  let mut v = Vec::new();
  v.resize(n, 0);
  v
}

fn zeros_repeat(n: usize) -> Vec<u64> {
  std::iter::repeat(0).take(n).collect()
}

fn zeros_push(n: usize) -> Vec<u64> {
  let mut v = Vec::new();
  for _ in 0..n {
    v.push(0);
  }
  v
}

/// Four ways to build a zeroed vector, timed at a small and a large size.
pub fn suite(size: usize) -> Suite<Zeros> {
  let small = (size / 1000).max(1);

  let mut suite = Suite::new()
    .candidate(Candidate::new("macro", zeros_macro as Zeros))
    .candidate(Candidate::new("resize", zeros_resize as Zeros))
    .candidate(Candidate::new("repeat", zeros_repeat as Zeros))
    .candidate(Candidate::new("push", zeros_push as Zeros));

  if small < size {
    suite = suite.benchmark(BenchmarkCase::new(format!("zeros_{small}"), move |f: &Zeros| f(small)));
  }

  suite.benchmark(BenchmarkCase::new(format!("zeros_{size}"), move |f: &Zeros| f(size)))
}
