use std::{
  path::{Path, PathBuf},
  process::{Command, Stdio},
  time::Duration,
};

use anyhow::{Context, Result};

use crate::{
  ext::ChildTimeoutExt,
  suite::{BenchmarkCase, Candidate, Suite},
};

/// An external program used as a candidate. Every call spawns it once and
/// waits at most `timeout` for it to exit.
#[derive(Debug, Clone)]
pub struct Program {
  pub path: PathBuf,
  pub timeout: Duration,
}

/// Runs `program args...` with all standard streams detached.
///
/// # Errors
///
/// This will return an error if:
/// - the program cannot be spawned,
/// - the exit status is non-zero,
/// - the program is still running after `timeout`.
pub fn run_program(program: &Path, args: &[String], timeout: Duration) -> Result<()> {
  Command::new(program)
    .args(args)
    .stdin(Stdio::null())
    .stdout(Stdio::null())
    .stderr(Stdio::null())
    .spawn()
    .with_context(|| format!("spawn {program:?}"))?
    .check_success_timeout(timeout)
    .with_context(|| format!("{program:?} {}", args.join(" ")))
}

/// Splits `name=value`, for command-line lists of named programs and
/// argument lists.
pub fn parse_named(s: &str) -> Result<(String, String)> {
  let Some((name, value)) = s.split_once('=') else {
    anyhow::bail!("expected NAME=VALUE, got {s:?}");
  };
  if name.is_empty() {
    anyhow::bail!("empty name in {s:?}");
  }

  Ok((name.to_string(), value.to_string()))
}

/// A suite where each candidate is a program and each benchmark is an
/// argument list passed to it. Arguments are split on whitespace.
pub fn program_suite(
  candidates: &[(String, String)],
  benchmarks: &[(String, String)],
  timeout: Duration,
) -> Suite<Program> {
  let suite = candidates.iter().fold(Suite::new(), |suite, (name, path)| {
    suite.candidate(Candidate::new(
      name.as_str(),
      Program {
        path: PathBuf::from(path),
        timeout,
      },
    ))
  });

  benchmarks.iter().fold(suite, |suite, (name, args)| {
    let args: Vec<String> = args.split_whitespace().map(str::to_string).collect();

    suite.benchmark(BenchmarkCase::fallible(name.as_str(), move |program: &Program| {
      run_program(&program.path, &args, program.timeout)
    }))
  })
}
