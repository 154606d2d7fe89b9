use std::{fmt, str::FromStr};

use crate::{
  bench::Failure,
  config::ConfigError,
  ext::FloatExt,
  stats::{ResultMatrix, View, ViewCell, ViewKind, ViewRow},
};

const SIGNIFICANT_DIGITS: usize = 3;
const COLUMN_WIDTH: usize = 14;
const COLUMN_PADDING: &str = "  ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableFormat {
  /// GitHub-flavoured markdown, ready to paste into documentation.
  #[default]
  Markdown,
  /// Fixed-width columns for a terminal.
  Plain,
  /// Comma-separated raw values, without emphasis.
  Csv,
}

impl FromStr for TableFormat {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "markdown" | "md" | "gfm" => Ok(TableFormat::Markdown),
      "plain" | "text" => Ok(TableFormat::Plain),
      "csv" => Ok(TableFormat::Csv),
      _ => Err(ConfigError::TableFormat(s.to_string())),
    }
  }
}

impl fmt::Display for TableFormat {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      TableFormat::Markdown => "markdown",
      TableFormat::Plain => "plain",
      TableFormat::Csv => "csv",
    })
  }
}

/// Which cells of a row are highlighted. Cells are compared by rank, so exact
/// ties are always highlighted alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Emphasis {
  /// Rank 1 as best, and rank 2 as second best when the row has more than two
  /// cells.
  #[default]
  BestAndSecond,
  Best,
  None,
}

impl FromStr for Emphasis {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "best-and-second" | "default" => Ok(Emphasis::BestAndSecond),
      "best" => Ok(Emphasis::Best),
      "none" => Ok(Emphasis::None),
      _ => Err(ConfigError::Emphasis(s.to_string())),
    }
  }
}

impl fmt::Display for Emphasis {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Emphasis::BestAndSecond => "best-and-second",
      Emphasis::Best => "best",
      Emphasis::None => "none",
    })
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TableOptions {
  pub format: TableFormat,
  pub emphasis: Emphasis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
  Best,
  Second,
  Plain,
}

impl Emphasis {
  fn mark(self, cell: &ViewCell, present: usize) -> Mark {
    match (self, cell.rank) {
      (Emphasis::BestAndSecond | Emphasis::Best, 1) => Mark::Best,
      (Emphasis::BestAndSecond, 2) if present > 2 => Mark::Second,
      _ => Mark::Plain,
    }
  }
}

/// Renders views of a [`ResultMatrix`] as text. Rendering never touches the
/// matrix, so one matrix can be rendered any number of times.
#[derive(Debug, Clone, Copy, Default)]
pub struct TablePresenter {
  pub options: TableOptions,
}

impl TablePresenter {
  pub fn new(options: TableOptions) -> Self {
    Self { options }
  }

  pub fn render(&self, view: &View) -> String {
    render(view, &self.options)
  }

  /// The time, relative time and rank tables, each under a title.
  pub fn render_all(&self, matrix: &ResultMatrix) -> String {
    ViewKind::ALL
      .iter()
      .map(|&kind| {
        let title = match self.options.format {
          TableFormat::Markdown => format!("**{}:**", kind.title()),
          TableFormat::Plain => format!("{}\n{}", kind.title(), "=".repeat(kind.title().len())),
          TableFormat::Csv => format!("# {}", kind.title()),
        };

        format!("{title}\n\n{}\n", self.render(&matrix.view(kind)))
      })
      .collect::<Vec<_>>()
      .join("\n")
  }

  /// One line per failed pair, or an empty string when nothing failed.
  pub fn render_failures(&self, failures: &[Failure]) -> String {
    if failures.is_empty() {
      return String::new();
    }

    let lines = failures.iter().map(|failure| match self.options.format {
      TableFormat::Markdown => format!("- `{}` / `{}`: {}", failure.benchmark, failure.candidate, failure.error),
      TableFormat::Plain => format!("{} / {}: {}", failure.benchmark, failure.candidate, failure.error),
      TableFormat::Csv => [
        csv_field(&failure.benchmark),
        csv_field(&failure.candidate),
        csv_field(&failure.error.to_string()),
      ]
      .join(","),
    });

    let title = match self.options.format {
      TableFormat::Markdown => "**Failures:**\n".to_string(),
      TableFormat::Plain => "Failures\n========\n".to_string(),
      TableFormat::Csv => "# Failures\n\nbenchmark,candidate,error".to_string(),
    };

    std::iter::once(title).chain(lines).collect::<Vec<_>>().join("\n") + "\n"
  }
}

/// Renders one view. Rows without cells never reach a view, and a view with
/// no rows renders as an empty string.
pub fn render(view: &View, options: &TableOptions) -> String {
  if view.rows.is_empty() {
    return String::new();
  }

  match options.format {
    TableFormat::Markdown => markdown(view, options.emphasis),
    TableFormat::Plain => plain(view, options.emphasis),
    TableFormat::Csv => csv(view),
  }
}

fn cell_text(kind: ViewKind, row: &ViewRow, cell: &ViewCell) -> String {
  match kind {
    ViewKind::Time => (cell.value * row.unit.map_or(1.0, |u| u.scale)).to_sig(SIGNIFICANT_DIGITS),
    ViewKind::Relative => cell.value.to_sig(SIGNIFICANT_DIGITS),
    ViewKind::Rank => cell.rank.to_string(),
  }
}

fn row_label(row: &ViewRow) -> (String, Option<String>) {
  (row.benchmark.clone(), row.unit.map(|u| u.symbol()))
}

fn markdown(view: &View, emphasis: Emphasis) -> String {
  let mut grid: Vec<Vec<String>> = Vec::with_capacity(view.rows.len() + 1);

  grid.push(
    std::iter::once("__Bench__ \\ __Func__ ".to_string())
      .chain(view.columns.iter().map(|c| format!(" __{c}__ ")))
      .collect(),
  );

  for row in &view.rows {
    let present = row.present();
    let label = match row_label(row) {
      (name, Some(unit)) => format!(" __{name}__ (`{unit}`) "),
      (name, None) => format!(" __{name}__ "),
    };

    let cells = row.cells.iter().map(|cell| match cell {
      Some(cell) => {
        let text = cell_text(view.kind, row, cell);
        match emphasis.mark(cell, present) {
          Mark::Best => format!(" __{text}__ "),
          Mark::Second => format!(" *{text}* "),
          Mark::Plain => format!(" {text} "),
        }
      }
      None => String::new(),
    });

    grid.push(std::iter::once(label).chain(cells).collect());
  }

  let widths = column_widths(&grid);

  let mut lines: Vec<String> = grid
    .iter()
    .map(|row| {
      let cells: Vec<String> = row
        .iter()
        .zip(&widths)
        .enumerate()
        .map(|(i, (cell, &width))| {
          if i == 0 {
            format!("{cell:>width$}")
          } else {
            format!("{cell:^width$}")
          }
        })
        .collect();

      format!("|{}|", cells.join("|"))
    })
    .collect();

  let rule: Vec<String> = widths
    .iter()
    .enumerate()
    .map(|(i, &width)| {
      let dashes = "-".repeat(width.saturating_sub(2));
      if i == 0 {
        format!(" {dashes}:")
      } else {
        format!(":{dashes}:")
      }
    })
    .collect();
  lines.insert(1, format!("|{}|", rule.join("|")));

  lines.join("\n")
}

fn column_widths(grid: &[Vec<String>]) -> Vec<usize> {
  let mut widths = vec![0; grid.first().map_or(0, Vec::len)];
  for row in grid {
    for (width, cell) in widths.iter_mut().zip(row) {
      *width = (*width).max(cell.chars().count());
    }
  }

  widths
}

fn format_header<'a, I: IntoIterator<Item = &'a str>>(columns: I, width: usize) -> String {
  let header = std::iter::once("benchmark")
    .chain(columns)
    .map(|col| format!("{col:<width$}"))
    .collect::<Vec<_>>()
    .join(COLUMN_PADDING);

  format!("{header}\n{}", "=".repeat(header.len()))
}

fn plain(view: &View, emphasis: Emphasis) -> String {
  let body: Vec<Vec<String>> = view
    .rows
    .iter()
    .map(|row| {
      let present = row.present();
      let label = match row_label(row) {
        (name, Some(unit)) => format!("{name} ({unit})"),
        (name, None) => name,
      };

      std::iter::once(label)
        .chain(row.cells.iter().map(|cell| match cell {
          Some(cell) => {
            let marker = match emphasis.mark(cell, present) {
              Mark::Best => '*',
              Mark::Second => '+',
              Mark::Plain => ' ',
            };
            format!("{}{marker}", cell_text(view.kind, row, cell))
          }
          None => "-".to_string(),
        }))
        .collect()
    })
    .collect();

  let width = body
    .iter()
    .flatten()
    .chain(&view.columns)
    .map(|cell| cell.chars().count())
    .max()
    .unwrap_or(0)
    .max(COLUMN_WIDTH);

  let mut lines = vec![format_header(view.columns.iter().map(String::as_str), width)];
  for row in &body {
    let line = row
      .iter()
      .enumerate()
      .map(|(i, col)| {
        if i == 0 {
          format!("{col:<width$}")
        } else {
          format!("{col:>width$}")
        }
      })
      .collect::<Vec<_>>()
      .join(COLUMN_PADDING);

    lines.push(line.trim_end().to_string());
  }

  lines.join("\n")
}

fn csv_field(field: &str) -> String {
  if field.contains([',', '"', '\n']) {
    format!("\"{}\"", field.replace('"', "\"\""))
  } else {
    field.to_string()
  }
}

fn csv(view: &View) -> String {
  let mut lines = vec![std::iter::once("benchmark")
    .chain(view.columns.iter().map(String::as_str))
    .map(csv_field)
    .collect::<Vec<_>>()
    .join(",")];

  for row in &view.rows {
    let fields = std::iter::once(csv_field(&row.benchmark)).chain(row.cells.iter().map(|cell| match cell {
      Some(cell) if view.kind == ViewKind::Rank => cell.rank.to_string(),
      Some(cell) => cell.value.to_string(),
      None => String::new(),
    }));

    lines.push(fields.collect::<Vec<_>>().join(","));
  }

  lines.join("\n")
}
