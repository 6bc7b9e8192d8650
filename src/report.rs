// Copyright 2025 Chisomo Makombo Sakala
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Renders a [`BenchmarkResult`] for people (console, markdown) or tools (json).

use crate::benchmark::BenchmarkResult;
use crate::benchmark::CompressorMetrics;
use crate::benchmark::FileResult;
use crate::benchmark::sizes::format_bytes;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
  #[default]
  Console,
  Markdown,
  Json,
}

impl ReportFormat {
  pub fn as_str(self) -> &'static str {
    match self {
      ReportFormat::Console => "console",
      ReportFormat::Markdown => "markdown",
      ReportFormat::Json => "json",
    }
  }
}

impl fmt::Display for ReportFormat {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for ReportFormat {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "console" | "text" => Ok(ReportFormat::Console),
      "markdown" | "md" => Ok(ReportFormat::Markdown),
      "json" => Ok(ReportFormat::Json),
      other => Err(format!(
        "unknown report format '{other}', expected console, markdown or json"
      )),
    }
  }
}

pub fn render(result: &BenchmarkResult, format: ReportFormat) -> Result<String, serde_json::Error> {
  match format {
    ReportFormat::Console => Ok(render_console(result)),
    ReportFormat::Markdown => Ok(render_markdown(result)),
    ReportFormat::Json => serde_json::to_string_pretty(result),
  }
}

fn optional_size(size: Option<u64>) -> String {
  size.map(format_bytes).unwrap_or_else(|| "-".to_string())
}

/// Columns shared by the console and markdown tables.
fn row(metrics: &CompressorMetrics, gzip: bool, brotli: bool) -> Vec<String> {
  let mut cells = vec![metrics.compressor.clone()];
  if metrics.success {
    cells.push(metrics.size_formatted.clone());
    cells.push(format!("{:.2}%", metrics.reduction_percent));
    cells.push(format!("{:.2}", metrics.time_ms));
  } else {
    cells.extend(["-".to_string(), "-".to_string(), "-".to_string()]);
  }
  if gzip {
    cells.push(optional_size(metrics.gzip_size));
  }
  if brotli {
    cells.push(optional_size(metrics.brotli_size));
  }
  cells.push(match &metrics.error {
    Some(error) => format!("failed: {error}"),
    None => "ok".to_string(),
  });
  cells
}

fn header(gzip: bool, brotli: bool) -> Vec<&'static str> {
  let mut cells = vec!["Compressor", "Size", "Reduction", "Time (ms)"];
  if gzip {
    cells.push("Gzip");
  }
  if brotli {
    cells.push("Brotli");
  }
  cells.push("Status");
  cells
}

fn file_title(file: &FileResult) -> String {
  format!("{} ({})", file.file, file.original_size_formatted)
}

pub fn render_console(result: &BenchmarkResult) -> String {
  let gzip = result.options.include_gzip;
  let brotli = result.options.include_brotli;
  let mut output = String::new();

  output.push_str("Minilab Benchmark\n");
  output.push_str(&"=".repeat(60));
  output.push_str("\n\n");

  for file in &result.files {
    output.push_str(&format!("File: {}\n", file_title(file)));
    output.push_str(&"-".repeat(60));
    output.push('\n');

    let header: Vec<String> = header(gzip, brotli).into_iter().map(String::from).collect();
    let rows: Vec<Vec<String>> = file.results.iter().map(|m| row(m, gzip, brotli)).collect();

    // Status is the last column and is left unpadded.
    let widths: Vec<usize> = (0..header.len())
      .map(|i| {
        rows
          .iter()
          .chain(std::iter::once(&header))
          .map(|cells| cells[i].chars().count())
          .max()
          .unwrap_or(0)
      })
      .collect();

    for cells in std::iter::once(&header).chain(rows.iter()) {
      let last = cells.len() - 1;
      let line: Vec<String> = cells
        .iter()
        .enumerate()
        .map(|(i, cell)| {
          if i == last {
            cell.clone()
          } else {
            format!("{:<width$}", cell, width = widths[i])
          }
        })
        .collect();
      output.push_str(&format!("  {}\n", line.join("  ")));
    }
    output.push('\n');
  }

  output.push_str("Summary\n");
  output.push_str(&"-".repeat(60));
  output.push('\n');
  output.push_str(&format!("  Best compression: {}\n", result.summary.best_compression));
  output.push_str(&format!("  Best performance: {}\n", result.summary.best_performance));
  output.push_str(&format!("  Recommended:      {}\n", result.summary.recommended));
  output
}

pub fn render_markdown(result: &BenchmarkResult) -> String {
  let gzip = result.options.include_gzip;
  let brotli = result.options.include_brotli;
  let mut output = String::new();

  output.push_str("# Minilab Benchmark\n\n");
  output.push_str(&format!("_Run at {}_\n\n", result.timestamp.to_rfc3339()));

  for file in &result.files {
    output.push_str(&format!("## {}\n\n", file_title(file)));
    let header = header(gzip, brotli);
    output.push_str(&format!("| {} |\n", header.join(" | ")));
    output.push_str(&format!("|{}\n", "---|".repeat(header.len())));
    for metrics in &file.results {
      let cells: Vec<String> = row(metrics, gzip, brotli)
        .into_iter()
        .map(|cell| cell.replace('|', "\\|").replace('\n', " "))
        .collect();
      output.push_str(&format!("| {} |\n", cells.join(" | ")));
    }
    output.push('\n');
  }

  output.push_str("## Summary\n\n");
  output.push_str(&format!("- **Best compression:** {}\n", result.summary.best_compression));
  output.push_str(&format!("- **Best performance:** {}\n", result.summary.best_performance));
  output.push_str(&format!("- **Recommended:** {}\n", result.summary.recommended));
  output
}
