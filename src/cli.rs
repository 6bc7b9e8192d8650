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
use crate::report::ReportFormat;
use crate::settings::FileType;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about = "Orchestrator of pluggable minifiers")]
pub struct Cli {
  /// Path to the configuration file. Missing files are ignored.
  #[arg(long, global = true, env = "MINILAB_CONFIG", default_value = "minilab.toml")]
  pub config: PathBuf,

  #[command(subcommand)]
  pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
  /// Compress files, or inline content, with one compressor.
  Compress(CompressCommand),

  /// Compare several compressors on the same input files.
  Benchmark(BenchmarkCommand),

  /// List built-in compressors and installed compressor packages.
  List,
}

#[derive(Debug, Args)]
pub struct CompressCommand {
  /// Built-in name, installed package name, or local path (e.g. ./my-compressor.toml).
  #[arg(short, long)]
  pub compressor: Option<String>,

  /// Input file(s). File names may contain `*` and `?`.
  #[arg(short, long = "input", num_args = 1.., conflicts_with = "content")]
  pub input: Vec<String>,

  /// Inline content to compress. The result is printed to stdout.
  #[arg(long)]
  pub content: Option<String>,

  /// Output path(s). A single path may contain `$1`, replaced by each input's name.
  #[arg(short, long = "output", num_args = 1..)]
  pub output: Vec<String>,

  /// File type, required by some compressors (js, css, html).
  #[arg(long = "type")]
  pub file_type: Option<FileType>,

  /// Compressor option as key=value. Values are parsed as JSON when possible.
  /// Dotted keys build nested objects: sourceMap.url=out.js.map
  #[arg(long = "option", value_name = "KEY=VALUE")]
  pub options: Vec<String>,

  /// Compressor options as a JSON object.
  #[arg(long)]
  pub options_json: Option<String>,

  /// Folder prepended to relative input paths.
  #[arg(long)]
  pub public_folder: Option<PathBuf>,

  /// Overwrite each input with its compressed version.
  #[arg(long)]
  pub replace_in_place: bool,

  /// Write the output even when the compressor returns an empty result.
  #[arg(long)]
  pub allow_empty_output: bool,

  /// Abort a compressor run after this many milliseconds.
  #[arg(long)]
  pub timeout_ms: Option<u64>,

  /// Maximum size of a compressor process' output, in bytes.
  #[arg(long)]
  pub buffer_size: Option<usize>,

  /// Use the legacy synchronous mode.
  #[arg(long)]
  pub sync: bool,
}

#[derive(Debug, Args)]
pub struct BenchmarkCommand {
  /// Input file(s) to benchmark. File names may contain `*` and `?`.
  #[arg(short, long = "input", num_args = 1.., required = true)]
  pub input: Vec<String>,

  /// Comma-separated compressors to compare.
  #[arg(short, long, value_delimiter = ',')]
  pub compressors: Vec<String>,

  /// Timed iterations per compressor.
  #[arg(long)]
  pub iterations: Option<u32>,

  /// Discarded iterations before timing (default: 1 when iterations > 1).
  #[arg(long)]
  pub warmup: Option<u32>,

  /// Report gzip sizes.
  #[arg(long)]
  pub gzip: bool,

  /// Report brotli sizes.
  #[arg(long)]
  pub brotli: bool,

  /// Keep per-iteration timings in the result.
  #[arg(long)]
  pub verbose: bool,

  #[arg(long = "type")]
  pub file_type: Option<FileType>,

  /// Options passed to every compressor, as a JSON object.
  #[arg(long)]
  pub options_json: Option<String>,

  /// Report format: console, markdown or json.
  #[arg(long, default_value = "console")]
  pub format: ReportFormat,

  /// Write the report to this file instead of stdout.
  #[arg(long)]
  pub report: Option<PathBuf>,
}
