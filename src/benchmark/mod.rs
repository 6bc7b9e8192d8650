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

//! Comparative benchmarking of compressors over input files.
//!
//! Every (file, compressor) pair is resolved, warmed up, timed and cleaned
//! up on its own. A failing pair becomes a `success: false` record and never
//! aborts the rest of the run.

pub mod metrics;
pub mod sizes;
mod temp;

pub use metrics::calculate_reduction;
pub use metrics::recommended_score;
pub use metrics::summarize;
pub use temp::TempFiles;

use crate::batch::read_input;
use crate::compressor::CompressorOutput;
use crate::compressor::Content;
use crate::context::RunContext;
use crate::error::BenchmarkError;
use crate::error::Result;
use crate::error::error_chain;
use crate::paths;
use crate::resolver::CompressorResolution;
use crate::resolver::Resolver;
use crate::runner;
use crate::settings::FileType;
use crate::settings::Options;
use crate::settings::Settings;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use sizes::format_bytes;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

/// Compressors benchmarked when none are named.
pub const DEFAULT_COMPRESSORS: [&str; 3] = ["terser", "esbuild", "swc"];

fn default_compressors() -> Vec<String> {
  DEFAULT_COMPRESSORS.map(String::from).to_vec()
}

fn default_iterations() -> u32 {
  1
}

/// Observer called with `(compressor, file)` before each pair starts.
#[derive(Clone)]
pub struct ProgressCallback(Arc<dyn Fn(&str, &Path) + Send + Sync>);

impl ProgressCallback {
  pub fn new(f: impl Fn(&str, &Path) + Send + Sync + 'static) -> Self {
    ProgressCallback(Arc::new(f))
  }

  fn notify(&self, compressor: &str, file: &Path) {
    (self.0)(compressor, file)
  }
}

impl fmt::Debug for ProgressCallback {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("ProgressCallback")
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkOptions {
  pub input: Vec<String>,
  #[serde(default = "default_compressors")]
  pub compressors: Vec<String>,
  #[serde(default = "default_iterations")]
  pub iterations: u32,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub warmup: Option<u32>,
  #[serde(default)]
  pub include_gzip: bool,
  #[serde(default)]
  pub include_brotli: bool,
  /// Keeps per-iteration timings in each record.
  #[serde(default)]
  pub verbose: bool,
  #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
  pub file_type: Option<FileType>,
  #[serde(default)]
  pub compressor_options: Options,
  #[serde(skip)]
  pub on_progress: Option<ProgressCallback>,
}

impl BenchmarkOptions {
  pub fn new<I, S>(input: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    BenchmarkOptions {
      input: input.into_iter().map(Into::into).collect(),
      compressors: default_compressors(),
      iterations: default_iterations(),
      warmup: None,
      include_gzip: false,
      include_brotli: false,
      verbose: false,
      file_type: None,
      compressor_options: Options::new(),
      on_progress: None,
    }
  }

  pub fn compressors<I, S>(mut self, compressors: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.compressors = compressors.into_iter().map(Into::into).collect();
    self
  }

  pub fn on_progress(mut self, f: impl Fn(&str, &Path) + Send + Sync + 'static) -> Self {
    self.on_progress = Some(ProgressCallback::new(f));
    self
  }

  /// Timed iterations, never less than one.
  pub fn effective_iterations(&self) -> u32 {
    self.iterations.max(1)
  }

  /// Warmup runs: as configured, else 1 when timing several iterations.
  pub fn effective_warmup(&self) -> u32 {
    self
      .warmup
      .unwrap_or(if self.effective_iterations() > 1 { 1 } else { 0 })
  }
}

/// Outcome of one compressor on one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressorMetrics {
  pub compressor: String,
  pub size: u64,
  pub size_formatted: String,
  /// Mean iteration time.
  pub time_ms: f64,
  pub min_time_ms: f64,
  pub max_time_ms: f64,
  pub reduction_percent: f64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub gzip_size: Option<u64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub brotli_size: Option<u64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub iteration_times: Option<Vec<f64>>,
  pub success: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

impl CompressorMetrics {
  pub fn failed(compressor: impl Into<String>, error: String) -> Self {
    CompressorMetrics {
      compressor: compressor.into(),
      size: 0,
      size_formatted: format_bytes(0),
      time_ms: 0.0,
      min_time_ms: 0.0,
      max_time_ms: 0.0,
      reduction_percent: 0.0,
      gzip_size: None,
      brotli_size: None,
      iteration_times: None,
      success: false,
      error: Some(error),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResult {
  pub file: String,
  pub original_size: u64,
  pub original_size_formatted: String,
  pub results: Vec<CompressorMetrics>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
  pub best_compression: String,
  pub best_performance: String,
  pub recommended: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkResult {
  pub timestamp: DateTime<Utc>,
  pub options: BenchmarkOptions,
  pub files: Vec<FileResult>,
  pub summary: Summary,
}

/// Benchmarks every compressor against every input file, sequentially.
pub async fn run_benchmark(
  options: BenchmarkOptions,
  resolver: &Resolver,
) -> std::result::Result<BenchmarkResult, BenchmarkError> {
  if options.input.is_empty() {
    return Err(BenchmarkError::NoInputFiles);
  }
  if options.compressors.is_empty() {
    return Err(BenchmarkError::NoCompressors);
  }

  let span = tracing::info_span!(
    "benchmark",
    compressors = options.compressors.len(),
    iterations = options.effective_iterations()
  );
  async {
    let files = paths::expand_inputs(&options.input, None).await?;
    if files.is_empty() {
      return Err(BenchmarkError::NoInputFiles);
    }
    let ctx = RunContext::new();

    let mut file_results = Vec::with_capacity(files.len());
    for file in &files {
      file_results.push(benchmark_file(file, &options, resolver, &ctx).await);
    }

    let summary = summarize(&file_results);
    tracing::info!(
      best_compression = %summary.best_compression,
      best_performance = %summary.best_performance,
      recommended = %summary.recommended,
      "Benchmark complete"
    );
    Ok(BenchmarkResult {
      timestamp: Utc::now(),
      options: options.clone(),
      files: file_results,
      summary,
    })
  }
  .instrument(span)
  .await
}

async fn benchmark_file(
  file: &Path,
  options: &BenchmarkOptions,
  resolver: &Resolver,
  ctx: &RunContext,
) -> FileResult {
  let original_size = match tokio::fs::metadata(file).await {
    Ok(metadata) => metadata.len(),
    Err(e) => {
      tracing::warn!(file = %file.display(), error = %e, "Could not stat input, assuming size 0");
      0
    }
  };
  let content = read_input(file).await.map_err(|e| error_chain(&e));

  let mut results = Vec::with_capacity(options.compressors.len());
  for name in &options.compressors {
    if let Some(progress) = &options.on_progress {
      progress.notify(name, file);
    }
    let metrics = match &content {
      Ok(content) => {
        let span = tracing::info_span!("benchmark_pair", compressor = %name, file = %file.display());
        benchmark_pair(file, content, original_size, name, options, resolver, ctx)
          .instrument(span)
          .await
      }
      Err(message) => CompressorMetrics::failed(name.as_str(), message.clone()),
    };
    if let Some(error) = &metrics.error {
      tracing::warn!(compressor = %name, file = %file.display(), %error, "Compressor failed");
    }
    results.push(metrics);
  }

  FileResult {
    file: file.display().to_string(),
    original_size,
    original_size_formatted: format_bytes(original_size),
    results,
  }
}

async fn benchmark_pair(
  file: &Path,
  content: &Content,
  original_size: u64,
  name: &str,
  options: &BenchmarkOptions,
  resolver: &Resolver,
  ctx: &RunContext,
) -> CompressorMetrics {
  let resolution = match resolver.resolve(name).await {
    Ok(resolution) => resolution,
    Err(e) => return CompressorMetrics::failed(name, error_chain(&e)),
  };

  let mut temps = TempFiles::new();
  let measured = measure(
    file,
    content,
    original_size,
    name,
    &resolution,
    options,
    &mut temps,
    ctx,
  )
  .await;
  temps.cleanup().await;

  measured.unwrap_or_else(|e| CompressorMetrics::failed(name, error_chain(&e)))
}

#[allow(clippy::too_many_arguments)]
async fn measure(
  file: &Path,
  content: &Content,
  original_size: u64,
  name: &str,
  resolution: &CompressorResolution,
  options: &BenchmarkOptions,
  temps: &mut TempFiles,
  ctx: &RunContext,
) -> Result<CompressorMetrics> {
  let settings_for = |output: &Path| {
    let mut builder = Settings::builder()
      .compressor(resolution.compressor.clone())
      .label(resolution.label.as_str())
      .input(file.display().to_string())
      .output(output.display().to_string())
      .options(options.compressor_options.clone());
    if let Some(file_type) = options.file_type {
      builder = builder.file_type(file_type);
    }
    builder.build()
  };

  for _ in 0..options.effective_warmup() {
    let output = temps.create(file, name, "warmup");
    runner::run_one(&settings_for(&output)?, content, None, ctx).await?;
  }

  let mut times = Vec::with_capacity(options.effective_iterations() as usize);
  let mut last = None;
  for i in 0..options.effective_iterations() {
    let output = temps.create(file, name, &i.to_string());
    let settings = settings_for(&output)?;
    let started = Instant::now();
    let produced = runner::run_and_persist(&settings, content, None, ctx).await?;
    times.push(started.elapsed().as_secs_f64() * 1000.0);
    last = Some((output, produced));
  }
  let Some((output, produced)) = last else {
    return Ok(CompressorMetrics::failed(name, "no iterations ran".to_string()));
  };

  let artifacts = artifacts(&output, produced).await;
  let size: u64 = artifacts.iter().map(|bytes| bytes.len() as u64).sum();

  let gzip_size = options
    .include_gzip
    .then(|| artifacts.iter().map(|bytes| sizes::gzip_size(bytes)).sum())
    .and_then(|size: std::io::Result<u64>| {
      size.inspect_err(|e| tracing::warn!(error = %e, "gzip sizing failed")).ok()
    });
  let brotli_size = options
    .include_brotli
    .then(|| artifacts.iter().map(|bytes| sizes::brotli_size(bytes)).sum())
    .and_then(|size: std::io::Result<u64>| {
      size.inspect_err(|e| tracing::warn!(error = %e, "brotli sizing failed")).ok()
    });

  let mean = times.iter().sum::<f64>() / times.len() as f64;
  let min = times.iter().copied().fold(f64::INFINITY, f64::min);
  let max = times.iter().copied().fold(0.0, f64::max);
  tracing::debug!(compressor = %name, mean_ms = mean, size, "Measured");

  Ok(CompressorMetrics {
    compressor: name.to_string(),
    size,
    size_formatted: format_bytes(size),
    time_ms: mean,
    min_time_ms: min,
    max_time_ms: max,
    reduction_percent: calculate_reduction(original_size, size),
    gzip_size,
    brotli_size,
    iteration_times: options.verbose.then_some(times),
    success: true,
    error: None,
  })
}

/// What one run produced, one entry per artifact. Multi-format results count
/// every entry, and so do their gzip and brotli sizes. Otherwise the buffer,
/// then the written file, then `code`.
async fn artifacts(output: &Path, produced: CompressorOutput) -> Vec<Vec<u8>> {
  if !produced.outputs.is_empty() {
    return produced
      .outputs
      .into_iter()
      .map(|entry| entry.content.into_bytes())
      .collect();
  }
  if let Some(buffer) = produced.buffer {
    return vec![buffer];
  }
  match tokio::fs::read(output).await {
    Ok(bytes) => vec![bytes],
    Err(_) => vec![produced.code.into_bytes()],
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn artifacts_prefer_outputs_then_buffer_then_file() {
    let dir = tempfile::tempdir().unwrap();
    let written = dir.path().join("out.tmp");
    std::fs::write(&written, "on disk").unwrap();

    let multi = CompressorOutput::code("")
      .with_output(Some("webp"), vec![0u8; 15])
      .with_output(Some("avif"), vec![0u8; 12]);
    let sizes: Vec<usize> = artifacts(&written, multi).await.iter().map(Vec::len).collect();
    assert_eq!(sizes, [15, 12]);

    let buffer = CompressorOutput::buffer(vec![1, 2, 3]);
    assert_eq!(artifacts(&written, buffer).await, [vec![1u8, 2, 3]]);

    let code = CompressorOutput::code("ignored");
    assert_eq!(artifacts(&written, code).await, [b"on disk".to_vec()]);

    let missing = dir.path().join("missing.tmp");
    let code = CompressorOutput::code("abc");
    assert_eq!(artifacts(&missing, code).await, [b"abc".to_vec()]);
  }

  #[test]
  fn warmup_defaults_follow_iterations() {
    let mut options = BenchmarkOptions::new(["a.js"]);
    assert_eq!(options.compressors, DEFAULT_COMPRESSORS);
    assert_eq!(options.effective_warmup(), 0);

    options.iterations = 5;
    assert_eq!(options.effective_warmup(), 1);

    options.warmup = Some(3);
    assert_eq!(options.effective_warmup(), 3);

    options.iterations = 0;
    assert_eq!(options.effective_iterations(), 1);
  }

  #[test]
  fn options_deserialize_from_camel_case() {
    let options: BenchmarkOptions = serde_json::from_value(serde_json::json!({
      "input": ["a.js"],
      "includeGzip": true,
      "type": "css",
      "compressorOptions": { "level": 2 }
    }))
    .unwrap();
    assert_eq!(options.compressors, DEFAULT_COMPRESSORS);
    assert_eq!(options.iterations, 1);
    assert!(options.include_gzip);
    assert_eq!(options.file_type, Some(FileType::Css));
    assert_eq!(options.compressor_options["level"], 2);
  }

  #[test]
  fn failed_records_serialize_their_error() {
    let value = serde_json::to_value(CompressorMetrics::failed("x", "boom".into())).unwrap();
    assert_eq!(value["success"], false);
    assert_eq!(value["error"], "boom");
    assert_eq!(value["reductionPercent"], 0.0);
    assert!(value.get("gzipSize").is_none());
  }
}
