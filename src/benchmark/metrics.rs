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

//! Scoring and summary of benchmark records.

use super::FileResult;
use super::Summary;

/// Weight of the speed term in [`recommended_score`].
pub const SPEED_WEIGHT: f64 = 0.4;
/// Weight of the size reduction term in [`recommended_score`].
pub const REDUCTION_WEIGHT: f64 = 0.6;
/// Summary value used when no compressor succeeded.
pub const NOT_AVAILABLE: &str = "N/A";

/// Percentage saved relative to `original`. Negative when the output grew.
/// An empty original yields 0.
pub fn calculate_reduction(original: u64, compressed: u64) -> f64 {
  if original == 0 {
    return 0.0;
  }
  (original as f64 - compressed as f64) * 100.0 / original as f64
}

/// Weighted score favouring size reduction while rewarding very fast runs.
pub fn recommended_score(time_ms: f64, reduction_percent: f64) -> f64 {
  SPEED_WEIGHT * (1000.0 / (time_ms + 1.0)) + REDUCTION_WEIGHT * reduction_percent
}

/// Picks the best compressors over every successful record. Ties go to the
/// first record encountered.
pub fn summarize(files: &[FileResult]) -> Summary {
  let mut best_compression: Option<(&str, f64)> = None;
  let mut best_performance: Option<(&str, f64)> = None;
  let mut recommended: Option<(&str, f64)> = None;

  let successful = files
    .iter()
    .flat_map(|file| file.results.iter())
    .filter(|metrics| metrics.success);

  for metrics in successful {
    let name = metrics.compressor.as_str();
    if best_compression.is_none_or(|(_, best)| metrics.reduction_percent > best) {
      best_compression = Some((name, metrics.reduction_percent));
    }
    if best_performance.is_none_or(|(_, best)| metrics.time_ms < best) {
      best_performance = Some((name, metrics.time_ms));
    }
    let score = recommended_score(metrics.time_ms, metrics.reduction_percent);
    if recommended.is_none_or(|(_, best)| score > best) {
      recommended = Some((name, score));
    }
  }

  let name_or_na = |pick: Option<(&str, f64)>| {
    pick
      .map(|(name, _)| name.to_string())
      .unwrap_or_else(|| NOT_AVAILABLE.to_string())
  };
  Summary {
    best_compression: name_or_na(best_compression),
    best_performance: name_or_na(best_performance),
    recommended: name_or_na(recommended),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::benchmark::CompressorMetrics;

  fn ok(name: &str, time_ms: f64, reduction_percent: f64) -> CompressorMetrics {
    CompressorMetrics {
      time_ms,
      reduction_percent,
      success: true,
      ..CompressorMetrics::failed(name, String::new())
    }
  }

  fn file(results: Vec<CompressorMetrics>) -> FileResult {
    FileResult {
      file: "a.js".to_string(),
      original_size: 100,
      original_size_formatted: "100 B".to_string(),
      results,
    }
  }

  #[test]
  fn reduction_math() {
    assert_eq!(calculate_reduction(100, 70), 30.0);
    assert_eq!(calculate_reduction(100, 0), 100.0);
    assert_eq!(calculate_reduction(0, 0), 0.0);
    assert_eq!(calculate_reduction(0, 42), 0.0);
    assert_eq!(calculate_reduction(100, 120), -20.0);
  }

  #[test]
  fn score_is_monotonic() {
    for reduction in [-10.0, 0.0, 35.5, 90.0] {
      let mut previous = f64::INFINITY;
      for time in [0.0, 1.0, 10.0, 250.0, 10_000.0] {
        let score = recommended_score(time, reduction);
        assert!(score <= previous);
        previous = score;
      }
    }
    for time in [0.0, 12.0, 500.0] {
      assert!(recommended_score(time, 50.0) > recommended_score(time, 49.0));
    }
  }

  #[test]
  fn summary_picks_first_best() {
    let summary = summarize(&[
      file(vec![ok("fast", 1.0, 10.0), ok("small", 200.0, 60.0)]),
      file(vec![ok("tie", 1.0, 60.0), CompressorMetrics::failed("broken", "x".into())]),
    ]);
    assert_eq!(summary.best_compression, "small");
    assert_eq!(summary.best_performance, "fast");
    assert_eq!(summary.recommended, "tie");
  }

  #[test]
  fn summary_on_total_failure() {
    let summary = summarize(&[file(vec![
      CompressorMetrics::failed("a", "boom".into()),
      CompressorMetrics::failed("b", "boom".into()),
    ])]);
    assert_eq!(summary.best_compression, NOT_AVAILABLE);
    assert_eq!(summary.best_performance, NOT_AVAILABLE);
    assert_eq!(summary.recommended, NOT_AVAILABLE);

    assert_eq!(summarize(&[]).recommended, NOT_AVAILABLE);
  }
}
