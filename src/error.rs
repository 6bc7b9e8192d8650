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
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result alias used throughout the library.
pub type Result<T, E = MinilabError> = std::result::Result<T, E>;

/// Top-level error enum for the minilab library.
#[derive(Error, Debug)]
pub enum MinilabError {
  #[error(transparent)]
  Settings(#[from] SettingsError),

  #[error(transparent)]
  Resolve(#[from] ResolveError),

  #[error(transparent)]
  Compressor(#[from] CompressorError),

  #[error(transparent)]
  File(#[from] FileError),

  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error(transparent)]
  Benchmark(#[from] BenchmarkError),

  #[error("Failed to start the async runtime")]
  Runtime(#[source] std::io::Error),
}

/// Configuration errors raised before any I/O happens (src/settings.rs).
#[derive(Error, Debug)]
pub enum SettingsError {
  #[error("Settings must provide a compressor")]
  MissingCompressor,

  #[error("Settings cannot provide both `content` and `input`")]
  ContentAndInput,

  #[error("Settings must provide either `content` or `input`")]
  MissingInput,

  #[error("Settings must provide an `output` unless `content` or `replace_in_place` is used")]
  MissingOutput,

  #[error("The `input` list is empty")]
  EmptyInput,

  #[error("No files match the input pattern '{0}'")]
  NoMatch(String),

  #[error("Input pattern '{0}' has a wildcard outside its file name, which is not supported")]
  WildcardInDirectory(String),

  #[error("Got {outputs} output paths for {inputs} input files")]
  OutputCountMismatch { inputs: usize, outputs: usize },

  #[error("Failed to expand input pattern '{pattern}'")]
  Expand {
    pattern: String,
    #[source]
    source: std::io::Error,
  },
}

/// Why a provider could not produce a module (src/resolver.rs).
#[derive(Error, Debug)]
pub enum LoadError {
  #[error("module not found: {0}")]
  NotFound(String),

  #[error("failed to read {path}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("invalid compressor manifest {path}: {message}")]
  Manifest { path: PathBuf, message: String },
}

impl LoadError {
  /// `true` for the recoverable "module not found" case.
  pub fn is_not_found(&self) -> bool {
    matches!(self, LoadError::NotFound(_))
  }
}

/// Errors raised while turning an identifier into a compressor.
#[derive(Error, Debug)]
pub enum ResolveError {
  #[error("Package '{identifier}' doesn't export a valid compressor function")]
  NoValidExport { identifier: String },

  #[error("Could not load compressor package '{identifier}': {source}")]
  PackageLoad {
    identifier: String,
    #[source]
    source: LoadError,
  },

  #[error("Could not load local compressor '{identifier}': {source}")]
  LocalLoad {
    identifier: String,
    #[source]
    source: LoadError,
  },

  #[error(
    "Could not resolve compressor '{identifier}'. If it is a local file, use a relative or absolute path such as './my-compressor.toml' or '/abs/path/compressor.js'."
  )]
  Unresolved { identifier: String },
}

/// Errors raised by a compressor invocation (src/adapters/).
#[derive(Error, Debug)]
pub enum CompressorError {
  #[error("{label}: {message}")]
  Failed { label: String, message: String },

  #[error("{label}: failed to spawn `{program}`")]
  Spawn {
    label: String,
    program: String,
    #[source]
    source: std::io::Error,
  },

  #[error("{label}: I/O error while talking to the compressor process")]
  Io {
    label: String,
    #[source]
    source: std::io::Error,
  },

  #[error("{label}: process exited with {status}\n--- STDERR ---\n{stderr}")]
  Exit {
    label: String,
    status: String,
    stderr: String,
  },

  #[error("{label}: output exceeded the buffer size of {limit} bytes")]
  BufferExceeded { label: String, limit: usize },

  #[error("{label}: timed out after {timeout:?}")]
  Timeout { label: String, timeout: Duration },

  #[error(transparent)]
  Validation(#[from] ValidationError),
}

/// The compressor returned something other than `{code: string, ...}`.
#[derive(Error, Debug)]
pub enum ValidationError {
  #[error(
    "Compressor '{label}' returned an invalid result: expected an object with a string `code` property, got {shape}"
  )]
  InvalidShape { label: String, shape: String },

  #[error("Compressor '{label}' returned an invalid `{field}`: {reason}")]
  InvalidField {
    label: String,
    field: &'static str,
    reason: String,
  },

  #[error("Compressor '{label}' did not print a JSON result")]
  NotJson {
    label: String,
    #[source]
    source: serde_json::Error,
  },
}

/// File operations performed by the runner and the benchmark.
#[derive(Error, Debug)]
pub enum FileError {
  #[error("Failed to read file: {path}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("Failed to write file: {path}")]
  Write {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("Failed to create directory: {path}")]
  CreateDir {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("Failed to read directory: {path}")]
  ReadDir {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// Errors related to configuration resolution (src/config.rs).
#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("Failed to load configuration: {0}")]
  Figment(#[from] Box<figment::Error>),

  #[error("Invalid --option '{0}', expected key=value")]
  InvalidOption(String),

  #[error("Failed to parse --options-json: {0}")]
  OptionsJson(#[source] serde_json::Error),

  #[error("--options-json must be a JSON object")]
  OptionsNotObject,

  #[error("No compressor given. Pass --compressor or set compress.compressor in the config file")]
  NoCompressor,

  #[error("Unknown report format '{0}'")]
  ReportFormat(String),
}

/// Errors that abort a whole benchmark run (src/benchmark/).
#[derive(Error, Debug)]
pub enum BenchmarkError {
  #[error("No input files to benchmark")]
  NoInputFiles,

  #[error("No compressors to benchmark")]
  NoCompressors,

  #[error(transparent)]
  Input(#[from] SettingsError),
}

/// Renders an error and its sources as a single line.
pub fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
  let mut message = error.to_string();
  let mut source = error.source();
  while let Some(cause) = source {
    let cause_text = cause.to_string();
    if !message.contains(&cause_text) {
      message.push_str(": ");
      message.push_str(&cause_text);
    }
    source = cause.source();
  }
  message
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn error_chain_includes_sources_once() {
    let err = ResolveError::LocalLoad {
      identifier: "./x.toml".to_string(),
      source: LoadError::Io {
        path: PathBuf::from("x.toml"),
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
      },
    };
    let text = error_chain(&err);
    assert!(text.starts_with("Could not load local compressor './x.toml'"));
    assert_eq!(text.matches("failed to read x.toml").count(), 1);
    assert!(text.ends_with("gone"));
  }

  #[test]
  fn unresolved_message_hints_at_local_paths() {
    let err = ResolveError::Unresolved {
      identifier: "nope".to_string(),
    };
    let text = err.to_string();
    assert!(text.contains("Could not resolve compressor 'nope'"));
    assert!(text.contains("./"));
  }
}
