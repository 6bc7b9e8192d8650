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
use crate::benchmark::BenchmarkOptions;
use crate::benchmark::DEFAULT_COMPRESSORS;
use crate::cli::BenchmarkCommand;
use crate::cli::CompressCommand;
use crate::error::ConfigError;
use crate::error::SettingsError;
use crate::report::ReportFormat;
use crate::resolver::CompressorResolution;
use crate::settings::FileType;
use crate::settings::Options;
use crate::settings::Settings;
use figment::Figment;
use figment::providers::Env;
use figment::providers::Format;
use figment::providers::Serialized;
use figment::providers::Toml;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

// --- Default Values ---
fn default_package_dirs() -> Vec<PathBuf> {
  vec![PathBuf::from(".minilab/compressors"), PathBuf::from("node_modules")]
}

fn default_bin_dirs() -> Vec<PathBuf> {
  vec![PathBuf::from("node_modules/.bin")]
}

fn default_compressors() -> Vec<String> {
  DEFAULT_COMPRESSORS.map(String::from).to_vec()
}

fn default_iterations() -> u32 {
  1
}

/// Where the resolver looks for packages and executables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
  #[serde(default = "default_package_dirs")]
  pub package_dirs: Vec<PathBuf>,
  #[serde(default = "default_bin_dirs")]
  pub bin_dirs: Vec<PathBuf>,
}

impl Default for ResolverConfig {
  fn default() -> Self {
    ResolverConfig {
      package_dirs: default_package_dirs(),
      bin_dirs: default_bin_dirs(),
    }
  }
}

/// `[compress]` section: defaults for `minilab compress`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompressDefaults {
  pub compressor: Option<String>,
  #[serde(rename = "type")]
  pub file_type: Option<FileType>,
  pub timeout_ms: Option<u64>,
  pub buffer_size: Option<usize>,
  #[serde(default)]
  pub options: Options,
}

/// `[benchmark]` section: defaults for `minilab benchmark`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkDefaults {
  #[serde(default = "default_compressors")]
  pub compressors: Vec<String>,
  #[serde(default = "default_iterations")]
  pub iterations: u32,
  pub warmup: Option<u32>,
  #[serde(default)]
  pub gzip: bool,
  #[serde(default)]
  pub brotli: bool,
}

impl Default for BenchmarkDefaults {
  fn default() -> Self {
    BenchmarkDefaults {
      compressors: default_compressors(),
      iterations: default_iterations(),
      warmup: None,
      gzip: false,
      brotli: false,
    }
  }
}

/// Configuration layered from defaults, `minilab.toml` and `MINILAB_*` env vars.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
  #[serde(default)]
  pub resolver: ResolverConfig,
  #[serde(default)]
  pub compress: CompressDefaults,
  #[serde(default)]
  pub benchmark: BenchmarkDefaults,
}

impl FileConfig {
  /// Loads the layered configuration. A missing file only contributes nothing.
  ///
  /// Nested keys use `__` in env vars: `MINILAB_BENCHMARK__ITERATIONS=5`.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    Self::figment(path)
      .extract()
      .map_err(|e| ConfigError::Figment(Box::new(e)))
  }

  pub fn figment(path: &Path) -> Figment {
    Figment::from(Serialized::defaults(FileConfig::default()))
      .merge(Toml::file(path))
      .merge(Env::prefixed("MINILAB_").split("__"))
  }
}

/// Fully validated `minilab compress` request, waiting for its compressor.
#[derive(Debug, Clone)]
pub struct CompressConfig {
  pub compressor: String,
  pub content: Option<String>,
  pub inputs: Vec<String>,
  pub outputs: Vec<String>,
  pub file_type: Option<FileType>,
  pub options: Options,
  pub public_folder: Option<PathBuf>,
  pub replace_in_place: bool,
  pub allow_empty_output: bool,
  pub timeout: Option<Duration>,
  pub buffer_size: Option<usize>,
  pub sync: bool,
}

impl TryFrom<(CompressCommand, FileConfig)> for CompressConfig {
  type Error = ConfigError;

  fn try_from(
    (
      CompressCommand {
        compressor,
        input,
        content,
        output,
        file_type,
        options,
        options_json,
        public_folder,
        replace_in_place,
        allow_empty_output,
        timeout_ms,
        buffer_size,
        sync,
      },
      file,
    ): (CompressCommand, FileConfig),
  ) -> Result<Self, Self::Error> {
    let defaults = file.compress;
    let compressor = compressor
      .or(defaults.compressor)
      .ok_or(ConfigError::NoCompressor)?;

    let mut merged = defaults.options;
    if let Some(json) = options_json {
      merged.extend(parse_options_json(&json)?);
    }
    for pair in &options {
      let (key, value) = parse_option(pair)?;
      set_option(&mut merged, &key, value);
    }

    Ok(CompressConfig {
      compressor,
      content,
      inputs: input,
      outputs: output,
      file_type: file_type.or(defaults.file_type),
      options: merged,
      public_folder,
      replace_in_place,
      allow_empty_output,
      timeout: timeout_ms.or(defaults.timeout_ms).map(Duration::from_millis),
      buffer_size: buffer_size.or(defaults.buffer_size),
      sync,
    })
  }
}

impl CompressConfig {
  /// Builds the runtime settings around a resolved compressor.
  pub fn into_settings(self, resolution: CompressorResolution) -> Result<Settings, SettingsError> {
    let mut builder = Settings::builder()
      .compressor(resolution.compressor)
      .label(resolution.label)
      .options(self.options)
      .sync(self.sync)
      .replace_in_place(self.replace_in_place)
      .allow_empty_output(self.allow_empty_output);

    if let Some(content) = self.content {
      builder = builder.content(content);
    }
    builder = match self.inputs.len() {
      0 => builder,
      1 => builder.input(self.inputs[0].clone()),
      _ => builder.inputs(self.inputs),
    };
    builder = match self.outputs.len() {
      0 => builder,
      1 => builder.output(self.outputs[0].clone()),
      _ => builder.outputs(self.outputs),
    };
    if let Some(file_type) = self.file_type {
      builder = builder.file_type(file_type);
    }
    if let Some(folder) = self.public_folder {
      builder = builder.public_folder(folder);
    }
    if let Some(timeout) = self.timeout {
      builder = builder.timeout(timeout);
    }
    if let Some(limit) = self.buffer_size {
      builder = builder.buffer_size(limit);
    }
    builder.build()
  }
}

/// Fully validated `minilab benchmark` request.
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
  pub options: BenchmarkOptions,
  pub format: ReportFormat,
  pub report: Option<PathBuf>,
}

impl TryFrom<(BenchmarkCommand, FileConfig)> for BenchmarkConfig {
  type Error = ConfigError;

  fn try_from(
    (
      BenchmarkCommand {
        input,
        compressors,
        iterations,
        warmup,
        gzip,
        brotli,
        verbose,
        file_type,
        options_json,
        format,
        report,
      },
      file,
    ): (BenchmarkCommand, FileConfig),
  ) -> Result<Self, Self::Error> {
    let defaults = file.benchmark;
    let compressors = if compressors.is_empty() {
      defaults.compressors
    } else {
      compressors
    };
    let compressor_options = match options_json {
      Some(json) => parse_options_json(&json)?,
      None => Options::new(),
    };

    Ok(BenchmarkConfig {
      options: BenchmarkOptions {
        input,
        compressors,
        iterations: iterations.unwrap_or(defaults.iterations),
        warmup: warmup.or(defaults.warmup),
        include_gzip: gzip || defaults.gzip,
        include_brotli: brotli || defaults.brotli,
        verbose,
        file_type,
        compressor_options,
        on_progress: None,
      },
      format,
      report,
    })
  }
}

/// Parses a JSON object of compressor options.
pub fn parse_options_json(json: &str) -> Result<Options, ConfigError> {
  match serde_json::from_str(json).map_err(ConfigError::OptionsJson)? {
    Value::Object(options) => Ok(options),
    _ => Err(ConfigError::OptionsNotObject),
  }
}

/// Parses `key=value`. The value is JSON when it parses as JSON, a string otherwise.
pub fn parse_option(pair: &str) -> Result<(String, Value), ConfigError> {
  let Some((key, raw)) = pair.split_once('=') else {
    return Err(ConfigError::InvalidOption(pair.to_string()));
  };
  let key = key.trim();
  if key.is_empty() {
    return Err(ConfigError::InvalidOption(pair.to_string()));
  }
  let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
  Ok((key.to_string(), value))
}

/// Inserts `value` at a dotted `key`, creating intermediate objects.
pub fn set_option(options: &mut Options, key: &str, value: Value) {
  match key.split_once('.') {
    None => {
      options.insert(key.to_string(), value);
    }
    Some((head, rest)) => {
      let slot = options
        .entry(head.to_string())
        .or_insert_with(|| Value::Object(Options::new()));
      if !slot.is_object() {
        *slot = Value::Object(Options::new());
      }
      if let Value::Object(nested) = slot {
        set_option(nested, rest, value);
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn option_values_are_json_or_strings() {
    assert_eq!(parse_option("mangle=false").unwrap(), ("mangle".to_string(), json!(false)));
    assert_eq!(parse_option("ecma=2020").unwrap(), ("ecma".to_string(), json!(2020)));
    assert_eq!(parse_option("name=foo").unwrap(), ("name".to_string(), json!("foo")));
    assert!(parse_option("novalue").is_err());
    assert!(parse_option("=1").is_err());
  }

  #[test]
  fn dotted_keys_nest() {
    let mut options = Options::new();
    set_option(&mut options, "sourceMap.url", json!("out.js.map"));
    set_option(&mut options, "sourceMap.filename", json!("out.js"));
    assert_eq!(
      Value::Object(options),
      json!({ "sourceMap": { "url": "out.js.map", "filename": "out.js" } })
    );
  }

  #[test]
  fn options_json_must_be_an_object() {
    assert!(parse_options_json("[1]").is_err());
    assert!(parse_options_json("{").is_err());
    assert_eq!(parse_options_json(r#"{"a":1}"#).unwrap().len(), 1);
  }

  #[test]
  fn missing_config_file_yields_defaults() {
    let config = FileConfig::load(Path::new("definitely/not/here/minilab.toml")).unwrap();
    assert_eq!(config.benchmark.compressors, ["terser", "esbuild", "swc"]);
    assert_eq!(config.benchmark.iterations, 1);
    assert!(config.compress.compressor.is_none());
  }

  #[test]
  fn config_file_overrides_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("minilab.toml");
    std::fs::write(
      &path,
      r#"
        [compress]
        compressor = "esbuild"
        type = "css"

        [benchmark]
        compressors = ["no-compress"]
        iterations = 4
      "#,
    )
    .unwrap();
    let config = FileConfig::load(&path).unwrap();
    assert_eq!(config.compress.compressor.as_deref(), Some("esbuild"));
    assert_eq!(config.compress.file_type, Some(FileType::Css));
    assert_eq!(config.benchmark.compressors, ["no-compress"]);
    assert_eq!(config.benchmark.iterations, 4);
  }
}
