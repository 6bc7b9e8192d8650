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
use crate::compressor::Compressor;
use crate::compressor::Content;
use crate::error::SettingsError;
use serde::Deserialize;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Compressor-specific options bag, passed through untouched.
pub type Options = serde_json::Map<String, serde_json::Value>;

/// Kind of file being compressed. Some compressors need it (esbuild, yui).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
  Js,
  Css,
  Html,
}

impl FileType {
  pub fn as_str(self) -> &'static str {
    match self {
      FileType::Js => "js",
      FileType::Css => "css",
      FileType::Html => "html",
    }
  }
}

impl fmt::Display for FileType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for FileType {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "js" => Ok(FileType::Js),
      "css" => Ok(FileType::Css),
      "html" => Ok(FileType::Html),
      other => Err(format!("unknown file type '{other}', expected js, css or html")),
    }
  }
}

/// Input file(s). Entries may contain `*`/`?` in their file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
  One(String),
  Many(Vec<String>),
}

impl Input {
  pub fn as_slice(&self) -> &[String] {
    match self {
      Input::One(path) => std::slice::from_ref(path),
      Input::Many(paths) => paths,
    }
  }
}

/// Output target: a single path (which may contain `$1`) or one path per input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
  Path(String),
  Many(Vec<PathBuf>),
}

/// A compression request.
#[derive(Debug, Clone)]
pub struct Settings {
  pub compressor: Arc<dyn Compressor>,
  pub label: String,
  pub content: Option<Content>,
  pub input: Option<Input>,
  pub output: Option<Output>,
  pub options: Options,
  /// Legacy synchronous mode.
  pub sync: bool,
  /// Upper bound on a compressor process' stdout.
  pub buffer_size: Option<usize>,
  pub timeout: Option<Duration>,
  pub file_type: Option<FileType>,
  pub public_folder: Option<PathBuf>,
  pub replace_in_place: bool,
  pub allow_empty_output: bool,
}

impl Settings {
  pub fn builder() -> SettingsBuilder {
    SettingsBuilder::default()
  }

  /// `true` when nothing should be written to disk.
  pub fn is_in_memory(&self) -> bool {
    self.content.is_some() || (self.output.is_none() && !self.replace_in_place)
  }

  /// Re-checks the invariants enforced by the builder. Used when callers
  /// mutate a `Settings` after building it.
  pub fn validate(&self) -> Result<(), SettingsError> {
    match (&self.content, &self.input) {
      (Some(_), Some(_)) => return Err(SettingsError::ContentAndInput),
      (None, None) => return Err(SettingsError::MissingInput),
      _ => {}
    }
    if let Some(input) = &self.input {
      if input.as_slice().is_empty() {
        return Err(SettingsError::EmptyInput);
      }
      if self.output.is_none() && !self.replace_in_place {
        return Err(SettingsError::MissingOutput);
      }
    }
    Ok(())
  }
}

/// Builds a [`Settings`], rejecting malformed requests before any I/O.
#[derive(Default)]
pub struct SettingsBuilder {
  compressor: Option<Arc<dyn Compressor>>,
  label: Option<String>,
  content: Option<Content>,
  input: Option<Input>,
  output: Option<Output>,
  options: Options,
  sync: bool,
  buffer_size: Option<usize>,
  timeout: Option<Duration>,
  file_type: Option<FileType>,
  public_folder: Option<PathBuf>,
  replace_in_place: bool,
  allow_empty_output: bool,
}

impl SettingsBuilder {
  pub fn compressor(mut self, compressor: Arc<dyn Compressor>) -> Self {
    self.compressor = Some(compressor);
    self
  }

  pub fn label(mut self, label: impl Into<String>) -> Self {
    self.label = Some(label.into());
    self
  }

  pub fn content(mut self, content: impl Into<Content>) -> Self {
    self.content = Some(content.into());
    self
  }

  pub fn input(mut self, input: impl Into<String>) -> Self {
    self.input = Some(Input::One(input.into()));
    self
  }

  pub fn inputs<I, S>(mut self, inputs: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.input = Some(Input::Many(inputs.into_iter().map(Into::into).collect()));
    self
  }

  pub fn output(mut self, output: impl Into<String>) -> Self {
    self.output = Some(Output::Path(output.into()));
    self
  }

  pub fn outputs<I, P>(mut self, outputs: I) -> Self
  where
    I: IntoIterator<Item = P>,
    P: Into<PathBuf>,
  {
    self.output = Some(Output::Many(outputs.into_iter().map(Into::into).collect()));
    self
  }

  pub fn options(mut self, options: Options) -> Self {
    self.options = options;
    self
  }

  pub fn option(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
    self.options.insert(key.into(), value);
    self
  }

  pub fn sync(mut self, sync: bool) -> Self {
    self.sync = sync;
    self
  }

  pub fn buffer_size(mut self, limit: usize) -> Self {
    self.buffer_size = Some(limit);
    self
  }

  pub fn timeout(mut self, timeout: Duration) -> Self {
    self.timeout = Some(timeout);
    self
  }

  pub fn file_type(mut self, file_type: FileType) -> Self {
    self.file_type = Some(file_type);
    self
  }

  pub fn public_folder(mut self, folder: impl Into<PathBuf>) -> Self {
    self.public_folder = Some(folder.into());
    self
  }

  pub fn replace_in_place(mut self, replace: bool) -> Self {
    self.replace_in_place = replace;
    self
  }

  pub fn allow_empty_output(mut self, allow: bool) -> Self {
    self.allow_empty_output = allow;
    self
  }

  pub fn build(self) -> Result<Settings, SettingsError> {
    let compressor = self.compressor.ok_or(SettingsError::MissingCompressor)?;
    let settings = Settings {
      compressor,
      label: self.label.unwrap_or_else(|| "compressor".to_string()),
      content: self.content,
      input: self.input,
      output: self.output,
      options: self.options,
      sync: self.sync,
      buffer_size: self.buffer_size,
      timeout: self.timeout,
      file_type: self.file_type,
      public_folder: self.public_folder,
      replace_in_place: self.replace_in_place,
      allow_empty_output: self.allow_empty_output,
    };
    settings.validate()?;
    Ok(settings)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::compressor::CompressorOutput;
  use crate::compressor::compressor_fn;

  fn identity() -> Arc<dyn Compressor> {
    compressor_fn(|job| async move {
      Ok(CompressorOutput::code(
        job.content.as_text().unwrap_or_default().to_string(),
      ))
    })
  }

  #[test]
  fn compressor_is_required() {
    let err = Settings::builder().content("x").build().unwrap_err();
    assert!(matches!(err, SettingsError::MissingCompressor));
  }

  #[test]
  fn content_and_input_are_exclusive() {
    let err = Settings::builder()
      .compressor(identity())
      .content("x")
      .input("a.js")
      .output("b.js")
      .build()
      .unwrap_err();
    assert!(matches!(err, SettingsError::ContentAndInput));
  }

  #[test]
  fn output_required_for_file_input() {
    let err = Settings::builder()
      .compressor(identity())
      .input("a.js")
      .build()
      .unwrap_err();
    assert!(matches!(err, SettingsError::MissingOutput));

    let in_place = Settings::builder()
      .compressor(identity())
      .input("a.js")
      .replace_in_place(true)
      .build();
    assert!(in_place.is_ok());
  }

  #[test]
  fn content_only_is_in_memory() {
    let settings = Settings::builder()
      .compressor(identity())
      .content("x")
      .build()
      .unwrap();
    assert!(settings.is_in_memory());
  }

  #[test]
  fn empty_input_list_is_rejected() {
    let err = Settings::builder()
      .compressor(identity())
      .inputs(Vec::<String>::new())
      .output("out.js")
      .build()
      .unwrap_err();
    assert!(matches!(err, SettingsError::EmptyInput));
  }

  #[test]
  fn file_type_parses_case_insensitively() {
    assert_eq!("CSS".parse::<FileType>(), Ok(FileType::Css));
    assert!("xml".parse::<FileType>().is_err());
  }
}
