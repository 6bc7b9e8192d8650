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

//! The compressor contract.
//!
//! A compressor receives `{settings, content, index}` and either fails or
//! returns a [`CompressorOutput`]. Adapters for external tools live in
//! [`crate::adapters`]; library callers can hand in any async closure through
//! [`FnCompressor`].

use crate::error::CompressorError;
use crate::settings::Options;
use crate::settings::Settings;
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Content handed to, or produced by, a compressor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
  Text(String),
  Bytes(Vec<u8>),
}

impl Content {
  /// Text when the bytes are valid UTF-8, raw bytes otherwise.
  pub fn from_bytes(bytes: Vec<u8>) -> Self {
    match String::from_utf8(bytes) {
      Ok(text) => Content::Text(text),
      Err(err) => Content::Bytes(err.into_bytes()),
    }
  }

  pub fn as_bytes(&self) -> &[u8] {
    match self {
      Content::Text(text) => text.as_bytes(),
      Content::Bytes(bytes) => bytes,
    }
  }

  pub fn into_bytes(self) -> Vec<u8> {
    match self {
      Content::Text(text) => text.into_bytes(),
      Content::Bytes(bytes) => bytes,
    }
  }

  pub fn as_text(&self) -> Option<&str> {
    match self {
      Content::Text(text) => Some(text),
      Content::Bytes(_) => None,
    }
  }

  pub fn len(&self) -> usize {
    self.as_bytes().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl From<String> for Content {
  fn from(text: String) -> Self {
    Content::Text(text)
  }
}

impl From<&str> for Content {
  fn from(text: &str) -> Self {
    Content::Text(text.to_string())
  }
}

impl From<Vec<u8>> for Content {
  fn from(bytes: Vec<u8>) -> Self {
    Content::Bytes(bytes)
  }
}

/// One entry of a multi-format result (e.g. `webp` and `avif` from one image).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputEntry {
  pub format: Option<String>,
  pub content: Content,
}

/// What a compressor returns on success. `code` is always present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompressorOutput {
  pub code: String,
  pub map: Option<String>,
  pub buffer: Option<Vec<u8>>,
  pub outputs: Vec<OutputEntry>,
}

impl CompressorOutput {
  pub fn code(code: impl Into<String>) -> Self {
    CompressorOutput {
      code: code.into(),
      ..Default::default()
    }
  }

  pub fn buffer(buffer: Vec<u8>) -> Self {
    CompressorOutput {
      buffer: Some(buffer),
      ..Default::default()
    }
  }

  pub fn with_map(mut self, map: impl Into<String>) -> Self {
    self.map = Some(map.into());
    self
  }

  pub fn with_output(mut self, format: Option<&str>, content: impl Into<Content>) -> Self {
    self.outputs.push(OutputEntry {
      format: format.map(str::to_string),
      content: content.into(),
    });
    self
  }
}

/// Arguments of one compressor invocation.
#[derive(Clone, Copy)]
pub struct CompressArgs<'a> {
  pub settings: &'a Settings,
  pub content: &'a Content,
  /// Position of the file within a batch, if any.
  pub index: Option<usize>,
}

/// A pluggable minifier.
#[async_trait]
pub trait Compressor: Send + Sync {
  async fn compress(&self, args: CompressArgs<'_>) -> Result<CompressorOutput, CompressorError>;
}

/// Owned view of [`CompressArgs`] handed to closures.
#[derive(Debug, Clone)]
pub struct CompressJob {
  pub label: String,
  pub content: Content,
  pub options: Options,
  pub index: Option<usize>,
}

/// Adapts an async closure into a [`Compressor`].
pub struct FnCompressor<F>(F);

impl<F> FnCompressor<F> {
  pub fn new(f: F) -> Self {
    FnCompressor(f)
  }
}

#[async_trait]
impl<F, Fut> Compressor for FnCompressor<F>
where
  F: Fn(CompressJob) -> Fut + Send + Sync,
  Fut: Future<Output = Result<CompressorOutput, CompressorError>> + Send,
{
  async fn compress(&self, args: CompressArgs<'_>) -> Result<CompressorOutput, CompressorError> {
    let job = CompressJob {
      label: args.settings.label.clone(),
      content: args.content.clone(),
      options: args.settings.options.clone(),
      index: args.index,
    };
    (self.0)(job).await
  }
}

/// Shorthand for `Arc::new(FnCompressor::new(f))`.
pub fn compressor_fn<F, Fut>(f: F) -> Arc<dyn Compressor>
where
  F: Fn(CompressJob) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<CompressorOutput, CompressorError>> + Send + 'static,
{
  Arc::new(FnCompressor::new(f))
}

impl fmt::Debug for dyn Compressor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("<compressor>")
  }
}
