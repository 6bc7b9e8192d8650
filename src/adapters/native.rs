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
use crate::compressor::CompressArgs;
use crate::compressor::Compressor;
use crate::compressor::CompressorOutput;
use crate::compressor::Content;
use crate::error::CompressorError;
use async_trait::async_trait;

/// Returns its input untouched. Useful as a baseline and for copying files.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCompress;

#[async_trait]
impl Compressor for NoCompress {
  async fn compress(&self, args: CompressArgs<'_>) -> Result<CompressorOutput, CompressorError> {
    Ok(match args.content {
      Content::Text(text) => CompressorOutput::code(text.clone()),
      Content::Bytes(bytes) => CompressorOutput::buffer(bytes.clone()),
    })
  }
}

/// Re-serializes JSON without insignificant whitespace. Key order is kept.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonMinify;

#[async_trait]
impl Compressor for JsonMinify {
  async fn compress(&self, args: CompressArgs<'_>) -> Result<CompressorOutput, CompressorError> {
    let Some(text) = args.content.as_text() else {
      return Err(CompressorError::Failed {
        label: "jsonminify".to_string(),
        message: "expected UTF-8 text content".to_string(),
      });
    };
    let value: serde_json::Value =
      serde_json::from_str(text).map_err(|e| CompressorError::Failed {
        label: "jsonminify".to_string(),
        message: e.to_string(),
      })?;
    Ok(CompressorOutput::code(value.to_string()))
  }
}
