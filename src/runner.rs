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

//! Runs a compressor once and persists what it returned.

use crate::compressor::CompressArgs;
use crate::compressor::Content;
use crate::compressor::CompressorOutput;
use crate::context::RunContext;
use crate::error::CompressorError;
use crate::error::FileError;
use crate::error::Result;
use crate::paths;
use crate::settings::Options;
use crate::settings::Output;
use crate::settings::Settings;
use std::path::Path;
use std::path::PathBuf;

/// Compresses `content` and writes the result according to `settings`.
/// Returns the `code` produced by the compressor.
pub async fn run_one(
  settings: &Settings,
  content: &Content,
  index: Option<usize>,
  ctx: &RunContext,
) -> Result<String> {
  Ok(run_and_persist(settings, content, index, ctx).await?.code)
}

/// Like [`run_one`], but hands back everything the compressor returned.
pub async fn run_and_persist(
  settings: &Settings,
  content: &Content,
  index: Option<usize>,
  ctx: &RunContext,
) -> Result<CompressorOutput> {
  let output = invoke(settings, content, index).await?;
  if !settings.is_in_memory() {
    persist(settings, &output, ctx).await?;
  }
  Ok(output)
}

/// Calls the compressor, applying `settings.timeout` if set.
pub async fn invoke(
  settings: &Settings,
  content: &Content,
  index: Option<usize>,
) -> std::result::Result<CompressorOutput, CompressorError> {
  let args = CompressArgs {
    settings,
    content,
    index,
  };
  let call = settings.compressor.compress(args);
  match settings.timeout {
    Some(timeout) => tokio::time::timeout(timeout, call)
      .await
      .map_err(|_| CompressorError::Timeout {
        label: settings.label.clone(),
        timeout,
      })?,
    None => call.await,
  }
}

async fn persist(settings: &Settings, output: &CompressorOutput, ctx: &RunContext) -> Result<()> {
  let input = settings
    .input
    .as_ref()
    .and_then(|input| input.as_slice().first())
    .map(PathBuf::from);
  let target = match (&settings.output, &input) {
    (Some(target), _) => target.clone(),
    (None, Some(input)) if settings.replace_in_place => {
      Output::Path(input.to_string_lossy().into_owned())
    }
    _ => return Ok(()),
  };

  if !output.outputs.is_empty() {
    let paths = paths::multi_output_paths(&target, input.as_deref(), &output.outputs)?;
    for (entry, path) in output.outputs.iter().zip(paths) {
      write_file(&path, entry.content.as_bytes()).await?;
    }
  } else if let Some(path) = paths::primary_output(&target, input.as_deref()) {
    if let Some(buffer) = &output.buffer {
      write_file(&path, buffer).await?;
    } else if !output.code.is_empty() || settings.allow_empty_output {
      write_file(&path, output.code.as_bytes()).await?;
    } else {
      tracing::warn!(
        compressor = %settings.label,
        path = %path.display(),
        "Compressor returned empty code, skipping write (set allow_empty_output to write it)"
      );
    }
  }

  if let Some(map) = &output.map {
    match source_map_path(&settings.options, ctx) {
      Some(path) => write_file(&path, map.as_bytes()).await?,
      None => tracing::debug!(compressor = %settings.label, "Discarding source map, no path configured"),
    }
  }
  Ok(())
}

/// Resolves where a source map goes: `sourceMap.url`, then
/// `sourceMap.filename`, then the legacy `_sourceMap.url`.
pub fn source_map_path(options: &Options, ctx: &RunContext) -> Option<PathBuf> {
  let current = options.get("sourceMap").and_then(|source_map| {
    source_map
      .get("url")
      .and_then(|url| url.as_str())
      .or_else(|| source_map.get("filename").and_then(|name| name.as_str()))
  });
  if let Some(path) = current {
    return Some(PathBuf::from(path));
  }

  let legacy = options
    .get("_sourceMap")
    .and_then(|source_map| source_map.get("url"))
    .and_then(|url| url.as_str())?;
  ctx.deprecations.warn_once(
    "_sourceMap",
    "The `_sourceMap` option is deprecated, use `sourceMap.url` instead",
  );
  Some(PathBuf::from(legacy))
}

/// Creates the parent directory of `path` if it has one.
pub async fn ensure_parent_dir(path: &Path) -> std::result::Result<(), FileError> {
  match path.parent() {
    Some(parent) if !parent.as_os_str().is_empty() => tokio::fs::create_dir_all(parent)
      .await
      .map_err(|source| FileError::CreateDir {
        path: parent.to_path_buf(),
        source,
      }),
    _ => Ok(()),
  }
}

async fn write_file(path: &Path, bytes: &[u8]) -> std::result::Result<(), FileError> {
  ensure_parent_dir(path).await?;
  tokio::fs::write(path, bytes)
    .await
    .map_err(|source| FileError::Write {
      path: path.to_path_buf(),
      source,
    })?;
  tracing::debug!(path = %path.display(), bytes = bytes.len(), "Wrote output");
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::compressor::compressor_fn;
  use crate::error::MinilabError;
  use serde_json::json;
  use std::time::Duration;

  fn upper() -> Settings {
    Settings::builder()
      .label("upper")
      .compressor(compressor_fn(|job| async move {
        let text = job.content.as_text().unwrap_or_default().to_uppercase();
        Ok(CompressorOutput::code(text))
      }))
      .content("x")
      .build()
      .unwrap()
  }

  #[tokio::test]
  async fn in_memory_returns_code_without_writing() {
    let settings = upper();
    let code = run_one(&settings, &Content::from("abc"), None, &RunContext::new())
      .await
      .unwrap();
    assert_eq!(code, "ABC");
  }

  #[tokio::test]
  async fn writes_code_map_and_creates_dirs() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("nested/out.js");
    let map = dir.path().join("maps/out.js.map");
    let settings = Settings::builder()
      .label("mapper")
      .compressor(compressor_fn(|_| async { Ok(CompressorOutput::code("min").with_map("{}")) }))
      .input("in.js")
      .output(out.display().to_string())
      .option("sourceMap", json!({ "url": map.display().to_string() }))
      .build()
      .unwrap();

    run_one(&settings, &Content::from("x"), None, &RunContext::new())
      .await
      .unwrap();
    assert_eq!(std::fs::read_to_string(&out).unwrap(), "min");
    assert_eq!(std::fs::read_to_string(&map).unwrap(), "{}");
  }

  #[tokio::test]
  async fn buffer_takes_precedence_over_code() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.bin");
    let settings = Settings::builder()
      .compressor(compressor_fn(|_| async {
        let mut out = CompressorOutput::buffer(vec![0xde, 0xad]);
        out.code = "ignored".to_string();
        Ok(out)
      }))
      .input("in.png")
      .output(out.display().to_string())
      .build()
      .unwrap();

    run_one(&settings, &Content::from("x"), None, &RunContext::new())
      .await
      .unwrap();
    assert_eq!(std::fs::read(&out).unwrap(), [0xde, 0xad]);
  }

  #[tokio::test]
  async fn empty_code_is_skipped_unless_allowed() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.js");
    let builder = || {
      Settings::builder()
        .compressor(compressor_fn(|_| async { Ok(CompressorOutput::code("")) }))
        .input("in.js")
        .output(out.display().to_string())
    };

    let skipped = builder().build().unwrap();
    run_one(&skipped, &Content::from("x"), None, &RunContext::new())
      .await
      .unwrap();
    assert!(!out.exists());

    let allowed = builder().allow_empty_output(true).build().unwrap();
    run_one(&allowed, &Content::from("x"), None, &RunContext::new())
      .await
      .unwrap();
    assert_eq!(std::fs::read_to_string(&out).unwrap(), "");
  }

  #[tokio::test]
  async fn multi_format_outputs_use_input_stem() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("photo.png");
    let settings = Settings::builder()
      .compressor(compressor_fn(|_| async {
        Ok(
          CompressorOutput::code("")
            .with_output(Some("webp"), vec![1u8])
            .with_output(Some("avif"), vec![2u8]),
        )
      }))
      .input(input.display().to_string())
      .output("$1")
      .build()
      .unwrap();

    run_one(&settings, &Content::from("x"), None, &RunContext::new())
      .await
      .unwrap();
    assert_eq!(std::fs::read(dir.path().join("photo.webp")).unwrap(), [1]);
    assert_eq!(std::fs::read(dir.path().join("photo.avif")).unwrap(), [2]);
  }

  #[tokio::test]
  async fn timeout_is_an_execution_error() {
    let settings = Settings::builder()
      .label("slow")
      .compressor(compressor_fn(|_| async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(CompressorOutput::code("late"))
      }))
      .content("x")
      .timeout(Duration::from_millis(20))
      .build()
      .unwrap();

    let err = run_one(&settings, &Content::from("x"), None, &RunContext::new())
      .await
      .unwrap_err();
    assert!(matches!(
      err,
      MinilabError::Compressor(CompressorError::Timeout { .. })
    ));
    assert!(err.to_string().starts_with("slow:"));
  }

  #[test]
  fn source_map_lookup_order() {
    let ctx = RunContext::new();
    let mut options = Options::new();
    options.insert("_sourceMap".into(), json!({ "url": "legacy.map" }));
    assert_eq!(source_map_path(&options, &ctx), Some(PathBuf::from("legacy.map")));
    assert!(ctx.deprecations.has_warned("_sourceMap"));

    options.insert("sourceMap".into(), json!({ "filename": "name.map" }));
    assert_eq!(source_map_path(&options, &ctx), Some(PathBuf::from("name.map")));

    options.insert("sourceMap".into(), json!({ "url": "url.map", "filename": "name.map" }));
    assert_eq!(source_map_path(&options, &ctx), Some(PathBuf::from("url.map")));

    assert_eq!(source_map_path(&Options::new(), &ctx), None);
  }
}
