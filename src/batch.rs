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

//! Entry point for compressing one or many files.

use crate::compressor::Content;
use crate::context::RunContext;
use crate::error::FileError;
use crate::error::MinilabError;
use crate::error::Result;
use crate::error::SettingsError;
use crate::paths;
use crate::runner;
use crate::settings::Input;
use crate::settings::Output;
use crate::settings::Settings;
use std::path::Path;
use std::path::PathBuf;
use tracing::Instrument;

const SYNC_DEPRECATION: &str =
  "The `sync` option is deprecated and will be removed, files are always compressed sequentially";

/// One file of a batch and the settings it runs with.
struct Job {
  input: PathBuf,
  settings: Settings,
}

/// Compresses according to `settings` and returns the resulting code.
/// For batches, the code of the last file is returned.
pub async fn compress(settings: Settings) -> Result<String> {
  let ctx = RunContext::new();
  compress_with(&settings, &ctx).await
}

/// Same as [`compress`], sharing deprecation state through `ctx`.
pub async fn compress_with(settings: &Settings, ctx: &RunContext) -> Result<String> {
  settings.validate()?;
  let span = tracing::info_span!("compress", compressor = %settings.label);
  async {
    if let Some(content) = &settings.content {
      return runner::run_one(settings, content, None, ctx).await;
    }

    let patterns = settings
      .input
      .as_ref()
      .map(Input::as_slice)
      .ok_or(SettingsError::MissingInput)?;
    let inputs = paths::expand_inputs(patterns, settings.public_folder.as_deref()).await?;
    if inputs.is_empty() {
      return Err(SettingsError::EmptyInput.into());
    }

    if settings.sync {
      ctx.deprecations.warn_once("sync", SYNC_DEPRECATION);
    }

    match batch_jobs(settings, &inputs)? {
      Some(jobs) => run_batch(jobs, settings.sync, ctx).await,
      None => run_single(settings, &inputs, ctx).await,
    }
  }
  .instrument(span)
  .await
}

/// Drives [`compress`] on a private current-thread runtime.
/// Must not be called from inside an async context.
pub fn compress_blocking(settings: Settings) -> Result<String> {
  let runtime = tokio::runtime::Builder::new_current_thread()
    .enable_all()
    .build()
    .map_err(MinilabError::Runtime)?;
  runtime.block_on(compress(settings))
}

/// Splits the request into one job per input, or `None` when all inputs feed
/// a single run.
fn batch_jobs(settings: &Settings, inputs: &[PathBuf]) -> Result<Option<Vec<Job>>> {
  if inputs.len() < 2 {
    return Ok(None);
  }

  let outputs: Vec<Output> = if settings.replace_in_place {
    inputs.iter().map(|input| Output::Path(path_string(input))).collect()
  } else {
    match &settings.output {
      Some(Output::Many(paths)) => {
        if paths.len() != inputs.len() {
          return Err(
            SettingsError::OutputCountMismatch {
              inputs: inputs.len(),
              outputs: paths.len(),
            }
            .into(),
          );
        }
        paths.iter().map(|path| Output::Path(path_string(path))).collect()
      }
      Some(Output::Path(pattern)) if pattern.contains(paths::INPUT_PLACEHOLDER) => {
        vec![Output::Path(pattern.clone()); inputs.len()]
      }
      _ => return Ok(None),
    }
  };

  let jobs = inputs
    .iter()
    .zip(outputs)
    .map(|(input, output)| Job {
      input: input.clone(),
      settings: Settings {
        input: Some(Input::One(path_string(input))),
        output: Some(output),
        replace_in_place: false,
        ..settings.clone()
      },
    })
    .collect();
  Ok(Some(jobs))
}

async fn run_single(settings: &Settings, inputs: &[PathBuf], ctx: &RunContext) -> Result<String> {
  let content = read_inputs(inputs).await?;
  let settings = Settings {
    input: Some(match inputs {
      [one] => Input::One(path_string(one)),
      many => Input::Many(many.iter().map(|path| path_string(path)).collect()),
    }),
    ..settings.clone()
  };
  if let Some(first) = first_output(&settings, inputs.first()) {
    runner::ensure_parent_dir(&first).await?;
  }
  runner::run_one(&settings, &content, None, ctx).await
}

async fn run_batch(jobs: Vec<Job>, sync: bool, ctx: &RunContext) -> Result<String> {
  let span = tracing::info_span!("batch", files = jobs.len(), sync);
  async {
    if let Some(job) = jobs.first()
      && let Some(first) = first_output(&job.settings, Some(&job.input))
    {
      runner::ensure_parent_dir(&first).await?;
    }

    let mut last = String::new();
    for (index, job) in jobs.iter().enumerate() {
      tracing::debug!(index, input = %job.input.display(), "Compressing file");
      let content = if sync {
        read_input_blocking(&job.input).await?
      } else {
        read_input(&job.input).await?
      };
      last = runner::run_one(&job.settings, &content, Some(index), ctx).await?;
    }
    Ok(last)
  }
  .instrument(span)
  .await
}

fn first_output(settings: &Settings, input: Option<&PathBuf>) -> Option<PathBuf> {
  let input = input.map(PathBuf::as_path);
  match (&settings.output, input) {
    (Some(output), _) => paths::primary_output(output, input),
    (None, Some(input)) if settings.replace_in_place => Some(input.to_path_buf()),
    _ => None,
  }
}

pub(crate) async fn read_input(path: &Path) -> std::result::Result<Content, FileError> {
  let bytes = tokio::fs::read(path).await.map_err(|source| FileError::Read {
    path: path.to_path_buf(),
    source,
  })?;
  Ok(Content::from_bytes(bytes))
}

/// Legacy sync mode: a plain blocking read, run on the blocking pool so the
/// executor thread stays free.
async fn read_input_blocking(path: &Path) -> std::result::Result<Content, FileError> {
  let owned = path.to_path_buf();
  let read = tokio::task::spawn_blocking(move || std::fs::read(owned))
    .await
    .unwrap_or_else(|join| Err(std::io::Error::other(join)));
  let bytes = read.map_err(|source| FileError::Read {
    path: path.to_path_buf(),
    source,
  })?;
  Ok(Content::from_bytes(bytes))
}

/// Reads every input. Several inputs are joined with a newline.
async fn read_inputs(paths: &[PathBuf]) -> std::result::Result<Content, FileError> {
  let mut contents = Vec::with_capacity(paths.len());
  for path in paths {
    contents.push(read_input(path).await?);
  }
  if contents.len() == 1 {
    return Ok(contents.remove(0));
  }
  let joined = contents
    .iter()
    .map(Content::as_bytes)
    .collect::<Vec<_>>()
    .join(&b'\n');
  Ok(Content::from_bytes(joined))
}

fn path_string(path: &Path) -> String {
  path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::compressor::CompressorOutput;
  use crate::compressor::compressor_fn;
  use crate::error::CompressorError;
  use std::sync::Arc;
  use std::sync::Mutex;

  fn write(dir: &Path, name: &str, text: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, text).unwrap();
    path.display().to_string()
  }

  #[tokio::test]
  async fn in_memory_content_is_returned() {
    let settings = Settings::builder()
      .compressor(compressor_fn(|job| async move {
        Ok(CompressorOutput::code(job.content.as_text().unwrap_or_default().trim()))
      }))
      .content("  a  ")
      .build()
      .unwrap();
    assert_eq!(compress(settings).await.unwrap(), "a");
  }

  #[tokio::test]
  async fn multiple_inputs_with_one_output_are_concatenated() {
    let dir = tempfile::tempdir().unwrap();
    let a = write(dir.path(), "a.js", "one");
    let b = write(dir.path(), "b.js", "two");
    let out = dir.path().join("dist/bundle.js");
    let settings = Settings::builder()
      .compressor(compressor_fn(|job| async move {
        Ok(CompressorOutput::code(job.content.as_text().unwrap_or_default()))
      }))
      .inputs([a, b])
      .output(out.display().to_string())
      .build()
      .unwrap();

    assert_eq!(compress(settings).await.unwrap(), "one\ntwo");
    assert_eq!(std::fs::read_to_string(out).unwrap(), "one\ntwo");
  }

  #[tokio::test]
  async fn batch_runs_in_order_and_stops_at_first_failure() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = [
      write(dir.path(), "a.js", "a"),
      write(dir.path(), "b.js", "fail"),
      write(dir.path(), "c.js", "c"),
    ];
    let seen = Arc::new(Mutex::new(Vec::new()));
    let spy = seen.clone();
    let settings = Settings::builder()
      .label("spy")
      .compressor(compressor_fn(move |job| {
        let spy = spy.clone();
        async move {
          let text = job.content.as_text().unwrap_or_default().to_string();
          spy.lock().unwrap().push((job.index, text.clone()));
          if text == "fail" {
            return Err(CompressorError::Failed {
              label: job.label,
              message: "boom".to_string(),
            });
          }
          Ok(CompressorOutput::code(text))
        }
      }))
      .inputs(inputs)
      .output(dir.path().join("out/$1.min.js").display().to_string())
      .build()
      .unwrap();

    let err = compress(settings).await.unwrap_err();
    assert_eq!(err.to_string(), "spy: boom");
    assert_eq!(
      *seen.lock().unwrap(),
      [(Some(0), "a".to_string()), (Some(1), "fail".to_string())]
    );
    assert!(dir.path().join("out/a.min.js").exists());
    assert!(!dir.path().join("out/c.min.js").exists());
  }

  #[tokio::test]
  async fn output_list_must_match_inputs() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings::builder()
      .compressor(compressor_fn(|_| async { Ok(CompressorOutput::code("x")) }))
      .inputs([write(dir.path(), "a.js", "a"), write(dir.path(), "b.js", "b")])
      .outputs([dir.path().join("only.js")])
      .build()
      .unwrap();
    assert!(matches!(
      compress(settings).await,
      Err(MinilabError::Settings(SettingsError::OutputCountMismatch { .. }))
    ));
  }

  #[tokio::test]
  async fn replace_in_place_overwrites_each_input() {
    let dir = tempfile::tempdir().unwrap();
    let a = write(dir.path(), "a.css", "a { }");
    let b = write(dir.path(), "b.css", "b { }");
    let settings = Settings::builder()
      .compressor(compressor_fn(|job| async move {
        let text = job.content.as_text().unwrap_or_default().replace(' ', "");
        Ok(CompressorOutput::code(text))
      }))
      .inputs([a.clone(), b.clone()])
      .replace_in_place(true)
      .sync(true)
      .build()
      .unwrap();

    let ctx = RunContext::new();
    assert_eq!(compress_with(&settings, &ctx).await.unwrap(), "b{}");
    assert_eq!(std::fs::read_to_string(a).unwrap(), "a{}");
    assert_eq!(std::fs::read_to_string(b).unwrap(), "b{}");
    assert!(ctx.deprecations.has_warned("sync"));
  }

  #[tokio::test]
  async fn sync_read_reports_the_missing_path() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("gone.css");
    let err = read_input_blocking(&missing).await.unwrap_err();
    assert!(matches!(&err, FileError::Read { path, .. } if *path == missing));
  }

  #[test]
  fn blocking_entry_point() {
    let settings = Settings::builder()
      .compressor(compressor_fn(|_| async { Ok(CompressorOutput::code("done")) }))
      .content("x")
      .build()
      .unwrap();
    assert_eq!(compress_blocking(settings).unwrap(), "done");
  }
}
