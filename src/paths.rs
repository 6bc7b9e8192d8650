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

//! Input expansion and output path derivation.

use crate::compressor::OutputEntry;
use crate::error::SettingsError;
use crate::settings::Output;
use std::ffi::OsString;
use std::path::Path;
use std::path::PathBuf;

/// Placeholder replaced by the input file's stem in output patterns.
pub const INPUT_PLACEHOLDER: &str = "$1";

/// Prefixes `public_folder` unless the input is absolute or already under it.
pub fn with_public_folder(input: &str, public_folder: Option<&Path>) -> PathBuf {
  let path = PathBuf::from(input);
  match public_folder {
    Some(folder) if path.is_relative() && !path.starts_with(folder) => folder.join(path),
    _ => path,
  }
}

/// Expands `*`/`?` in the file-name component of each input, in sorted order.
/// Inputs without wildcards are returned as given. A wildcard in a directory
/// component (`src/*/a.js`) is rejected.
pub async fn expand_inputs(
  patterns: &[String],
  public_folder: Option<&Path>,
) -> Result<Vec<PathBuf>, SettingsError> {
  let mut expanded = Vec::new();
  for pattern in patterns {
    let path = with_public_folder(pattern, public_folder);
    if has_wildcard_dir(&path) {
      return Err(SettingsError::WildcardInDirectory(pattern.clone()));
    }
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
      expanded.push(path);
      continue;
    };
    if !has_wildcard(name) {
      expanded.push(path);
      continue;
    }

    let name = name.to_string();
    let dir = match path.parent() {
      Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
      _ => PathBuf::from("."),
    };
    let mut entries = tokio::fs::read_dir(&dir)
      .await
      .map_err(|source| SettingsError::Expand {
        pattern: pattern.clone(),
        source,
      })?;

    let mut matches = Vec::new();
    while let Some(entry) = entries
      .next_entry()
      .await
      .map_err(|source| SettingsError::Expand {
        pattern: pattern.clone(),
        source,
      })?
    {
      let file_name = entry.file_name();
      let Some(file_name) = file_name.to_str() else {
        continue;
      };
      let is_file = entry.file_type().await.is_ok_and(|t| t.is_file());
      if is_file && wildcard_match(&name, file_name) {
        matches.push(path.with_file_name(file_name));
      }
    }
    if matches.is_empty() {
      return Err(SettingsError::NoMatch(pattern.clone()));
    }
    matches.sort();
    expanded.extend(matches);
  }
  Ok(expanded)
}

pub fn has_wildcard(pattern: &str) -> bool {
  pattern.contains(['*', '?'])
}

fn has_wildcard_dir(path: &Path) -> bool {
  path.parent().is_some_and(|dir| {
    dir
      .components()
      .any(|component| component.as_os_str().to_str().is_some_and(has_wildcard))
  })
}

/// Matches `name` against a pattern where `*` is any run and `?` any one character.
pub fn wildcard_match(pattern: &str, name: &str) -> bool {
  let pattern: Vec<char> = pattern.chars().collect();
  let name: Vec<char> = name.chars().collect();
  let (mut p, mut n) = (0, 0);
  let mut backtrack: Option<(usize, usize)> = None;

  while n < name.len() {
    if p < pattern.len() && (pattern[p] == '?' || pattern[p] == name[n]) {
      p += 1;
      n += 1;
    } else if p < pattern.len() && pattern[p] == '*' {
      backtrack = Some((p, n));
      p += 1;
    } else if let Some((star, matched)) = backtrack {
      p = star + 1;
      n = matched + 1;
      backtrack = Some((star, matched + 1));
    } else {
      return false;
    }
  }
  pattern[p..].iter().all(|c| *c == '*')
}

/// Replaces `$1` with the input's stem. A pattern without a directory is
/// placed next to the input.
pub fn substitute_output(pattern: &str, input: Option<&Path>) -> PathBuf {
  let Some(input) = input.filter(|_| pattern.contains(INPUT_PLACEHOLDER)) else {
    return PathBuf::from(pattern);
  };
  let stem = input
    .file_stem()
    .map(|stem| stem.to_string_lossy().into_owned())
    .unwrap_or_default();
  let replaced = PathBuf::from(pattern.replace(INPUT_PLACEHOLDER, &stem));
  let has_dir = replaced
    .parent()
    .is_some_and(|parent| !parent.as_os_str().is_empty());
  match input.parent() {
    Some(dir) if !has_dir => dir.join(replaced),
    _ => replaced,
  }
}

/// Where the primary result (code or buffer) is written.
pub fn primary_output(output: &Output, input: Option<&Path>) -> Option<PathBuf> {
  match output {
    Output::Path(pattern) => Some(substitute_output(pattern, input)),
    Output::Many(paths) => paths.first().cloned(),
  }
}

/// Paths for each entry of a multi-format result.
///
/// * an explicit list gives one path per entry,
/// * `$1` alone gives `<input dir>/<input stem>.<format>`,
/// * any other pattern is substituted, then suffixed with `.<format>`.
///
/// Entries without a format use the input's extension.
pub fn multi_output_paths(
  output: &Output,
  input: Option<&Path>,
  entries: &[OutputEntry],
) -> Result<Vec<PathBuf>, SettingsError> {
  if let Output::Many(paths) = output {
    if paths.len() < entries.len() {
      return Err(SettingsError::OutputCountMismatch {
        inputs: entries.len(),
        outputs: paths.len(),
      });
    }
    return Ok(paths[..entries.len()].to_vec());
  }

  let Output::Path(pattern) = output else {
    return Ok(Vec::new());
  };
  let fallback_format = input
    .and_then(Path::extension)
    .map(|ext| ext.to_string_lossy().into_owned())
    .unwrap_or_else(|| "out".to_string());

  let base = if pattern == INPUT_PLACEHOLDER {
    match input {
      Some(input) => {
        let stem = input.file_stem().map(OsString::from).unwrap_or_default();
        input.with_file_name(stem)
      }
      None => PathBuf::from("output"),
    }
  } else {
    substitute_output(pattern, input)
  };

  Ok(
    entries
      .iter()
      .map(|entry| {
        let format = entry.format.as_deref().unwrap_or(&fallback_format);
        with_suffix(&base, format)
      })
      .collect(),
  )
}

/// Appends `.<suffix>` to a path without replacing its extension.
pub fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
  let mut p = path.as_os_str().to_os_string();
  p.push(".");
  p.push(suffix);
  PathBuf::from(p)
}

/// `path` relative to `base` when possible, for display.
pub fn display_path(path: &Path, base: &Path) -> String {
  pathdiff::diff_paths(path, base)
    .filter(|relative| !relative.as_os_str().is_empty())
    .unwrap_or_else(|| path.to_path_buf())
    .display()
    .to_string()
}
