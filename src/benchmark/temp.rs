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
use rand::RngCore;
use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

/// Temp outputs of one benchmark pair.
///
/// Call [`TempFiles::cleanup`] when done. If the guard is dropped without it
/// (a panic, a cancelled future) the files are removed with blocking I/O
/// from `Drop`. Removal is best-effort: errors are ignored so they never
/// mask the benchmark's own result. Files named after a tracked path plus a
/// suffix (multi-format outputs) are removed too.
#[derive(Debug, Default)]
pub struct TempFiles {
  paths: Vec<PathBuf>,
}

impl TempFiles {
  pub fn new() -> Self {
    TempFiles::default()
  }

  /// Reserves `<file>.<compressor>.<purpose>.<random hex>.tmp`.
  pub fn create(&mut self, file: &Path, compressor: &str, purpose: &str) -> PathBuf {
    let suffix = rand::rng().next_u32();
    let mut name = file.as_os_str().to_os_string();
    name.push(format!(".{}.{purpose}.{suffix:08x}.tmp", sanitize(compressor)));
    let path = PathBuf::from(name);
    self.paths.push(path.clone());
    path
  }

  pub fn paths(&self) -> &[PathBuf] {
    &self.paths
  }

  /// Removes every tracked file and its derived outputs.
  pub async fn cleanup(mut self) {
    let paths = std::mem::take(&mut self.paths);
    for path in &paths {
      let _ = tokio::fs::remove_file(path).await;
    }
    for (dir, prefixes) in derived_prefixes(&paths) {
      let Ok(mut entries) = tokio::fs::read_dir(&dir).await else {
        continue;
      };
      while let Ok(Some(entry)) = entries.next_entry().await {
        if is_derived(&entry.file_name(), &prefixes) {
          let _ = tokio::fs::remove_file(entry.path()).await;
        }
      }
    }
  }
}

impl Drop for TempFiles {
  fn drop(&mut self) {
    if self.paths.is_empty() {
      return;
    }
    for path in &self.paths {
      let _ = std::fs::remove_file(path);
    }
    for (dir, prefixes) in derived_prefixes(&self.paths) {
      let Ok(entries) = std::fs::read_dir(&dir) else {
        continue;
      };
      for entry in entries.flatten() {
        if is_derived(&entry.file_name(), &prefixes) {
          let _ = std::fs::remove_file(entry.path());
        }
      }
    }
  }
}

/// `<name>.` prefixes of the tracked files, grouped by directory so each
/// directory is listed once.
fn derived_prefixes(paths: &[PathBuf]) -> BTreeMap<PathBuf, Vec<String>> {
  let mut by_dir: BTreeMap<PathBuf, Vec<String>> = BTreeMap::new();
  for path in paths {
    let (Some(dir), Some(name)) = (path.parent(), path.file_name().and_then(|n| n.to_str())) else {
      continue;
    };
    let dir = if dir.as_os_str().is_empty() { Path::new(".") } else { dir };
    by_dir
      .entry(dir.to_path_buf())
      .or_default()
      .push(format!("{name}."));
  }
  by_dir
}

fn is_derived(file_name: &std::ffi::OsStr, prefixes: &[String]) -> bool {
  file_name
    .to_str()
    .is_some_and(|name| prefixes.iter().any(|prefix| name.starts_with(prefix.as_str())))
}

/// Keeps a compressor name usable inside a file name.
pub fn sanitize(name: &str) -> String {
  name
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn names_are_unique_and_sanitized() {
    let mut temps = TempFiles::new();
    let a = temps.create(Path::new("dir/app.js"), "@scope/tool", "warmup");
    let b = temps.create(Path::new("dir/app.js"), "@scope/tool", "warmup");
    assert_ne!(a, b);
    let name = a.file_name().unwrap().to_str().unwrap();
    assert!(name.starts_with("app.js._scope_tool.warmup."));
    assert!(name.ends_with(".tmp"));
    assert_eq!(a.parent(), Some(Path::new("dir")));
  }

  #[test]
  fn drop_removes_files_and_derived_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("a.png");
    let (tmp, missing) = {
      let mut temps = TempFiles::new();
      let tmp = temps.create(&input, "imagemin", "0");
      let missing = temps.create(&input, "imagemin", "1");
      std::fs::write(&tmp, "x").unwrap();
      std::fs::write(format!("{}.webp", tmp.display()), "x").unwrap();
      (tmp, missing)
    };
    assert!(!tmp.exists());
    assert!(!missing.exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
  }

  #[tokio::test]
  async fn cleanup_spares_unrelated_files() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("a.png");
    std::fs::write(&input, "keep").unwrap();
    std::fs::write(dir.path().join("a.png.other"), "keep").unwrap();

    let mut temps = TempFiles::new();
    for i in 0..3 {
      let tmp = temps.create(&input, "imagemin", &i.to_string());
      std::fs::write(&tmp, "x").unwrap();
      std::fs::write(format!("{}.avif", tmp.display()), "x").unwrap();
    }
    temps.cleanup().await;

    let mut left: Vec<_> = std::fs::read_dir(dir.path())
      .unwrap()
      .map(|entry| entry.unwrap().file_name())
      .collect();
    left.sort();
    assert_eq!(left, ["a.png", "a.png.other"]);
  }

  #[test]
  fn prefixes_are_grouped_per_directory() {
    let paths = [
      PathBuf::from("x/a.tmp"),
      PathBuf::from("x/b.tmp"),
      PathBuf::from("c.tmp"),
    ];
    let grouped = derived_prefixes(&paths);
    assert_eq!(grouped.len(), 2);
    assert_eq!(grouped[Path::new("x")], ["a.tmp.", "b.tmp."]);
    assert_eq!(grouped[Path::new(".")], ["c.tmp."]);
  }
}
