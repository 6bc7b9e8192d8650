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

//! Discovery of installed compressor packages, for `minilab list`.

use crate::module::MANIFEST_FILE;
use crate::module::read_manifest;
use serde::Serialize;
use std::path::Path;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageInfo {
  /// Identifier accepted by the resolver, e.g. `my-tool` or `@scope/my-tool`.
  pub name: String,
  pub manifest: PathBuf,
  pub version: Option<String>,
  pub exports: Vec<String>,
}

/// Scans each package dir one level deep, plus one level under `@scope` dirs.
/// Missing dirs are skipped; unreadable manifests are logged and skipped.
pub async fn discover_packages(dirs: &[PathBuf]) -> Vec<PackageInfo> {
  let mut packages = Vec::new();
  for dir in dirs {
    tracing::debug!("Scanning for compressor packages in {}", dir.display());
    for (name, package_dir) in package_dirs(dir).await {
      let manifest = package_dir.join(MANIFEST_FILE);
      if !tokio::fs::try_exists(&manifest).await.unwrap_or(false) {
        continue;
      }
      match read_manifest(&manifest).await {
        Ok(parsed) => packages.push(PackageInfo {
          name,
          version: parsed.package.version.clone(),
          exports: parsed.export_names().map(String::from).collect(),
          manifest,
        }),
        Err(e) => tracing::warn!(manifest = %manifest.display(), error = %e, "Skipping invalid package"),
      }
    }
  }
  packages
}

/// `(identifier, directory)` pairs below `root`, sorted by identifier.
async fn package_dirs(root: &Path) -> Vec<(String, PathBuf)> {
  let mut found = Vec::new();
  for (name, path) in subdirs(root).await {
    if name.starts_with('@') {
      for (inner, inner_path) in subdirs(&path).await {
        found.push((format!("{name}/{inner}"), inner_path));
      }
    } else {
      found.push((name, path));
    }
  }
  found.sort();
  found
}

async fn subdirs(dir: &Path) -> Vec<(String, PathBuf)> {
  let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
    return Vec::new();
  };
  let mut dirs = Vec::new();
  while let Ok(Some(entry)) = entries.next_entry().await {
    let is_dir = entry.file_type().await.is_ok_and(|t| t.is_dir());
    if let (true, Some(name)) = (is_dir, entry.file_name().to_str()) {
      dirs.push((name.to_string(), entry.path()));
    }
  }
  dirs
}
