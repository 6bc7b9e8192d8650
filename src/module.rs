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

//! Loaded compressor modules and the export-extraction rule.
//!
//! A module is an ordered set of named exports, each either a compressor or
//! a plain value. Modules come from the built-in registry, from
//! `compressor.toml` manifests, or from a bare script on disk.

use crate::adapters::CommandCompressor;
use crate::command::CommandArgs;
use crate::command::Protocol;
use crate::compressor::Compressor;
use crate::error::LoadError;
use crate::registry;
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

/// File name of a package manifest inside a package directory.
pub const MANIFEST_FILE: &str = "compressor.toml";

#[derive(Debug, Clone)]
pub enum Export {
  Compressor(Arc<dyn Compressor>),
  Value(serde_json::Value),
}

impl Export {
  pub fn as_compressor(&self) -> Option<&Arc<dyn Compressor>> {
    match self {
      Export::Compressor(compressor) => Some(compressor),
      Export::Value(_) => None,
    }
  }
}

#[derive(Debug, Clone, Default)]
pub struct Module {
  exports: IndexMap<String, Export>,
}

impl Module {
  pub fn new() -> Self {
    Module::default()
  }

  pub fn with_compressor(mut self, name: impl Into<String>, compressor: Arc<dyn Compressor>) -> Self {
    self.exports.insert(name.into(), Export::Compressor(compressor));
    self
  }

  pub fn with_value(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
    self.exports.insert(name.into(), Export::Value(value));
    self
  }

  pub fn get(&self, name: &str) -> Option<&Export> {
    self.exports.get(name)
  }

  pub fn compressor(&self, name: &str) -> Option<Arc<dyn Compressor>> {
    self.get(name).and_then(Export::as_compressor).cloned()
  }

  pub fn export_names(&self) -> impl Iterator<Item = &str> {
    self.exports.keys().map(String::as_str)
  }

  /// First export, in declaration order, that is a compressor.
  pub fn first_compressor(&self) -> Option<Arc<dyn Compressor>> {
    self
      .exports
      .values()
      .find_map(Export::as_compressor)
      .cloned()
  }
}

/// Camel-cases the base name of an identifier: `@scope/my-tool` -> `myTool`.
pub fn camel_case(identifier: &str) -> String {
  let base = identifier.rsplit(['/', '\\']).next().unwrap_or(identifier);
  let mut out = String::with_capacity(base.len());
  let mut chars = base.chars().peekable();
  while let Some(c) = chars.next() {
    if matches!(c, '-' | '_') {
      if let Some(next) = chars.next() {
        out.extend(next.to_uppercase());
        continue;
      }
    }
    out.push(c);
  }
  out
}

/// Picks the compressor out of a module. First match wins:
///
/// 1. the registry's export name for `identifier`,
/// 2. the camel-cased base name of `identifier`,
/// 3. an export named `compressor`,
/// 4. the `default` export,
/// 5. the first export that is a compressor.
pub fn extract_compressor(module: &Module, identifier: &str) -> Option<Arc<dyn Compressor>> {
  registry::known_export_name(identifier)
    .and_then(|name| module.compressor(name))
    .or_else(|| module.compressor(&camel_case(identifier)))
    .or_else(|| module.compressor("compressor"))
    .or_else(|| module.compressor("default"))
    .or_else(|| module.first_compressor())
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct PackageMeta {
  pub name: Option<String>,
  pub version: Option<String>,
  pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExportDecl {
  Command(CommandArgs),
  Value(serde_json::Value),
}

/// A parsed `compressor.toml` (or `.json`) manifest.
#[derive(Debug, Deserialize)]
pub struct Manifest {
  #[serde(default)]
  pub package: PackageMeta,
  #[serde(default)]
  exports: IndexMap<String, ExportDecl>,
}

impl Manifest {
  pub fn export_names(&self) -> impl Iterator<Item = &str> {
    self.exports.keys().map(String::as_str)
  }

  /// Builds the module. Commands run inside `base_dir`.
  pub fn into_module(self, base_dir: &Path, label: &str) -> Module {
    let mut module = Module::new();
    for (name, decl) in self.exports {
      module = match decl {
        ExportDecl::Command(mut command) => {
          if is_relative_program(&command.command) {
            command.command = base_dir.join(&command.command);
          }
          let command = command.working_dir(base_dir);
          module.with_compressor(name, Arc::new(CommandCompressor::new(label, command)))
        }
        ExportDecl::Value(value) => module.with_value(name, value),
      };
    }
    module
  }
}

/// `./bin/tool` is relative to the manifest; `node` is looked up on `PATH`.
fn is_relative_program(program: &Path) -> bool {
  program.is_relative() && program.components().count() > 1
}

/// Reads and parses a manifest file.
pub async fn read_manifest(path: &Path) -> Result<Manifest, LoadError> {
  let text = tokio::fs::read_to_string(path)
    .await
    .map_err(|source| LoadError::Io {
      path: path.to_path_buf(),
      source,
    })?;

  let parsed = if path.extension().is_some_and(|ext| ext == "json") {
    serde_json::from_str(&text).map_err(|e| e.to_string())
  } else {
    toml::from_str(&text).map_err(|e| e.to_string())
  };

  parsed.map_err(|message| LoadError::Manifest {
    path: path.to_path_buf(),
    message,
  })
}

/// Loads a manifest into a module.
pub async fn load_manifest(path: &Path, label: &str) -> Result<Module, LoadError> {
  let manifest = read_manifest(path).await?;
  let base_dir = path
    .parent()
    .map(Path::to_path_buf)
    .unwrap_or_else(|| PathBuf::from("."));
  Ok(manifest.into_module(&base_dir, label))
}

/// Wraps a standalone script as a module whose `default` export runs it
/// with the JSON protocol.
pub fn script_module(path: &Path, label: &str) -> Module {
  let interpreter = match path.extension().and_then(|ext| ext.to_str()) {
    Some("js" | "mjs" | "cjs") => Some("node"),
    Some("ts") => Some("tsx"),
    Some("py") => Some("python3"),
    Some("sh") => Some("sh"),
    _ => None,
  };
  let command = match interpreter {
    Some(program) => CommandArgs::new(program).args([path.display().to_string()]),
    None => CommandArgs::new(path),
  };
  let mut command = command.protocol(Protocol::Json);
  if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
    command = command.working_dir(dir);
  }
  Module::new().with_compressor("default", Arc::new(CommandCompressor::new(label, command)))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::adapters::NoCompress;
  use crate::compressor::CompressArgs;
  use crate::compressor::CompressorOutput;
  use crate::compressor::Content;
  use crate::compressor::compressor_fn;
  use crate::settings::Settings;
  use serde_json::json;

  fn tagged(tag: &'static str) -> Arc<dyn Compressor> {
    compressor_fn(move |_| async move { Ok(CompressorOutput::code(tag)) })
  }

  async fn tag_of(compressor: Arc<dyn Compressor>) -> String {
    let settings = Settings::builder()
      .compressor(Arc::new(NoCompress))
      .content("")
      .build()
      .unwrap();
    let content = Content::from("");
    compressor
      .compress(CompressArgs {
        settings: &settings,
        content: &content,
        index: None,
      })
      .await
      .unwrap()
      .code
  }

  #[test]
  fn camel_case_strips_scope_and_separators() {
    assert_eq!(camel_case("my-tool"), "myTool");
    assert_eq!(camel_case("@scope/my_cool-tool"), "myCoolTool");
    assert_eq!(camel_case("terser"), "terser");
    assert_eq!(camel_case("trailing-"), "trailing-");
  }

  #[tokio::test]
  async fn known_export_name_wins_for_builtins() {
    let module = Module::new()
      .with_compressor("compressor", tagged("named"))
      .with_compressor("uglifyJs", tagged("known"));
    let found = extract_compressor(&module, "uglify-js").unwrap();
    assert_eq!(tag_of(found).await, "known");
  }

  #[tokio::test]
  async fn camel_cased_name_beats_compressor_export() {
    let module = Module::new()
      .with_compressor("compressor", tagged("named"))
      .with_compressor("myTool", tagged("camel"));
    let found = extract_compressor(&module, "@acme/my-tool").unwrap();
    assert_eq!(tag_of(found).await, "camel");
  }

  #[tokio::test]
  async fn compressor_export_beats_default() {
    let module = Module::new()
      .with_compressor("default", tagged("default"))
      .with_compressor("compressor", tagged("named"));
    let found = extract_compressor(&module, "whatever").unwrap();
    assert_eq!(tag_of(found).await, "named");
  }

  #[tokio::test]
  async fn default_only_is_accepted() {
    let module = Module::new().with_compressor("default", tagged("default"));
    let found = extract_compressor(&module, "whatever").unwrap();
    assert_eq!(tag_of(found).await, "default");
  }

  #[tokio::test]
  async fn first_compressor_export_is_the_last_resort() {
    let module = Module::new()
      .with_value("version", json!("1.0.0"))
      .with_compressor("minifyAll", tagged("first"))
      .with_compressor("other", tagged("second"));
    let found = extract_compressor(&module, "whatever").unwrap();
    assert_eq!(tag_of(found).await, "first");
  }

  #[test]
  fn values_are_never_compressors() {
    let module = Module::new()
      .with_value("compressor", json!("not callable"))
      .with_value("default", json!({ "command": 1 }));
    assert!(extract_compressor(&module, "whatever").is_none());
  }

  #[test]
  fn manifest_keeps_declaration_order_and_values() {
    let manifest: Manifest = toml::from_str(
      r#"
        [package]
        name = "squeeze"
        version = "0.2.0"

        [exports]
        version = "0.2.0"

        [exports.squeeze]
        command = "tr"
        args = ["-s", " "]

        [exports.broken]
        flavour = "not a command"
      "#,
    )
    .unwrap();
    assert_eq!(manifest.package.name.as_deref(), Some("squeeze"));
    let names: Vec<_> = manifest.export_names().collect();
    assert_eq!(names, ["version", "squeeze", "broken"]);

    let module = manifest.into_module(Path::new("/pkg"), "squeeze");
    assert!(module.compressor("squeeze").is_some());
    assert!(module.compressor("version").is_none());
    assert!(module.compressor("broken").is_none());
  }

  #[test]
  fn relative_programs_resolve_against_the_manifest() {
    assert!(is_relative_program(Path::new("./bin/tool")));
    assert!(is_relative_program(Path::new("bin/tool")));
    assert!(!is_relative_program(Path::new("node")));
    assert!(!is_relative_program(Path::new("/usr/bin/node")));
  }
}
