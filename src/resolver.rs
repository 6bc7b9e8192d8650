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

//! Turns a compressor identifier into a callable compressor.
//!
//! Three providers are tried in a fixed order:
//!
//! 1. [`BuiltInProvider`] for names in the [`registry`](crate::registry),
//! 2. [`PackageProvider`] for packages installed in a package directory,
//! 3. [`LocalFileProvider`] for identifiers that look like a path.
//!
//! Each provider returns a [`Module`]; the compressor is then picked out of it
//! with [`extract_compressor`].

use crate::adapters::builtin_compressor;
use crate::compressor::Compressor;
use crate::config::ResolverConfig;
use crate::error::LoadError;
use crate::error::ResolveError;
use crate::module::MANIFEST_FILE;
use crate::module::Module;
use crate::module::extract_compressor;
use crate::module::load_manifest;
use crate::module::script_module;
use crate::registry;
use crate::registry::BuiltinKind;
use async_trait::async_trait;
use std::env;
use std::fmt;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Instrument;

/// Extensions stripped from a local file name to build its label.
const LABEL_EXTENSIONS: &[&str] = &["js", "ts", "mjs", "cjs", "toml", "json"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
  BuiltIn,
  Package,
  LocalFile,
}

/// One strategy for loading a module by identifier.
#[async_trait]
pub trait CompressorProvider: Send + Sync {
  fn kind(&self) -> ProviderKind;

  /// `Err(LoadError::NotFound)` means "try the next provider".
  async fn load(&self, identifier: &str) -> Result<Module, LoadError>;
}

/// The outcome of a resolution. Created per call, never cached.
#[derive(Clone)]
pub struct CompressorResolution {
  pub compressor: Arc<dyn Compressor>,
  pub label: String,
  pub is_built_in: bool,
}

impl fmt::Debug for CompressorResolution {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CompressorResolution")
      .field("label", &self.label)
      .field("is_built_in", &self.is_built_in)
      .finish_non_exhaustive()
  }
}

/// `true` for `./x`, `../x`, `/x` and Windows drive paths like `C:\x`.
pub fn is_local_path(identifier: &str) -> bool {
  if ["./", "../", ".\\", "..\\", "/"]
    .iter()
    .any(|prefix| identifier.starts_with(prefix))
  {
    return true;
  }
  let bytes = identifier.as_bytes();
  bytes.len() >= 3
    && bytes[0].is_ascii_alphabetic()
    && bytes[1] == b':'
    && (bytes[2] == b'\\' || bytes[2] == b'/')
}

/// Label of a local compressor: its file name without a script or manifest extension.
pub fn local_label(identifier: &str) -> String {
  let path = Path::new(identifier);
  let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
    return identifier.to_string();
  };
  match path.extension().and_then(|ext| ext.to_str()) {
    Some(ext) if LABEL_EXTENSIONS.contains(&ext) => name[..name.len() - ext.len() - 1].to_string(),
    _ => name.to_string(),
  }
}

/// Built-in compressors. Command built-ins count as installed when their
/// executable is found in `bin_dirs` or on `PATH`.
#[derive(Debug, Clone, Default)]
pub struct BuiltInProvider {
  bin_dirs: Vec<PathBuf>,
}

impl BuiltInProvider {
  pub fn new(bin_dirs: Vec<PathBuf>) -> Self {
    BuiltInProvider { bin_dirs }
  }

  /// Whether the built-in `name` can run on this machine.
  pub async fn is_installed(&self, name: &str) -> bool {
    match registry::builtin(name).map(|spec| spec.kind) {
      Some(BuiltinKind::Native(_)) => true,
      Some(BuiltinKind::Command(template)) => find_program(template.program, &self.bin_dirs)
        .await
        .is_some(),
      None => false,
    }
  }
}

#[async_trait]
impl CompressorProvider for BuiltInProvider {
  fn kind(&self) -> ProviderKind {
    ProviderKind::BuiltIn
  }

  async fn load(&self, identifier: &str) -> Result<Module, LoadError> {
    let Some(spec) = registry::builtin(identifier) else {
      return Err(LoadError::NotFound(identifier.to_string()));
    };
    let program = match spec.kind {
      BuiltinKind::Native(_) => None,
      BuiltinKind::Command(template) => {
        let Some(program) = find_program(template.program, &self.bin_dirs).await else {
          return Err(LoadError::NotFound(format!(
            "{identifier} (executable `{}` is not installed)",
            template.program
          )));
        };
        Some(program)
      }
    };
    Ok(Module::new().with_compressor(spec.export, builtin_compressor(spec, program)))
  }
}

/// Packages installed as `<package_dir>/<identifier>/compressor.toml`.
#[derive(Debug, Clone, Default)]
pub struct PackageProvider {
  package_dirs: Vec<PathBuf>,
}

impl PackageProvider {
  pub fn new(package_dirs: Vec<PathBuf>) -> Self {
    PackageProvider { package_dirs }
  }
}

#[async_trait]
impl CompressorProvider for PackageProvider {
  fn kind(&self) -> ProviderKind {
    ProviderKind::Package
  }

  async fn load(&self, identifier: &str) -> Result<Module, LoadError> {
    if identifier.is_empty() || is_local_path(identifier) {
      return Err(LoadError::NotFound(identifier.to_string()));
    }
    for dir in &self.package_dirs {
      let manifest = dir.join(identifier).join(MANIFEST_FILE);
      if is_file(&manifest).await {
        tracing::debug!(manifest = %manifest.display(), "Found compressor package");
        return load_manifest(&manifest, identifier).await;
      }
    }
    Err(LoadError::NotFound(identifier.to_string()))
  }
}

/// Local manifests, package directories and scripts, relative to `cwd`.
#[derive(Debug, Clone)]
pub struct LocalFileProvider {
  cwd: PathBuf,
}

impl LocalFileProvider {
  pub fn new(cwd: PathBuf) -> Self {
    LocalFileProvider { cwd }
  }
}

#[async_trait]
impl CompressorProvider for LocalFileProvider {
  fn kind(&self) -> ProviderKind {
    ProviderKind::LocalFile
  }

  async fn load(&self, identifier: &str) -> Result<Module, LoadError> {
    let path = self.cwd.join(identifier);
    let metadata = tokio::fs::metadata(&path)
      .await
      .map_err(|source| LoadError::Io {
        path: path.clone(),
        source,
      })?;
    let label = local_label(identifier);

    if metadata.is_dir() {
      return load_manifest(&path.join(MANIFEST_FILE), &label).await;
    }
    match path.extension().and_then(|ext| ext.to_str()) {
      Some("toml" | "json") => load_manifest(&path, &label).await,
      _ => Ok(script_module(&path, &label)),
    }
  }
}

/// Resolves identifiers through the provider chain.
pub struct Resolver {
  builtin: Box<dyn CompressorProvider>,
  package: Box<dyn CompressorProvider>,
  local: Box<dyn CompressorProvider>,
}

impl Resolver {
  /// Standard providers, with relative directories taken from `cwd`.
  pub fn new(config: &ResolverConfig, cwd: &Path) -> Self {
    let absolute = |dirs: &[PathBuf]| dirs.iter().map(|dir| cwd.join(dir)).collect::<Vec<_>>();
    Resolver::with_providers(
      Box::new(BuiltInProvider::new(absolute(config.bin_dirs.as_slice()))),
      Box::new(PackageProvider::new(absolute(config.package_dirs.as_slice()))),
      Box::new(LocalFileProvider::new(cwd.to_path_buf())),
    )
  }

  /// Standard providers rooted at the process' current directory.
  pub fn from_env(config: &ResolverConfig) -> std::io::Result<Self> {
    let cwd = env::current_dir()?;
    Ok(Resolver::new(config, &cwd))
  }

  pub fn with_providers(
    builtin: Box<dyn CompressorProvider>,
    package: Box<dyn CompressorProvider>,
    local: Box<dyn CompressorProvider>,
  ) -> Self {
    Resolver {
      builtin,
      package,
      local,
    }
  }

  pub async fn resolve(&self, identifier: &str) -> Result<CompressorResolution, ResolveError> {
    let span = tracing::debug_span!("resolve", compressor = %identifier);
    self.resolve_inner(identifier).instrument(span).await
  }

  async fn resolve_inner(&self, identifier: &str) -> Result<CompressorResolution, ResolveError> {
    if registry::is_builtin(identifier) {
      match self.builtin.load(identifier).await {
        Ok(module) => match extract_compressor(&module, identifier) {
          Some(compressor) => {
            tracing::debug!("Resolved built-in compressor");
            return Ok(CompressorResolution {
              compressor,
              label: identifier.to_string(),
              is_built_in: true,
            });
          }
          None => tracing::debug!("Built-in module has no usable export"),
        },
        Err(e) => tracing::debug!(error = %e, "Built-in unavailable, trying packages"),
      }
    }

    let looks_local = is_local_path(identifier);

    match self.package.load(identifier).await {
      Ok(module) => {
        let compressor =
          extract_compressor(&module, identifier).ok_or_else(|| ResolveError::NoValidExport {
            identifier: identifier.to_string(),
          })?;
        tracing::debug!("Resolved installed package");
        return Ok(CompressorResolution {
          compressor,
          label: identifier.to_string(),
          is_built_in: false,
        });
      }
      Err(e) if e.is_not_found() || looks_local => {
        tracing::debug!(error = %e, "No installed package")
      }
      Err(source) => {
        return Err(ResolveError::PackageLoad {
          identifier: identifier.to_string(),
          source,
        });
      }
    }

    if looks_local {
      let label = local_label(identifier);
      let module = self
        .local
        .load(identifier)
        .await
        .map_err(|source| ResolveError::LocalLoad {
          identifier: identifier.to_string(),
          source,
        })?;
      let compressor =
        extract_compressor(&module, &label).ok_or_else(|| ResolveError::NoValidExport {
          identifier: identifier.to_string(),
        })?;
      tracing::debug!(%label, "Resolved local compressor");
      return Ok(CompressorResolution {
        compressor,
        label,
        is_built_in: false,
      });
    }

    Err(ResolveError::Unresolved {
      identifier: identifier.to_string(),
    })
  }
}

/// Searches `extra_dirs`, then `PATH`, for an executable named `program`.
pub async fn find_program(program: &str, extra_dirs: &[PathBuf]) -> Option<PathBuf> {
  let path_dirs = env::var_os("PATH")
    .map(|paths| env::split_paths(&paths).collect::<Vec<_>>())
    .unwrap_or_default();

  for dir in extra_dirs.iter().chain(path_dirs.iter()) {
    for name in candidate_names(program) {
      let candidate = dir.join(&name);
      if is_executable(&candidate).await {
        return Some(candidate);
      }
    }
  }
  None
}

fn candidate_names(program: &str) -> Vec<String> {
  if cfg!(target_os = "windows") {
    vec![
      format!("{program}.exe"),
      format!("{program}.cmd"),
      program.to_string(),
    ]
  } else {
    vec![program.to_string()]
  }
}

async fn is_file(path: &Path) -> bool {
  tokio::fs::metadata(path)
    .await
    .is_ok_and(|metadata| metadata.is_file())
}

async fn is_executable(path: &Path) -> bool {
  let Ok(metadata) = tokio::fs::metadata(path).await else {
    return false;
  };
  if !metadata.is_file() {
    return false;
  }
  #[cfg(unix)]
  {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
  }
  #[cfg(not(unix))]
  {
    true
  }
}
