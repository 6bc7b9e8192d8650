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
use std::env;
use std::path::Path;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Env var naming a file to log to instead of stderr.
pub const LOG_FILE_ENV: &str = "MINILAB_LOG_FILE";

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "warn,minilab=info";

/// Sets up the global tracing subscriber.
///
/// Reads the `MINILAB_LOG_FILE` env var.
/// - If set, logs to that file, creating its directory.
/// - If not set, logs to stderr.
///
/// Log level is controlled by the `RUST_LOG` env var (e.g., `RUST_LOG=minilab=debug`),
/// falling back to [`DEFAULT_FILTER`].
/// The returned guard flushes the file writer and must be held until exit.
pub fn setup_tracing() -> anyhow::Result<Option<WorkerGuard>> {
  let env_filter =
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

  match env::var(LOG_FILE_ENV) {
    Ok(log_file) if !log_file.is_empty() => {
      let (dir, file_name) = log_file_location(Path::new(&log_file))?;
      std::fs::create_dir_all(&dir)?;
      let file_appender = tracing_appender::rolling::never(dir, file_name);
      let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);

      tracing_subscriber::registry()
        .with(env_filter)
        .with(
          fmt::layer()
            .with_writer(non_blocking_writer)
            .with_ansi(false), // No ANSI colors in files
        )
        .try_init()?;
      Ok(Some(guard))
    }
    _ => {
      tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init()?;
      Ok(None)
    }
  }
}

/// Splits a log file path into the directory the appender writes in and the
/// file name. A bare name lands in the current directory.
fn log_file_location(path: &Path) -> anyhow::Result<(PathBuf, PathBuf)> {
  let Some(file_name) = path.file_name() else {
    anyhow::bail!("{LOG_FILE_ENV} must name a file, got '{}'", path.display());
  };
  let dir = match path.parent() {
    Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
    _ => PathBuf::from("."),
  };
  Ok((dir, PathBuf::from(file_name)))
}
