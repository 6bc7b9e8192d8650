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
use Commands::Benchmark;
use Commands::Compress;
use Commands::List;
use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use minilab::cli::Cli;
use minilab::cli::Commands;
use minilab::compress;
use minilab::config::BenchmarkConfig;
use minilab::config::CompressConfig;
use minilab::config::FileConfig;
use minilab::logging::setup_tracing;
use minilab::packages::discover_packages;
use minilab::paths::display_path;
use minilab::registry;
use minilab::report::render;
use minilab::resolver::BuiltInProvider;
use minilab::resolver::Resolver;
use minilab::run_benchmark;
use std::path::PathBuf;
use tracing::Instrument;

#[tokio::main]
async fn main() -> Result<()> {
  let _log_guard = setup_tracing()?;

  let Cli { config, command } = Cli::parse();
  let file_config = FileConfig::load(&config)
    .with_context(|| format!("Failed to load configuration from {}", config.display()))?;
  let cwd = std::env::current_dir().context("Failed to read the current directory")?;
  let resolver = Resolver::new(&file_config.resolver, &cwd);

  let main_span = tracing::info_span!("minilab");
  async move {
    match command {
      Compress(args) => {
        let config = CompressConfig::try_from((args, file_config))?;
        let resolution = resolver.resolve(&config.compressor).await?;
        tracing::info!(
          compressor = %resolution.label,
          built_in = resolution.is_built_in,
          "Resolved compressor"
        );

        let settings = config.into_settings(resolution)?;
        let in_memory = settings.is_in_memory();
        let code = compress(settings).await?;
        if in_memory {
          println!("{code}");
        }
      }
      Benchmark(args) => {
        let BenchmarkConfig {
          mut options,
          format,
          report,
        } = BenchmarkConfig::try_from((args, file_config))?;
        options = options.on_progress(|compressor, file| {
          tracing::info!("Benchmarking {} on {}", compressor, file.display());
        });

        let result = run_benchmark(options, &resolver).await?;
        let rendered = render(&result, format)?;
        match report {
          Some(path) => {
            tokio::fs::write(&path, rendered)
              .await
              .with_context(|| format!("Failed to write report to {}", path.display()))?;
            tracing::info!("Report written to {}", path.display());
          }
          None => println!("{rendered}"),
        }
      }
      List => {
        let absolute = |dirs: &[PathBuf]| dirs.iter().map(|dir| cwd.join(dir)).collect::<Vec<_>>();
        let builtins = BuiltInProvider::new(absolute(file_config.resolver.bin_dirs.as_slice()));

        println!("Built-in compressors:");
        for spec in registry::builtins() {
          let status = if builtins.is_installed(spec.name).await {
            "installed"
          } else {
            "not installed"
          };
          println!("  {:<24} {:<14} {}", spec.name, spec.export, status);
        }

        println!();
        println!("Compressor packages:");
        let packages = discover_packages(&absolute(file_config.resolver.package_dirs.as_slice())).await;
        if packages.is_empty() {
          println!("  (none)");
        }
        for package in packages {
          println!(
            "  {:<24} {:<10} {:<30} {}",
            package.name,
            package.version.as_deref().unwrap_or("-"),
            package.exports.join(", "),
            display_path(&package.manifest, &cwd)
          );
        }
      }
    }
    Ok::<_, anyhow::Error>(())
  }
  .instrument(main_span)
  .await
}
