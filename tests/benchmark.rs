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
use async_trait::async_trait;
use minilab::BenchmarkOptions;
use minilab::CompressorOutput;
use minilab::Resolver;
use minilab::benchmark::metrics::NOT_AVAILABLE;
use minilab::compressor_fn;
use minilab::config::ResolverConfig;
use minilab::error::CompressorError;
use minilab::error::LoadError;
use minilab::module::Module;
use minilab::resolver::BuiltInProvider;
use minilab::resolver::CompressorProvider;
use minilab::resolver::LocalFileProvider;
use minilab::resolver::ProviderKind;
use minilab::run_benchmark;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use tempfile::tempdir;

/// Installed packages served from memory.
struct MemoryPackages(Vec<(&'static str, Module)>);

#[async_trait]
impl CompressorProvider for MemoryPackages {
  fn kind(&self) -> ProviderKind {
    ProviderKind::Package
  }

  async fn load(&self, identifier: &str) -> Result<Module, LoadError> {
    self
      .0
      .iter()
      .find(|(name, _)| *name == identifier)
      .map(|(_, module)| module.clone())
      .ok_or_else(|| LoadError::NotFound(identifier.to_string()))
  }
}

fn with_packages(cwd: &Path, packages: Vec<(&'static str, Module)>) -> Resolver {
  Resolver::with_providers(
    Box::new(BuiltInProvider::default()),
    Box::new(MemoryPackages(packages)),
    Box::new(LocalFileProvider::new(cwd.to_path_buf())),
  )
}

fn file_names(dir: &Path) -> Vec<String> {
  let mut names: Vec<String> = fs::read_dir(dir)
    .unwrap()
    .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
    .collect();
  names.sort();
  names
}

const PRETTY_JSON: &str = "{\n  \"name\": \"minilab\",\n  \"tags\": [ \"a\", \"b\" ],\n  \"nested\": { \"ok\": true }\n}\n";

#[tokio::test]
async fn terser_and_esbuild_produce_one_file_two_records() {
  let temp = tempdir().unwrap();
  let input = temp.path().join("app.js");
  fs::write(&input, "function foo() {\n  // comment\n  return 1 + 1;\n}\n").unwrap();
  let resolver = Resolver::new(&ResolverConfig::default(), temp.path());

  let options =
    BenchmarkOptions::new([input.display().to_string()]).compressors(["terser", "esbuild"]);
  let result = run_benchmark(options, &resolver).await.unwrap();

  assert_eq!(result.files.len(), 1);
  let names: Vec<&str> = result.files[0]
    .results
    .iter()
    .map(|m| m.compressor.as_str())
    .collect();
  assert_eq!(names, ["terser", "esbuild"]);

  let any_success = result.files[0].results.iter().any(|m| m.success);
  if any_success {
    assert!(names.contains(&result.summary.best_performance.as_str()));
  } else {
    assert_eq!(result.summary.best_performance, NOT_AVAILABLE);
  }
}

#[tokio::test]
async fn native_compressors_are_measured_and_cleaned_up() {
  let temp = tempdir().unwrap();
  let input = temp.path().join("data.json");
  fs::write(&input, PRETTY_JSON).unwrap();
  let resolver = Resolver::new(&ResolverConfig::default(), temp.path());

  let seen = Arc::new(Mutex::new(Vec::new()));
  let spy = seen.clone();
  let mut options = BenchmarkOptions::new([input.display().to_string()])
    .compressors(["no-compress", "jsonminify"])
    .on_progress(move |compressor, _file| spy.lock().unwrap().push(compressor.to_string()));
  options.iterations = 3;
  options.include_gzip = true;
  options.include_brotli = true;
  options.verbose = true;

  let result = run_benchmark(options, &resolver).await.unwrap();
  assert_eq!(*seen.lock().unwrap(), ["no-compress", "jsonminify"]);

  let file = &result.files[0];
  assert_eq!(file.original_size, PRETTY_JSON.len() as u64);

  let baseline = &file.results[0];
  assert!(baseline.success, "{:?}", baseline.error);
  assert_eq!(baseline.size, file.original_size);
  assert_eq!(baseline.reduction_percent, 0.0);

  let minified = &file.results[1];
  assert!(minified.success, "{:?}", minified.error);
  assert!(minified.reduction_percent > 0.0);
  assert_eq!(minified.iteration_times.as_ref().map(Vec::len), Some(3));
  assert!(minified.min_time_ms <= minified.time_ms && minified.time_ms <= minified.max_time_ms);
  assert!(minified.gzip_size.is_some());
  assert!(minified.brotli_size.is_some());

  assert_eq!(result.summary.best_compression, "jsonminify");

  let leftovers: Vec<_> = fs::read_dir(temp.path())
    .unwrap()
    .map(|entry| entry.unwrap().file_name())
    .collect();
  assert_eq!(leftovers, ["data.json"]);
}

#[tokio::test]
async fn failures_are_recorded_per_pair() {
  let temp = tempdir().unwrap();
  let input = temp.path().join("broken.json");
  fs::write(&input, "{ not json").unwrap();
  let resolver = Resolver::new(&ResolverConfig::default(), temp.path());

  let options = BenchmarkOptions::new([input.display().to_string()])
    .compressors(["not-a-real-package-xyz", "jsonminify"]);
  let result = run_benchmark(options, &resolver).await.unwrap();

  let records = &result.files[0].results;
  assert_eq!(records.len(), 2);
  assert!(records.iter().all(|m| !m.success));
  assert!(
    records[0]
      .error
      .as_deref()
      .unwrap()
      .contains("Could not resolve compressor")
  );
  assert!(records[1].error.as_deref().unwrap().starts_with("jsonminify:"));

  assert_eq!(result.summary.best_compression, NOT_AVAILABLE);
  assert_eq!(result.summary.best_performance, NOT_AVAILABLE);
  assert_eq!(result.summary.recommended, NOT_AVAILABLE);
}

#[tokio::test]
async fn multi_format_outputs_are_sized_by_their_entries() {
  let temp = tempdir().unwrap();
  let input = temp.path().join("photo.png");
  fs::write(&input, vec![7u8; 1000]).unwrap();

  let converter = Module::new().with_compressor(
    "compressor",
    compressor_fn(|_| async {
      Ok(
        CompressorOutput::code("")
          .with_output(Some("webp"), vec![1u8; 1500])
          .with_output(Some("avif"), vec![2u8; 1200]),
      )
    }),
  );
  let shrinker = Module::new().with_compressor(
    "compressor",
    compressor_fn(|_| async { Ok(CompressorOutput::buffer(vec![3u8; 500])) }),
  );
  let resolver = with_packages(
    temp.path(),
    vec![("converter", converter), ("shrinker", shrinker)],
  );

  let mut options = BenchmarkOptions::new([input.display().to_string()])
    .compressors(["converter", "shrinker"]);
  options.include_gzip = true;
  let result = run_benchmark(options, &resolver).await.unwrap();

  let records = &result.files[0].results;
  let converted = &records[0];
  assert!(converted.success, "{:?}", converted.error);
  assert_eq!(converted.size, 2700);
  assert_eq!(converted.reduction_percent, -170.0);
  assert!(converted.gzip_size.is_some_and(|size| size > 0));

  let shrunk = &records[1];
  assert!(shrunk.success, "{:?}", shrunk.error);
  assert_eq!(shrunk.size, 500);
  assert_eq!(shrunk.reduction_percent, 50.0);

  assert_eq!(result.summary.best_compression, "shrinker");
  assert_eq!(file_names(temp.path()), ["photo.png"]);
}

#[tokio::test]
async fn temp_outputs_are_removed_when_a_later_iteration_fails() {
  let temp = tempdir().unwrap();
  let input = temp.path().join("app.js");
  fs::write(&input, "let a = 1;").unwrap();

  let calls = Arc::new(AtomicUsize::new(0));
  let dir: PathBuf = temp.path().to_path_buf();
  let flaky = Module::new().with_compressor(
    "compressor",
    compressor_fn(move |_| {
      let calls = calls.clone();
      let dir = dir.clone();
      async move {
        if calls.fetch_add(1, Ordering::SeqCst) == 0 {
          return Ok(CompressorOutput::code("let a=1"));
        }
        let on_disk = file_names(&dir)
          .iter()
          .filter(|name| name.ends_with(".tmp"))
          .count();
        Err(CompressorError::Failed {
          label: "flaky".to_string(),
          message: format!("second run failed with {on_disk} temp file(s) on disk"),
        })
      }
    }),
  );
  let resolver = with_packages(temp.path(), vec![("flaky", flaky)]);

  let mut options = BenchmarkOptions::new([input.display().to_string()]).compressors(["flaky"]);
  options.iterations = 2;
  options.warmup = Some(0);
  let result = run_benchmark(options, &resolver).await.unwrap();

  let record = &result.files[0].results[0];
  assert!(!record.success);
  assert!(
    record
      .error
      .as_deref()
      .unwrap()
      .contains("second run failed with 1 temp file(s) on disk")
  );
  assert_eq!(file_names(temp.path()), ["app.js"]);
}
