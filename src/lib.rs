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

//! # Minilab
//!
//! `minilab` is a pluggable orchestrator for file minifiers. It resolves a
//! compressor by name (a built-in, an installed package or a local file),
//! runs it over one or many files, writes what it returns and can benchmark
//! several compressors against each other.
//!
//! Compressors themselves are external tools or in-process adapters; this
//! crate never minifies anything on its own.
//!
//! ## Core Modules
//!
//! * [`batch`]: The `compress` entry point. Expands inputs, picks single or
//!   batch mode and drives the runner sequentially.
//! * [`runner`]: Runs one compressor invocation and persists code, buffers,
//!   multi-format outputs and source maps.
//! * [`resolver`]: Turns an identifier into a compressor through the
//!   built-in, package and local-file providers.
//! * [`benchmark`]: Times compressors per file and summarizes the winners.
//! * [`report`]: Console, markdown and JSON renderers for benchmark results.
//! * [`registry`]: The static table of built-in compressors.
//! * [`config`]: Layered file/env configuration and CLI conversion.
//! * [`cli`]: Defines the `clap`-based command-line interface.
//! * [`error`]: Defines the custom error types for the library.
//! * [`logging`]: Provides the `setup_tracing` utility.

pub mod adapters;
pub mod batch;
pub mod benchmark;
pub mod cli;
pub mod command;
pub mod compressor;
pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod module;
pub mod packages;
pub mod paths;
pub mod registry;
pub mod report;
pub mod resolver;
pub mod runner;
pub mod settings;
pub mod validate;

pub use batch::compress;
pub use batch::compress_blocking;
pub use batch::compress_with;
pub use benchmark::BenchmarkOptions;
pub use benchmark::BenchmarkResult;
pub use benchmark::run_benchmark;
pub use compressor::CompressArgs;
pub use compressor::Compressor;
pub use compressor::CompressorOutput;
pub use compressor::Content;
pub use compressor::compressor_fn;
pub use context::RunContext;
pub use error::MinilabError;
pub use error::Result;
pub use resolver::CompressorResolution;
pub use resolver::Resolver;
pub use settings::Settings;
