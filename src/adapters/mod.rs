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

//! Concrete compressors: in-process ones and a generic child-process adapter.

pub mod command;
pub mod native;

pub use command::CommandCompressor;
pub use native::JsonMinify;
pub use native::NoCompress;

use crate::command::CommandArgs;
use crate::compressor::Compressor;
use crate::registry::BuiltinKind;
use crate::registry::BuiltinSpec;
use crate::registry::NativeKind;
use std::path::PathBuf;
use std::sync::Arc;

/// Instantiates a built-in. `program` is the executable found for command
/// built-ins; it is ignored for native ones.
pub fn builtin_compressor(spec: &BuiltinSpec, program: Option<PathBuf>) -> Arc<dyn Compressor> {
  match spec.kind {
    BuiltinKind::Native(NativeKind::NoCompress) => Arc::new(NoCompress),
    BuiltinKind::Native(NativeKind::JsonMinify) => Arc::new(JsonMinify),
    BuiltinKind::Command(template) => {
      let command = CommandArgs::new(program.unwrap_or_else(|| PathBuf::from(template.program)))
        .args(template.args.iter().copied())
        .binary(template.binary);
      let mut compressor = CommandCompressor::new(spec.name, command);
      for (file_type, args) in template.type_args {
        compressor = compressor.with_type_args(*file_type, args);
      }
      Arc::new(compressor)
    }
  }
}
