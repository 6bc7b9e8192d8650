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
use serde::Deserialize;
use serde::Serialize;
use std::path::PathBuf;

/// How content and results travel between minilab and a compressor process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
  /// Raw content on stdin, raw result on stdout.
  #[default]
  Stdio,
  /// A JSON request on stdin, a JSON `{code, map?, buffer?, outputs?}` on stdout.
  Json,
}

/// Holds the executable command and base arguments for a compressor.
///
/// This struct is the "contract" for a runnable compressor export, declared
/// in a `compressor.toml` manifest or built from the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandArgs {
  /// The command to execute (e.g., "node" or "/path/to/binary").
  pub command: PathBuf,

  /// A list of base arguments to pass to the command (e.g., ["./index.js"]).
  #[serde(default)]
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub args: Vec<String>,

  #[serde(default)]
  pub protocol: Protocol,

  /// Stdio only: stdout is a binary buffer rather than text.
  #[serde(default)]
  pub binary: bool,

  /// Directory the command runs in. Manifests set this to their own directory.
  #[serde(skip)]
  pub working_dir: Option<PathBuf>,
}

impl CommandArgs {
  pub fn new(command: impl Into<PathBuf>) -> Self {
    CommandArgs {
      command: command.into(),
      args: Vec::new(),
      protocol: Protocol::default(),
      binary: false,
      working_dir: None,
    }
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }

  pub fn protocol(mut self, protocol: Protocol) -> Self {
    self.protocol = protocol;
    self
  }

  pub fn binary(mut self, binary: bool) -> Self {
    self.binary = binary;
    self
  }

  pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.working_dir = Some(dir.into());
    self
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn manifest_entry_defaults_to_stdio() {
    let args: CommandArgs = toml::from_str(r#"command = "tr""#).unwrap();
    assert_eq!(args.protocol, Protocol::Stdio);
    assert!(args.args.is_empty());
    assert!(!args.binary);
  }

  #[test]
  fn unknown_fields_are_rejected() {
    let parsed: Result<CommandArgs, _> = toml::from_str("command = \"tr\"\nflavour = 1");
    assert!(parsed.is_err());
  }
}
