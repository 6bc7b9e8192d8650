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
use crate::command::CommandArgs;
use crate::command::Protocol;
use crate::compressor::CompressArgs;
use crate::compressor::Compressor;
use crate::compressor::CompressorOutput;
use crate::error::CompressorError;
use crate::settings::FileType;
use crate::settings::Options;
use crate::validate::content_to_json;
use crate::validate::validate_result;
use async_trait::async_trait;
use serde_json::Value;
use serde_json::json;
use std::io::ErrorKind;
use std::process::Stdio;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::process::Command;
use tracing::Instrument;

/// Option keys that configure minilab itself and are never forwarded as flags.
const RESERVED_OPTIONS: &[&str] = &["sourceMap", "_sourceMap"];

/// Runs an external minifier as a child process.
#[derive(Debug, Clone)]
pub struct CommandCompressor {
  label: String,
  command: CommandArgs,
  type_args: Vec<(FileType, Vec<String>)>,
}

impl CommandCompressor {
  pub fn new(label: impl Into<String>, command: CommandArgs) -> Self {
    CommandCompressor {
      label: label.into(),
      command,
      type_args: Vec::new(),
    }
  }

  /// Extra arguments appended when compressing a given file type.
  pub fn with_type_args(mut self, file_type: FileType, args: &[&str]) -> Self {
    self
      .type_args
      .push((file_type, args.iter().map(|arg| arg.to_string()).collect()));
    self
  }

  pub fn command(&self) -> &CommandArgs {
    &self.command
  }

  fn build_command(&self, args: &CompressArgs<'_>) -> Command {
    let mut cmd = Command::new(&self.command.command);
    cmd.args(&self.command.args);

    if self.command.protocol == Protocol::Stdio {
      if let Some(file_type) = args.settings.file_type {
        for (wanted, extra) in &self.type_args {
          if *wanted == file_type {
            cmd.args(extra);
          }
        }
      }
      cmd.args(options_to_flags(&args.settings.options));
    }

    if let Some(dir) = &self.command.working_dir {
      cmd.current_dir(dir);
    }

    cmd
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true);
    cmd
  }

  fn payload(&self, args: &CompressArgs<'_>) -> Vec<u8> {
    match self.command.protocol {
      Protocol::Stdio => args.content.as_bytes().to_vec(),
      Protocol::Json => {
        let file_type = args.settings.file_type.map(FileType::as_str);
        let request = json!({
          "settings": {
            "label": args.settings.label,
            "type": file_type,
            "options": Value::Object(args.settings.options.clone()),
          },
          "content": content_to_json(args.content),
          "index": args.index,
        });
        request.to_string().into_bytes()
      }
    }
  }
}

#[async_trait]
impl Compressor for CommandCompressor {
  async fn compress(&self, args: CompressArgs<'_>) -> Result<CompressorOutput, CompressorError> {
    let label = self.label.clone();
    let mut cmd = self.build_command(&args);

    tracing::debug!(cmd = ?cmd, "Spawning compressor");
    let mut child = cmd.spawn().map_err(|source| CompressorError::Spawn {
      label: label.clone(),
      program: self.command.command.display().to_string(),
      source,
    })?;

    let (Some(mut stdin), Some(stdout), Some(stderr)) =
      (child.stdin.take(), child.stdout.take(), child.stderr.take())
    else {
      return Err(CompressorError::Failed {
        label,
        message: "failed to take the child's stdio pipes".to_string(),
      });
    };

    let stderr_task = tokio::spawn(
      read_and_log_stderr(stderr, label.clone())
        .instrument(tracing::info_span!("stderr_handler", compressor = %label)),
    );

    let payload = self.payload(&args);
    let write_stdin = async move {
      let written = stdin.write_all(&payload).await;
      drop(stdin);
      match written {
        // The child may legitimately exit without reading all of its input.
        Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(()),
        other => other,
      }
    };

    let (written, read, status) = tokio::join!(
      write_stdin,
      read_limited(stdout, args.settings.buffer_size),
      child.wait()
    );

    let stderr_text = match stderr_task.await {
      Ok(Ok(text)) => text,
      Ok(Err(e)) => {
        tracing::warn!(error = %e, "Failed to read compressor stderr");
        String::new()
      }
      Err(e) => {
        tracing::warn!(error = %e, "Compressor stderr task failed");
        String::new()
      }
    };

    let status = status.map_err(|source| io_error(&label, source))?;
    if !status.success() {
      return Err(CompressorError::Exit {
        label,
        status: status.to_string(),
        stderr: stderr_text.trim_end().to_string(),
      });
    }
    written.map_err(|source| io_error(&label, source))?;
    let (stdout, exceeded) = read.map_err(|source| io_error(&label, source))?;
    if let (true, Some(limit)) = (exceeded, args.settings.buffer_size) {
      return Err(CompressorError::BufferExceeded { label, limit });
    }

    match self.command.protocol {
      Protocol::Stdio if self.command.binary => Ok(CompressorOutput::buffer(stdout)),
      Protocol::Stdio => match String::from_utf8(stdout) {
        Ok(code) => Ok(CompressorOutput::code(code)),
        Err(_) => Err(CompressorError::Failed {
          label,
          message: "printed output that is not valid UTF-8".to_string(),
        }),
      },
      Protocol::Json => {
        let value: Value = serde_json::from_slice(&stdout).map_err(|source| {
          crate::error::ValidationError::NotJson {
            label: label.clone(),
            source,
          }
        })?;
        Ok(validate_result(&label, value)?)
      }
    }
  }
}

/// Turns an options bag into command-line flags.
///
/// `true` becomes `--key`, `false`/`null` are dropped, scalars become
/// `--key value`, arrays repeat the flag and objects are passed as JSON.
pub fn options_to_flags(options: &Options) -> Vec<String> {
  let mut flags = Vec::new();
  for (key, value) in options {
    if RESERVED_OPTIONS.contains(&key.as_str()) {
      continue;
    }
    let flag = format!("--{key}");
    match value {
      Value::Null | Value::Bool(false) => {}
      Value::Bool(true) => flags.push(flag),
      Value::Array(items) => {
        for item in items {
          flags.push(flag.clone());
          flags.push(scalar_arg(item));
        }
      }
      other => {
        flags.push(flag);
        flags.push(scalar_arg(other));
      }
    }
  }
  flags
}

fn io_error(label: &str, source: std::io::Error) -> CompressorError {
  CompressorError::Io {
    label: label.to_string(),
    source,
  }
}

fn scalar_arg(value: &Value) -> String {
  match value {
    Value::String(s) => s.clone(),
    other => other.to_string(),
  }
}

/// Reads a stream to the end. Past `limit` bytes the rest is drained and
/// discarded so the child never blocks on a full pipe.
async fn read_limited<R: AsyncRead + Unpin>(
  mut stream: R,
  limit: Option<usize>,
) -> std::io::Result<(Vec<u8>, bool)> {
  let mut out = Vec::new();
  let mut chunk = [0u8; 8192];
  let mut exceeded = false;
  loop {
    let n = stream.read(&mut chunk).await?;
    if n == 0 {
      break;
    }
    match limit {
      Some(limit) if exceeded || out.len() + n > limit => exceeded = true,
      _ => out.extend_from_slice(&chunk[..n]),
    }
  }
  Ok((out, exceeded))
}

/// Reads lines from a process's stderr, logs them and returns them.
async fn read_and_log_stderr<R: AsyncRead + Unpin>(
  stream: R,
  label: String,
) -> std::io::Result<String> {
  let mut reader = BufReader::new(stream).lines();
  let mut collected = String::new();

  while let Some(line) = reader.next_line().await? {
    tracing::warn!(compressor = %label, "{}", line);
    collected.push_str(&line);
    collected.push('\n');
  }
  Ok(collected)
}
