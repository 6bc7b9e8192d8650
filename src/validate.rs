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

//! Runtime shape checks for results that cross a process boundary.
//!
//! In-process compressors return a typed [`CompressorOutput`]. Custom
//! compressors speaking the JSON protocol return arbitrary JSON, which is
//! checked here before it reaches the runner.

use crate::compressor::CompressorOutput;
use crate::compressor::Content;
use crate::compressor::OutputEntry;
use crate::error::ValidationError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;
use serde_json::json;

/// Short human description of a JSON value's shape.
pub fn describe_shape(value: &Value) -> String {
  match value {
    Value::Null => "null".to_string(),
    Value::Bool(_) => "boolean".to_string(),
    Value::Number(_) => "number".to_string(),
    Value::String(_) => "string".to_string(),
    Value::Array(_) => "array".to_string(),
    Value::Object(map) => match map.get("code") {
      Some(code) => format!("object with `code` of type {}", describe_shape(code)),
      None if map.is_empty() => "object with no keys".to_string(),
      None => {
        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        format!("object with keys [{}]", keys.join(", "))
      }
    },
  }
}

/// Checks that `value` is `{code: string, map?, buffer?, outputs?}` and
/// converts it into a [`CompressorOutput`].
pub fn validate_result(label: &str, value: Value) -> Result<CompressorOutput, ValidationError> {
  let Value::Object(mut map) = value else {
    return Err(ValidationError::InvalidShape {
      label: label.to_string(),
      shape: describe_shape(&value),
    });
  };

  let code = match map.remove("code") {
    Some(Value::String(code)) => code,
    other => {
      // Put `code` back so the shape description shows what was sent.
      if let Some(code) = other {
        map.insert("code".to_string(), code);
      }
      return Err(ValidationError::InvalidShape {
        label: label.to_string(),
        shape: describe_shape(&Value::Object(map)),
      });
    }
  };

  let source_map = match map.remove("map") {
    None | Some(Value::Null) => None,
    Some(Value::String(source_map)) => Some(source_map),
    Some(other) => {
      return Err(invalid_field(
        label,
        "map",
        format!("expected a string, got {}", describe_shape(&other)),
      ));
    }
  };

  let buffer = match map.remove("buffer") {
    None | Some(Value::Null) => None,
    Some(Value::String(encoded)) => Some(
      STANDARD
        .decode(encoded.as_bytes())
        .map_err(|e| invalid_field(label, "buffer", format!("invalid base64: {e}")))?,
    ),
    Some(other) => {
      return Err(invalid_field(
        label,
        "buffer",
        format!("expected a base64 string, got {}", describe_shape(&other)),
      ));
    }
  };

  let outputs = match map.remove("outputs") {
    None | Some(Value::Null) => Vec::new(),
    Some(Value::Array(entries)) => entries
      .into_iter()
      .map(|entry| output_entry(label, entry))
      .collect::<Result<Vec<_>, _>>()?,
    Some(other) => {
      return Err(invalid_field(
        label,
        "outputs",
        format!("expected an array, got {}", describe_shape(&other)),
      ));
    }
  };

  Ok(CompressorOutput {
    code,
    map: source_map,
    buffer,
    outputs,
  })
}

fn output_entry(label: &str, entry: Value) -> Result<OutputEntry, ValidationError> {
  let Value::Object(mut entry) = entry else {
    return Err(invalid_field(
      label,
      "outputs",
      format!("expected objects, got {}", describe_shape(&entry)),
    ));
  };

  let format = match entry.remove("format") {
    None | Some(Value::Null) => None,
    Some(Value::String(format)) => Some(format),
    Some(other) => {
      return Err(invalid_field(
        label,
        "outputs",
        format!("`format` must be a string, got {}", describe_shape(&other)),
      ));
    }
  };

  let content = match entry.remove("content") {
    Some(value) => content_from_json(&value).ok_or_else(|| {
      invalid_field(
        label,
        "outputs",
        format!(
          "`content` must be a string or {{\"base64\": ...}}, got {}",
          describe_shape(&value)
        ),
      )
    })?,
    None => return Err(invalid_field(label, "outputs", "missing `content`".to_string())),
  };

  Ok(OutputEntry { format, content })
}

/// Encodes content for the JSON protocol: text as a string, bytes as `{"base64": ...}`.
pub fn content_to_json(content: &Content) -> Value {
  match content {
    Content::Text(text) => Value::String(text.clone()),
    Content::Bytes(bytes) => json!({ "base64": STANDARD.encode(bytes) }),
  }
}

/// Inverse of [`content_to_json`]. `None` for anything else.
pub fn content_from_json(value: &Value) -> Option<Content> {
  match value {
    Value::String(text) => Some(Content::Text(text.clone())),
    Value::Object(map) => {
      let encoded = map.get("base64")?.as_str()?;
      STANDARD.decode(encoded.as_bytes()).ok().map(Content::Bytes)
    }
    _ => None,
  }
}

fn invalid_field(label: &str, field: &'static str, reason: String) -> ValidationError {
  ValidationError::InvalidField {
    label: label.to_string(),
    field,
    reason,
  }
}
