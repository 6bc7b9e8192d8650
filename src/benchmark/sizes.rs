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

//! Compressed transfer sizes and human-readable byte counts.

use flate2::Compression;
use flate2::write::GzEncoder;
use std::io;
use std::io::Read;
use std::io::Write;

const BROTLI_BUFFER_SIZE: usize = 4096;
const BROTLI_QUALITY: u32 = 11;
const BROTLI_WINDOW: u32 = 22;

/// Size of `data` after gzip at maximum compression.
pub fn gzip_size(data: &[u8]) -> io::Result<u64> {
  let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
  encoder.write_all(data)?;
  Ok(encoder.finish()?.len() as u64)
}

/// Size of `data` after brotli at maximum quality.
pub fn brotli_size(data: &[u8]) -> io::Result<u64> {
  let mut reader =
    brotli::CompressorReader::new(data, BROTLI_BUFFER_SIZE, BROTLI_QUALITY, BROTLI_WINDOW);
  let mut compressed = Vec::new();
  reader.read_to_end(&mut compressed)?;
  Ok(compressed.len() as u64)
}

/// Formats a byte count with decimal units, e.g. `1.23 kB`.
pub fn format_bytes(bytes: u64) -> String {
  const UNITS: [&str; 4] = ["kB", "MB", "GB", "TB"];
  if bytes < 1000 {
    return format!("{bytes} B");
  }
  let mut value = bytes as f64;
  let mut unit = UNITS[0];
  for candidate in UNITS {
    value /= 1000.0;
    unit = candidate;
    if value < 1000.0 {
      break;
    }
  }
  format!("{value:.2} {unit}")
}
