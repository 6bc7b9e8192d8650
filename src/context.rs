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
use std::collections::HashSet;
use std::sync::Mutex;

/// Remembers which deprecation warnings a run has already emitted.
#[derive(Debug, Default)]
pub struct DeprecationTracker {
  seen: Mutex<HashSet<String>>,
}

impl DeprecationTracker {
  /// Logs `message` the first time `key` is seen. Returns whether it logged.
  pub fn warn_once(&self, key: &str, message: &str) -> bool {
    let mut seen = self.seen.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if !seen.insert(key.to_string()) {
      return false;
    }
    tracing::warn!(deprecation = key, "{}", message);
    true
  }

  pub fn has_warned(&self, key: &str) -> bool {
    let seen = self.seen.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    seen.contains(key)
  }
}

/// State owned by one top-level compress or benchmark run.
#[derive(Debug, Default)]
pub struct RunContext {
  pub deprecations: DeprecationTracker,
}

impl RunContext {
  pub fn new() -> Self {
    RunContext::default()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn warns_once_per_key_and_per_run() {
    let first = RunContext::new();
    assert!(first.deprecations.warn_once("sync", "sync is deprecated"));
    assert!(!first.deprecations.warn_once("sync", "sync is deprecated"));
    assert!(first.deprecations.has_warned("sync"));

    let second = RunContext::new();
    assert!(!second.deprecations.has_warned("sync"));
    assert!(second.deprecations.warn_once("sync", "sync is deprecated"));
  }
}
