// Copyright 2024 OctoFHIR Team
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

//! Evaluator cache configuration options

use serde::{Deserialize, Serialize};

/// Configuration for evaluator caching behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorCacheConfig {
    /// Number of languages the cache is sized for up front
    pub initial_capacity: usize,

    /// Languages resolved by [`super::CachingScriptEvaluatorFactory::preload`]
    pub preload_languages: Vec<String>,

    /// Whether hit/miss/creation counters are maintained
    pub record_statistics: bool,
}

impl EvaluatorCacheConfig {
    /// Create a new configuration with custom settings
    pub fn new(initial_capacity: usize, record_statistics: bool) -> Self {
        Self {
            initial_capacity,
            preload_languages: Vec::new(),
            record_statistics,
        }
    }

    /// Create a configuration that resolves the given languages ahead of time
    pub fn eager<I, S>(languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let preload_languages: Vec<String> = languages.into_iter().map(Into::into).collect();
        Self {
            initial_capacity: preload_languages.len().max(4),
            preload_languages,
            record_statistics: true,
        }
    }

    /// Create a configuration with statistics switched off
    pub fn without_statistics() -> Self {
        Self {
            record_statistics: false,
            ..Self::default()
        }
    }

    /// Create a configuration for testing
    pub fn testing() -> Self {
        Self {
            initial_capacity: 1,
            preload_languages: Vec::new(),
            record_statistics: true,
        }
    }
}

impl Default for EvaluatorCacheConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 8,
            preload_languages: Vec::new(),
            record_statistics: true,
        }
    }
}
