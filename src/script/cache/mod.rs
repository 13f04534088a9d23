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

//! Evaluator caching keyed by language name
//!
//! Lookups take the map's read path only. On a miss the creation hook runs
//! without holding any lock, and the result is published with an
//! insert-if-absent write. Two callers racing on an unseen language may
//! therefore both create an evaluator; only the first insert becomes
//! canonical and every caller gets that one back. Failed creations are
//! never stored, so the next lookup retries.

pub mod config;
pub mod stats;

pub use config::EvaluatorCacheConfig;
pub use stats::CacheStatistics;

use super::{ScriptEvaluator, ScriptEvaluatorCreator, ScriptEvaluatorFactory};
use crate::error::{Result, ScriptError, ValidationError};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::fmt;
use std::sync::Arc;

/// Thread-safe, lazily populated cache of script evaluators
pub struct CachingScriptEvaluatorFactory<C> {
    creator: Arc<C>,
    cache: Arc<DashMap<String, Arc<dyn ScriptEvaluator>>>,
    stats: Arc<CacheStatistics>,
    config: Arc<EvaluatorCacheConfig>,
}

impl<C> fmt::Debug for CachingScriptEvaluatorFactory<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachingScriptEvaluatorFactory")
            .field("cache_size", &self.cache.len())
            .field("stats", &self.stats)
            .field("config", &self.config)
            .finish()
    }
}

impl<C> Clone for CachingScriptEvaluatorFactory<C> {
    fn clone(&self) -> Self {
        Self {
            creator: Arc::clone(&self.creator),
            cache: Arc::clone(&self.cache),
            stats: Arc::clone(&self.stats),
            config: Arc::clone(&self.config),
        }
    }
}

impl<C: ScriptEvaluatorCreator> CachingScriptEvaluatorFactory<C> {
    /// Create a factory with the default cache configuration
    pub fn new(creator: C) -> Self {
        Self::with_config(creator, EvaluatorCacheConfig::default())
    }

    /// Create a factory with a custom cache configuration
    pub fn with_config(creator: C, config: EvaluatorCacheConfig) -> Self {
        Self {
            creator: Arc::new(creator),
            cache: Arc::new(DashMap::with_capacity(config.initial_capacity)),
            stats: Arc::new(CacheStatistics::default()),
            config: Arc::new(config),
        }
    }

    /// Resolve the evaluator for `language_name`, creating it on first use
    pub fn get(&self, language_name: &str) -> Result<Arc<dyn ScriptEvaluator>> {
        if let Some(cached) = self.cache.get(language_name) {
            self.record(CacheStatistics::record_hit);
            log::trace!("evaluator cache hit for '{language_name}'");
            return Ok(Arc::clone(cached.value()));
        }

        self.record(CacheStatistics::record_miss);
        let created = self
            .creator
            .create_new_script_evaluator(language_name)
            .map_err(|source| {
                self.record(CacheStatistics::record_failure);
                ValidationError::ConstraintDeclaration {
                    language_name: language_name.to_string(),
                    source,
                }
            })?;
        self.record(CacheStatistics::record_creation);

        let canonical = match self.cache.entry(language_name.to_string()) {
            Entry::Occupied(entry) => {
                self.record(CacheStatistics::record_discarded);
                log::trace!("discarding evaluator for '{language_name}' created by a racing lookup");
                Arc::clone(entry.get())
            }
            Entry::Vacant(entry) => {
                log::debug!("cached new script evaluator for '{language_name}'");
                Arc::clone(entry.insert(created).value())
            }
        };

        Ok(canonical)
    }

    /// Resolve every language in `languages`, stopping at the first failure
    pub fn warm<I, S>(&self, languages: I) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut resolved = 0;
        for language in languages {
            self.get(language.as_ref())?;
            resolved += 1;
        }
        Ok(resolved)
    }

    /// Resolve the languages listed in the configuration
    pub fn preload(&self) -> Result<usize> {
        let config = Arc::clone(&self.config);
        self.warm(config.preload_languages.iter())
    }

    /// Get the creation hook
    pub fn creator(&self) -> &C {
        &self.creator
    }
}

impl<C> CachingScriptEvaluatorFactory<C> {
    /// Number of languages currently cached
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Whether an evaluator for `language_name` has been cached
    pub fn contains(&self, language_name: &str) -> bool {
        self.cache.contains_key(language_name)
    }

    /// Names of all cached languages, sorted
    pub fn cached_languages(&self) -> Vec<String> {
        let mut languages: Vec<String> = self.cache.iter().map(|entry| entry.key().clone()).collect();
        languages.sort();
        languages
    }

    /// Drop every cached evaluator
    pub fn clear(&self) {
        self.cache.clear();
    }

    /// Get cache statistics
    pub fn stats(&self) -> &CacheStatistics {
        &self.stats
    }

    /// Get the cache configuration
    pub fn config(&self) -> &EvaluatorCacheConfig {
        &self.config
    }

    fn record(&self, counter: fn(&CacheStatistics)) {
        if self.config.record_statistics {
            counter(&self.stats);
        }
    }
}

impl<C: ScriptEvaluatorCreator> ScriptEvaluatorFactory for CachingScriptEvaluatorFactory<C> {
    fn get_script_evaluator_by_language_name(
        &self,
        language_name: &str,
    ) -> Result<Arc<dyn ScriptEvaluator>> {
        self.get(language_name)
    }
}

/// Adapts a closure into a [`ScriptEvaluatorCreator`]
pub struct FnCreator<F>(F);

impl<F> ScriptEvaluatorCreator for FnCreator<F>
where
    F: Fn(&str) -> std::result::Result<Arc<dyn ScriptEvaluator>, ScriptError> + Send + Sync,
{
    fn create_new_script_evaluator(
        &self,
        language_name: &str,
    ) -> std::result::Result<Arc<dyn ScriptEvaluator>, ScriptError> {
        (self.0)(language_name)
    }
}

impl<F> CachingScriptEvaluatorFactory<FnCreator<F>>
where
    F: Fn(&str) -> std::result::Result<Arc<dyn ScriptEvaluator>, ScriptError> + Send + Sync,
{
    /// Create a factory whose creation hook is a closure
    pub fn from_fn(create: F) -> Self {
        Self::new(FnCreator(create))
    }
}
