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

//! Name-based registry of script engines

use super::cache::CachingScriptEvaluatorFactory;
use super::{ScriptEvaluator, ScriptEvaluatorCreator};
use crate::error::ScriptError;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Builds an evaluator for the language name it is invoked with
pub type EngineConstructor =
    Arc<dyn Fn(&str) -> Result<Arc<dyn ScriptEvaluator>, ScriptError> + Send + Sync>;

/// Evaluator factory backed by a [`ScriptEngineManager`]
pub type DefaultScriptEvaluatorFactory = CachingScriptEvaluatorFactory<ScriptEngineManager>;

/// Registry of engine constructors keyed by language name and alias
#[derive(Default)]
pub struct ScriptEngineManager {
    engines: RwLock<HashMap<String, EngineConstructor>>,
}

impl fmt::Debug for ScriptEngineManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptEngineManager")
            .field("engines", &self.engine_names())
            .finish()
    }
}

impl ScriptEngineManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an engine under `name`, replacing any engine already registered there
    pub fn register<F>(&self, name: impl Into<String>, constructor: F)
    where
        F: Fn(&str) -> Result<Arc<dyn ScriptEvaluator>, ScriptError> + Send + Sync + 'static,
    {
        let name = name.into();
        log::debug!("registering script engine '{name}'");
        self.engines.write().insert(name, Arc::new(constructor));
    }

    /// Make the engine registered under `target` also available as `alias`
    pub fn register_alias(
        &self,
        alias: impl Into<String>,
        target: &str,
    ) -> Result<(), ScriptError> {
        let mut engines = self.engines.write();
        let constructor = engines
            .get(target)
            .cloned()
            .ok_or_else(|| ScriptError::EngineNotFound {
                language_name: target.to_string(),
            })?;
        engines.insert(alias.into(), constructor);
        Ok(())
    }

    /// Remove the engine registered under `name`
    pub fn unregister(&self, name: &str) -> bool {
        self.engines.write().remove(name).is_some()
    }

    pub fn has_engine(&self, name: &str) -> bool {
        self.engines.read().contains_key(name)
    }

    /// Registered names, aliases included, sorted
    pub fn engine_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.engines.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Look up the constructor for `name`
    pub fn engine_by_name(&self, name: &str) -> Option<EngineConstructor> {
        self.engines.read().get(name).cloned()
    }
}

impl ScriptEvaluatorCreator for ScriptEngineManager {
    fn create_new_script_evaluator(
        &self,
        language_name: &str,
    ) -> Result<Arc<dyn ScriptEvaluator>, ScriptError> {
        // Read lock is released before the constructor runs.
        let constructor =
            self.engine_by_name(language_name)
                .ok_or_else(|| ScriptError::EngineNotFound {
                    language_name: language_name.to_string(),
                })?;
        constructor(language_name)
    }
}

impl CachingScriptEvaluatorFactory<ScriptEngineManager> {
    /// Create a factory resolving languages through `manager`
    pub fn with_engines(manager: ScriptEngineManager) -> Self {
        Self::new(manager)
    }

    /// Get the engine manager backing this factory
    pub fn engine_manager(&self) -> &ScriptEngineManager {
        self.creator()
    }
}
