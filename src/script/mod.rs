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

//! Script evaluators for expression based constraints
//!
//! A [`ScriptEvaluator`] is the handle through which a constraint runs a
//! script written in some named language. Evaluators are resolved by
//! language name through a [`ScriptEvaluatorFactory`]; the
//! [`CachingScriptEvaluatorFactory`] memoizes them so that each language is
//! materialized once per factory, delegating the actual construction to a
//! [`ScriptEvaluatorCreator`].

pub mod cache;
pub mod engine;

pub use cache::{CacheStatistics, CachingScriptEvaluatorFactory, EvaluatorCacheConfig, FnCreator};
pub use engine::{DefaultScriptEvaluatorFactory, EngineConstructor, ScriptEngineManager};

use crate::error::{Result, ScriptError};
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Named values made visible to a script during evaluation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptBindings {
    values: IndexMap<String, Value>,
}

impl ScriptBindings {
    /// Create an empty set of bindings
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `value` under `name`, replacing any previous binding
    pub fn bind(mut self, name: impl Into<String>, value: Value) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    /// Bind `value` under `name` in place
    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.values.insert(name.into(), value)
    }

    /// Look up a bound value
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Iterate bindings in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for ScriptBindings {
    fn from_iter<T: IntoIterator<Item = (K, Value)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Ready-to-use evaluator for one scripting language
///
/// Implementations wrap an external engine. Handles for the same language
/// are interchangeable; callers must not rely on their identity.
pub trait ScriptEvaluator: Send + Sync + fmt::Debug {
    /// Language this evaluator executes
    fn language_name(&self) -> &str;

    /// Run `script` with the given bindings and return its result
    fn evaluate(
        &self,
        script: &str,
        bindings: &ScriptBindings,
    ) -> std::result::Result<Value, ScriptError>;

    /// Run `script` as an assertion; anything other than a boolean result is an error
    fn evaluate_assertion(
        &self,
        script: &str,
        bindings: &ScriptBindings,
    ) -> std::result::Result<bool, ScriptError> {
        match self.evaluate(script, bindings)? {
            Value::Bool(result) => Ok(result),
            other => Err(ScriptError::Evaluation {
                language_name: self.language_name().to_string(),
                message: format!("script '{script}' returned non-boolean value {other}"),
            }),
        }
    }
}

/// Resolves script evaluators by language name
pub trait ScriptEvaluatorFactory: Send + Sync {
    /// Retrieve the evaluator for `language_name`
    ///
    /// Fails with [`crate::ValidationError::ConstraintDeclaration`] when no
    /// evaluator can be found for the language.
    fn get_script_evaluator_by_language_name(
        &self,
        language_name: &str,
    ) -> Result<Arc<dyn ScriptEvaluator>>;
}

/// Creation hook used by [`CachingScriptEvaluatorFactory`] on a cache miss
///
/// Creation may be invoked more than once for the same language when
/// callers race, so it must not have side effects beyond producing the
/// evaluator.
pub trait ScriptEvaluatorCreator: Send + Sync {
    /// Build a fresh evaluator for `language_name`
    fn create_new_script_evaluator(
        &self,
        language_name: &str,
    ) -> std::result::Result<Arc<dyn ScriptEvaluator>, ScriptError>;
}

impl<C: ScriptEvaluatorCreator + ?Sized> ScriptEvaluatorCreator for Arc<C> {
    fn create_new_script_evaluator(
        &self,
        language_name: &str,
    ) -> std::result::Result<Arc<dyn ScriptEvaluator>, ScriptError> {
        (**self).create_new_script_evaluator(language_name)
    }
}
