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

//! Shared helpers for integration tests

#![allow(dead_code)]

use hv_engine::{ScriptBindings, ScriptError, ScriptEvaluator, ScriptEvaluatorCreator};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Install a test logger once; repeated calls are ignored
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Evaluator that looks a binding up by the script text
#[derive(Debug)]
pub struct LookupEvaluator {
    language: String,
}

impl LookupEvaluator {
    pub fn for_language(language: &str) -> Self {
        Self {
            language: language.to_string(),
        }
    }
}

impl ScriptEvaluator for LookupEvaluator {
    fn language_name(&self) -> &str {
        &self.language
    }

    fn evaluate(&self, script: &str, bindings: &ScriptBindings) -> Result<Value, ScriptError> {
        bindings
            .get(script)
            .cloned()
            .ok_or_else(|| ScriptError::Evaluation {
                language_name: self.language.clone(),
                message: format!("unbound name '{script}'"),
            })
    }
}

/// Creation hook counting its invocations, with configurable languages
pub struct RecordingCreator {
    known: HashSet<String>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl RecordingCreator {
    pub fn new<I, S>(known: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known: known.into_iter().map(Into::into).collect(),
            calls: AtomicUsize::new(0),
            delay: None,
        }
    }

    /// Sleep inside every creation to widen race windows
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ScriptEvaluatorCreator for RecordingCreator {
    fn create_new_script_evaluator(
        &self,
        language_name: &str,
    ) -> Result<Arc<dyn ScriptEvaluator>, ScriptError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if !self.known.contains(language_name) {
            return Err(ScriptError::EngineNotFound {
                language_name: language_name.to_string(),
            });
        }
        Ok(Arc::new(LookupEvaluator::for_language(language_name)))
    }
}
