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

//! Integration tests for cached script evaluator resolution

use hv_engine::{
    CachingScriptEvaluatorFactory, DefaultScriptEvaluatorFactory, ScriptBindings, ScriptEngineManager,
    ScriptError, ScriptEvaluator, ScriptEvaluatorFactory, ValidationError,
};
use rstest::rstest;
use serde_json::json;
use std::error::Error as _;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

mod utils;
use utils::{RecordingCreator, init_logging};

fn factory() -> CachingScriptEvaluatorFactory<RecordingCreator> {
    init_logging();
    CachingScriptEvaluatorFactory::new(RecordingCreator::new(["javascript", "groovy", "expression"]))
}

#[rstest]
#[case("javascript")]
#[case("groovy")]
#[case("expression")]
fn test_sequential_lookups_are_cache_hits(#[case] language: &str) {
    let factory = factory();
    let bindings = ScriptBindings::new().bind("_this", json!({"start": 1}));

    let first = factory.get_script_evaluator_by_language_name(language).unwrap();
    let second = factory.get_script_evaluator_by_language_name(language).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(
        first.evaluate("_this", &bindings).unwrap(),
        second.evaluate("_this", &bindings).unwrap()
    );
    assert_eq!(first.language_name(), language);
    assert_eq!(factory.creator().calls(), 1);
    assert_eq!(factory.stats().hits(), 1);
}

#[rstest]
#[case(2)]
#[case(8)]
#[case(32)]
fn test_concurrent_first_lookups_converge(#[case] threads: usize) {
    init_logging();
    let factory = CachingScriptEvaluatorFactory::new(
        RecordingCreator::new(["javascript"]).with_delay(Duration::from_millis(5)),
    );
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let factory = factory.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                factory.get("javascript").unwrap()
            })
        })
        .collect();
    let evaluators: Vec<Arc<dyn ScriptEvaluator>> =
        handles.into_iter().map(|h| h.join().unwrap()).collect();

    let canonical = factory.get("javascript").unwrap();
    for evaluator in &evaluators {
        assert!(Arc::ptr_eq(evaluator, &canonical));
    }
    assert_eq!(factory.len(), 1);

    let created = factory.stats().creations();
    assert_eq!(created as usize, factory.creator().calls());
    assert!(created >= 1);
    assert_eq!(factory.stats().discarded(), created - 1);
}

#[test]
fn test_failed_creation_is_retried() {
    let factory = factory();

    for attempt in 1..=3 {
        let err = factory.get("cobol").unwrap_err();
        assert!(matches!(
            err,
            ValidationError::ConstraintDeclaration { ref language_name, .. } if language_name == "cobol"
        ));
        assert_eq!(factory.creator().calls(), attempt);
    }
    assert!(!factory.contains("cobol"));
    assert_eq!(factory.stats().failures(), 3);
}

#[test]
fn test_declaration_error_exposes_engine_cause() {
    let err = factory().get("ruby").unwrap_err();

    let cause = err.source().unwrap();
    assert_eq!(
        cause.to_string(),
        ScriptError::EngineNotFound {
            language_name: "ruby".to_string()
        }
        .to_string()
    );
    assert!(err.to_string().contains("'ruby'"));
}

#[test]
fn test_concurrent_failures_leave_cache_empty() {
    let factory = factory();
    let barrier = Arc::new(Barrier::new(4));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let factory = factory.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                factory.get("cobol").is_err()
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
    assert!(factory.is_empty());
    assert_eq!(factory.creator().calls(), 4);
}

#[test]
fn test_default_factory_resolves_registered_engines() {
    init_logging();
    let manager = ScriptEngineManager::new();
    manager.register("javascript", |language: &str| {
        Ok(Arc::new(utils::LookupEvaluator::for_language(language)))
    });
    manager.register_alias("ECMAScript", "javascript").unwrap();
    let factory: Arc<dyn ScriptEvaluatorFactory> =
        Arc::new(DefaultScriptEvaluatorFactory::with_engines(manager));

    let evaluator = factory
        .get_script_evaluator_by_language_name("ECMAScript")
        .unwrap();
    let bindings = ScriptBindings::new().bind("valid", json!(true));
    assert!(evaluator.evaluate_assertion("valid", &bindings).unwrap());

    assert!(matches!(
        factory.get_script_evaluator_by_language_name("python"),
        Err(ValidationError::ConstraintDeclaration {
            source: ScriptError::EngineNotFound { .. },
            ..
        })
    ));
}
