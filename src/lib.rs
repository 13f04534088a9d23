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

//! Building blocks for a constraint validation engine
//!
//! - [`script`]: resolves script evaluators by language name and caches
//!   them, so each language is materialized once per factory
//! - [`path`]: persistent property paths describing where a violation
//!   occurred
//! - [`context`]: validator contexts and violation builders, including
//!   the cross-parameter variant that retargets violations to a single
//!   method parameter

pub mod constraint;
pub mod context;
pub mod error;
pub mod path;
pub mod script;

// Re-export main types
pub use constraint::{ClockProvider, ConstraintDescriptor, FixedClockProvider, SystemClockProvider};
pub use context::{
    Capability, ConstraintValidatorContext, ConstraintViolationBuilder,
    ConstraintViolationCreationContext, ContextKind, ContextView, CrossParameterView,
    ValidatorPayload,
};
pub use error::{Result, ScriptError, ValidationError};
pub use path::{ElementKind, NodeKey, PathNode, PropertyPath};
pub use script::{
    CachingScriptEvaluatorFactory, DefaultScriptEvaluatorFactory, EvaluatorCacheConfig,
    ScriptBindings, ScriptEngineManager, ScriptEvaluator, ScriptEvaluatorCreator,
    ScriptEvaluatorFactory,
};
