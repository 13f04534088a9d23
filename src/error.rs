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

//! Error types for evaluator resolution and violation path construction

use thiserror::Error;

/// Result type alias for validation engine operations
pub type Result<T> = std::result::Result<T, ValidationError>;

/// Errors raised by script engines and evaluator creation hooks
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScriptError {
    /// No engine is registered under the requested language name
    #[error("No script engine registered for language '{language_name}'")]
    EngineNotFound {
        /// Requested language name
        language_name: String,
    },

    /// An engine was found but could not be initialized
    #[error("Script engine for '{language_name}' failed to initialize: {message}")]
    EngineInitialization {
        /// Language the engine was created for
        language_name: String,
        /// Error message
        message: String,
    },

    /// Script execution failed
    #[error("Evaluation of '{language_name}' script failed: {message}")]
    Evaluation {
        /// Language of the failing script
        language_name: String,
        /// Error message
        message: String,
    },

    /// Custom engine error
    #[error("{0}")]
    Custom(String),
}

/// Errors surfaced to callers of the validation engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// No evaluator could be resolved for a language used in a constraint declaration
    #[error("Wasn't able to find a script evaluator for '{language_name}' language.")]
    ConstraintDeclaration {
        /// Unresolved language name
        language_name: String,
        /// Underlying engine lookup failure
        #[source]
        source: ScriptError,
    },

    /// A caller broke a precondition of the API
    #[error("Contract violation: {message}")]
    Contract {
        /// Description of the broken precondition
        message: String,
    },

    /// The context cannot be viewed as the requested capability
    #[error("Type {requested} not supported for unwrapping.")]
    UnsupportedUnwrap {
        /// Name of the requested capability
        requested: String,
    },

    /// Parameter nodes can only be added from cross-parameter contexts
    #[error("Parameter nodes may only be added to cross-parameter constraint violations")]
    ParameterNodeNotAllowed,

    /// A textual property path could not be parsed
    #[error("Unable to parse property path '{path}' at position {position}")]
    InvalidPath {
        /// The rejected input
        path: String,
        /// Byte offset of the first invalid character
        position: usize,
    },
}

impl ValidationError {
    /// Create a contract violation error
    pub fn contract(message: impl Into<String>) -> Self {
        Self::Contract {
            message: message.into(),
        }
    }

    /// Whether this error reports a programming error rather than a runtime condition
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::Contract { .. } | Self::ParameterNodeNotAllowed | Self::InvalidPath { .. }
        )
    }
}
