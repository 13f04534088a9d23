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

//! Contexts handed to constraint validators
//!
//! A [`ConstraintValidatorContext`] is either a plain context or a
//! cross-parameter context that also knows the names of the validated
//! method's parameters. Both build custom violations rooted at a copy of
//! the validated path; only cross-parameter builders may retarget a
//! violation to a single parameter.

mod builder;

pub use builder::{ConstraintViolationBuilder, ConstraintViolationCreationContext};

use crate::constraint::{ClockProvider, ConstraintDescriptor};
use crate::error::{Result, ValidationError};
use crate::path::{ElementKind, PropertyPath};
use indexmap::IndexMap;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Opaque payload configured for constraint validators
pub type ValidatorPayload = Arc<dyn Any + Send + Sync>;

/// Variant specific state of a validator context
#[derive(Debug, Clone, PartialEq)]
pub enum ContextKind {
    /// Bean, property and return value validation
    Base,
    /// Validation of a method's parameters as a whole
    CrossParameter {
        /// Parameter names, in declaration order
        method_parameter_names: Arc<[String]>,
    },
}

/// Views a validator context can be unwrapped to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// The standard validator context contract
    ValidatorContext,
    /// Message parameters, expression variables and dynamic payload
    ExtendedValidatorContext,
    /// Access to the method parameter names
    CrossParameterContext,
    /// Message interpolation state
    ///
    /// Belongs to the message interpolator, not to validator contexts:
    /// unwrapping any validator context to it fails with
    /// [`ValidationError::UnsupportedUnwrap`].
    MessageInterpolatorContext,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::ValidatorContext => "ConstraintValidatorContext",
            Capability::ExtendedValidatorContext => "ExtendedConstraintValidatorContext",
            Capability::CrossParameterContext => "CrossParameterConstraintValidatorContext",
            Capability::MessageInterpolatorContext => "MessageInterpolatorContext",
        };
        f.write_str(name)
    }
}

/// Result of [`ConstraintValidatorContext::unwrap`]
#[derive(Debug, Clone, Copy)]
pub enum ContextView<'a> {
    Validator(&'a ConstraintValidatorContext),
    CrossParameter(CrossParameterView<'a>),
}

impl<'a> ContextView<'a> {
    /// The unwrapped context
    pub fn context(&self) -> &'a ConstraintValidatorContext {
        match self {
            ContextView::Validator(context) => *context,
            ContextView::CrossParameter(view) => view.context,
        }
    }

    pub fn as_cross_parameter(&self) -> Option<&CrossParameterView<'a>> {
        match self {
            ContextView::CrossParameter(view) => Some(view),
            ContextView::Validator(_) => None,
        }
    }
}

/// Cross-parameter view of a validator context
#[derive(Debug, Clone, Copy)]
pub struct CrossParameterView<'a> {
    context: &'a ConstraintValidatorContext,
    method_parameter_names: &'a [String],
}

impl<'a> CrossParameterView<'a> {
    pub fn method_parameter_names(&self) -> &'a [String] {
        self.method_parameter_names
    }

    pub fn context(&self) -> &'a ConstraintValidatorContext {
        self.context
    }
}

/// State shared with a constraint validator during one validation call
pub struct ConstraintValidatorContext {
    kind: ContextKind,
    clock_provider: Arc<dyn ClockProvider>,
    base_path: PropertyPath,
    descriptor: Arc<ConstraintDescriptor>,
    validator_payload: Option<ValidatorPayload>,
    default_violation_disabled: bool,
    violations: Vec<ConstraintViolationCreationContext>,
    message_parameters: IndexMap<String, Value>,
    expression_variables: IndexMap<String, Value>,
    dynamic_payload: Option<Value>,
}

impl fmt::Debug for ConstraintValidatorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstraintValidatorContext")
            .field("kind", &self.kind)
            .field("base_path", &self.base_path.to_string())
            .field("constraint", &self.descriptor.name())
            .field("has_payload", &self.validator_payload.is_some())
            .field("default_violation_disabled", &self.default_violation_disabled)
            .field("violations", &self.violations.len())
            .finish()
    }
}

impl ConstraintValidatorContext {
    /// Create a context for bean, property or return value validation
    pub fn new(
        clock_provider: Arc<dyn ClockProvider>,
        base_path: PropertyPath,
        descriptor: Arc<ConstraintDescriptor>,
        validator_payload: Option<ValidatorPayload>,
    ) -> Self {
        Self {
            kind: ContextKind::Base,
            clock_provider,
            base_path,
            descriptor,
            validator_payload,
            default_violation_disabled: false,
            violations: Vec::new(),
            message_parameters: IndexMap::new(),
            expression_variables: IndexMap::new(),
            dynamic_payload: None,
        }
    }

    /// Create a context for cross-parameter validation
    ///
    /// `base_path` must end in a cross-parameter node; anything else is a
    /// contract violation and no context is created.
    pub fn new_cross_parameter(
        method_parameter_names: impl Into<Arc<[String]>>,
        clock_provider: Arc<dyn ClockProvider>,
        base_path: PropertyPath,
        descriptor: Arc<ConstraintDescriptor>,
        validator_payload: Option<ValidatorPayload>,
    ) -> Result<Self> {
        let leaf_kind = base_path.leaf_node().kind();
        if leaf_kind != ElementKind::CrossParameter {
            return Err(ValidationError::contract(format!(
                "context can only be used for cross-parameter validation, but path '{base_path}' ends in a {leaf_kind} node"
            )));
        }

        let mut context = Self::new(clock_provider, base_path, descriptor, validator_payload);
        context.kind = ContextKind::CrossParameter {
            method_parameter_names: method_parameter_names.into(),
        };
        Ok(context)
    }

    pub fn kind(&self) -> &ContextKind {
        &self.kind
    }

    pub fn is_cross_parameter(&self) -> bool {
        matches!(self.kind, ContextKind::CrossParameter { .. })
    }

    /// Parameter names of the validated method, for cross-parameter contexts
    pub fn method_parameter_names(&self) -> Option<&[String]> {
        match &self.kind {
            ContextKind::CrossParameter {
                method_parameter_names,
            } => Some(method_parameter_names.as_ref()),
            ContextKind::Base => None,
        }
    }

    /// Path of the validated element
    pub fn base_path(&self) -> &PropertyPath {
        &self.base_path
    }

    pub fn descriptor(&self) -> &ConstraintDescriptor {
        &self.descriptor
    }

    pub fn clock_provider(&self) -> &dyn ClockProvider {
        self.clock_provider.as_ref()
    }

    /// Message template of the violation reported when the validator fails
    pub fn default_constraint_message_template(&self) -> &str {
        self.descriptor.message_template()
    }

    /// Suppress the default violation; only custom violations are reported
    pub fn disable_default_constraint_violation(&mut self) {
        self.default_violation_disabled = true;
    }

    pub fn is_default_constraint_violation_disabled(&self) -> bool {
        self.default_violation_disabled
    }

    /// Validator payload, if one of type `T` was configured
    pub fn constraint_validator_payload<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.validator_payload.as_deref()?.downcast_ref::<T>()
    }

    /// Start a custom violation rooted at a copy of the base path
    pub fn build_constraint_violation_with_template(
        &self,
        message_template: impl Into<String>,
    ) -> ConstraintViolationBuilder {
        let method_parameter_names = match &self.kind {
            ContextKind::CrossParameter {
                method_parameter_names,
            } => Some(Arc::clone(method_parameter_names)),
            ContextKind::Base => None,
        };
        ConstraintViolationBuilder::new(
            message_template.into(),
            self.base_path.clone(),
            method_parameter_names,
        )
    }

    pub fn add_message_parameter(&mut self, name: impl Into<String>, value: Value) -> &mut Self {
        self.message_parameters.insert(name.into(), value);
        self
    }

    pub fn add_expression_variable(&mut self, name: impl Into<String>, value: Value) -> &mut Self {
        self.expression_variables.insert(name.into(), value);
        self
    }

    pub fn with_dynamic_payload(&mut self, payload: Value) -> &mut Self {
        self.dynamic_payload = Some(payload);
        self
    }

    pub fn message_parameters(&self) -> &IndexMap<String, Value> {
        &self.message_parameters
    }

    pub fn expression_variables(&self) -> &IndexMap<String, Value> {
        &self.expression_variables
    }

    pub fn dynamic_payload(&self) -> Option<&Value> {
        self.dynamic_payload.as_ref()
    }

    pub(crate) fn push_violation(&mut self, violation: ConstraintViolationCreationContext) {
        self.violations.push(violation);
    }

    /// Violations to report: the default one unless disabled, then custom ones in insertion order
    pub fn constraint_violation_creation_contexts(&self) -> Vec<ConstraintViolationCreationContext> {
        let mut contexts = Vec::with_capacity(self.violations.len() + 1);
        if !self.default_violation_disabled {
            contexts.push(ConstraintViolationCreationContext {
                message_template: self.default_constraint_message_template().to_string(),
                path: self.base_path.clone(),
                message_parameters: self.message_parameters.clone(),
                expression_variables: self.expression_variables.clone(),
                dynamic_payload: self.dynamic_payload.clone(),
            });
        }
        contexts.extend(self.violations.iter().cloned());
        contexts
    }

    /// View this context as `capability`
    ///
    /// Cross-parameter contexts answer [`Capability::CrossParameterContext`];
    /// every context answers the validator context capabilities. Anything
    /// else fails with [`ValidationError::UnsupportedUnwrap`].
    pub fn unwrap(&self, capability: Capability) -> Result<ContextView<'_>> {
        if let ContextKind::CrossParameter {
            method_parameter_names,
        } = &self.kind
        {
            if capability == Capability::CrossParameterContext {
                return Ok(ContextView::CrossParameter(CrossParameterView {
                    context: self,
                    method_parameter_names: method_parameter_names.as_ref(),
                }));
            }
        }

        match capability {
            Capability::ValidatorContext | Capability::ExtendedValidatorContext => {
                Ok(ContextView::Validator(self))
            }
            other => Err(ValidationError::UnsupportedUnwrap {
                requested: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::SystemClockProvider;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn descriptor() -> Arc<ConstraintDescriptor> {
        Arc::new(ConstraintDescriptor::new("ConsistentDates", "{dates.consistent}"))
    }

    fn cross_parameter_context() -> ConstraintValidatorContext {
        ConstraintValidatorContext::new_cross_parameter(
            vec!["start".to_string(), "end".to_string()],
            Arc::new(SystemClockProvider),
            PropertyPath::for_method("book").append_cross_parameter_node(),
            descriptor(),
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_cross_parameter_context_requires_cross_parameter_leaf() {
        let err = ConstraintValidatorContext::new_cross_parameter(
            vec!["start".to_string()],
            Arc::new(SystemClockProvider),
            PropertyPath::for_method("book").append_parameter_node("start", 0),
            descriptor(),
            None,
        )
        .unwrap_err();

        assert!(matches!(err, ValidationError::Contract { .. }));
        assert!(err.to_string().contains("PARAMETER"));
    }

    #[test]
    fn test_builder_starts_at_copy_of_base_path() {
        let context = cross_parameter_context();
        let builder = context
            .build_constraint_violation_with_template("{start.before.end}")
            .add_parameter_node(0)
            .unwrap();

        assert_eq!(builder.path().to_string(), "book.start");
        assert_eq!(context.base_path().to_string(), "book.<cross-parameter>");
        assert_eq!(
            builder.method_parameter_names(),
            Some(&["start".to_string(), "end".to_string()][..])
        );
    }

    #[test]
    fn test_default_violation_and_custom_violations() {
        let mut context = cross_parameter_context();
        context.add_message_parameter("min", json!(1));
        context
            .build_constraint_violation_with_template("{end.after.start}")
            .add_parameter_node(1)
            .unwrap()
            .add_constraint_violation(&mut context);

        let contexts = context.constraint_violation_creation_contexts();
        assert_eq!(contexts.len(), 2);
        assert_eq!(contexts[0].message_template, "{dates.consistent}");
        assert_eq!(contexts[0].path.to_string(), "book.<cross-parameter>");
        assert_eq!(contexts[1].path.to_string(), "book.end");
        assert_eq!(contexts[1].message_parameters.get("min"), Some(&json!(1)));

        context.disable_default_constraint_violation();
        let contexts = context.constraint_violation_creation_contexts();
        assert_eq!(contexts.len(), 1);
        assert_eq!(contexts[0].message_template, "{end.after.start}");
    }

    #[test]
    fn test_violation_snapshots_context_state() {
        let mut context = ConstraintValidatorContext::new(
            Arc::new(SystemClockProvider),
            PropertyPath::root(),
            descriptor(),
            None,
        );
        context
            .add_expression_variable("limit", json!(10))
            .with_dynamic_payload(json!({"severity": "warn"}));
        context
            .build_constraint_violation_with_template("{too.many}")
            .add_property_node("items")
            .add_constraint_violation(&mut context);
        context.add_expression_variable("limit", json!(20));

        let contexts = context.constraint_violation_creation_contexts();
        assert_eq!(contexts[1].expression_variables.get("limit"), Some(&json!(10)));
        assert_eq!(contexts[0].expression_variables.get("limit"), Some(&json!(20)));
        assert_eq!(contexts[1].dynamic_payload, Some(json!({"severity": "warn"})));
    }

    #[test]
    fn test_validator_payload_downcast() {
        let context = ConstraintValidatorContext::new(
            Arc::new(SystemClockProvider),
            PropertyPath::root(),
            descriptor(),
            Some(Arc::new(42_u32)),
        );

        assert_eq!(context.constraint_validator_payload::<u32>(), Some(&42));
        assert_eq!(context.constraint_validator_payload::<String>(), None);
    }

    #[test]
    fn test_unwrap_cross_parameter() {
        let context = cross_parameter_context();

        let view = context.unwrap(Capability::CrossParameterContext).unwrap();
        let cross = view.as_cross_parameter().unwrap();
        assert_eq!(cross.method_parameter_names(), &["start", "end"]);
        assert!(context.unwrap(Capability::ValidatorContext).is_ok());
        assert_eq!(
            context
                .unwrap(Capability::MessageInterpolatorContext)
                .unwrap_err(),
            ValidationError::UnsupportedUnwrap {
                requested: "MessageInterpolatorContext".to_string()
            }
        );
    }

    #[test]
    fn test_unwrap_base_context() {
        let context = ConstraintValidatorContext::new(
            Arc::new(SystemClockProvider),
            PropertyPath::root().append_property_node("email"),
            descriptor(),
            None,
        );

        let view = context.unwrap(Capability::ExtendedValidatorContext).unwrap();
        assert!(view.as_cross_parameter().is_none());
        assert_eq!(view.context().base_path().to_string(), "email");
        assert!(context.unwrap(Capability::CrossParameterContext).is_err());
    }
}
