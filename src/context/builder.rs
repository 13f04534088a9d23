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

//! Custom constraint violation builders

use super::ConstraintValidatorContext;
use crate::error::{Result, ValidationError};
use crate::path::{ElementKind, NodeKey, PropertyPath};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Builds the path of one custom constraint violation
///
/// The builder owns its current path and, for cross-parameter contexts,
/// the method parameter names. Each step replaces the current path with a
/// derived one; paths handed out earlier are never affected.
#[derive(Debug, Clone)]
pub struct ConstraintViolationBuilder {
    message_template: String,
    path: PropertyPath,
    method_parameter_names: Option<Arc<[String]>>,
}

impl ConstraintViolationBuilder {
    pub(crate) fn new(
        message_template: String,
        path: PropertyPath,
        method_parameter_names: Option<Arc<[String]>>,
    ) -> Self {
        Self {
            message_template,
            path,
            method_parameter_names,
        }
    }

    pub fn add_property_node(mut self, name: &str) -> Self {
        self.path = self.path.append_property_node(name);
        self
    }

    pub fn add_bean_node(mut self) -> Self {
        self.path = self.path.append_bean_node();
        self
    }

    pub fn add_container_element_node(mut self, name: &str) -> Self {
        self.path = self.path.append_container_element_node(name);
        self
    }

    /// Mark the current leaf as an element of a container
    pub fn in_iterable(mut self) -> Self {
        self.path = self.path.with_leaf_iterable();
        self
    }

    pub fn at_index(mut self, index: usize) -> Self {
        self.path = self.path.with_leaf_index(index);
        self
    }

    pub fn at_key(mut self, key: impl Into<NodeKey>) -> Self {
        self.path = self.path.with_leaf_key(key);
        self
    }

    /// Point the violation at the method parameter at `index`
    ///
    /// Only available for cross-parameter violations, as the first step:
    /// the cross-parameter leaf is dropped and replaced by a parameter node
    /// named after the parameter at `index`. Calling it once the leaf is no
    /// longer the cross-parameter node, or with an index outside the
    /// parameter list, is a contract violation.
    pub fn add_parameter_node(mut self, index: usize) -> Result<Self> {
        let names = self
            .method_parameter_names
            .as_ref()
            .ok_or(ValidationError::ParameterNodeNotAllowed)?;
        let leaf_kind = self.path.leaf_node().kind();
        if leaf_kind != ElementKind::CrossParameter {
            return Err(ValidationError::contract(format!(
                "parameter nodes replace the cross-parameter node, but the current leaf is {leaf_kind}"
            )));
        }
        let name = names.get(index).ok_or_else(|| {
            ValidationError::contract(format!(
                "parameter index {index} is out of range for a method with {} parameters",
                names.len()
            ))
        })?;

        let path = self.path.without_leaf().append_parameter_node(name, index);
        self.path = path;
        Ok(self)
    }

    pub fn message_template(&self) -> &str {
        &self.message_template
    }

    /// Path the violation currently points at
    pub fn path(&self) -> &PropertyPath {
        &self.path
    }

    pub fn method_parameter_names(&self) -> Option<&[String]> {
        self.method_parameter_names.as_deref()
    }

    /// Finish the violation and register it with `context`
    pub fn add_constraint_violation(self, context: &mut ConstraintValidatorContext) {
        let violation = ConstraintViolationCreationContext {
            message_template: self.message_template,
            path: self.path,
            message_parameters: context.message_parameters().clone(),
            expression_variables: context.expression_variables().clone(),
            dynamic_payload: context.dynamic_payload().cloned(),
        };
        context.push_violation(violation);
    }
}

/// Everything needed to report one constraint violation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstraintViolationCreationContext {
    /// Message template to interpolate
    pub message_template: String,
    /// Location of the failure
    pub path: PropertyPath,
    /// Message parameters set on the context when the violation was added
    pub message_parameters: IndexMap<String, Value>,
    /// Expression variables set on the context when the violation was added
    pub expression_variables: IndexMap<String, Value>,
    /// Dynamic payload set on the context when the violation was added
    pub dynamic_payload: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cross_parameter_builder() -> ConstraintViolationBuilder {
        ConstraintViolationBuilder::new(
            "{dates.consistent}".to_string(),
            PropertyPath::for_method("book").append_cross_parameter_node(),
            Some(Arc::from(vec![
                "a".to_string(),
                "b".to_string(),
                "c".to_string(),
            ])),
        )
    }

    #[test]
    fn test_parameter_node_replaces_cross_parameter_leaf() {
        let builder = cross_parameter_builder();
        let base = builder.path().clone();

        let builder = builder.add_parameter_node(1).unwrap();
        let leaf = builder.path().leaf_node();

        assert_eq!(leaf.kind(), ElementKind::Parameter);
        assert_eq!(leaf.name(), Some("b"));
        assert_eq!(leaf.parameter_index(), Some(1));
        assert_eq!(builder.path().without_leaf(), base.without_leaf());
        assert_eq!(base.leaf_node().kind(), ElementKind::CrossParameter);
    }

    #[test]
    fn test_parameter_node_then_property_nodes() {
        let builder = cross_parameter_builder()
            .add_parameter_node(2)
            .unwrap()
            .add_property_node("lines")
            .at_index(0);

        assert_eq!(builder.path().to_string(), "book.c.lines[0]");
    }

    #[test]
    fn test_parameter_node_after_other_steps_is_rejected() {
        let after_property = cross_parameter_builder()
            .add_property_node("x")
            .add_parameter_node(0)
            .unwrap_err();
        assert!(after_property.is_contract_violation());

        let twice = cross_parameter_builder()
            .add_parameter_node(0)
            .unwrap()
            .add_parameter_node(1)
            .unwrap_err();
        assert!(twice.is_contract_violation());
    }

    #[test]
    fn test_parameter_index_out_of_range() {
        let err = cross_parameter_builder().add_parameter_node(3).unwrap_err();
        assert!(err.is_contract_violation());
        assert!(matches!(err, ValidationError::Contract { .. }));
    }

    #[test]
    fn test_parameter_node_requires_cross_parameter_builder() {
        let builder = ConstraintViolationBuilder::new(
            "{invalid}".to_string(),
            PropertyPath::root(),
            None,
        );
        assert_eq!(
            builder.add_parameter_node(0).unwrap_err(),
            ValidationError::ParameterNodeNotAllowed
        );
    }

    #[test]
    fn test_node_builders() {
        let builder = ConstraintViolationBuilder::new(
            "{invalid}".to_string(),
            PropertyPath::root(),
            None,
        )
        .add_property_node("addresses")
        .at_key("home")
        .add_container_element_node("<map value>")
        .add_bean_node()
        .add_property_node("tags")
        .in_iterable();

        assert_eq!(builder.path().to_string(), "addresses[home].<map value>.tags[]");
        assert_eq!(builder.path().len(), 5);
        assert_eq!(builder.message_template(), "{invalid}");
        assert!(builder.method_parameter_names().is_none());
    }
}
