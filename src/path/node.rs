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

//! Path nodes

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Name given to cross-parameter nodes
pub const CROSS_PARAMETER_NODE_NAME: &str = "<cross-parameter>";

/// Name given to return value nodes
pub const RETURN_VALUE_NODE_NAME: &str = "<return value>";

/// What a path node points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElementKind {
    Bean,
    Property,
    Method,
    Constructor,
    Parameter,
    CrossParameter,
    ReturnValue,
    ContainerElement,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementKind::Bean => "BEAN",
            ElementKind::Property => "PROPERTY",
            ElementKind::Method => "METHOD",
            ElementKind::Constructor => "CONSTRUCTOR",
            ElementKind::Parameter => "PARAMETER",
            ElementKind::CrossParameter => "CROSS_PARAMETER",
            ElementKind::ReturnValue => "RETURN_VALUE",
            ElementKind::ContainerElement => "CONTAINER_ELEMENT",
        };
        f.write_str(name)
    }
}

/// Map key of a node inside a keyed container
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeKey {
    Integer(i64),
    Text(String),
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKey::Integer(value) => write!(f, "{value}"),
            NodeKey::Text(value) => f.write_str(value),
        }
    }
}

impl From<i64> for NodeKey {
    fn from(value: i64) -> Self {
        NodeKey::Integer(value)
    }
}

impl From<&str> for NodeKey {
    fn from(value: &str) -> Self {
        NodeKey::Text(value.to_string())
    }
}

impl From<String> for NodeKey {
    fn from(value: String) -> Self {
        NodeKey::Text(value)
    }
}

/// One immutable segment of a property path
///
/// Every node links to its parent, so a node also identifies the whole path
/// from the root down to it. Equality and hashing only consider the
/// segment itself; use [`super::PropertyPath`] to compare whole paths.
#[derive(Debug, Clone)]
pub struct PathNode {
    name: Option<Arc<str>>,
    kind: ElementKind,
    in_iterable: bool,
    index: Option<usize>,
    key: Option<NodeKey>,
    parameter_index: Option<usize>,
    parent: Option<Arc<PathNode>>,
    depth: usize,
}

impl PathNode {
    pub(crate) fn new(
        parent: Option<Arc<PathNode>>,
        name: Option<Arc<str>>,
        kind: ElementKind,
    ) -> Self {
        let depth = parent.as_ref().map_or(1, |p| p.depth + 1);
        Self {
            name,
            kind,
            in_iterable: false,
            index: None,
            key: None,
            parameter_index: None,
            parent,
            depth,
        }
    }

    /// Copy this segment onto a different parent
    pub(crate) fn reparent(&self, parent: Option<Arc<PathNode>>) -> Self {
        let depth = parent.as_ref().map_or(1, |p| p.depth + 1);
        Self {
            name: self.name.clone(),
            kind: self.kind,
            in_iterable: self.in_iterable,
            index: self.index,
            key: self.key.clone(),
            parameter_index: self.parameter_index,
            parent,
            depth,
        }
    }

    pub(crate) fn with_parameter_index(mut self, index: usize) -> Self {
        self.parameter_index = Some(index);
        self
    }

    pub(crate) fn into_iterable(mut self) -> Self {
        self.in_iterable = true;
        self
    }

    pub(crate) fn with_index(mut self, index: usize) -> Self {
        self.in_iterable = true;
        self.index = Some(index);
        self.key = None;
        self
    }

    pub(crate) fn with_key(mut self, key: NodeKey) -> Self {
        self.in_iterable = true;
        self.key = Some(key);
        self.index = None;
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    /// Whether the node addresses an element of a container
    pub fn is_in_iterable(&self) -> bool {
        self.in_iterable
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn key(&self) -> Option<&NodeKey> {
        self.key.as_ref()
    }

    /// Position of the method parameter, for parameter nodes
    pub fn parameter_index(&self) -> Option<usize> {
        self.parameter_index
    }

    pub fn parent(&self) -> Option<&Arc<PathNode>> {
        self.parent.as_ref()
    }

    /// Number of nodes from the root to this node, inclusive
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub(crate) fn is_unnamed_root(&self) -> bool {
        self.parent.is_none() && self.name.is_none() && self.kind == ElementKind::Bean
    }
}

// Parent chain is released iteratively, stopping at the first ancestor that
// is still shared with another path.
impl Drop for PathNode {
    fn drop(&mut self) {
        let mut next = self.parent.take();
        while let Some(parent) = next {
            next = match Arc::into_inner(parent) {
                Some(mut node) => node.parent.take(),
                None => None,
            };
        }
    }
}

impl PartialEq for PathNode {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.name == other.name
            && self.in_iterable == other.in_iterable
            && self.index == other.index
            && self.key == other.key
            && self.parameter_index == other.parameter_index
    }
}

impl Eq for PathNode {}

impl Hash for PathNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.name.hash(state);
        self.in_iterable.hash(state);
        self.index.hash(state);
        self.key.hash(state);
        self.parameter_index.hash(state);
    }
}

impl fmt::Display for PathNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            f.write_str(name)?;
        }
        if self.in_iterable {
            f.write_str("[")?;
            if let Some(index) = self.index {
                write!(f, "{index}")?;
            } else if let Some(key) = &self.key {
                write!(f, "{key}")?;
            }
            f.write_str("]")?;
        }
        Ok(())
    }
}
