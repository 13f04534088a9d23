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

//! Persistent property paths
//!
//! A [`PropertyPath`] describes where inside a validated object graph a
//! constraint failed. It is stored as a reference to its leaf node; each
//! node points at its parent, so the path is a singly linked list running
//! from leaf to root.
//!
//! # Structural sharing
//!
//! Paths are never mutated. Every edit returns a new path whose new leaf
//! links to the unchanged ancestor chain of the receiver:
//!
//! - `without_leaf` is a pointer move to the parent
//! - `append_*` allocates exactly one node
//! - `with_leaf_*` allocates one replacement node on the same parent
//!
//! Any number of violation builders, on any number of threads, can derive
//! paths from the same base without copying or synchronization.

mod node;
mod parse;

pub use node::{CROSS_PARAMETER_NODE_NAME, ElementKind, NodeKey, PathNode, RETURN_VALUE_NODE_NAME};

use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Immutable root-to-leaf chain of [`PathNode`]s
#[derive(Debug, Clone)]
pub struct PropertyPath {
    leaf: Arc<PathNode>,
}

impl PropertyPath {
    /// Path consisting only of the unnamed root bean node
    pub fn root() -> Self {
        Self::from_leaf(PathNode::new(None, None, ElementKind::Bean))
    }

    /// Path rooted at a method node, as used for parameter and return value validation
    pub fn for_method(name: impl AsRef<str>) -> Self {
        Self::from_leaf(PathNode::new(
            None,
            Some(Arc::from(name.as_ref())),
            ElementKind::Method,
        ))
    }

    /// Path rooted at a constructor node
    pub fn for_constructor(name: impl AsRef<str>) -> Self {
        Self::from_leaf(PathNode::new(
            None,
            Some(Arc::from(name.as_ref())),
            ElementKind::Constructor,
        ))
    }

    fn from_leaf(leaf: PathNode) -> Self {
        Self {
            leaf: Arc::new(leaf),
        }
    }

    fn child(&self, name: Option<&str>, kind: ElementKind) -> PathNode {
        PathNode::new(Some(Arc::clone(&self.leaf)), name.map(Arc::from), kind)
    }

    /// The trailing node of the path
    pub fn leaf_node(&self) -> &PathNode {
        &self.leaf
    }

    /// Shared handle to the trailing node
    pub fn leaf(&self) -> &Arc<PathNode> {
        &self.leaf
    }

    /// Number of nodes, root included
    pub fn len(&self) -> usize {
        self.leaf.depth()
    }

    /// Paths always contain at least the root node
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Whether this path is the bare unnamed root
    pub fn is_root(&self) -> bool {
        self.leaf.is_unnamed_root()
    }

    /// Iterate nodes from the leaf up to the root
    pub fn leaf_iter(&self) -> LeafToRoot<'_> {
        LeafToRoot {
            next: Some(&self.leaf),
        }
    }

    /// Iterate nodes from the root down to the leaf
    pub fn nodes(&self) -> impl DoubleEndedIterator<Item = &PathNode> + ExactSizeIterator {
        let mut nodes: Vec<&PathNode> = self.leaf_iter().collect();
        nodes.reverse();
        nodes.into_iter()
    }

    /// Whether both paths reuse at least one physical node
    pub fn shares_ancestry_with(&self, other: &PropertyPath) -> bool {
        let own: HashSet<*const PathNode> =
            self.leaf_iter().map(|node| node as *const PathNode).collect();
        other
            .leaf_iter()
            .any(|node| own.contains(&(node as *const PathNode)))
    }

    /// Path without its trailing node
    ///
    /// A single-node path yields the unnamed root path; the unnamed root
    /// yields itself.
    pub fn without_leaf(&self) -> PropertyPath {
        match self.leaf.parent() {
            Some(parent) => PropertyPath {
                leaf: Arc::clone(parent),
            },
            None if self.leaf.is_unnamed_root() => self.clone(),
            None => PropertyPath::root(),
        }
    }

    /// Append a copy of `node`'s segment after the current leaf
    pub fn append_node(&self, node: &PathNode) -> PropertyPath {
        Self::from_leaf(node.reparent(Some(Arc::clone(&self.leaf))))
    }

    pub fn append_bean_node(&self) -> PropertyPath {
        Self::from_leaf(self.child(None, ElementKind::Bean))
    }

    pub fn append_property_node(&self, name: &str) -> PropertyPath {
        Self::from_leaf(self.child(Some(name), ElementKind::Property))
    }

    pub fn append_container_element_node(&self, name: &str) -> PropertyPath {
        Self::from_leaf(self.child(Some(name), ElementKind::ContainerElement))
    }

    /// Append a method parameter node carrying `name` and `index`
    pub fn append_parameter_node(&self, name: &str, index: usize) -> PropertyPath {
        Self::from_leaf(
            self.child(Some(name), ElementKind::Parameter)
                .with_parameter_index(index),
        )
    }

    pub fn append_cross_parameter_node(&self) -> PropertyPath {
        Self::from_leaf(self.child(Some(CROSS_PARAMETER_NODE_NAME), ElementKind::CrossParameter))
    }

    pub fn append_return_value_node(&self) -> PropertyPath {
        Self::from_leaf(self.child(Some(RETURN_VALUE_NODE_NAME), ElementKind::ReturnValue))
    }

    /// Mark the leaf as an element of an unindexed container
    pub fn with_leaf_iterable(&self) -> PropertyPath {
        self.replace_leaf(|leaf| leaf.into_iterable())
    }

    /// Mark the leaf as the element at `index` of its container
    pub fn with_leaf_index(&self, index: usize) -> PropertyPath {
        self.replace_leaf(|leaf| leaf.with_index(index))
    }

    /// Mark the leaf as the element under `key` of its container
    pub fn with_leaf_key(&self, key: impl Into<NodeKey>) -> PropertyPath {
        let key = key.into();
        self.replace_leaf(move |leaf| leaf.with_key(key))
    }

    fn replace_leaf(&self, edit: impl FnOnce(PathNode) -> PathNode) -> PropertyPath {
        let leaf = self.leaf.reparent(self.leaf.parent().cloned());
        Self::from_leaf(edit(leaf))
    }
}

impl Default for PropertyPath {
    fn default() -> Self {
        Self::root()
    }
}

impl PartialEq for PropertyPath {
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        let mut left = Some(&self.leaf);
        let mut right = Some(&other.leaf);
        while let (Some(l), Some(r)) = (left, right) {
            if Arc::ptr_eq(l, r) {
                return true;
            }
            if **l != **r {
                return false;
            }
            left = l.parent();
            right = r.parent();
        }
        true
    }
}

impl Eq for PropertyPath {}

impl Hash for PropertyPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.len().hash(state);
        for node in self.leaf_iter() {
            node.hash(state);
        }
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for node in self.nodes() {
            let rendered = node.to_string();
            if rendered.is_empty() {
                continue;
            }
            if !first {
                f.write_str(".")?;
            }
            f.write_str(&rendered)?;
            first = false;
        }
        Ok(())
    }
}

impl Serialize for PropertyPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Iterator walking a path from its leaf to its root
#[derive(Debug, Clone)]
pub struct LeafToRoot<'a> {
    next: Option<&'a Arc<PathNode>>,
}

impl<'a> Iterator for LeafToRoot<'a> {
    type Item = &'a PathNode;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent();
        Some(current.as_ref())
    }
}
