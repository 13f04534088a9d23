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

//! Parsing of dotted property path strings such as `order.lines[2].quantity`

use super::{NodeKey, PropertyPath};
use crate::error::{Result, ValidationError};
use once_cell::sync::Lazy;
use regex::Regex;
use std::str::FromStr;

static SEGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z_$][A-Za-z0-9_$]*)(?:\[([^\[\]]*)\])?$")
        .expect("property path segment pattern is valid")
});

static CANONICAL_INTEGER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:0|-?[1-9][0-9]*)$").expect("integer selector pattern is valid")
});

impl PropertyPath {
    /// Build a property path below the unnamed root from its string form
    ///
    /// Segments are separated by `.`; a segment may carry `[n]` (index),
    /// `[key]` (map key) or `[]` (unindexed container element). The empty
    /// string yields the root path.
    ///
    /// A selector in canonical integer form is an index when non-negative
    /// and an integer key when negative; anything else, including `[007]`,
    /// is a text key. Non-negative integer keys therefore read back as
    /// indexes, and text keys containing `.`, `[` or `]` have no string form
    /// this parser accepts.
    pub fn parse(input: &str) -> Result<PropertyPath> {
        let mut path = PropertyPath::root();
        if input.is_empty() {
            return Ok(path);
        }

        let mut offset = 0;
        for segment in input.split('.') {
            let captures = SEGMENT
                .captures(segment)
                .ok_or_else(|| ValidationError::InvalidPath {
                    path: input.to_string(),
                    position: offset,
                })?;

            path = path.append_property_node(&captures[1]);
            if let Some(selector) = captures.get(2) {
                path = apply_selector(path, selector.as_str());
            }
            offset += segment.len() + 1;
        }

        Ok(path)
    }
}

fn apply_selector(path: PropertyPath, raw: &str) -> PropertyPath {
    if raw.is_empty() {
        return path.with_leaf_iterable();
    }
    if CANONICAL_INTEGER.is_match(raw) {
        if let Ok(index) = raw.parse::<usize>() {
            return path.with_leaf_index(index);
        }
        if let Ok(key) = raw.parse::<i64>() {
            return path.with_leaf_key(NodeKey::Integer(key));
        }
    }
    path.with_leaf_key(NodeKey::Text(raw.to_string()))
}

impl FromStr for PropertyPath {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self> {
        PropertyPath::parse(s)
    }
}
