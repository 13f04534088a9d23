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

//! Constraint metadata and time sources handed to validator contexts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Metadata of the constraint being validated
///
/// Only the message template is read by validator contexts; everything
/// else is carried for the constraint implementation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintDescriptor {
    name: String,
    message_template: String,
    #[serde(default)]
    attributes: Map<String, Value>,
}

impl ConstraintDescriptor {
    pub fn new(name: impl Into<String>, message_template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message_template: message_template.into(),
            attributes: Map::new(),
        }
    }

    /// Attach a constraint attribute such as `lang` or `script`
    pub fn with_attribute(mut self, name: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn message_template(&self) -> &str {
        &self.message_template
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }
}

/// Source of the current time for temporal constraints
pub trait ClockProvider: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClockProvider;

impl ClockProvider for SystemClockProvider {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClockProvider(DateTime<Utc>);

impl FixedClockProvider {
    pub fn new(instant: DateTime<Utc>) -> Self {
        Self(instant)
    }
}

impl ClockProvider for FixedClockProvider {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
