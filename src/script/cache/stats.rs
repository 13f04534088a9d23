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

//! Evaluator cache statistics collection

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters describing how an evaluator cache has been used
#[derive(Debug, Default)]
pub struct CacheStatistics {
    hits: AtomicU64,
    misses: AtomicU64,
    creations: AtomicU64,
    failures: AtomicU64,
    discarded: AtomicU64,
}

impl CacheStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a lookup answered from the cache
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a lookup that had to invoke the creation hook
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful evaluator creation
    pub fn record_creation(&self) {
        self.creations.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed evaluator creation
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a created evaluator that lost the insert race and was dropped
    pub fn record_discarded(&self) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn creations(&self) -> u64 {
        self.creations.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn discarded(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }

    /// Get total number of lookups
    pub fn total_lookups(&self) -> u64 {
        self.hits() + self.misses()
    }

    /// Get cache hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.total_lookups();
        if total == 0 {
            0.0
        } else {
            self.hits() as f64 / total as f64
        }
    }

    /// Reset all counters to zero
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.creations.store(0, Ordering::Relaxed);
        self.failures.store(0, Ordering::Relaxed);
        self.discarded.store(0, Ordering::Relaxed);
    }

    /// Get a summary string of cache statistics
    pub fn summary(&self) -> String {
        format!(
            "Evaluator cache: hits={}, misses={}, created={}, failed={}, discarded={}, hit_rate={:.2}%",
            self.hits(),
            self.misses(),
            self.creations(),
            self.failures(),
            self.discarded(),
            self.hit_rate() * 100.0
        )
    }
}
