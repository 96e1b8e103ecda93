/*
 *  tracker.rs
 *
 *  statmon - host vitals at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Last rendered value per metric
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::collections::HashMap;

use crate::metrics::Sample;

/// Remembers what each metric showed when it was last drawn.
///
/// Only [`commit`](ChangeTracker::commit) mutates; a metric that failed to
/// draw keeps its old value and shows up in the next diff again.
#[derive(Debug, Default, Clone)]
pub struct ChangeTracker {
    last: HashMap<String, String>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Samples whose value differs from the last committed one, in input order
    pub fn diff<'a>(&self, samples: &'a [Sample]) -> Vec<&'a Sample> {
        samples
            .iter()
            .filter(|s| self.last.get(&s.name) != Some(&s.value))
            .collect()
    }

    /// Record `sample` as drawn
    pub fn commit(&mut self, sample: &Sample) {
        match self.last.get_mut(&sample.name) {
            Some(v) => v.clone_from(&sample.value),
            None => {
                self.last.insert(sample.name.clone(), sample.value.clone());
            }
        }
    }

    pub fn last(&self, name: &str) -> Option<&str> {
        self.last.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.last.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last.is_empty()
    }
}
