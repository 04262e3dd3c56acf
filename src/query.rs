// Copyright 2024 Saptak Santra
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

//! Runtime `{all, any, none}` component queries, cached per archetype.

use smallvec::SmallVec;

use crate::bitset::Bitset;

const MAX_FILTER_COMPONENTS: usize = 8;

/// A runtime query filter over dense component type-ids.
///
/// An archetype matches if it carries every id in `all`, at least one id in `any` (when `any` is
/// non-empty), and none of the ids in `none`.
#[derive(Clone, Default)]
pub struct QueryFilter {
    pub(crate) all: SmallVec<[u32; MAX_FILTER_COMPONENTS]>,
    pub(crate) any: SmallVec<[u32; MAX_FILTER_COMPONENTS]>,
    pub(crate) none: SmallVec<[u32; MAX_FILTER_COMPONENTS]>,
}

impl QueryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(mut self, ids: &[u32]) -> Self {
        self.all.extend_from_slice(ids);
        self
    }

    pub fn any(mut self, ids: &[u32]) -> Self {
        self.any.extend_from_slice(ids);
        self
    }

    pub fn none(mut self, ids: &[u32]) -> Self {
        self.none.extend_from_slice(ids);
        self
    }

    pub fn matches(&self, mask: &Bitset) -> bool {
        if !self.all.iter().all(|&id| mask.contains(id as usize)) {
            return false;
        }
        if !self.any.is_empty() && !self.any.iter().any(|&id| mask.contains(id as usize)) {
            return false;
        }
        if self.none.iter().any(|&id| mask.contains(id as usize)) {
            return false;
        }
        true
    }
}

/// A query id, stable for the lifetime of the registration.
pub type QueryId = u64;

/// A live query: a filter plus the archetypes (by index into `World`'s archetype table) known to
/// match it so far.
///
/// New archetypes are offered once, at creation time (via [`Query::offer_archetype`]), which is
/// the incremental-cache idiom this is grounded on: matching is never recomputed from scratch.
pub struct Query {
    filter: QueryFilter,
    matching_archetypes: Vec<u32>,
}

impl Query {
    pub fn new(filter: QueryFilter) -> Self {
        Self {
            filter,
            matching_archetypes: Vec::new(),
        }
    }

    pub fn filter(&self) -> &QueryFilter {
        &self.filter
    }

    pub fn matching_archetypes(&self) -> &[u32] {
        &self.matching_archetypes
    }

    /// Checks a newly created archetype against the filter; records it if it matches.
    pub fn offer_archetype(&mut self, archetype_id: u32, mask: &Bitset) {
        if self.filter.matches(mask) {
            self.matching_archetypes.push(archetype_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_with(bits: &[usize]) -> Bitset {
        bits.iter().copied().collect()
    }

    #[test]
    fn all_filter_requires_every_id() {
        let filter = QueryFilter::new().all(&[0, 1]);
        assert!(filter.matches(&mask_with(&[0, 1, 2])));
        assert!(!filter.matches(&mask_with(&[0])));
    }

    #[test]
    fn any_filter_requires_at_least_one() {
        let filter = QueryFilter::new().any(&[0, 1]);
        assert!(filter.matches(&mask_with(&[1])));
        assert!(!filter.matches(&mask_with(&[2])));
    }

    #[test]
    fn none_filter_excludes_matches() {
        let filter = QueryFilter::new().all(&[0]).none(&[1]);
        assert!(!filter.matches(&mask_with(&[0, 1])));
        assert!(filter.matches(&mask_with(&[0])));
    }

    #[test]
    fn offer_archetype_records_only_matches() {
        let mut query = Query::new(QueryFilter::new().all(&[0]));
        query.offer_archetype(0, &mask_with(&[0]));
        query.offer_archetype(1, &mask_with(&[1]));
        assert_eq!(query.matching_archetypes(), &[0]);
    }
}
