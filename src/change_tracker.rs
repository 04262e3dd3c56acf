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

//! Frame-scoped change detection: per-(entity, component-type) Added/Modified/Removed marks.

use std::any::TypeId;

use rustc_hash::FxHashMap;

use crate::entity::EntityId;
use crate::sparse::SparseSet;

/// Bitmask of change kinds, for querying `has_changed`/`changed_entities`.
pub mod kind {
    pub const ADDED: u8 = 0b001;
    pub const MODIFIED: u8 = 0b010;
    pub const REMOVED: u8 = 0b100;
    pub const ANY: u8 = ADDED | MODIFIED | REMOVED;
}

#[derive(Default)]
struct PerTypeMarks {
    added: SparseSet,
    modified: SparseSet,
    removed: SparseSet,
}

impl PerTypeMarks {
    fn set_for(&mut self, k: u8) -> &mut SparseSet {
        match k {
            kind::ADDED => &mut self.added,
            kind::MODIFIED => &mut self.modified,
            kind::REMOVED => &mut self.removed,
            _ => unreachable!("single-kind mark expected"),
        }
    }

    fn matches(&self, entity: EntityId, kinds: u8) -> bool {
        (kinds & kind::ADDED != 0 && self.added.contains(entity))
            || (kinds & kind::MODIFIED != 0 && self.modified.contains(entity))
            || (kinds & kind::REMOVED != 0 && self.removed.contains(entity))
    }

    fn entities(&self, kinds: u8) -> Vec<EntityId> {
        let mut out = Vec::new();
        if kinds & kind::ADDED != 0 {
            out.extend(self.added.iter());
        }
        if kinds & kind::MODIFIED != 0 {
            out.extend(self.modified.iter());
        }
        if kinds & kind::REMOVED != 0 {
            out.extend(self.removed.iter());
        }
        out
    }

    fn count(&self) -> u32 {
        (self.added.len() + self.modified.len() + self.removed.len()) as u32
    }

    fn clear(&mut self) {
        self.added.clear();
        self.modified.clear();
        self.removed.clear();
    }
}

/// Per-frame record of Added/Modified/Removed marks, keyed by `(entity, component-type)`.
///
/// Marks persist only until the next [`ChangeTracker::clear_all`] — the single sanctioned frame
/// boundary. Callers must not rely on marks surviving across it.
#[derive(Default)]
pub struct ChangeTracker {
    by_type: FxHashMap<TypeId, PerTypeMarks>,
    /// Reverse index: which types changed for a given entity, for `changed_components`.
    entity_types: FxHashMap<EntityId, Vec<TypeId>>,
    frame: u64,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent; ensures a per-type mark table exists.
    pub fn register_component<T: 'static>(&mut self) {
        self.by_type.entry(TypeId::of::<T>()).or_default();
    }

    fn mark<T: 'static>(&mut self, entity: EntityId, which: u8) {
        let type_id = TypeId::of::<T>();
        let marks = self.by_type.entry(type_id).or_default();
        marks.set_for(which).insert(entity);
        let types = self.entity_types.entry(entity).or_default();
        if !types.contains(&type_id) {
            types.push(type_id);
        }
    }

    pub fn mark_added<T: 'static>(&mut self, entity: EntityId) {
        self.mark::<T>(entity, kind::ADDED);
    }

    pub fn mark_modified<T: 'static>(&mut self, entity: EntityId) {
        self.mark::<T>(entity, kind::MODIFIED);
    }

    pub fn mark_removed<T: 'static>(&mut self, entity: EntityId) {
        self.mark::<T>(entity, kind::REMOVED);
    }

    pub fn has_changed<T: 'static>(&self, entity: EntityId, kinds: u8) -> bool {
        self.by_type
            .get(&TypeId::of::<T>())
            .map(|m| m.matches(entity, kinds))
            .unwrap_or(false)
    }

    pub fn has_any_change(&self, entity: EntityId) -> bool {
        self.entity_types
            .get(&entity)
            .map(|types| !types.is_empty())
            .unwrap_or(false)
    }

    pub fn changed_entities<T: 'static>(&self, kinds: u8) -> Vec<EntityId> {
        self.by_type
            .get(&TypeId::of::<T>())
            .map(|m| m.entities(kinds))
            .unwrap_or_default()
    }

    pub fn changed_components(&self, entity: EntityId) -> Vec<TypeId> {
        self.entity_types.get(&entity).cloned().unwrap_or_default()
    }

    /// Sum of marks (all kinds) across the given types; all registered types if `types` is empty.
    pub fn change_count(&self, types: &[TypeId]) -> u32 {
        if types.is_empty() {
            self.by_type.values().map(PerTypeMarks::count).sum()
        } else {
            types
                .iter()
                .filter_map(|t| self.by_type.get(t))
                .map(PerTypeMarks::count)
                .sum()
        }
    }

    /// Drops all marks and bumps the frame counter. The counter tracks calls to `clear_all`, not
    /// wall-clock time.
    pub fn clear_all(&mut self) {
        for marks in self.by_type.values_mut() {
            marks.clear();
        }
        self.entity_types.clear();
        self.frame += 1;
    }

    pub fn clear_component<T: 'static>(&mut self) {
        if let Some(marks) = self.by_type.get_mut(&TypeId::of::<T>()) {
            marks.clear();
        }
    }

    pub fn clear_entity(&mut self, entity: EntityId) {
        if let Some(types) = self.entity_types.remove(&entity) {
            for t in types {
                if let Some(marks) = self.by_type.get_mut(&t) {
                    marks.added.remove(entity);
                    marks.modified.remove(entity);
                    marks.removed.remove(entity);
                }
            }
        }
    }

    pub fn current_frame(&self) -> u64 {
        self.frame
    }
}
