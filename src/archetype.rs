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

//! Archetype storage: one bucket per distinct component-set, structure-of-arrays columns.

use std::hash::{Hash, Hasher};

use rustc_hash::FxHashMap;

use crate::bitset::Bitset;
use crate::component::BoxedComponent;
use crate::entity::EntityId;
use crate::error::{EcsError, Result};
use crate::typed_slab::TypedSlab;

/// A value being written into an archetype row: either a boxed generic component, or raw
/// scalar bytes destined for a [`TypedSlab`] column.
///
/// The source component's kind must match the target column's kind — supplying `Typed` bytes
/// for a `Boxed` column (or vice versa) is a contract violation.
pub enum ComponentValue {
    Boxed(BoxedComponent),
    Typed(Vec<u8>),
}

/// One component's storage within an archetype: either per-entity boxed values, or a flat
/// numeric slab.
pub enum Column {
    Boxed(Vec<BoxedComponent>),
    Typed(TypedSlab),
}

impl Column {
    fn len(&self) -> usize {
        match self {
            Column::Boxed(v) => v.len(),
            Column::Typed(s) => s.len(),
        }
    }

    fn push(&mut self, value: ComponentValue) -> Result<()> {
        match (self, value) {
            (Column::Boxed(v), ComponentValue::Boxed(b)) => {
                v.push(b);
                Ok(())
            }
            (Column::Typed(s), ComponentValue::Typed(bytes)) => {
                s.add(&bytes);
                Ok(())
            }
            _ => Err(EcsError::InvariantViolated(
                "component value kind does not match column kind".into(),
            )),
        }
    }

    /// Swap-removes `row`; returns true if a different row got moved into its place.
    fn swap_remove(&mut self, row: usize) -> bool {
        match self {
            Column::Boxed(v) => {
                if row >= v.len() {
                    return false;
                }
                let last = v.len() - 1;
                v.swap_remove(row);
                row != last
            }
            Column::Typed(s) => s.remove(row),
        }
    }

    /// Swap-removes `row`, returning its value. Used by archetype migration, which must carry
    /// the value into the destination archetype rather than drop it.
    fn take(&mut self, row: usize) -> (ComponentValue, bool) {
        match self {
            Column::Boxed(v) => {
                let last = v.len() - 1;
                let value = v.swap_remove(row);
                (ComponentValue::Boxed(value), row != last)
            }
            Column::Typed(s) => {
                let bytes = s.view(row).expect("row in range").to_vec();
                let moved = s.remove(row);
                (ComponentValue::Typed(bytes), moved)
            }
        }
    }
}

/// Archetype: Structure of Arrays storage for every entity sharing one component-set.
pub struct Archetype {
    mask: Bitset,
    /// Dense type-ids, in registration order; pointwise-parallel with `columns`.
    component_types: Vec<u32>,
    type_index: FxHashMap<u32, usize>,
    entities: Vec<EntityId>,
    entity_row: FxHashMap<EntityId, usize>,
    columns: Vec<Column>,
}

impl Archetype {
    /// Creates an archetype for `mask`, with one [`Column::Boxed`] or [`Column::Typed`] per
    /// entry in `component_types` (kinds chosen by the caller, in the same order).
    pub fn new(mask: Bitset, component_types: Vec<u32>, columns: Vec<Column>) -> Self {
        debug_assert_eq!(component_types.len(), columns.len());
        let type_index = component_types
            .iter()
            .enumerate()
            .map(|(i, &t)| (t, i))
            .collect();
        Self {
            mask,
            component_types,
            type_index,
            entities: Vec::new(),
            entity_row: FxHashMap::default(),
            columns,
        }
    }

    /// The empty archetype: no components, mask is all-zero.
    pub fn empty() -> Self {
        Self::new(Bitset::default(), Vec::new(), Vec::new())
    }

    pub fn mask(&self) -> &Bitset {
        &self.mask
    }

    pub fn component_types(&self) -> &[u32] {
        &self.component_types
    }

    /// Stable digest of this archetype's mask, for use as a cache/debug key.
    pub fn hash(&self) -> u64 {
        let mut hasher = rustc_hash::FxHasher::default();
        self.mask.hash(&mut hasher);
        hasher.finish()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    pub fn row_of(&self, entity: EntityId) -> Option<usize> {
        self.entity_row.get(&entity).copied()
    }

    /// Appends one entity's full row. `values.len()` must equal `component_types.len()`, each in
    /// matching order and matching boxed/typed kind; otherwise an [`EcsError::InvariantViolated`]
    /// is returned and no partial state is committed beyond the entity's own presence check.
    pub fn add_entity(&mut self, entity: EntityId, values: Vec<ComponentValue>) -> Result<usize> {
        if values.len() != self.columns.len() {
            return Err(EcsError::InvariantViolated(format!(
                "expected {} component values, got {}",
                self.columns.len(),
                values.len()
            )));
        }
        let row = self.entities.len();
        for (column, value) in self.columns.iter_mut().zip(values) {
            column.push(value)?;
        }
        self.entities.push(entity);
        self.entity_row.insert(entity, row);
        Ok(row)
    }

    /// Swap-removes `entity`'s row from every column. Returns the entity that was moved into
    /// the freed row (if any), so the caller can update that entity's stored location.
    pub fn remove_entity(&mut self, entity: EntityId) -> Option<EntityId> {
        let row = self.entity_row.remove(&entity)?;
        for column in &mut self.columns {
            column.swap_remove(row);
        }
        self.entities.swap_remove(row);
        if row < self.entities.len() {
            let moved = self.entities[row];
            self.entity_row.insert(moved, row);
            Some(moved)
        } else {
            None
        }
    }

    /// Swap-removes `entity`'s row, returning its component values (in column order) and the
    /// entity that got moved into the freed row, if any. Used for cross-archetype migration
    /// (`World::add_component`/`remove_component`), where the values must survive the move.
    pub fn take_entity(&mut self, entity: EntityId) -> Option<(Vec<ComponentValue>, Option<EntityId>)> {
        let row = self.entity_row.remove(&entity)?;
        let mut values = Vec::with_capacity(self.columns.len());
        for column in &mut self.columns {
            let (value, _moved) = column.take(row);
            values.push(value);
        }
        self.entities.swap_remove(row);
        let moved_entity = if row < self.entities.len() {
            let moved = self.entities[row];
            self.entity_row.insert(moved, row);
            Some(moved)
        } else {
            None
        };
        Some((values, moved_entity))
    }

    pub fn column_index(&self, type_id: u32) -> Option<usize> {
        self.type_index.get(&type_id).copied()
    }

    pub fn column(&self, type_id: u32) -> Option<&Column> {
        self.column_index(type_id).and_then(|i| self.columns.get(i))
    }

    pub fn column_mut(&mut self, type_id: u32) -> Option<&mut Column> {
        let idx = self.column_index(type_id)?;
        self.columns.get_mut(idx)
    }

    pub fn column_by_index(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    pub fn column_mut_by_index(&mut self, index: usize) -> Option<&mut Column> {
        self.columns.get_mut(index)
    }

    /// Reads a boxed component by type-id and row, downcast to `T`.
    pub fn get<T: 'static>(&self, type_id: u32, row: usize) -> Option<&T> {
        match self.column(type_id)? {
            Column::Boxed(v) => v.get(row)?.downcast_ref::<T>(),
            Column::Typed(_) => None,
        }
    }

    /// Mutably reads a boxed component by type-id and row, downcast to `T`.
    pub fn get_mut<T: 'static>(&mut self, type_id: u32, row: usize) -> Option<&mut T> {
        match self.column_mut(type_id)? {
            Column::Boxed(v) => v.get_mut(row)?.downcast_mut::<T>(),
            Column::Typed(_) => None,
        }
    }

    /// Live-prefix byte slice of a typed column, suitable for zero-copy GPU upload.
    pub fn typed_buffer(&self, type_id: u32) -> Option<&[u8]> {
        match self.column(type_id)? {
            Column::Typed(slab) => Some(slab.raw_bytes()),
            Column::Boxed(_) => None,
        }
    }

    /// Reserves row capacity across all columns. Boxed columns reserve their `Vec`; typed slabs
    /// grow lazily on `add` (doubling), so this is a hint only for them.
    pub fn reserve_rows(&mut self, additional: usize) {
        self.entities.reserve(additional);
        for column in &mut self.columns {
            if let Column::Boxed(v) = column {
                v.reserve(additional);
            }
        }
    }

    /// Iterates `(entity, row)` pairs in row order.
    pub fn iter_entities(&self) -> impl Iterator<Item = (EntityId, usize)> + '_ {
        self.entities.iter().copied().zip(0..)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_with(bits: &[usize]) -> Bitset {
        bits.iter().copied().collect()
    }

    #[test]
    fn add_and_remove_swap_semantics() {
        let mut arch = Archetype::new(mask_with(&[0]), vec![0], vec![Column::Boxed(Vec::new())]);
        let e0 = EntityId::make(0, 0);
        let e1 = EntityId::make(1, 0);
        let e2 = EntityId::make(2, 0);
        arch.add_entity(e0, vec![ComponentValue::Boxed(Box::new(1i32))])
            .unwrap();
        arch.add_entity(e1, vec![ComponentValue::Boxed(Box::new(2i32))])
            .unwrap();
        arch.add_entity(e2, vec![ComponentValue::Boxed(Box::new(3i32))])
            .unwrap();

        let moved = arch.remove_entity(e0);
        assert_eq!(moved, Some(e2));
        assert_eq!(arch.len(), 2);
        assert_eq!(arch.row_of(e2), Some(0));
        assert_eq!(arch.get::<i32>(0, 0), Some(&3));
    }

    #[test]
    fn mismatched_arity_is_invariant_violation() {
        let mut arch = Archetype::new(mask_with(&[0]), vec![0], vec![Column::Boxed(Vec::new())]);
        let e0 = EntityId::make(0, 0);
        let err = arch.add_entity(e0, vec![]);
        assert!(err.is_err());
    }

    #[test]
    fn typed_column_roundtrip() {
        let mut arch = Archetype::new(
            mask_with(&[0]),
            vec![0],
            vec![Column::Typed(TypedSlab::new(4, 3))],
        );
        let e0 = EntityId::make(0, 0);
        arch.add_entity(
            e0,
            vec![ComponentValue::Typed(
                bytemuck::bytes_of(&[1.0f32, 2.0, 3.0]).to_vec(),
            )],
        )
        .unwrap();
        let buf = arch.typed_buffer(0).unwrap();
        assert_eq!(buf.len(), 12);
    }

    #[test]
    fn empty_archetype_has_empty_mask() {
        let arch = Archetype::empty();
        assert!(arch.mask().is_empty());
        assert!(arch.is_empty());
    }
}
