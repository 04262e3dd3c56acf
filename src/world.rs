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

//! World: the sole mutator of entity-to-archetype mapping, and the hub that ties together the
//! entity allocator, component registry, archetype storage, resources, queries and change
//! tracking.

use std::any::{Any, TypeId};

use rustc_hash::FxHashMap;

#[cfg(feature = "profiling")]
use tracing::trace;

use crate::archetype::{Archetype, Column, ComponentValue};
use crate::bitset::Bitset;
use crate::change_tracker::ChangeTracker;
use crate::component::{Bundle, Component, ComponentRegistry};
use crate::entity::{EntityId, EntityLocation, IdAllocator};
use crate::error::{EcsError, Result};
use crate::query::{Query, QueryFilter, QueryId};

/// Central ECS world: owns every entity, archetype, resource and live query.
pub struct World {
    allocator: IdAllocator,
    registry: ComponentRegistry,
    archetypes: Vec<Archetype>,
    archetype_index: FxHashMap<Bitset, usize>,
    locations: FxHashMap<EntityId, EntityLocation>,
    resources: FxHashMap<TypeId, Box<dyn Any + Send + Sync>>,
    queries: FxHashMap<QueryId, Query>,
    next_query_id: u64,
    change_tracker: ChangeTracker,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    pub fn new() -> Self {
        let mut world = Self {
            allocator: IdAllocator::new(),
            registry: ComponentRegistry::new(),
            archetypes: Vec::new(),
            archetype_index: FxHashMap::default(),
            locations: FxHashMap::default(),
            resources: FxHashMap::default(),
            queries: FxHashMap::default(),
            next_query_id: 0,
            change_tracker: ChangeTracker::new(),
        };
        let empty_mask = Bitset::default();
        world.archetypes.push(Archetype::empty());
        world.archetype_index.insert(empty_mask, 0);
        world
    }

    /// Registers `T` if not already known, returning its dense type-id.
    pub fn register_component<T: Component>(&mut self) -> u32 {
        self.change_tracker.register_component::<T>();
        self.registry.register::<T>().0
    }

    fn mask_for(&self, type_ids: &[TypeId]) -> Bitset {
        self.registry.mask(type_ids)
    }

    fn find_or_create_archetype(&mut self, mask: Bitset, component_types: Vec<u32>) -> usize {
        if let Some(&id) = self.archetype_index.get(&mask) {
            return id;
        }
        let columns = component_types.iter().map(|_| Column::Boxed(Vec::new())).collect();
        let archetype = Archetype::new(mask.clone(), component_types, columns);
        let id = self.archetypes.len();
        self.archetypes.push(archetype);
        self.archetype_index.insert(mask.clone(), id);
        for query in self.queries.values_mut() {
            query.offer_archetype(id as u32, &mask);
        }
        id
    }

    /// Spawns a new entity with the given bundle of components.
    pub fn spawn<B: Bundle>(&mut self, bundle: B) -> EntityId {
        let entity = self
            .allocator
            .create()
            .expect("entity index space exhausted");
        let type_ids = B::type_ids();
        let component_types = B::register(&mut self.registry);
        let mask = self.mask_for(&type_ids);
        let archetype_id = self.find_or_create_archetype(mask, component_types.into_vec());
        let values: Vec<ComponentValue> = bundle
            .into_values()
            .into_iter()
            .map(ComponentValue::Boxed)
            .collect();
        let row = self.archetypes[archetype_id]
            .add_entity(entity, values)
            .expect("bundle arity matches archetype column count");
        self.locations.insert(
            entity,
            EntityLocation {
                archetype_id,
                archetype_row: row,
            },
        );
        let _ = type_ids;
        entity
    }

    /// Explicitly marks `entity`'s `T` as Added this frame. Call after `spawn`/`add_component`
    /// when change-tracking integration is desired for that concrete type.
    pub fn mark_added<T: Component>(&mut self, entity: EntityId) {
        self.change_tracker.mark_added::<T>(entity);
    }

    /// Explicitly marks `entity`'s `T` as Modified this frame.
    pub fn mark_modified<T: Component>(&mut self, entity: EntityId) {
        self.change_tracker.mark_modified::<T>(entity);
    }

    pub fn change_tracker(&self) -> &ChangeTracker {
        &self.change_tracker
    }

    pub fn change_tracker_mut(&mut self) -> &mut ChangeTracker {
        &mut self.change_tracker
    }

    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.allocator.is_live(entity)
    }

    pub fn entity_count(&self) -> u32 {
        self.allocator.live_count()
    }

    pub fn entity_iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.allocator.live_iter()
    }

    /// Despawns `entity`, removing it and its components from its archetype.
    pub fn despawn(&mut self, entity: EntityId) -> Result<()> {
        if !self.is_alive(entity) {
            return Ok(());
        }
        let location = self
            .locations
            .remove(&entity)
            .expect("live entity always has a location");
        let archetype = &mut self.archetypes[location.archetype_id];
        if let Some(moved) = archetype.remove_entity(entity) {
            if let Some(moved_location) = self.locations.get_mut(&moved) {
                moved_location.archetype_row = archetype.row_of(moved).unwrap();
            }
        }
        self.allocator.destroy(entity);
        #[cfg(feature = "profiling")]
        trace!(?entity, "despawned entity");
        Ok(())
    }

    /// Adds `component` to `entity`, migrating it into the archetype for its new mask. If `T` is
    /// already present, this overwrites the value in place without migrating.
    pub fn add_component<T: Component>(&mut self, entity: EntityId, component: T) -> Result<()> {
        if !self.is_alive(entity) {
            return Err(EcsError::InvariantViolated(format!(
                "add_component on non-live entity {entity}"
            )));
        }
        let type_id = TypeId::of::<T>();
        let (dense_id, _bit) = self.registry.register::<T>();
        let location = *self.locations.get(&entity).unwrap();
        let old_archetype = &self.archetypes[location.archetype_id];

        if old_archetype.column_index(dense_id).is_some() {
            let row = location.archetype_row;
            let archetype = &mut self.archetypes[location.archetype_id];
            if let Some(slot) = archetype.get_mut::<T>(dense_id, row) {
                *slot = component;
            }
            self.change_tracker.mark_modified::<T>(entity);
            return Ok(());
        }

        let mut new_types = old_archetype.component_types().to_vec();
        new_types.push(dense_id);
        let mask = self.mask_for(&[type_id]).union(old_archetype.mask());
        let new_archetype_id = self.find_or_create_archetype(mask, new_types);

        let (mut values, moved) = self.archetypes[location.archetype_id]
            .take_entity(entity)
            .expect("entity is present in its recorded archetype");
        if let Some(moved_entity) = moved {
            if let Some(moved_location) = self.locations.get_mut(&moved_entity) {
                moved_location.archetype_row = self.archetypes[location.archetype_id]
                    .row_of(moved_entity)
                    .unwrap();
            }
        }
        values.push(ComponentValue::Boxed(Box::new(component)));
        let row = self.archetypes[new_archetype_id]
            .add_entity(entity, values)
            .expect("migrated row matches new archetype's column count");
        self.locations.insert(
            entity,
            EntityLocation {
                archetype_id: new_archetype_id,
                archetype_row: row,
            },
        );
        self.change_tracker.mark_added::<T>(entity);
        Ok(())
    }

    /// Removes `T` from `entity`, migrating it into the archetype for its new (smaller) mask.
    /// Returns the removed value, or `None` if `entity` did not have `T`.
    pub fn remove_component<T: Component>(&mut self, entity: EntityId) -> Result<Option<T>> {
        if !self.is_alive(entity) {
            return Err(EcsError::InvariantViolated(format!(
                "remove_component on non-live entity {entity}"
            )));
        }
        let type_id = TypeId::of::<T>();
        let Some(dense_id) = self.registry.type_id::<T>() else {
            return Ok(None);
        };
        let location = *self.locations.get(&entity).unwrap();
        let old_archetype = &self.archetypes[location.archetype_id];
        let Some(removed_column_idx) = old_archetype.column_index(dense_id) else {
            return Ok(None);
        };

        let mut new_types = old_archetype.component_types().to_vec();
        new_types.remove(removed_column_idx);
        let mut new_mask = old_archetype.mask().clone();
        if let Some(bit) = self.registry.bit_index_of(type_id) {
            new_mask.clear(bit);
        }
        let new_archetype_id = self.find_or_create_archetype(new_mask, new_types);

        let (mut values, moved) = self.archetypes[location.archetype_id]
            .take_entity(entity)
            .expect("entity is present in its recorded archetype");
        if let Some(moved_entity) = moved {
            if let Some(moved_location) = self.locations.get_mut(&moved_entity) {
                moved_location.archetype_row = self.archetypes[location.archetype_id]
                    .row_of(moved_entity)
                    .unwrap();
            }
        }
        let removed_value = values.remove(removed_column_idx);
        let removed = match removed_value {
            ComponentValue::Boxed(boxed) => boxed.downcast::<T>().ok().map(|b| *b),
            ComponentValue::Typed(_) => None,
        };

        let row = self.archetypes[new_archetype_id]
            .add_entity(entity, values)
            .expect("migrated row matches new archetype's column count");
        self.locations.insert(
            entity,
            EntityLocation {
                archetype_id: new_archetype_id,
                archetype_row: row,
            },
        );
        self.change_tracker.mark_removed::<T>(entity);
        Ok(removed)
    }

    pub fn has_component<T: Component>(&self, entity: EntityId) -> bool {
        let Some(location) = self.locations.get(&entity) else {
            return false;
        };
        let Some(dense_id) = self.registry.type_id::<T>() else {
            return false;
        };
        self.archetypes[location.archetype_id]
            .column_index(dense_id)
            .is_some()
    }

    pub fn get_component<T: Component>(&self, entity: EntityId) -> Option<&T> {
        let location = self.locations.get(&entity)?;
        let dense_id = self.registry.type_id::<T>()?;
        self.archetypes[location.archetype_id].get::<T>(dense_id, location.archetype_row)
    }

    pub fn get_component_mut<T: Component>(&mut self, entity: EntityId) -> Option<&mut T> {
        let location = *self.locations.get(&entity)?;
        let dense_id = self.registry.type_id::<T>()?;
        self.archetypes[location.archetype_id].get_mut::<T>(dense_id, location.archetype_row)
    }

    pub fn insert_resource<T: Component>(&mut self, value: T) {
        self.resources.insert(TypeId::of::<T>(), Box::new(value));
    }

    pub fn get_resource<T: Component>(&self) -> Option<&T> {
        self.resources
            .get(&TypeId::of::<T>())
            .and_then(|b| b.downcast_ref::<T>())
    }

    pub fn get_resource_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.resources
            .get_mut(&TypeId::of::<T>())
            .and_then(|b| b.downcast_mut::<T>())
    }

    pub fn remove_resource<T: Component>(&mut self) -> Option<T> {
        self.resources
            .remove(&TypeId::of::<T>())
            .and_then(|b| b.downcast::<T>().ok())
            .map(|b| *b)
    }

    /// Registers a new query, seeding it with every existing matching archetype, and returns its
    /// id for later use with `for_each`/`entity_count`/`remove_query`.
    pub fn query(&mut self, filter: QueryFilter) -> QueryId {
        let mut query = Query::new(filter);
        for (id, archetype) in self.archetypes.iter().enumerate() {
            query.offer_archetype(id as u32, archetype.mask());
        }
        let id = self.next_query_id;
        self.next_query_id += 1;
        self.queries.insert(id, query);
        id
    }

    pub fn remove_query(&mut self, id: QueryId) {
        self.queries.remove(&id);
    }

    pub fn query_entity_count(&self, id: QueryId) -> usize {
        let Some(query) = self.queries.get(&id) else {
            return 0;
        };
        query
            .matching_archetypes()
            .iter()
            .map(|&a| self.archetypes[a as usize].len())
            .sum()
    }

    pub fn query_collect(&self, id: QueryId) -> Vec<EntityId> {
        let mut out = Vec::new();
        self.query_for_each(id, |entity, _values| out.push(entity));
        out
    }

    /// Iterates every entity matching `id`'s filter, in archetype-then-row order. `f` receives
    /// the entity and the boxed values of the filter's `all:` component list, in that order
    /// (`None` for any that live in a typed column, since typed storage is not `dyn Any`).
    pub fn query_for_each(&self, id: QueryId, mut f: impl FnMut(EntityId, Vec<Option<&dyn Any>>)) {
        let Some(query) = self.queries.get(&id) else {
            return;
        };
        let all = &query.filter().all;
        for &archetype_id in query.matching_archetypes() {
            let archetype = &self.archetypes[archetype_id as usize];
            for (entity, row) in archetype.iter_entities() {
                let values: Vec<Option<&dyn Any>> = all
                    .iter()
                    .map(|&type_id| match archetype.column_index(type_id) {
                        Some(idx) => match archetype.column_by_index(idx) {
                            Some(Column::Boxed(v)) => v.get(row).map(|b| b.as_ref() as &dyn Any),
                            _ => None,
                        },
                        None => None,
                    })
                    .collect();
                f(entity, values);
            }
        }
    }

    /// Same result as `query_collect`, but scans matching archetypes concurrently via rayon.
    /// Read-only, so it is safe regardless of how many archetypes match.
    #[cfg(feature = "parallel")]
    pub fn query_collect_parallel(&self, id: QueryId) -> Vec<EntityId> {
        use rayon::prelude::*;
        let Some(query) = self.queries.get(&id) else {
            return Vec::new();
        };
        query
            .matching_archetypes()
            .par_iter()
            .flat_map(|&a| self.archetypes[a as usize].entities().par_iter().copied())
            .collect()
    }

    pub fn archetype_count(&self) -> usize {
        self.archetypes.len()
    }

    /// Drops every entity, archetype (except the empty root) and resource, and clears change
    /// tracking. Registered component types and live queries are preserved.
    pub fn clear(&mut self) {
        self.allocator.clear();
        self.locations.clear();
        self.resources.clear();
        self.archetypes.clear();
        self.archetype_index.clear();
        self.archetypes.push(Archetype::empty());
        self.archetype_index.insert(Bitset::default(), 0);
        for query in self.queries.values_mut() {
            *query = Query::new(query.filter().clone());
        }
        self.change_tracker.clear_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Velocity {
        dx: f32,
    }

    #[test]
    fn spawn_and_get_component() {
        let mut world = World::new();
        let e = world.spawn((Position { x: 1.0, y: 2.0 },));
        assert!(world.is_alive(e));
        assert_eq!(world.get_component::<Position>(e), Some(&Position { x: 1.0, y: 2.0 }));
    }

    #[test]
    fn despawn_removes_entity_and_frees_index() {
        let mut world = World::new();
        let e = world.spawn((Position { x: 0.0, y: 0.0 },));
        world.despawn(e).unwrap();
        assert!(!world.is_alive(e));
        assert_eq!(world.get_component::<Position>(e), None);
    }

    #[test]
    fn add_component_migrates_into_new_archetype() {
        let mut world = World::new();
        let e = world.spawn((Position { x: 1.0, y: 1.0 },));
        world.add_component(e, Velocity { dx: 5.0 }).unwrap();
        assert_eq!(world.get_component::<Velocity>(e), Some(&Velocity { dx: 5.0 }));
        assert_eq!(world.get_component::<Position>(e), Some(&Position { x: 1.0, y: 1.0 }));
    }

    #[test]
    fn remove_component_migrates_out_and_returns_value() {
        let mut world = World::new();
        let e = world.spawn((Position { x: 1.0, y: 1.0 }, Velocity { dx: 5.0 }));
        let removed = world.remove_component::<Velocity>(e).unwrap();
        assert_eq!(removed, Some(Velocity { dx: 5.0 }));
        assert!(!world.has_component::<Velocity>(e));
        assert!(world.has_component::<Position>(e));
    }

    #[test]
    fn query_matches_entities_with_all_filter_components() {
        let mut world = World::new();
        let e1 = world.spawn((Position { x: 0.0, y: 0.0 }, Velocity { dx: 1.0 }));
        let _e2 = world.spawn((Position { x: 0.0, y: 0.0 },));
        let pos_id = world.register_component::<Position>();
        let vel_id = world.register_component::<Velocity>();
        let query = world.query(QueryFilter::new().all(&[pos_id, vel_id]));
        let matched = world.query_collect(query);
        assert_eq!(matched, vec![e1]);
    }

    #[test]
    fn resources_roundtrip() {
        let mut world = World::new();
        world.insert_resource(42u32);
        assert_eq!(world.get_resource::<u32>(), Some(&42));
        assert_eq!(world.remove_resource::<u32>(), Some(42));
        assert_eq!(world.get_resource::<u32>(), None);
    }

    #[test]
    fn clear_resets_entities_but_not_resources_api() {
        let mut world = World::new();
        let e = world.spawn((Position { x: 0.0, y: 0.0 },));
        world.clear();
        assert!(!world.is_alive(e));
        assert_eq!(world.entity_count(), 0);
    }
}
