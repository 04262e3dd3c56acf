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

//! Cross-cutting invariants that don't fit neatly into a single module's unit tests.

use realtime_ecs::{CommandBuffer, QueryFilter, World};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Velocity {
    dx: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Health(i32);

/// Every other component on an entity survives an `add_component` migration unchanged.
#[test]
fn migration_preserves_untouched_components() {
    let mut world = World::new();
    let e = world.spawn((Position { x: 1.0, y: 2.0 }, Health(50)));
    world.add_component(e, Velocity { dx: 3.0 }).unwrap();

    assert_eq!(world.get_component::<Position>(e), Some(&Position { x: 1.0, y: 2.0 }));
    assert_eq!(world.get_component::<Health>(e), Some(&Health(50)));
    assert_eq!(world.get_component::<Velocity>(e), Some(&Velocity { dx: 3.0 }));
}

/// And likewise across a `remove_component` migration.
#[test]
fn migration_preserves_components_after_removal() {
    let mut world = World::new();
    let e = world.spawn((Position { x: 1.0, y: 2.0 }, Velocity { dx: 3.0 }, Health(50)));
    world.remove_component::<Velocity>(e).unwrap();

    assert_eq!(world.get_component::<Position>(e), Some(&Position { x: 1.0, y: 2.0 }));
    assert_eq!(world.get_component::<Health>(e), Some(&Health(50)));
    assert!(!world.has_component::<Velocity>(e));
}

/// A swap-remove during despawn must not corrupt the entity that gets moved into the vacated row.
#[test]
fn despawn_mid_archetype_preserves_the_swapped_entity() {
    let mut world = World::new();
    let e0 = world.spawn((Position { x: 0.0, y: 0.0 },));
    let e1 = world.spawn((Position { x: 1.0, y: 1.0 },));
    let e2 = world.spawn((Position { x: 2.0, y: 2.0 },));

    world.despawn(e0).unwrap();

    assert!(world.is_alive(e1));
    assert!(world.is_alive(e2));
    assert_eq!(world.get_component::<Position>(e1), Some(&Position { x: 1.0, y: 1.0 }));
    assert_eq!(world.get_component::<Position>(e2), Some(&Position { x: 2.0, y: 2.0 }));
}

/// A query created before new matching entities exist still picks them up once their archetype
/// is created (membership is evaluated live off `matching_archetypes`, not snapshotted).
#[test]
fn query_sees_entities_created_after_registration() {
    let mut world = World::new();
    let pos_id = world.register_component::<Position>();
    let query = world.query(QueryFilter::new().all(&[pos_id]));
    assert_eq!(world.query_entity_count(query), 0);

    let e = world.spawn((Position { x: 0.0, y: 0.0 },));
    assert_eq!(world.query_collect(query), vec![e]);
}

/// Re-registering an already-known component type returns the same dense id both times.
#[test]
fn component_registration_is_idempotent_through_world() {
    let mut world = World::new();
    let first = world.register_component::<Position>();
    let second = world.register_component::<Position>();
    assert_eq!(first, second);
}

/// Replaying the same command sequence against a fresh world yields the same resulting entity
/// count and liveness shape, even though the concrete `EntityId`s differ.
#[test]
fn command_buffer_structure_is_idempotent_across_worlds() {
    let run = || {
        let mut world = World::new();
        let mut buffer = CommandBuffer::new();
        buffer.spawn((Position { x: 0.0, y: 0.0 },)).unwrap();
        buffer.spawn((Position { x: 1.0, y: 1.0 },)).unwrap();
        buffer.apply(&mut world).unwrap();
        world.entity_count()
    };
    assert_eq!(run(), run());
}

/// `clear_all` leaves the tracker with zero marks across every registered type.
#[test]
fn change_tracker_clear_all_is_disjoint_from_prior_marks() {
    let mut world = World::new();
    let e = world.spawn((Position { x: 0.0, y: 0.0 },));
    world.mark_added::<Position>(e);
    assert!(world.change_tracker().has_any_change(e));

    world.change_tracker_mut().clear_all();
    assert!(!world.change_tracker().has_any_change(e));
    assert_eq!(world.change_tracker().change_count(&[]), 0);
}
