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

//! End-to-end scenarios spanning World, Query, CommandBuffer, SystemScheduler, GpuBufferSync and
//! RenderDataStore together.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use realtime_ecs::gpu::{usage, GpuBuffer, GpuBufferSync, GpuDevice};
use realtime_ecs::render::RenderDataStore;
use realtime_ecs::scheduler::{ErrorPolicy, Stage, SystemScheduler};
use realtime_ecs::{QueryFilter, Result, World};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Position {
    x: f32,
    y: f32,
    z: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Velocity {
    x: f32,
    y: f32,
    z: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Health {
    current: i32,
    max: i32,
}

/// Scenario A — basic query.
#[test]
fn scenario_a_basic_query() {
    let mut world = World::new();
    let _e1 = world.spawn((Position { x: 1.0, y: 0.0, z: 0.0 },));
    let e2 = world.spawn((
        Position { x: 2.0, y: 0.0, z: 0.0 },
        Velocity { x: 1.0, y: 0.0, z: 0.0 },
    ));
    let _e3 = world.spawn((Velocity { x: 1.0, y: 0.0, z: 0.0 },));

    let pos_id = world.register_component::<Position>();
    let vel_id = world.register_component::<Velocity>();
    let query = world.query(QueryFilter::new().all(&[pos_id, vel_id]));

    let matched = world.query_collect(query);
    assert_eq!(matched, vec![e2]);

    let mut values = Vec::new();
    world.query_for_each(query, |entity, payload| {
        let position = payload[0].unwrap().downcast_ref::<Position>().unwrap();
        let velocity = payload[1].unwrap().downcast_ref::<Velocity>().unwrap();
        values.push((entity, *position, *velocity));
    });
    assert_eq!(values.len(), 1);
    assert_eq!(values[0].0, e2);
    assert_eq!(values[0].1, Position { x: 2.0, y: 0.0, z: 0.0 });
    assert_eq!(values[0].2, Velocity { x: 1.0, y: 0.0, z: 0.0 });
}

/// Scenario B — migration chain.
#[test]
fn scenario_b_migration_chain() {
    let mut world = World::new();
    let e = world.spawn((Position { x: 10.0, y: 0.0, z: 0.0 },));
    world.add_component(e, Velocity { x: 1.0, y: 0.0, z: 0.0 }).unwrap();
    world
        .add_component(e, Health { current: 100, max: 100 })
        .unwrap();
    world.remove_component::<Velocity>(e).unwrap();

    assert_eq!(world.get_component::<Position>(e), Some(&Position { x: 10.0, y: 0.0, z: 0.0 }));
    assert_eq!(world.get_component::<Health>(e), Some(&Health { current: 100, max: 100 }));
    assert!(!world.has_component::<Velocity>(e));
    assert!(world.has_component::<Position>(e));
    assert!(world.has_component::<Health>(e));
}

/// Scenario C — command buffer reuse.
#[test]
fn scenario_c_command_buffer_reuse() {
    let mut world = World::new();
    let mut buffer = realtime_ecs::CommandBuffer::new();

    let e1_slot: Arc<Mutex<Option<realtime_ecs::EntityId>>> = Arc::new(Mutex::new(None));
    let e1_slot_write = e1_slot.clone();
    buffer
        .spawn_with(move |world| {
            let e = world.spawn((Position { x: 0.0, y: 0.0, z: 0.0 },));
            *e1_slot_write.lock().unwrap() = Some(e);
            Ok(e)
        })
        .unwrap();
    buffer.apply(&mut world).unwrap();
    let e1 = e1_slot.lock().unwrap().unwrap();
    assert!(world.is_alive(e1));

    buffer.clear();
    let e2_slot: Arc<Mutex<Option<realtime_ecs::EntityId>>> = Arc::new(Mutex::new(None));
    let e2_slot_write = e2_slot.clone();
    buffer
        .spawn_with(move |world| {
            let e = world.spawn((Position { x: 0.0, y: 0.0, z: 0.0 },));
            *e2_slot_write.lock().unwrap() = Some(e);
            Ok(e)
        })
        .unwrap();
    buffer.despawn(e1).unwrap();
    buffer.apply(&mut world).unwrap();
    let e2 = e2_slot.lock().unwrap().unwrap();

    assert!(world.is_alive(e2));
    assert!(!world.is_alive(e1));
    assert_eq!(world.entity_count(), 1);
}

/// Scenario D — scheduler order.
#[test]
fn scenario_d_scheduler_order() {
    let mut scheduler = SystemScheduler::new();
    let mut world = World::new();
    let log = Arc::new(Mutex::new(Vec::new()));

    for (name, after) in [("A", &[][..]), ("B", &["A"][..]), ("C", &["B"][..])] {
        let log = log.clone();
        let name_owned = name.to_string();
        scheduler.add_system(
            &mut world,
            name,
            Stage::Update,
            0,
            after,
            None,
            None,
            Box::new(move |_ctx, _query| {
                log.lock().unwrap().push(name_owned.clone());
                Ok(())
            }),
        );
    }

    scheduler.update(&mut world, 0.016).unwrap();
    scheduler.update(&mut world, 0.016).unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["A", "B", "C", "A", "B", "C"]);
    assert_eq!(scheduler.frame_count(), 2);
    assert!((scheduler.total_time() - 0.032).abs() < 1e-6);
}

/// Scenario E — priority vs after.
#[test]
fn scenario_e_priority_vs_after() {
    let mut scheduler = SystemScheduler::new();
    let mut world = World::new();
    let log = Arc::new(Mutex::new(Vec::new()));

    let log_a = log.clone();
    scheduler.add_system(
        &mut world,
        "A",
        Stage::Update,
        10,
        &[],
        None,
        None,
        Box::new(move |_, _| {
            log_a.lock().unwrap().push("A");
            Ok(())
        }),
    );
    let log_b = log.clone();
    scheduler.add_system(
        &mut world,
        "B",
        Stage::Update,
        5,
        &[],
        None,
        None,
        Box::new(move |_, _| {
            log_b.lock().unwrap().push("B");
            Ok(())
        }),
    );
    let log_c = log.clone();
    scheduler.add_system(
        &mut world,
        "C",
        Stage::Update,
        0,
        &["A"],
        None,
        None,
        Box::new(move |_, _| {
            log_c.lock().unwrap().push("C");
            Ok(())
        }),
    );

    scheduler.update(&mut world, 0.016).unwrap();
    let order = log.lock().unwrap().clone();
    let a_pos = order.iter().position(|s| *s == "A").unwrap();
    let b_pos = order.iter().position(|s| *s == "B").unwrap();
    let c_pos = order.iter().position(|s| *s == "C").unwrap();
    assert!(b_pos < c_pos);
    assert!(a_pos < c_pos);
}

/// Scenario D/E's error resilience counterpart: an `after` cycle must not abort `update` under
/// the default `Continue` policy.
#[test]
fn scheduler_cycle_does_not_abort_update() {
    let mut scheduler = SystemScheduler::new();
    let mut world = World::new();
    scheduler.set_error_policy(ErrorPolicy::Continue);
    scheduler.add_system(&mut world, "x", Stage::Update, 0, &["y"], None, None, Box::new(|_, _| Ok(())));
    scheduler.add_system(&mut world, "y", Stage::Update, 0, &["x"], None, None, Box::new(|_, _| Ok(())));
    assert!(scheduler.update(&mut world, 0.016).is_ok());
}

struct TestBuffer {
    size: usize,
}
impl GpuBuffer for TestBuffer {
    fn size(&self) -> usize {
        self.size
    }
}

struct TestDevice {
    uploaded_ranges: Arc<Mutex<Vec<(usize, usize)>>>,
    created: Arc<AtomicUsize>,
}
impl GpuDevice for TestDevice {
    fn create_buffer(&self, _label: &str, size: usize, _usage: u32) -> Result<Box<dyn GpuBuffer>> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(TestBuffer { size }))
    }
    fn update(&self, _buffer: &mut dyn GpuBuffer, offset: usize, data: &[u8]) -> Result<()> {
        self.uploaded_ranges.lock().unwrap().push((offset, offset + data.len()));
        Ok(())
    }
    fn destroy(&self, _buffer: Box<dyn GpuBuffer>) -> Result<()> {
        Ok(())
    }
}

/// Scenario F — GPU sync merge.
#[test]
fn scenario_f_gpu_sync_merge() {
    let mut gpu = GpuBufferSync::new();
    let uploads = Arc::new(Mutex::new(Vec::new()));
    gpu.initialize(Box::new(TestDevice {
        uploaded_ranges: uploads.clone(),
        created: Arc::new(AtomicUsize::new(0)),
    }));
    gpu.register_storage("s", usage::STORAGE);
    gpu.update_source("s", 0, &vec![0u8; 400]).unwrap();
    assert!(gpu.sync("s").unwrap() > 0);
    uploads.lock().unwrap().clear();

    gpu.mark_dirty("s", 0, 64).unwrap();
    gpu.mark_dirty("s", 32, 64).unwrap();
    assert_eq!(gpu.dirty_region_count("s"), Some(1));

    gpu.sync("s").unwrap();
    assert_eq!(*uploads.lock().unwrap(), vec![(0, 96)]);
}

/// Scenario G — world matrix hierarchy.
#[test]
fn scenario_g_world_matrix_hierarchy() {
    let mut world = World::new();
    let p = world.spawn((Position { x: 0.0, y: 0.0, z: 0.0 },));
    let c = world.spawn((Position { x: 0.0, y: 0.0, z: 0.0 },));

    let mut store = RenderDataStore::new("scene", 8, false, false);
    let p_slot = store.allocate(p);
    let c_slot = store.allocate(c);
    store.set_parent(c_slot, p_slot);
    store.set_position(p_slot, glam::Vec3::new(1.0, 0.0, 0.0));
    store.set_position(c_slot, glam::Vec3::new(0.0, 1.0, 0.0));

    store.update_world_matrices();

    let translation = store.world_matrix(c_slot).unwrap().w_axis;
    assert_eq!((translation.x, translation.y, translation.z), (1.0, 1.0, 0.0));
}
