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

//! Flat, slot-indexed render data (transforms, colors, custom fields) for GPU-driven rendering.
//! Distinct from the ECS archetype storage: entities opt in by allocating a slot, and the store
//! mirrors itself to the GPU through [`GpuBufferSync`] rather than being queried through `World`.

use glam::{EulerRot, Mat4, Quat, Vec3};
use rustc_hash::FxHashMap;

#[cfg(feature = "profiling")]
use tracing::warn;

use crate::entity::EntityId;
use crate::error::Result;
use crate::gpu::{usage, GpuBufferSync, GpuDevice};

const MAX_HIERARCHY_ITERATIONS: usize = 100;
const DEFAULT_CAPACITY: usize = 64;
/// Sentinel parent slot meaning "no parent".
pub const NO_PARENT: i32 = -1;

struct CustomField {
    stride: usize,
    values: Vec<f32>,
    gpu_sync: bool,
}

/// Per-entity transform and color data, indexed by a stable slot assigned on [`allocate`].
///
/// [`allocate`]: RenderDataStore::allocate
pub struct RenderDataStore {
    label: String,
    capacity: usize,
    free_list: Vec<u32>,
    slot_of_entity: FxHashMap<EntityId, u32>,
    entity_of_slot: Vec<Option<EntityId>>,
    positions: Vec<Vec3>,
    rotations: Vec<Quat>,
    scales: Vec<Vec3>,
    colors: Vec<[f32; 4]>,
    parents: Vec<i32>,
    local_matrices: Vec<Mat4>,
    world_matrices: Vec<Mat4>,
    dirty: Vec<bool>,
    custom_fields: FxHashMap<String, CustomField>,
    change_detection: bool,
    added_this_frame: Vec<EntityId>,
    removed_this_frame: Vec<EntityId>,
    gpu_enabled: bool,
    gpu: GpuBufferSync,
}

impl Default for RenderDataStore {
    fn default() -> Self {
        Self::new("render", DEFAULT_CAPACITY, true, true)
    }
}

impl RenderDataStore {
    pub fn new(label: &str, initial_capacity: usize, enable_change_detection: bool, enable_gpu_sync: bool) -> Self {
        let capacity = initial_capacity.max(1);
        Self {
            label: label.to_string(),
            capacity,
            free_list: (0..capacity as u32).rev().collect(),
            slot_of_entity: FxHashMap::default(),
            entity_of_slot: vec![None; capacity],
            positions: vec![Vec3::ZERO; capacity],
            rotations: vec![Quat::IDENTITY; capacity],
            scales: vec![Vec3::ONE; capacity],
            colors: vec![[1.0, 1.0, 1.0, 1.0]; capacity],
            parents: vec![NO_PARENT; capacity],
            local_matrices: vec![Mat4::IDENTITY; capacity],
            world_matrices: vec![Mat4::IDENTITY; capacity],
            dirty: vec![true; capacity],
            custom_fields: FxHashMap::default(),
            change_detection: enable_change_detection,
            added_this_frame: Vec::new(),
            removed_this_frame: Vec::new(),
            gpu_enabled: enable_gpu_sync,
            gpu: GpuBufferSync::new(),
        }
    }

    fn grow_to(&mut self, new_capacity: usize) {
        let old_capacity = self.capacity;
        self.entity_of_slot.resize(new_capacity, None);
        self.positions.resize(new_capacity, Vec3::ZERO);
        self.rotations.resize(new_capacity, Quat::IDENTITY);
        self.scales.resize(new_capacity, Vec3::ONE);
        self.colors.resize(new_capacity, [1.0, 1.0, 1.0, 1.0]);
        self.parents.resize(new_capacity, NO_PARENT);
        self.local_matrices.resize(new_capacity, Mat4::IDENTITY);
        self.world_matrices.resize(new_capacity, Mat4::IDENTITY);
        self.dirty.resize(new_capacity, true);
        for field in self.custom_fields.values_mut() {
            field.values.resize(new_capacity * field.stride, 0.0);
        }
        for slot in (old_capacity..new_capacity).rev() {
            self.free_list.push(slot as u32);
        }
        self.capacity = new_capacity;
    }

    /// Assigns a slot to `entity`, or returns its existing one. Grows capacity (doubling) if the
    /// free list is exhausted.
    pub fn allocate(&mut self, entity: EntityId) -> u32 {
        if let Some(&slot) = self.slot_of_entity.get(&entity) {
            return slot;
        }
        if self.free_list.is_empty() {
            self.grow_to(self.capacity * 2);
        }
        let slot = self.free_list.pop().expect("grown when empty");
        self.reset_slot(slot);
        self.entity_of_slot[slot as usize] = Some(entity);
        self.slot_of_entity.insert(entity, slot);
        if self.change_detection {
            self.added_this_frame.push(entity);
        }
        slot
    }

    fn reset_slot(&mut self, slot: u32) {
        let i = slot as usize;
        self.positions[i] = Vec3::ZERO;
        self.rotations[i] = Quat::IDENTITY;
        self.scales[i] = Vec3::ONE;
        self.colors[i] = [1.0, 1.0, 1.0, 1.0];
        self.parents[i] = NO_PARENT;
        self.local_matrices[i] = Mat4::IDENTITY;
        self.world_matrices[i] = Mat4::IDENTITY;
        self.dirty[i] = true;
    }

    /// Returns `entity`'s slot to the free list. No-op if `entity` was never allocated.
    pub fn free(&mut self, entity: EntityId) {
        if let Some(slot) = self.slot_of_entity.remove(&entity) {
            self.entity_of_slot[slot as usize] = None;
            self.parents[slot as usize] = NO_PARENT;
            self.free_list.push(slot);
            if self.change_detection {
                self.removed_this_frame.push(entity);
            }
        }
    }

    pub fn slot_of(&self, entity: EntityId) -> Option<u32> {
        self.slot_of_entity.get(&entity).copied()
    }

    pub fn entity_of(&self, slot: u32) -> Option<EntityId> {
        self.entity_of_slot.get(slot as usize).copied().flatten()
    }

    fn is_live(&self, slot: u32) -> bool {
        matches!(self.entity_of_slot.get(slot as usize), Some(Some(_)))
    }

    pub fn set_position(&mut self, slot: u32, position: Vec3) {
        if self.is_live(slot) {
            self.positions[slot as usize] = position;
            self.dirty[slot as usize] = true;
        }
    }

    pub fn get_position(&self, slot: u32) -> Option<Vec3> {
        self.is_live(slot).then(|| self.positions[slot as usize])
    }

    pub fn set_rotation(&mut self, slot: u32, rotation: Quat) {
        if self.is_live(slot) {
            self.rotations[slot as usize] = rotation;
            self.dirty[slot as usize] = true;
        }
    }

    pub fn set_rotation_euler(&mut self, slot: u32, x: f32, y: f32, z: f32) {
        self.set_rotation(slot, Quat::from_euler(EulerRot::XYZ, x, y, z));
    }

    pub fn get_rotation(&self, slot: u32) -> Option<Quat> {
        self.is_live(slot).then(|| self.rotations[slot as usize])
    }

    pub fn set_scale(&mut self, slot: u32, scale: Vec3) {
        if self.is_live(slot) {
            self.scales[slot as usize] = scale;
            self.dirty[slot as usize] = true;
        }
    }

    pub fn set_uniform_scale(&mut self, slot: u32, scale: f32) {
        self.set_scale(slot, Vec3::splat(scale));
    }

    pub fn get_scale(&self, slot: u32) -> Option<Vec3> {
        self.is_live(slot).then(|| self.scales[slot as usize])
    }

    pub fn set_color(&mut self, slot: u32, color: [f32; 4]) {
        if self.is_live(slot) {
            self.colors[slot as usize] = color;
        }
    }

    pub fn get_color(&self, slot: u32) -> Option<[f32; 4]> {
        self.is_live(slot).then(|| self.colors[slot as usize])
    }

    /// Sets `slot`'s parent. A value equal to `slot` itself (a self-parent) is rejected.
    pub fn set_parent(&mut self, slot: u32, parent: u32) {
        if self.is_live(slot) && parent != slot {
            self.parents[slot as usize] = parent as i32;
            self.dirty[slot as usize] = true;
        }
    }

    pub fn clear_parent(&mut self, slot: u32) {
        if self.is_live(slot) {
            self.parents[slot as usize] = NO_PARENT;
            self.dirty[slot as usize] = true;
        }
    }

    pub fn get_parent(&self, slot: u32) -> Option<i32> {
        self.is_live(slot).then(|| self.parents[slot as usize])
    }

    pub fn world_matrix(&self, slot: u32) -> Option<Mat4> {
        self.is_live(slot).then(|| self.world_matrices[slot as usize])
    }

    pub fn local_matrix(&self, slot: u32) -> Option<Mat4> {
        self.is_live(slot).then(|| self.local_matrices[slot as usize])
    }

    pub fn all_world_matrices(&self) -> &[Mat4] {
        &self.world_matrices
    }

    /// Registers a named field of `stride` scalars per slot, zero-initialized.
    pub fn add_custom_field(&mut self, name: &str, stride: usize, gpu_sync: bool) {
        let capacity = self.capacity;
        self.custom_fields.entry(name.to_string()).or_insert_with(|| CustomField {
            stride,
            values: vec![0.0; capacity * stride],
            gpu_sync,
        });
        if gpu_sync && self.gpu_enabled {
            self.gpu.register_storage(&self.buffer_name(name), usage::VERTEX | usage::COPY_DST);
        }
    }

    pub fn set_custom_field(&mut self, slot: u32, name: &str, values: &[f32]) -> bool {
        if !self.is_live(slot) {
            return false;
        }
        let Some(field) = self.custom_fields.get_mut(name) else {
            return false;
        };
        if values.len() != field.stride {
            return false;
        }
        let start = slot as usize * field.stride;
        field.values[start..start + field.stride].copy_from_slice(values);
        true
    }

    pub fn get_custom_field(&self, slot: u32, name: &str) -> Option<&[f32]> {
        if !self.is_live(slot) {
            return None;
        }
        let field = self.custom_fields.get(name)?;
        let start = slot as usize * field.stride;
        Some(&field.values[start..start + field.stride])
    }

    fn buffer_name(&self, suffix: &str) -> String {
        format!("{}_{}", self.label, suffix)
    }

    pub fn initialize_gpu(&mut self, device: Box<dyn GpuDevice>) {
        self.gpu.initialize(device);
        self.gpu.register_storage(&self.buffer_name("worldMatrices"), usage::VERTEX | usage::COPY_DST);
        self.gpu.register_storage(&self.buffer_name("colors"), usage::VERTEX | usage::COPY_DST);
    }

    /// Recomputes world matrices for every slot marked dirty, composing (scale, rotation,
    /// position) into a local matrix and then, if parented, premultiplying by the parent's world
    /// matrix. Returns the number of slots updated.
    ///
    /// Slots are resolved in waves: a slot is resolvable once its parent (if any) is no longer
    /// dirty. This converges within the hierarchy's depth; a pass that resolves nothing (a
    /// parent cycle) or the 100th pass with slots still dirty stops the algorithm, leaving those
    /// slots' world matrices stale.
    pub fn update_world_matrices(&mut self) -> usize {
        let mut remaining: Vec<usize> = (0..self.capacity).filter(|&i| self.dirty[i]).collect();
        let mut updated = 0;
        let mut iterations = 0;

        while !remaining.is_empty() {
            if iterations >= MAX_HIERARCHY_ITERATIONS {
                #[cfg(feature = "profiling")]
                warn!(target: "ecs::render", unresolved = remaining.len(), slots = ?remaining, "update_world_matrices hit the iteration cap");
                break;
            }
            iterations += 1;

            let still_dirty: std::collections::HashSet<usize> = remaining.iter().copied().collect();
            let (ready, blocked): (Vec<usize>, Vec<usize>) = remaining.into_iter().partition(|&i| {
                let parent = self.parents[i];
                parent < 0 || !still_dirty.contains(&(parent as usize))
            });

            if ready.is_empty() {
                #[cfg(feature = "profiling")]
                warn!(target: "ecs::render", unresolved = blocked.len(), slots = ?blocked, "update_world_matrices found a parent cycle");
                break;
            }

            for &i in &ready {
                let local = Mat4::from_scale_rotation_translation(self.scales[i], self.rotations[i], self.positions[i]);
                self.local_matrices[i] = local;
                let parent = self.parents[i];
                self.world_matrices[i] = if parent < 0 {
                    local
                } else {
                    self.world_matrices[parent as usize] * local
                };
                self.dirty[i] = false;
                updated += 1;
            }
            remaining = blocked;
        }

        if updated > 0 && self.gpu_enabled {
            let _ = self.gpu.mark_full_dirty(&self.buffer_name("worldMatrices"));
        }
        updated
    }

    /// Uploads world matrices and colors for all live slots, then syncs every registered buffer.
    pub fn sync_to_gpu(&mut self) -> Result<usize> {
        if !self.gpu_enabled {
            return Ok(0);
        }
        let matrix_bytes: Vec<u8> = self
            .world_matrices
            .iter()
            .flat_map(|m| bytemuck::bytes_of(&m.to_cols_array()).to_vec())
            .collect();
        self.gpu.update_source(&self.buffer_name("worldMatrices"), 0, &matrix_bytes)?;

        let color_bytes: Vec<u8> = self.colors.iter().flat_map(|c| bytemuck::bytes_of(c).to_vec()).collect();
        self.gpu.update_source(&self.buffer_name("colors"), 0, &color_bytes)?;

        for (name, field) in &self.custom_fields {
            if !field.gpu_sync {
                continue;
            }
            let bytes = bytemuck::cast_slice(&field.values);
            self.gpu.update_source(&self.buffer_name(name), 0, bytes)?;
        }

        self.gpu.sync_all()
    }

    /// Clears the per-frame change log. Per-frame change marks do not survive across this call.
    pub fn end_frame(&mut self) {
        self.added_this_frame.clear();
        self.removed_this_frame.clear();
    }

    pub fn added_this_frame(&self) -> &[EntityId] {
        &self.added_this_frame
    }

    pub fn removed_this_frame(&self) -> &[EntityId] {
        &self.removed_this_frame
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.slot_of_entity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slot_of_entity.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::IdAllocator;

    fn entity(allocator: &mut IdAllocator) -> EntityId {
        allocator.create().unwrap()
    }

    #[test]
    fn allocate_is_idempotent_per_entity() {
        let mut allocator = IdAllocator::new();
        let e = entity(&mut allocator);
        let mut store = RenderDataStore::new("test", 4, true, false);
        let a = store.allocate(e);
        let b = store.allocate(e);
        assert_eq!(a, b);
    }

    #[test]
    fn free_recycles_slot_and_records_removal() {
        let mut allocator = IdAllocator::new();
        let e = entity(&mut allocator);
        let mut store = RenderDataStore::new("test", 4, true, false);
        let slot = store.allocate(e);
        store.free(e);
        assert_eq!(store.slot_of(e), None);
        assert_eq!(store.removed_this_frame(), [e]);
        let e2 = entity(&mut allocator);
        assert_eq!(store.allocate(e2), slot);
    }

    #[test]
    fn grows_capacity_when_free_list_exhausted() {
        let mut allocator = IdAllocator::new();
        let mut store = RenderDataStore::new("test", 2, false, false);
        for _ in 0..5 {
            let e = entity(&mut allocator);
            store.allocate(e);
        }
        assert!(store.capacity() >= 5);
    }

    #[test]
    fn world_matrix_identity_for_unparented_identity_transform() {
        let mut allocator = IdAllocator::new();
        let e = entity(&mut allocator);
        let mut store = RenderDataStore::new("test", 4, false, false);
        let slot = store.allocate(e);
        store.update_world_matrices();
        assert_eq!(store.world_matrix(slot), Some(Mat4::IDENTITY));
    }

    #[test]
    fn world_matrix_composes_through_parent_chain() {
        let mut allocator = IdAllocator::new();
        let p = entity(&mut allocator);
        let c = entity(&mut allocator);
        let mut store = RenderDataStore::new("test", 4, false, false);
        let p_slot = store.allocate(p);
        let c_slot = store.allocate(c);
        store.set_parent(c_slot, p_slot);
        store.set_position(p_slot, Vec3::new(1.0, 0.0, 0.0));
        store.set_position(c_slot, Vec3::new(0.0, 1.0, 0.0));
        store.update_world_matrices();
        let translation = store.world_matrix(c_slot).unwrap().w_axis;
        assert_eq!((translation.x, translation.y, translation.z), (1.0, 1.0, 0.0));
    }

    #[test]
    fn self_parent_is_rejected() {
        let mut allocator = IdAllocator::new();
        let e = entity(&mut allocator);
        let mut store = RenderDataStore::new("test", 4, false, false);
        let slot = store.allocate(e);
        store.set_parent(slot, slot);
        assert_eq!(store.get_parent(slot), Some(NO_PARENT));
    }

    #[test]
    fn custom_field_roundtrip() {
        let mut allocator = IdAllocator::new();
        let e = entity(&mut allocator);
        let mut store = RenderDataStore::new("test", 4, false, false);
        let slot = store.allocate(e);
        store.add_custom_field("phase", 1, false);
        assert!(store.set_custom_field(slot, "phase", &[0.5]));
        assert_eq!(store.get_custom_field(slot, "phase"), Some(&[0.5][..]));
    }

    #[test]
    fn end_frame_clears_change_log() {
        let mut allocator = IdAllocator::new();
        let e = entity(&mut allocator);
        let mut store = RenderDataStore::new("test", 4, true, false);
        store.allocate(e);
        store.end_frame();
        assert!(store.added_this_frame().is_empty());
    }
}
