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

//! Entity identity: a packed 32-bit handle and the allocator that recycles it.

use std::fmt;

/// Number of bits given to the index half of an [`EntityId`].
const INDEX_BITS: u32 = 20;
/// Number of bits given to the generation half of an [`EntityId`].
const GENERATION_BITS: u32 = 12;

const INDEX_MASK: u32 = (1 << INDEX_BITS) - 1;
const GENERATION_MASK: u32 = (1 << GENERATION_BITS) - 1;

/// Maximum number of simultaneously live indices.
pub const MAX_INDEX: u32 = INDEX_MASK;
/// Maximum generation value before a slot is retired instead of recycled.
pub const MAX_GENERATION: u32 = GENERATION_MASK;

/// A packed entity identifier: high 20 bits are the index, low 12 bits the generation.
///
/// The all-ones value is the invalid sentinel; it is never produced by [`IdAllocator::create`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[repr(transparent)]
pub struct EntityId(u32);

impl EntityId {
    /// The invalid sentinel handle (all bits set).
    pub const INVALID: EntityId = EntityId(u32::MAX);

    /// Packs an `(index, generation)` pair into a handle.
    #[inline]
    pub fn make(index: u32, generation: u32) -> Self {
        debug_assert!(index <= INDEX_MASK, "entity index out of range");
        debug_assert!(generation <= GENERATION_MASK, "entity generation out of range");
        EntityId(((index & INDEX_MASK) << GENERATION_BITS) | (generation & GENERATION_MASK))
    }

    /// The index half of the handle.
    #[inline]
    pub fn index(self) -> u32 {
        (self.0 >> GENERATION_BITS) & INDEX_MASK
    }

    /// The generation half of the handle.
    #[inline]
    pub fn generation(self) -> u32 {
        self.0 & GENERATION_MASK
    }

    /// True for any handle other than the [`EntityId::INVALID`] sentinel.
    ///
    /// Does not consult an allocator; a syntactically valid handle may still refer to a
    /// destroyed entity. Use [`IdAllocator::is_live`] for liveness.
    #[inline]
    pub fn is_valid(self) -> bool {
        self != EntityId::INVALID
    }

    /// Raw bit pattern, for ABI/FFI boundaries.
    #[inline]
    pub fn to_bits(self) -> u32 {
        self.0
    }

    /// Reconstructs a handle from its raw bit pattern.
    #[inline]
    pub fn from_bits(bits: u32) -> Self {
        EntityId(bits)
    }
}

impl Default for EntityId {
    fn default() -> Self {
        EntityId::INVALID
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_valid() {
            write!(f, "Entity(invalid)")
        } else {
            write!(f, "Entity({}v{})", self.index(), self.generation())
        }
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Entity location: which archetype it resides in, and at which row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityLocation {
    pub archetype_id: usize,
    pub archetype_row: usize,
}

#[derive(Clone, Copy)]
struct Slot {
    generation: u32,
    alive: bool,
}

/// Allocates and recycles [`EntityId`] handles with generational invalidation.
pub struct IdAllocator {
    slots: Vec<Slot>,
    free_list: Vec<u32>,
    live_count: u32,
}

impl IdAllocator {
    /// Creates an empty allocator.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            live_count: 0,
        }
    }

    /// Allocates a fresh live handle.
    ///
    /// Prefers recycling from the free list, bumping the slot's stored generation. A slot whose
    /// next generation would overflow [`MAX_GENERATION`] is retired permanently (not returned to
    /// the free list) and another candidate is tried. Returns `None` only when every one of the
    /// `2^20` indices is simultaneously live.
    pub fn create(&mut self) -> Option<EntityId> {
        while let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            debug_assert!(!slot.alive);
            let next_gen = slot.generation + 1;
            if next_gen > MAX_GENERATION {
                // Generation space exhausted for this slot: retire it for good.
                continue;
            }
            slot.generation = next_gen;
            slot.alive = true;
            self.live_count += 1;
            return Some(EntityId::make(index, slot.generation));
        }

        let index = self.slots.len() as u32;
        if index > MAX_INDEX {
            return None;
        }
        self.slots.push(Slot {
            generation: 0,
            alive: true,
        });
        self.live_count += 1;
        Some(EntityId::make(index, 0))
    }

    /// Destroys a handle, returning it to the free list. Returns `false` if the handle was not
    /// live (no-op in that case).
    pub fn destroy(&mut self, id: EntityId) -> bool {
        if !self.is_live(id) {
            return false;
        }
        let index = id.index() as usize;
        self.slots[index].alive = false;
        self.live_count -= 1;
        self.free_list.push(index as u32);
        true
    }

    /// True iff `id`'s index is in range, its stored generation matches, and the slot is alive.
    pub fn is_live(&self, id: EntityId) -> bool {
        if !id.is_valid() {
            return false;
        }
        let index = id.index() as usize;
        match self.slots.get(index) {
            Some(slot) => slot.alive && slot.generation == id.generation(),
            None => false,
        }
    }

    /// Number of currently live handles.
    pub fn live_count(&self) -> u32 {
        self.live_count
    }

    /// Total number of indices ever allocated (live + retired + free).
    pub fn total_count(&self) -> u32 {
        self.slots.len() as u32
    }

    /// Number of indices currently sitting in the free list, awaiting recycle or retirement.
    pub fn free_count(&self) -> u32 {
        self.free_list.len() as u32
    }

    /// Iterates all live handles in ascending index order.
    pub fn live_iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.alive
                .then(|| EntityId::make(i as u32, slot.generation))
        })
    }

    /// Resets the allocator to empty.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free_list.clear();
        self.live_count = 0;
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
