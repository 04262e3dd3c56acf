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

//! Contiguous numeric storage for one component type: `stride` scalars per entity, packed
//! flat so the live prefix is a zero-copy GPU upload source.

use bytemuck::Pod;

/// A contiguous, flat-packed buffer of `stride` scalars per entity.
///
/// Unlike [`crate::archetype::ComponentColumn`], a `TypedSlab` never boxes or drops values — it
/// is purely bytes, laid out so [`TypedSlab::raw_bytes`] is directly uploadable to a GPU buffer.
pub struct TypedSlab {
    data: Vec<u8>,
    scalar_size: usize,
    stride: usize,
    len: usize,
}

impl TypedSlab {
    /// `scalar_size` is the byte width of one scalar (e.g. 4 for f32/u32/i32); `stride` is how
    /// many scalars make up one entity's row.
    pub fn new(scalar_size: usize, stride: usize) -> Self {
        assert!(scalar_size > 0 && stride > 0, "scalar_size and stride must be nonzero");
        Self {
            data: Vec::new(),
            scalar_size,
            stride,
            len: 0,
        }
    }

    /// Byte width of one entity's row.
    pub fn item_size(&self) -> usize {
        self.scalar_size * self.stride
    }

    /// Number of entities currently stored.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends one entity's row (raw bytes, length must equal [`TypedSlab::item_size`]), doubling
    /// the backing buffer's capacity when it runs out. Returns the new row index.
    pub fn add(&mut self, scalars: &[u8]) -> usize {
        assert_eq!(scalars.len(), self.item_size(), "scalar row has wrong byte length");
        let row = self.len;
        let needed = (row + 1) * self.item_size();
        if needed > self.data.capacity() {
            let new_cap = (self.data.capacity() * 2).max(needed);
            self.data.reserve(new_cap - self.data.len());
        }
        self.data.extend_from_slice(scalars);
        self.len += 1;
        row
    }

    /// Removes `row` via swap-with-last. Returns `true` if a different row was moved into
    /// `row`'s place (the caller must then fix up that entity's row index).
    pub fn remove(&mut self, row: usize) -> bool {
        if row >= self.len {
            return false;
        }
        let item_size = self.item_size();
        let last = self.len - 1;
        if row != last {
            let (head, tail) = self.data.split_at_mut(last * item_size);
            head[row * item_size..(row + 1) * item_size].copy_from_slice(&tail[..item_size]);
        }
        self.data.truncate(last * item_size);
        self.len -= 1;
        row != last
    }

    /// Raw byte view of one entity's row.
    pub fn view(&self, row: usize) -> Option<&[u8]> {
        if row >= self.len {
            return None;
        }
        let item_size = self.item_size();
        Some(&self.data[row * item_size..(row + 1) * item_size])
    }

    /// Mutable raw byte view of one entity's row.
    pub fn view_mut(&mut self, row: usize) -> Option<&mut [u8]> {
        if row >= self.len {
            return None;
        }
        let item_size = self.item_size();
        Some(&mut self.data[row * item_size..(row + 1) * item_size])
    }

    /// Reads scalar `elem` (0-indexed within the row's `stride`) of `row` as `T`.
    pub fn get<T: Pod>(&self, row: usize, elem: usize) -> Option<T> {
        debug_assert_eq!(std::mem::size_of::<T>(), self.scalar_size);
        let row_bytes = self.view(row)?;
        let offset = elem * self.scalar_size;
        let slice = row_bytes.get(offset..offset + self.scalar_size)?;
        Some(bytemuck::pod_read_unaligned(slice))
    }

    /// Writes scalar `elem` of `row` from `value`.
    pub fn set<T: Pod>(&mut self, row: usize, elem: usize, value: T) -> bool {
        debug_assert_eq!(std::mem::size_of::<T>(), self.scalar_size);
        let scalar_size = self.scalar_size;
        let Some(row_bytes) = self.view_mut(row) else {
            return false;
        };
        let offset = elem * scalar_size;
        if offset + scalar_size > row_bytes.len() {
            return false;
        }
        row_bytes[offset..offset + scalar_size].copy_from_slice(bytemuck::bytes_of(&value));
        true
    }

    /// Zero-copy view of the live portion of the buffer, suitable for GPU upload.
    pub fn raw_bytes(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_read_back() {
        let mut slab = TypedSlab::new(4, 3); // vec3 of f32
        let row = slab.add(bytemuck::bytes_of(&[1.0f32, 2.0, 3.0]));
        assert_eq!(row, 0);
        assert_eq!(slab.get::<f32>(0, 0), Some(1.0));
        assert_eq!(slab.get::<f32>(0, 2), Some(3.0));
    }

    #[test]
    fn remove_swaps_last_into_hole() {
        let mut slab = TypedSlab::new(4, 1);
        slab.add(bytemuck::bytes_of(&10.0f32));
        slab.add(bytemuck::bytes_of(&20.0f32));
        slab.add(bytemuck::bytes_of(&30.0f32));
        let moved = slab.remove(0);
        assert!(moved);
        assert_eq!(slab.get::<f32>(0, 0), Some(30.0));
        assert_eq!(slab.len(), 2);
    }

    #[test]
    fn remove_last_row_does_not_report_a_move() {
        let mut slab = TypedSlab::new(4, 1);
        slab.add(bytemuck::bytes_of(&10.0f32));
        slab.add(bytemuck::bytes_of(&20.0f32));
        assert!(!slab.remove(1));
        assert_eq!(slab.len(), 1);
    }

    #[test]
    fn raw_bytes_covers_exactly_the_live_prefix() {
        let mut slab = TypedSlab::new(4, 1);
        slab.add(bytemuck::bytes_of(&1.0f32));
        slab.add(bytemuck::bytes_of(&2.0f32));
        assert_eq!(slab.raw_bytes().len(), 8);
    }

    #[test]
    fn set_overwrites_in_place() {
        let mut slab = TypedSlab::new(4, 2);
        slab.add(bytemuck::bytes_of(&[1.0f32, 2.0]));
        assert!(slab.set(0, 1, 9.0f32));
        assert_eq!(slab.get::<f32>(0, 1), Some(9.0));
    }
}
