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

//! GPU buffer synchronization: CPU-side mirrors of named storages, uploaded to an abstract
//! device through dirty-region tracking.
//!
//! The concrete GPU API is intentionally out of scope — callers supply a [`GpuDevice`]
//! implementation (backed by whatever graphics backend they like); this module only tracks what
//! changed and when to grow or re-create a buffer.

use rustc_hash::FxHashMap;

use crate::error::{EcsError, Result};

/// Usage flags, OR-able, passed to [`GpuDevice::create_buffer`].
pub mod usage {
    pub const COPY_SRC: u32 = 0x04;
    pub const COPY_DST: u32 = 0x08;
    pub const INDEX: u32 = 0x10;
    pub const VERTEX: u32 = 0x20;
    pub const UNIFORM: u32 = 0x40;
    pub const STORAGE: u32 = 0x80;
}

const MIN_BUFFER_CAPACITY: usize = 256;

/// An opaque device-side buffer handle.
pub trait GpuBuffer: Send + Sync {
    fn size(&self) -> usize;
}

/// The abstract GPU boundary. Implementations own the real backend (wgpu, vulkan, a test double).
pub trait GpuDevice: Send + Sync {
    fn create_buffer(&self, label: &str, size: usize, usage: u32) -> Result<Box<dyn GpuBuffer>>;
    fn update(&self, buffer: &mut dyn GpuBuffer, offset: usize, data: &[u8]) -> Result<()>;
    fn destroy(&self, buffer: Box<dyn GpuBuffer>) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DirtyRegion {
    offset: usize,
    len: usize,
}

impl DirtyRegion {
    fn end(&self) -> usize {
        self.offset + self.len
    }

    fn overlaps_or_touches(&self, other: &DirtyRegion) -> bool {
        self.offset <= other.end() && other.offset <= self.end()
    }

    fn merge(&self, other: &DirtyRegion) -> DirtyRegion {
        let offset = self.offset.min(other.offset);
        let end = self.end().max(other.end());
        DirtyRegion { offset, len: end - offset }
    }
}

struct Storage {
    source: Vec<u8>,
    usage: u32,
    buffer: Option<Box<dyn GpuBuffer>>,
    capacity: usize,
    dirty: Vec<DirtyRegion>,
    full_dirty: bool,
}

impl Storage {
    fn new(usage: u32) -> Self {
        Self {
            source: Vec::new(),
            usage,
            buffer: None,
            capacity: 0,
            dirty: Vec::new(),
            full_dirty: false,
        }
    }

    fn insert_dirty(&mut self, region: DirtyRegion) {
        let mut merged = region;
        let mut kept = Vec::with_capacity(self.dirty.len() + 1);
        for existing in self.dirty.drain(..) {
            if merged.overlaps_or_touches(&existing) {
                merged = merged.merge(&existing);
            } else {
                kept.push(existing);
            }
        }
        kept.push(merged);
        kept.sort_by_key(|r| r.offset);
        self.dirty = kept;
    }
}

/// Stats surfaced for diagnostics/tests, not consumed internally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub storages: usize,
    pub buffers_allocated: usize,
    pub bytes_uploaded_last_sync: usize,
}

pub struct GpuBufferSync {
    device: Option<Box<dyn GpuDevice>>,
    storages: FxHashMap<String, Storage>,
    buffers_allocated: usize,
}

impl Default for GpuBufferSync {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuBufferSync {
    pub fn new() -> Self {
        Self {
            device: None,
            storages: FxHashMap::default(),
            buffers_allocated: 0,
        }
    }

    pub fn initialize(&mut self, device: Box<dyn GpuDevice>) {
        self.device = Some(device);
    }

    pub fn register_storage(&mut self, name: &str, usage: u32) {
        self.storages.entry(name.to_string()).or_insert_with(|| Storage::new(usage));
    }

    pub fn unregister_storage(&mut self, name: &str) -> Result<()> {
        if let Some(storage) = self.storages.remove(name) {
            if let (Some(device), Some(buffer)) = (&self.device, storage.buffer) {
                device.destroy(buffer)?;
            }
        }
        Ok(())
    }

    /// Overwrites `source`'s bytes at `offset` and marks that range dirty.
    pub fn update_source(&mut self, name: &str, offset: usize, data: &[u8]) -> Result<()> {
        let storage = self
            .storages
            .get_mut(name)
            .ok_or_else(|| EcsError::InvariantViolated(format!("unknown GPU storage '{name}'")))?;
        let end = offset + data.len();
        if end > storage.source.len() {
            storage.source.resize(end, 0);
        }
        storage.source[offset..end].copy_from_slice(data);
        storage.insert_dirty(DirtyRegion { offset, len: data.len() });
        Ok(())
    }

    pub fn mark_dirty(&mut self, name: &str, offset: usize, len: usize) -> Result<()> {
        let storage = self
            .storages
            .get_mut(name)
            .ok_or_else(|| EcsError::InvariantViolated(format!("unknown GPU storage '{name}'")))?;
        storage.insert_dirty(DirtyRegion { offset, len });
        Ok(())
    }

    pub fn mark_full_dirty(&mut self, name: &str) -> Result<()> {
        let storage = self
            .storages
            .get_mut(name)
            .ok_or_else(|| EcsError::InvariantViolated(format!("unknown GPU storage '{name}'")))?;
        storage.full_dirty = true;
        storage.dirty.clear();
        Ok(())
    }

    /// Uploads every dirty region of `name` to its device buffer, growing (2x, 256-byte minimum)
    /// or creating the buffer first if the source has outgrown it.
    pub fn sync(&mut self, name: &str) -> Result<usize> {
        let device = self
            .device
            .as_ref()
            .ok_or_else(|| EcsError::DeviceFailure("GpuBufferSync not initialized".into()))?;
        let storage = self
            .storages
            .get_mut(name)
            .ok_or_else(|| EcsError::InvariantViolated(format!("unknown GPU storage '{name}'")))?;

        let needed = storage.source.len();
        if storage.buffer.is_none() || needed > storage.capacity {
            let new_capacity = if storage.capacity == 0 {
                needed.max(MIN_BUFFER_CAPACITY)
            } else {
                (storage.capacity * 2).max(needed).max(MIN_BUFFER_CAPACITY)
            };
            if let Some(old) = storage.buffer.take() {
                device.destroy(old)?;
            }
            storage.buffer = Some(device.create_buffer(name, new_capacity, storage.usage)?);
            storage.capacity = new_capacity;
            self.buffers_allocated += 1;
            storage.full_dirty = true;
            storage.dirty.clear();
        }

        let buffer = storage.buffer.as_deref_mut().expect("buffer just ensured present");
        let mut uploaded = 0;
        if storage.full_dirty {
            device.update(buffer, 0, &storage.source)?;
            uploaded = storage.source.len();
            storage.full_dirty = false;
        } else {
            for region in storage.dirty.drain(..) {
                let end = (region.offset + region.len).min(storage.source.len());
                if region.offset >= end {
                    continue;
                }
                device.update(buffer, region.offset, &storage.source[region.offset..end])?;
                uploaded += end - region.offset;
            }
        }
        Ok(uploaded)
    }

    pub fn sync_all(&mut self) -> Result<usize> {
        let names: Vec<String> = self.storages.keys().cloned().collect();
        let mut total = 0;
        for name in names {
            total += self.sync(&name)?;
        }
        Ok(total)
    }

    pub fn get_buffer(&self, name: &str) -> Option<&dyn GpuBuffer> {
        self.storages.get(name)?.buffer.as_deref()
    }

    /// Number of merged dirty regions currently pending for `name`, or `None` if unregistered.
    /// Always 0 right after a `sync` (regions are drained, full-dirty uploads clear the flag).
    pub fn dirty_region_count(&self, name: &str) -> Option<usize> {
        Some(self.storages.get(name)?.dirty.len())
    }

    pub fn stats(&self) -> SyncStats {
        SyncStats {
            storages: self.storages.len(),
            buffers_allocated: self.buffers_allocated,
            bytes_uploaded_last_sync: 0,
        }
    }

    pub fn destroy(&mut self) -> Result<()> {
        let names: Vec<String> = self.storages.keys().cloned().collect();
        for name in names {
            self.unregister_storage(&name)?;
        }
        self.device = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct TestBuffer {
        size: usize,
    }
    impl GpuBuffer for TestBuffer {
        fn size(&self) -> usize {
            self.size
        }
    }

    struct TestDevice {
        created: Arc<AtomicUsize>,
        uploaded_bytes: Arc<AtomicUsize>,
    }
    impl GpuDevice for TestDevice {
        fn create_buffer(&self, _label: &str, size: usize, _usage: u32) -> Result<Box<dyn GpuBuffer>> {
            self.created.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(TestBuffer { size }))
        }
        fn update(&self, _buffer: &mut dyn GpuBuffer, _offset: usize, data: &[u8]) -> Result<()> {
            self.uploaded_bytes.fetch_add(data.len(), Ordering::SeqCst);
            Ok(())
        }
        fn destroy(&self, _buffer: Box<dyn GpuBuffer>) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn sync_creates_buffer_and_uploads_full_dirty_region() {
        let mut gpu = GpuBufferSync::new();
        let created = Arc::new(AtomicUsize::new(0));
        let uploaded = Arc::new(AtomicUsize::new(0));
        gpu.initialize(Box::new(TestDevice {
            created: created.clone(),
            uploaded_bytes: uploaded.clone(),
        }));
        gpu.register_storage("positions", usage::VERTEX | usage::COPY_DST);
        gpu.update_source("positions", 0, &[1u8, 2, 3, 4]).unwrap();
        let n = gpu.sync("positions").unwrap();
        assert_eq!(n, 4);
        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert_eq!(uploaded.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn buffer_grows_by_doubling_when_source_outgrows_capacity() {
        let mut gpu = GpuBufferSync::new();
        let created = Arc::new(AtomicUsize::new(0));
        gpu.initialize(Box::new(TestDevice {
            created: created.clone(),
            uploaded_bytes: Arc::new(AtomicUsize::new(0)),
        }));
        gpu.register_storage("s", usage::STORAGE);
        gpu.update_source("s", 0, &vec![0u8; 10]).unwrap();
        gpu.sync("s").unwrap();
        assert_eq!(gpu.storages.get("s").unwrap().capacity, MIN_BUFFER_CAPACITY);
        gpu.update_source("s", 0, &vec![0u8; MIN_BUFFER_CAPACITY + 1]).unwrap();
        gpu.sync("s").unwrap();
        assert!(gpu.storages.get("s").unwrap().capacity >= MIN_BUFFER_CAPACITY + 1);
        assert_eq!(created.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn overlapping_dirty_regions_merge() {
        let mut storage = Storage::new(0);
        storage.insert_dirty(DirtyRegion { offset: 0, len: 10 });
        storage.insert_dirty(DirtyRegion { offset: 8, len: 10 });
        assert_eq!(storage.dirty.len(), 1);
        assert_eq!(storage.dirty[0], DirtyRegion { offset: 0, len: 18 });
    }

    #[test]
    fn overlapping_marks_collapse_to_one_region_and_upload_their_union() {
        let mut gpu = GpuBufferSync::new();
        let uploaded = Arc::new(AtomicUsize::new(0));
        gpu.initialize(Box::new(TestDevice {
            created: Arc::new(AtomicUsize::new(0)),
            uploaded_bytes: uploaded.clone(),
        }));
        gpu.register_storage("s", usage::STORAGE);
        gpu.update_source("s", 0, &vec![0u8; 400]).unwrap();
        gpu.sync("s").unwrap();
        uploaded.store(0, Ordering::SeqCst);

        gpu.mark_dirty("s", 0, 64).unwrap();
        gpu.mark_dirty("s", 32, 64).unwrap();
        assert_eq!(gpu.dirty_region_count("s"), Some(1));
        let n = gpu.sync("s").unwrap();
        assert_eq!(n, 96);
        assert_eq!(gpu.dirty_region_count("s"), Some(0));
    }

    #[test]
    fn mark_full_dirty_clears_region_list_and_reuploads_everything() {
        let mut gpu = GpuBufferSync::new();
        let uploaded = Arc::new(AtomicUsize::new(0));
        gpu.initialize(Box::new(TestDevice {
            created: Arc::new(AtomicUsize::new(0)),
            uploaded_bytes: uploaded.clone(),
        }));
        gpu.register_storage("s", usage::STORAGE);
        gpu.update_source("s", 0, &[1u8; 20]).unwrap();
        gpu.sync("s").unwrap();
        gpu.mark_full_dirty("s").unwrap();
        let n = gpu.sync("s").unwrap();
        assert_eq!(n, 20);
    }
}
