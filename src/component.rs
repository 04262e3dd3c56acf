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

//! Component and Bundle traits, and the per-World component registry.
//!
//! Components are data attached to entities. Bundles group multiple components for spawning.

use std::any::{Any, TypeId};

use rustc_hash::FxHashMap;
use smallvec::{smallvec, SmallVec};

use crate::bitset::Bitset;

/// Maximum number of components supported by Bundle implementations
pub const MAX_BUNDLE_COMPONENTS: usize = 8;

/// Marker trait for components
///
/// Components must be 'static (no borrowed data)
pub trait Component: 'static + Send + Sync {}

/// Automatically implement Component for all valid types
impl<T: 'static + Send + Sync> Component for T {}

/// A boxed component value, type-erased for storage in an archetype column.
pub type BoxedComponent = Box<dyn Any + Send + Sync>;

/// Bundle of components
///
/// Allows spawning entities with multiple components at once.
pub trait Bundle: Send + Sync + 'static {
    /// Get type IDs of all components in bundle, in declaration order.
    fn type_ids() -> SmallVec<[TypeId; MAX_BUNDLE_COMPONENTS]>
    where
        Self: Sized;

    /// Registers every component type in the bundle and returns each one's dense type-id, in
    /// declaration order.
    fn register(registry: &mut ComponentRegistry) -> SmallVec<[u32; MAX_BUNDLE_COMPONENTS]>
    where
        Self: Sized;

    /// Consumes the bundle into boxed per-component values, in declaration order (matching
    /// [`Bundle::type_ids`]/[`Bundle::register`]).
    fn into_values(self) -> SmallVec<[BoxedComponent; MAX_BUNDLE_COMPONENTS]>;
}

// DO NOT implement Bundle for T: Component
// This conflicts with tuple implementations
// Instead, implement only for tuples

// Macro for tuple Bundle implementations
macro_rules! impl_bundle {
    ($($T:ident),*) => {
        impl<$($T: Component),*> Bundle for ($($T,)*) {
            fn type_ids() -> SmallVec<[TypeId; MAX_BUNDLE_COMPONENTS]> {
                smallvec![$(TypeId::of::<$T>()),*]
            }

            fn register(registry: &mut ComponentRegistry) -> SmallVec<[u32; MAX_BUNDLE_COMPONENTS]> {
                smallvec![$(registry.register::<$T>().0),*]
            }

            #[allow(non_snake_case)]
            fn into_values(self) -> SmallVec<[BoxedComponent; MAX_BUNDLE_COMPONENTS]> {
                let ($($T,)*) = self;
                smallvec![$(Box::new($T) as BoxedComponent),*]
            }
        }
    };
}

// Implement for tuples of 1-8 components
impl_bundle!(A);
impl_bundle!(A, B);
impl_bundle!(A, B, C);
impl_bundle!(A, B, C, D);
impl_bundle!(A, B, C, D, E);
impl_bundle!(A, B, C, D, E, F);
impl_bundle!(A, B, C, D, E, F, G);
impl_bundle!(A, B, C, D, E, F, G, H);

#[derive(Clone, Copy)]
struct Registration {
    type_id: u32,
    bit_index: usize,
}

/// Assigns each distinct component type a dense `type_id` (storage key) and `bit_index` (mask
/// position) the first time it is seen, within one [`crate::world::World`].
///
/// Registration is idempotent: a type registered twice gets back the identical ids both times.
#[derive(Default)]
pub struct ComponentRegistry {
    by_type: FxHashMap<TypeId, Registration>,
    next_id: u32,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T`, returning `(type_id, bit_index)`. Idempotent.
    pub fn register<T: Component>(&mut self) -> (u32, usize) {
        self.register_dyn(TypeId::of::<T>())
    }

    /// Type-erased registration entry point, used by [`Bundle::register`] and callers that only
    /// have a `TypeId` in hand.
    pub fn register_dyn(&mut self, type_id: TypeId) -> (u32, usize) {
        if let Some(reg) = self.by_type.get(&type_id) {
            return (reg.type_id, reg.bit_index);
        }
        let id = self.next_id;
        let reg = Registration {
            type_id: id,
            bit_index: id as usize,
        };
        self.next_id += 1;
        self.by_type.insert(type_id, reg);
        (reg.type_id, reg.bit_index)
    }

    /// Dense type-id for an already-registered type, or `None`.
    pub fn type_id<T: Component>(&self) -> Option<u32> {
        self.by_type.get(&TypeId::of::<T>()).map(|r| r.type_id)
    }

    /// Bit-index for an already-registered type, or `None`.
    pub fn bit_index<T: Component>(&self) -> Option<usize> {
        self.by_type.get(&TypeId::of::<T>()).map(|r| r.bit_index)
    }

    /// Bit-index for an already-registered type, keyed dynamically.
    pub fn bit_index_of(&self, type_id: TypeId) -> Option<usize> {
        self.by_type.get(&type_id).map(|r| r.bit_index)
    }

    /// Union of bit-indices for a set of already-registered types.
    ///
    /// # Panics
    /// Panics if any type in `types` was never registered — mirrors the source's contract that
    /// masking an unregistered type is a programming error, not a recoverable one.
    pub fn mask(&self, types: &[TypeId]) -> Bitset {
        let mut set = Bitset::default();
        for t in types {
            let bit = self
                .bit_index_of(*t)
                .expect("mask() requires all types to be registered first");
            set.set(bit);
        }
        set
    }

    /// Number of distinct registered component types.
    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}

#[cfg(test)]
mod tests {
    #![allow(dead_code)]
    use super::*;

    #[derive(Debug, Clone, Copy)]
    struct Position {
        x: f32,
        y: f32,
    }

    #[derive(Debug, Clone, Copy)]
    struct Velocity {
        x: f32,
    }

    #[test]
    fn test_single_component() {
        let type_ids = <(Position,)>::type_ids();
        assert_eq!(type_ids.len(), 1);
        assert_eq!(type_ids[0], TypeId::of::<Position>());
    }

    #[test]
    fn test_multiple_components() {
        let type_ids = <(Position, Velocity)>::type_ids();
        assert_eq!(type_ids.len(), 2);
    }

    #[test]
    fn registration_is_idempotent() {
        let mut registry = ComponentRegistry::new();
        let (id_a, bit_a) = registry.register::<Position>();
        let (id_b, bit_b) = registry.register::<Position>();
        assert_eq!(id_a, id_b);
        assert_eq!(bit_a, bit_b);
    }

    #[test]
    fn distinct_types_get_distinct_ids() {
        let mut registry = ComponentRegistry::new();
        let (pos_id, _) = registry.register::<Position>();
        let (vel_id, _) = registry.register::<Velocity>();
        assert_ne!(pos_id, vel_id);
    }

    #[test]
    fn bundle_into_values_preserves_order() {
        let mut registry = ComponentRegistry::new();
        let ids = <(Position, Velocity)>::register(&mut registry);
        assert_eq!(ids.len(), 2);
        let values = (Position { x: 1.0, y: 2.0 }, Velocity { x: 3.0 }).into_values();
        assert_eq!(values.len(), 2);
        assert_eq!(values[0].downcast_ref::<Position>().unwrap().x, 1.0);
        assert_eq!(values[1].downcast_ref::<Velocity>().unwrap().x, 3.0);
    }
}
