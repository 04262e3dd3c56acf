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

//! A real-time entity-component-system runtime: archetype storage, a staged system scheduler,
//! change tracking, and a GPU buffer synchronization layer for render data.

pub mod archetype;
pub mod bitset;
pub mod change_tracker;
pub mod command;
pub mod component;
pub mod dag;
pub mod entity;
pub mod error;
pub mod gpu;
pub mod query;
pub mod render;
pub mod scheduler;
pub mod sparse;
pub mod time;
pub mod typed_slab;
pub mod world;

pub use archetype::Archetype;
pub use bitset::Bitset;
pub use change_tracker::ChangeTracker;
pub use command::CommandBuffer;
pub use component::{Bundle, Component};
pub use dag::DagScheduler;
pub use entity::EntityId;
pub use error::{EcsError, Result};
pub use gpu::{GpuBuffer, GpuBufferSync, GpuDevice};
pub use query::{Query, QueryFilter, QueryId};
pub use render::RenderDataStore;
pub use scheduler::{Context, ErrorPolicy, Stage, SystemScheduler};
pub use time::{FixedTime, Time};
pub use world::World;
