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

//! Deferred world mutations, recorded during system execution and applied afterward.

use crate::component::{Bundle, Component};
use crate::entity::EntityId;
use crate::error::{EcsError, Result};
use crate::world::World;

pub type SpawnFn = Box<dyn FnOnce(&mut World) -> Result<EntityId> + Send>;
pub type MutateFn = Box<dyn FnOnce(&mut World) -> Result<()> + Send>;

enum Command {
    Spawn(SpawnFn),
    Despawn(EntityId),
    AddComponent(MutateFn),
    RemoveComponent(MutateFn),
    InsertResource(MutateFn),
    RemoveResource(MutateFn),
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Spawn(_) => write!(f, "Spawn(...)"),
            Command::Despawn(e) => f.debug_tuple("Despawn").field(e).finish(),
            Command::AddComponent(_) => write!(f, "AddComponent(...)"),
            Command::RemoveComponent(_) => write!(f, "RemoveComponent(...)"),
            Command::InsertResource(_) => write!(f, "InsertResource(...)"),
            Command::RemoveResource(_) => write!(f, "RemoveResource(...)"),
        }
    }
}

/// Counts of each command kind currently recorded, for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommandStats {
    pub spawn: usize,
    pub despawn: usize,
    pub add_component: usize,
    pub remove_component: usize,
    pub insert_resource: usize,
    pub remove_resource: usize,
}

impl CommandStats {
    fn record(&mut self, command: &Command) {
        match command {
            Command::Spawn(_) => self.spawn += 1,
            Command::Despawn(_) => self.despawn += 1,
            Command::AddComponent(_) => self.add_component += 1,
            Command::RemoveComponent(_) => self.remove_component += 1,
            Command::InsertResource(_) => self.insert_resource += 1,
            Command::RemoveResource(_) => self.remove_resource += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Recording,
    Applied,
}

/// A buffer of deferred world mutations with a `Recording -> Applied` lifecycle: once
/// [`CommandBuffer::apply`] has drained it, recording more commands or applying again is a
/// programming error (`EcsError::InvariantViolated`), not silently ignored. [`CommandBuffer::clear`]
/// resets it back to `Recording`.
pub struct CommandBuffer {
    commands: Vec<Command>,
    stats: CommandStats,
    state: State,
}

impl Default for CommandBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
            stats: CommandStats::default(),
            state: State::Recording,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            commands: Vec::with_capacity(capacity),
            stats: CommandStats::default(),
            state: State::Recording,
        }
    }

    fn push(&mut self, command: Command) -> Result<()> {
        if self.state != State::Recording {
            return Err(EcsError::InvariantViolated(
                "cannot record into a CommandBuffer after it has been applied; call clear() first".into(),
            ));
        }
        self.stats.record(&command);
        self.commands.push(command);
        Ok(())
    }

    /// Queues a bundle spawn.
    pub fn spawn<B: Bundle>(&mut self, bundle: B) -> Result<()> {
        self.push(Command::Spawn(Box::new(move |world| Ok(world.spawn(bundle)))))
    }

    /// Queues a spawn driven by an arbitrary closure (e.g. one that needs intermediate world state).
    pub fn spawn_with<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut World) -> Result<EntityId> + Send + 'static,
    {
        self.push(Command::Spawn(Box::new(f)))
    }

    pub fn despawn(&mut self, entity: EntityId) -> Result<()> {
        self.push(Command::Despawn(entity))
    }

    pub fn add_component<T: Component>(&mut self, entity: EntityId, component: T) -> Result<()> {
        self.push(Command::AddComponent(Box::new(move |world| {
            world.add_component(entity, component)
        })))
    }

    pub fn remove_component<T: Component>(&mut self, entity: EntityId) -> Result<()> {
        self.push(Command::RemoveComponent(Box::new(move |world| {
            world.remove_component::<T>(entity).map(|_| ())
        })))
    }

    pub fn insert_resource<T: Component>(&mut self, value: T) -> Result<()> {
        self.push(Command::InsertResource(Box::new(move |world| {
            world.insert_resource(value);
            Ok(())
        })))
    }

    pub fn remove_resource<T: Component>(&mut self) -> Result<()> {
        self.push(Command::RemoveResource(Box::new(move |world| {
            world.remove_resource::<T>();
            Ok(())
        })))
    }

    /// Applies every recorded command to `world`, in record order, then transitions to `Applied`.
    ///
    /// # Errors
    /// Returns immediately on the first command that errors, leaving the remaining commands
    /// unapplied and the buffer in `Applied` state (call `clear()` to reuse it).
    pub fn apply(&mut self, world: &mut World) -> Result<()> {
        if self.state != State::Recording {
            return Err(EcsError::InvariantViolated(
                "CommandBuffer::apply called twice without an intervening clear()".into(),
            ));
        }
        self.state = State::Applied;
        for command in self.commands.drain(..) {
            match command {
                Command::Spawn(f) => {
                    f(world)?;
                }
                Command::Despawn(entity) => {
                    world.despawn(entity)?;
                }
                Command::AddComponent(f) | Command::RemoveComponent(f) | Command::InsertResource(f)
                | Command::RemoveResource(f) => {
                    f(world)?;
                }
            }
        }
        self.stats = CommandStats::default();
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn stats(&self) -> CommandStats {
        self.stats
    }

    /// Drops any recorded-but-unapplied commands and resets to `Recording`.
    pub fn clear(&mut self) {
        self.commands.clear();
        self.stats = CommandStats::default();
        self.state = State::Recording;
    }
}
