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

//! Staged system scheduler: fixed stages, priority/after ordering rebuilt lazily on change, and
//! a real `update(delta_time)` dispatch loop.

use rustc_hash::FxHashMap;

#[cfg(feature = "profiling")]
use tracing::{error, warn};

use crate::error::{EcsError, Result};
use crate::query::{QueryFilter, QueryId};
use crate::world::World;

/// Fixed execution stages, run in this order every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Stage {
    FrameStart = 0,
    PreUpdate = 1,
    Update = 2,
    PostUpdate = 3,
    PreRender = 4,
    Render = 5,
    FrameEnd = 6,
}

const STAGES: [Stage; 7] = [
    Stage::FrameStart,
    Stage::PreUpdate,
    Stage::Update,
    Stage::PostUpdate,
    Stage::PreRender,
    Stage::Render,
    Stage::FrameEnd,
];

/// What a system sees when it runs.
pub struct Context<'w> {
    pub world: &'w mut World,
    pub delta_time: f32,
    pub total_time: f64,
    pub frame_count: u64,
}

impl<'w> Context<'w> {
    pub fn get_resource<T: crate::component::Component>(&self) -> Option<&T> {
        self.world.get_resource::<T>()
    }
}

pub type SystemExecute = Box<dyn FnMut(&mut Context, Option<QueryId>) -> Result<()> + Send>;
pub type RunIf = Box<dyn Fn(&World) -> bool + Send>;

struct SystemDef {
    name: String,
    stage: Stage,
    enabled: bool,
    priority: i32,
    after: Vec<String>,
    run_if: Option<RunIf>,
    query_id: Option<QueryId>,
    execute: SystemExecute,
}

/// What happens when a system's `execute` returns an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Log (if `profiling` is enabled) and move on to the next system. Default.
    Continue,
    /// Disable the offending system (it will not run again until re-enabled) and move on.
    DisableAndContinue,
    /// Propagate the error from `update`, aborting the remaining systems this frame.
    Throw,
}

/// Builder/registry for systems, plus the lazily-rebuilt per-stage execution order.
pub struct SystemScheduler {
    systems: Vec<SystemDef>,
    name_index: FxHashMap<String, usize>,
    dirty: bool,
    stage_order: Vec<Vec<usize>>,
    parallel_execution: bool,
    error_policy: ErrorPolicy,
    error_callback: Option<Box<dyn FnMut(&str, &EcsError) + Send>>,
    frame_count: u64,
    total_time: f64,
    query_cache: FxHashMap<String, crate::query::QueryId>,
}

impl Default for SystemScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemScheduler {
    pub fn new() -> Self {
        Self {
            systems: Vec::new(),
            name_index: FxHashMap::default(),
            dirty: true,
            stage_order: Vec::new(),
            parallel_execution: false,
            error_policy: ErrorPolicy::Continue,
            error_callback: None,
            frame_count: 0,
            total_time: 0.0,
            query_cache: FxHashMap::default(),
        }
    }

    /// Registers a system. `after` names other systems (by name) that must run first, within the
    /// same stage; names that refer to a system in a different stage or to no system at all are
    /// ignored when building order. If `filter` is present, a `Query` is created against `world`
    /// and cached for the lifetime of the system, passed to `execute` on every call.
    ///
    /// Replaces on name collision, deregistering the old system's cached query first.
    #[allow(clippy::too_many_arguments)]
    pub fn add_system(
        &mut self,
        world: &mut World,
        name: &str,
        stage: Stage,
        priority: i32,
        after: &[&str],
        filter: Option<QueryFilter>,
        run_if: Option<RunIf>,
        execute: SystemExecute,
    ) {
        self.remove_system(world, name);
        let query_id = filter.map(|f| world.query(f));
        let idx = self.systems.len();
        self.systems.push(SystemDef {
            name: name.to_string(),
            stage,
            enabled: true,
            priority,
            after: after.iter().map(|s| s.to_string()).collect(),
            run_if,
            query_id,
            execute,
        });
        self.name_index.insert(name.to_string(), idx);
        self.dirty = true;
    }

    /// Removes a system by name, also deregistering its cached query (if any) from `world`.
    /// Returns `false` if no system by that name was registered.
    pub fn remove_system(&mut self, world: &mut World, name: &str) -> bool {
        if let Some(idx) = self.name_index.remove(name) {
            if let Some(query_id) = self.systems[idx].query_id.take() {
                world.remove_query(query_id);
            }
            self.systems[idx].enabled = false;
            self.systems[idx].after.clear();
            self.systems[idx].name = String::new();
            self.dirty = true;
            true
        } else {
            false
        }
    }

    pub fn set_enabled(&mut self, name: &str, enabled: bool) {
        if let Some(&idx) = self.name_index.get(name) {
            self.systems[idx].enabled = enabled;
        }
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.name_index
            .get(name)
            .map(|&idx| self.systems[idx].enabled)
            .unwrap_or(false)
    }

    pub fn set_parallel_execution(&mut self, enabled: bool) {
        self.parallel_execution = enabled;
    }

    pub fn is_parallel_execution_enabled(&self) -> bool {
        self.parallel_execution
    }

    pub fn set_error_policy(&mut self, policy: ErrorPolicy) {
        self.error_policy = policy;
    }

    pub fn set_error_callback(&mut self, callback: impl FnMut(&str, &EcsError) + Send + 'static) {
        self.error_callback = Some(Box::new(callback));
    }

    /// Returns, per stage, the batches of system names that have no ordering dependency between
    /// them within that batch. This is informational only — `update` still executes systems one
    /// at a time, in the flattened order; no synchronization scheme is applied to make concurrent
    /// system access to `World` safe, so callers must not treat this as a license to run batch
    /// members on separate threads against the same `World`.
    pub fn get_parallel_batches(&mut self) -> Vec<Vec<String>> {
        self.ensure_built();
        let mut batches = Vec::new();
        for stage in STAGES {
            let stage_idx = stage as usize;
            let order = &self.stage_order[stage_idx];
            let mut dag: crate::dag::DagScheduler = crate::dag::DagScheduler::new();
            for &i in order {
                dag.add_node(&self.systems[i].name, ());
            }
            for &i in order {
                for dep in &self.systems[i].after {
                    if self.name_index.contains_key(dep) {
                        dag.add_edge(dep, &self.systems[i].name);
                    }
                }
            }
            if let Ok(stage_batches) = dag.parallel_batches() {
                batches.extend(stage_batches);
            }
        }
        batches
    }

    fn ensure_built(&mut self) {
        if !self.dirty {
            return;
        }
        self.stage_order = STAGES
            .iter()
            .map(|&stage| self.build_stage_order(stage))
            .collect::<Result<Vec<_>>>()
            .unwrap_or_else(|_| vec![Vec::new(); STAGES.len()]);
        self.dirty = false;
    }

    fn build_stage_order(&self, stage: Stage) -> Result<Vec<usize>> {
        let stage_systems: Vec<usize> = self
            .systems
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.name.is_empty() && s.stage == stage)
            .map(|(i, _)| i)
            .collect();
        let n = stage_systems.len();
        let local_of: FxHashMap<&str, usize> = stage_systems
            .iter()
            .enumerate()
            .map(|(local, &global)| (self.systems[global].name.as_str(), local))
            .collect();

        let mut in_degree = vec![0usize; n];
        let mut edges: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (local, &global) in stage_systems.iter().enumerate() {
            for dep in &self.systems[global].after {
                if let Some(&dep_local) = local_of.get(dep.as_str()) {
                    edges[dep_local].push(local);
                    in_degree[local] += 1;
                }
            }
        }

        let mut ready: Vec<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);
        while !ready.is_empty() {
            ready.sort_by(|&a, &b| {
                let sa = &self.systems[stage_systems[a]];
                let sb = &self.systems[stage_systems[b]];
                sa.priority.cmp(&sb.priority).then_with(|| sa.name.cmp(&sb.name))
            });
            let picked = ready.remove(0);
            order.push(stage_systems[picked]);
            for &next in &edges[picked] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    ready.push(next);
                }
            }
        }

        if order.len() != n {
            let remaining = stage_systems
                .iter()
                .filter(|&&global| {
                    let local = local_of[self.systems[global].name.as_str()];
                    in_degree[local] > 0
                })
                .map(|&global| self.systems[global].name.clone())
                .collect();
            return Err(EcsError::CycleDetected(remaining));
        }
        Ok(order)
    }

    /// Registers a query once per cache key, reusing it on later calls with the same key.
    pub fn get_or_create_cached_query(
        &mut self,
        world: &mut World,
        key: &str,
        filter: QueryFilter,
    ) -> crate::query::QueryId {
        if let Some(&id) = self.query_cache.get(key) {
            return id;
        }
        let id = world.query(filter);
        self.query_cache.insert(key.to_string(), id);
        id
    }

    /// Runs every enabled system, in stage order (`FrameStart` through `FrameEnd`), honoring
    /// `run_if` and the configured `ErrorPolicy`. Advances `frame_count` and `total_time`.
    pub fn update(&mut self, world: &mut World, delta_time: f32) -> Result<()> {
        self.ensure_built();
        self.total_time += delta_time as f64;
        self.frame_count += 1;
        let frame_count = self.frame_count;
        let total_time = self.total_time;

        for stage in STAGES {
            let order = self.stage_order[stage as usize].clone();
            for idx in order {
                if !self.systems[idx].enabled {
                    continue;
                }
                if let Some(run_if) = &self.systems[idx].run_if {
                    if !run_if(world) {
                        continue;
                    }
                }
                let mut ctx = Context {
                    world,
                    delta_time,
                    total_time,
                    frame_count,
                };
                let query_id = self.systems[idx].query_id;
                let result = (self.systems[idx].execute)(&mut ctx, query_id);
                if let Err(err) = result {
                    let name = self.systems[idx].name.clone();
                    if let Some(callback) = &mut self.error_callback {
                        callback(&name, &err);
                    }
                    #[cfg(feature = "profiling")]
                    error!(system = %name, error = %err, "system execution failed");
                    match self.error_policy {
                        ErrorPolicy::Continue => {}
                        ErrorPolicy::DisableAndContinue => {
                            self.systems[idx].enabled = false;
                            #[cfg(feature = "profiling")]
                            warn!(system = %name, "system disabled after failure");
                        }
                        ErrorPolicy::Throw => return Err(err),
                    }
                }
            }
        }
        Ok(())
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn total_time(&self) -> f64 {
        self.total_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Arc;

    #[test]
    fn systems_run_in_priority_then_name_order_within_a_stage() {
        let mut scheduler = SystemScheduler::new();
        let mut world = World::new();
        let log = Arc::new(std::sync::Mutex::new(Vec::new()));

        for (name, priority) in [("low", 0), ("high", 10), ("mid", 5)] {
            let log = log.clone();
            let name_owned = name.to_string();
            scheduler.add_system(
                &mut world,
                name,
                Stage::Update,
                priority,
                &[],
                None,
                None,
                Box::new(move |_ctx, _query| {
                    log.lock().unwrap().push(name_owned.clone());
                    Ok(())
                }),
            );
        }
        scheduler.update(&mut world, 1.0 / 60.0).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["low", "mid", "high"]);
    }

    #[test]
    fn after_constraint_is_respected_regardless_of_priority() {
        let mut scheduler = SystemScheduler::new();
        let mut world = World::new();
        let log = Arc::new(std::sync::Mutex::new(Vec::new()));

        let log_a = log.clone();
        scheduler.add_system(
            &mut world,
            "a",
            Stage::Update,
            100,
            &[],
            None,
            None,
            Box::new(move |_, _| {
                log_a.lock().unwrap().push("a");
                Ok(())
            }),
        );
        let log_b = log.clone();
        scheduler.add_system(
            &mut world,
            "b",
            Stage::Update,
            0,
            &["a"],
            None,
            None,
            Box::new(move |_, _| {
                log_b.lock().unwrap().push("b");
                Ok(())
            }),
        );
        scheduler.update(&mut world, 1.0 / 60.0).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn disabled_system_does_not_run() {
        let mut scheduler = SystemScheduler::new();
        let mut world = World::new();
        let count = Arc::new(AtomicI32::new(0));
        let count_clone = count.clone();
        scheduler.add_system(
            &mut world,
            "counter",
            Stage::Update,
            0,
            &[],
            None,
            None,
            Box::new(move |_, _| {
                count_clone.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        );
        scheduler.set_enabled("counter", false);
        scheduler.update(&mut world, 0.1).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn error_policy_disable_and_continue_disables_failing_system() {
        let mut scheduler = SystemScheduler::new();
        let mut world = World::new();
        scheduler.set_error_policy(ErrorPolicy::DisableAndContinue);
        scheduler.add_system(
            &mut world,
            "failing",
            Stage::Update,
            0,
            &[],
            None,
            None,
            Box::new(|_, _| Err(EcsError::InvariantViolated("boom".into()))),
        );
        scheduler.update(&mut world, 0.1).unwrap();
        assert!(!scheduler.is_enabled("failing"));
    }

    #[test]
    fn system_query_filter_is_cached_and_passed_to_execute() {
        #[derive(Debug, Clone, Copy, PartialEq)]
        struct Position {
            x: f32,
        }

        let mut scheduler = SystemScheduler::new();
        let mut world = World::new();
        let pos_id = world.register_component::<Position>();
        let e = world.spawn((Position { x: 1.0 },));

        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        scheduler.add_system(
            &mut world,
            "mover",
            Stage::Update,
            0,
            &[],
            Some(QueryFilter::new().all(&[pos_id])),
            None,
            Box::new(move |ctx, query| {
                let query = query.expect("query was registered for this system");
                seen_clone.lock().unwrap().extend(ctx.world.query_collect(query));
                Ok(())
            }),
        );
        scheduler.update(&mut world, 0.1).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![e]);
    }

    #[test]
    fn remove_system_deregisters_its_cached_query() {
        #[derive(Debug, Clone, Copy, PartialEq)]
        struct Position {
            x: f32,
        }

        let mut scheduler = SystemScheduler::new();
        let mut world = World::new();
        let pos_id = world.register_component::<Position>();
        scheduler.add_system(
            &mut world,
            "mover",
            Stage::Update,
            0,
            &[],
            Some(QueryFilter::new().all(&[pos_id])),
            None,
            Box::new(|_, _| Ok(())),
        );
        assert!(scheduler.remove_system(&mut world, "mover"));
        assert!(!scheduler.remove_system(&mut world, "mover"));
    }

    #[test]
    fn frame_count_and_total_time_accumulate() {
        let mut scheduler = SystemScheduler::new();
        let mut world = World::new();
        scheduler.update(&mut world, 0.5).unwrap();
        scheduler.update(&mut world, 0.25).unwrap();
        assert_eq!(scheduler.frame_count(), 2);
        assert!((scheduler.total_time() - 0.75).abs() < 1e-9);
    }
}
