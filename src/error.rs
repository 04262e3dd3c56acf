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

//! Error types.
//!
//! Recoverable conditions (not-live entity, unregistered component, absent component) are
//! reported as `bool`/`Option` returns throughout the crate, per the propagation rule — they are
//! never constructed as `EcsError` values. `EcsError` is reserved for operations that return
//! `Result`: contract breaches, scheduler cycles, system failures under policy, and device
//! failures.

use std::fmt;

/// Crate-wide error type, covering the fatal/propagated half of the error taxonomy.
#[derive(Debug, Clone)]
pub enum EcsError {
    /// A contract breach: archetype row-count mismatch, index-space overflow, double-apply of a
    /// `CommandBuffer`, or similar.
    InvariantViolated(String),

    /// `DagScheduler::topo_sort` found a cycle; carries the cyclic path (node ids, in order).
    CycleDetected(Vec<String>),

    /// A system's `execute` raised an error, captured structurally.
    SystemFailure {
        system: String,
        stage: String,
        message: String,
    },

    /// A device-trait call (`create_buffer`/`update`/`destroy`) failed; propagated unchanged.
    DeviceFailure(String),
}

impl fmt::Display for EcsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EcsError::InvariantViolated(msg) => write!(f, "invariant violated: {msg}"),
            EcsError::CycleDetected(path) => {
                write!(f, "dependency cycle detected: {}", path.join(" -> "))
            }
            EcsError::SystemFailure {
                system,
                stage,
                message,
            } => write!(f, "system '{system}' failed in stage '{stage}': {message}"),
            EcsError::DeviceFailure(msg) => write!(f, "device failure: {msg}"),
        }
    }
}

impl std::error::Error for EcsError {}

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EcsError>;
