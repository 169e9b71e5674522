// Copyright 2025 John Brosnihan
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
//! Error types for engine construction and ticking
//!
//! The force and integration math has no failure modes of its own. What can
//! go wrong is configuration (bad worker count, empty population, invalid
//! bodies) and protocol breakage between the coordinator and its workers.
//! A protocol break is always a defect: workers panic on the spot and the
//! coordinator reports the hang-up as one of the variants below.

use thiserror::Error;

/// Errors reported by the engines
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The worker count must be at least one
    #[error("worker count must be at least 1")]
    InvalidWorkerCount,

    /// The engine was handed no bodies
    #[error("body population is empty")]
    EmptyPopulation,

    /// A body failed validation when the engine was built
    #[error("body {index} is invalid: {reason}")]
    InvalidBody {
        /// Index of the offending body
        index: usize,
        /// What was wrong with it
        reason: String,
    },

    /// `advance` was called with a non-positive or non-finite timestep
    #[error("timestep must be positive and finite, got {0}")]
    InvalidTimestep(f64),

    /// Gravitational constant or softening out of range
    #[error("invalid gravity parameters: {0}")]
    InvalidGravity(String),

    /// Partitions do not cover the population exactly once
    #[error("partitions for n={bodies}, p={workers} do not cover [0, n): {detail}")]
    PartitionCoverage {
        /// Body count
        bodies: usize,
        /// Worker count
        workers: usize,
        /// First defect found
        detail: String,
    },

    /// A worker hung up mid-protocol
    #[error("worker {worker} disconnected")]
    WorkerDisconnected {
        /// Id of the worker whose channel closed
        worker: usize,
    },

    /// The coordinator saw the wrong item count or order
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// A worker thread could not be started
    #[error("failed to spawn worker {worker}: {reason}")]
    WorkerSpawn {
        /// Id of the worker that failed to start
        worker: usize,
        /// Error reported by the OS
        reason: String,
    },

    /// An earlier tick failed and the engine no longer holds all bodies
    #[error("engine is poisoned by an earlier failed tick")]
    Poisoned,

    /// Architecture name not recognised
    #[error("unknown architecture '{0}', expected broadcast or systolic")]
    UnknownArchitecture(String),

    /// A worker thread panicked and was found on join
    #[error("worker {worker} panicked")]
    WorkerPanicked {
        /// Id of the panicked worker
        worker: usize,
    },
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, EngineError>;
