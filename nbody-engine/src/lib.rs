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
//! # N-Body Engine
//!
//! Parallel all-pairs gravity for N point masses in the plane. Every tick
//! computes all pairwise forces exactly once against a consistent snapshot
//! of positions, then integrates every body.
//!
//! ## Features
//!
//! - **Broadcast exchange**: workers own fixed partitions and trade
//!   partition snapshots each tick behind a completion barrier
//! - **Systolic ring**: bodies stream through a fixed ring of stages,
//!   picking up forces as they pass
//! - **Lock-free ownership**: bodies move between threads by value, so a
//!   force accumulator never has two writers
//! - **Deterministic**: results do not depend on thread scheduling
//! - **Parallel reference**: optional Rayon-backed all-pairs oracle
//!
//! ## Example
//!
//! ```rust
//! use nbody_engine::config::EngineConfig;
//! use nbody_engine::engine::{Architecture, Engine};
//! use nbody_engine::initializer::GalaxyInitializer;
//! use rand::SeedableRng;
//! use rand_chacha::ChaChaRng;
//!
//! let mut rng = ChaChaRng::seed_from_u64(42);
//! let bodies = GalaxyInitializer::default().generate(64, &mut rng);
//!
//! let mut engine = Architecture::Systolic
//!     .build(EngineConfig::new(4), bodies)
//!     .unwrap();
//! for _ in 0..3 {
//!     engine.advance(nbody_engine::body::DEFAULT_TIMESTEP, None).unwrap();
//! }
//! assert_eq!(engine.bodies().len(), 64);
//! ```

#![warn(missing_docs)]

/// Point masses and the gravity kernel
pub mod body;

/// Engine configuration
pub mod config;

/// Conserved-quantity diagnostics
pub mod diagnostics;

/// Parallel force engines
pub mod engine;

/// Error types
pub mod error;

/// Seedable initial populations
pub mod initializer;

/// Division of bodies among workers
pub mod partition;

/// Render sink boundary
pub mod render;

pub use body::Body;
pub use config::EngineConfig;
pub use engine::{Architecture, Engine};
pub use error::{EngineError, Result};
