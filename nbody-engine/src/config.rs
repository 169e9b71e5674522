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
//! Engine configuration

use crate::body::GravityParams;
use crate::error::{EngineError, Result};

/// Configuration shared by every engine architecture
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Number of concurrent workers (P)
    pub workers: usize,
    /// Gravity kernel parameters
    pub gravity: GravityParams,
    /// Whether to emit a debug log line per tick
    pub log_ticks: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            workers: 1,
            gravity: GravityParams::default(),
            log_ticks: false,
        }
    }
}

impl EngineConfig {
    /// Create a configuration with `workers` workers and default gravity
    pub fn new(workers: usize) -> Self {
        EngineConfig {
            workers,
            ..Self::default()
        }
    }

    /// Use custom gravity parameters
    pub fn with_gravity(mut self, gravity: GravityParams) -> Self {
        self.gravity = gravity;
        self
    }

    /// Enable per-tick debug logging
    pub fn with_tick_logging(mut self) -> Self {
        self.log_ticks = true;
        self
    }

    /// Check the worker count
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(EngineError::InvalidWorkerCount);
        }
        Ok(())
    }
}
