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
//! Plain all-pairs engine
//!
//! Every body sums the pull of every other body, in index order, against
//! a snapshot of the tick's positions. With the `parallel` feature the
//! outer loop runs on Rayon's pool; each body is still written by exactly
//! one task, so the numbers are identical either way.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::body::{Body, GravityParams};
use crate::config::EngineConfig;
use crate::engine::{check_timestep, finish_body, validate_population, Engine};
use crate::error::Result;
use crate::render::RenderSink;

/// Single all-pairs loop, used as an oracle for the parallel engines
pub struct ReferenceEngine {
    config: EngineConfig,
    bodies: Vec<Body>,
    ticks: u64,
}

impl ReferenceEngine {
    /// Validate the population and wrap it
    ///
    /// The worker count in `config` is ignored.
    pub fn new(config: EngineConfig, bodies: Vec<Body>) -> Result<Self> {
        validate_population(&bodies)?;
        Ok(ReferenceEngine {
            config,
            bodies,
            ticks: 0,
        })
    }

    fn compute_forces(&mut self) {
        let snapshot = self.bodies.clone();
        let gravity = self.config.gravity;

        #[cfg(feature = "parallel")]
        self.bodies
            .par_iter_mut()
            .enumerate()
            .for_each(|(i, body)| pull_from_all(i, body, &snapshot, &gravity));

        #[cfg(not(feature = "parallel"))]
        self.bodies
            .iter_mut()
            .enumerate()
            .for_each(|(i, body)| pull_from_all(i, body, &snapshot, &gravity));
    }
}

fn pull_from_all(i: usize, body: &mut Body, snapshot: &[Body], gravity: &GravityParams) {
    for (j, other) in snapshot.iter().enumerate() {
        if i != j {
            body.add_force_with(other, gravity);
        }
    }
}

impl Engine for ReferenceEngine {
    fn name(&self) -> &str {
        "reference"
    }

    fn workers(&self) -> usize {
        1
    }

    fn ticks(&self) -> u64 {
        self.ticks
    }

    fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    fn advance(&mut self, dt: f64, mut sink: Option<&mut dyn RenderSink>) -> Result<()> {
        check_timestep(dt)?;
        self.compute_forces();
        for body in &mut self.bodies {
            finish_body(body, dt, &mut sink);
        }
        self.ticks += 1;
        if self.config.log_ticks {
            log::debug!("reference tick {} done: n={}, dt={:e}", self.ticks, self.bodies.len(), dt);
        }
        Ok(())
    }
}
