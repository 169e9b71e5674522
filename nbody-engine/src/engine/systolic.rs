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
//! Systolic ring engine
//!
//! P persistent stages are joined by P+1 channels into a line:
//!
//! ```text
//! coordinator ─► ch[0] ─► stage 0 ─► ch[1] ─► ... ─► stage P-1 ─► ch[P] ─► coordinator
//! ```
//!
//! Each tick the coordinator pushes every body, in index order, into
//! `ch[0]`. Stage `k` then:
//!
//! 1. reads its own `|partition(k)|` bodies and pairs every new arrival
//!    with all earlier arrivals, adding the force to both ends;
//! 2. reads the remaining bodies one by one, adds each visitor's pull to
//!    every resident body and forwards the visitor unchanged;
//! 3. forwards its resident bodies.
//!
//! Stage `k` forwards `p(k+1), ..., p(P-1), p(0), ..., p(k)`, so the next
//! stage always sees its own partition first and the tail yields bodies
//! in index order again.
//!
//! Visitors are never force-accumulated by the stages they pass. This is
//! complete rather than lopsided: a body in partition `h` takes the pull
//! of every body of partition `s` when those bodies visit stage `h`, and
//! partition `s` takes its pull back when the body visits stage `s`.
//! Every ordered pair is counted exactly once per tick.
//!
//! Bodies travel by value tagged with their global index. Stages assert
//! that their resident bodies are exactly their partition; the
//! coordinator checks the tail order.

use std::ops::Range;
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::thread::{self, JoinHandle};

use crate::body::{Body, GravityParams};
use crate::config::EngineConfig;
use crate::engine::{check_timestep, finish_body, validate_population, Engine};
use crate::error::{EngineError, Result};
use crate::partition::PartitionScheme;
use crate::render::RenderSink;

/// A body in flight with its global index
#[derive(Debug, Clone, Copy)]
struct Parcel {
    index: usize,
    body: Body,
}

/// One stage of the ring
struct Stage {
    id: usize,
    range: Range<usize>,
    population: usize,
    inlet: Receiver<Parcel>,
    outlet: SyncSender<Parcel>,
    gravity: GravityParams,
}

impl Stage {
    fn run(self) {
        let mut resident = Vec::with_capacity(self.range.len());
        while self.tick(&mut resident).is_some() {}
        log::debug!("systolic stage {} exiting", self.id);
    }

    /// One pass of the pipeline; None once a neighbour has hung up
    fn tick(&self, resident: &mut Vec<Parcel>) -> Option<()> {
        resident.clear();

        for _ in 0..self.range.len() {
            let mut arriving = self.inlet.recv().ok()?;
            assert!(
                self.range.contains(&arriving.index),
                "stage {} expected a body from {:?}, got index {}",
                self.id,
                self.range,
                arriving.index
            );
            let probe = arriving.body;
            for earlier in resident.iter_mut() {
                arriving.body.add_force_with(&earlier.body, &self.gravity);
                earlier.body.add_force_with(&probe, &self.gravity);
            }
            resident.push(arriving);
        }

        for _ in self.range.len()..self.population {
            let visitor = self.inlet.recv().ok()?;
            assert!(
                !self.range.contains(&visitor.index),
                "stage {} saw its own body {} among visitors",
                self.id,
                visitor.index
            );
            for host in resident.iter_mut() {
                host.body.add_force_with(&visitor.body, &self.gravity);
            }
            self.outlet.send(visitor).ok()?;
        }

        for parcel in resident.drain(..) {
            self.outlet.send(parcel).ok()?;
        }
        Some(())
    }
}

/// Engine where bodies stream through a ring of worker stages
///
/// # Example
///
/// ```
/// use nbody_engine::body::Body;
/// use nbody_engine::config::EngineConfig;
/// use nbody_engine::engine::{Engine, SystolicEngine};
/// use nbody_engine::render::ColorHint;
///
/// let bodies = vec![
///     Body::at_rest([0.0, 0.0], 1e30, ColorHint::default()),
///     Body::at_rest([1e11, 0.0], 1e24, ColorHint::default()),
///     Body::at_rest([0.0, 1e11], 1e24, ColorHint::default()),
/// ];
/// let mut engine = SystolicEngine::new(EngineConfig::new(3), bodies).unwrap();
/// engine.advance(1e3, None).unwrap();
/// assert!(engine.bodies()[2].velocity()[1] < 0.0);
/// ```
pub struct SystolicEngine {
    config: EngineConfig,
    ranges: Vec<Range<usize>>,
    bodies: Vec<Body>,
    head: Option<SyncSender<Parcel>>,
    tail: Receiver<Parcel>,
    handles: Vec<JoinHandle<()>>,
    ticks: u64,
    poisoned: bool,
}

impl SystolicEngine {
    /// Validate the population, partition it and start P ring stages
    pub fn new(config: EngineConfig, bodies: Vec<Body>) -> Result<Self> {
        config.validate()?;
        validate_population(&bodies)?;
        let workers = config.workers;
        let population = bodies.len();
        let ranges = PartitionScheme::Pipeline.validate(population, workers)?;

        // Up to N parcels sit in any one channel during a tick.
        let (head, mut inlet) = sync_channel::<Parcel>(population);
        let mut handles = Vec::with_capacity(workers);
        for (id, range) in ranges.iter().enumerate() {
            let (outlet, next_inlet) = sync_channel::<Parcel>(population);
            let stage = Stage {
                id,
                range: range.clone(),
                population,
                inlet,
                outlet,
                gravity: config.gravity,
            };
            let handle = thread::Builder::new()
                .name(format!("systolic-{}", id))
                .spawn(move || stage.run())
                .map_err(|err| EngineError::WorkerSpawn {
                    worker: id,
                    reason: err.to_string(),
                })?;
            handles.push(handle);
            inlet = next_inlet;
        }

        log::info!(
            "systolic engine started: n={}, p={}, partition sizes {:?}",
            population,
            workers,
            ranges.iter().map(|r| r.len()).collect::<Vec<_>>()
        );

        Ok(SystolicEngine {
            config,
            ranges,
            bodies,
            head: Some(head),
            tail: inlet,
            handles,
            ticks: 0,
            poisoned: false,
        })
    }

    /// Partition resident at each stage
    pub fn partitions(&self) -> &[Range<usize>] {
        &self.ranges
    }

    /// Stop the ring and report any stage that panicked
    pub fn shutdown(mut self) -> Result<()> {
        self.stop()
    }

    fn stop(&mut self) -> Result<()> {
        // Dropping the head hangs up stage 0; the hang-up cascades down the ring.
        if self.head.take().is_none() {
            return Ok(());
        }
        let stages = self.handles.len();
        let mut result = Ok(());
        for (worker, handle) in self.handles.drain(..).enumerate() {
            if handle.join().is_err() {
                log::warn!("systolic stage {} panicked", worker);
                result = Err(EngineError::WorkerPanicked { worker });
            }
        }
        log::info!("systolic engine stopped: p={}, {} stages joined", self.config.workers, stages);
        result
    }

    fn tick(&mut self, dt: f64, mut sink: Option<&mut dyn RenderSink>) -> Result<()> {
        let head = self
            .head
            .as_ref()
            .ok_or(EngineError::WorkerDisconnected { worker: 0 })?;
        let population = self.bodies.len();
        for (index, body) in std::mem::take(&mut self.bodies).into_iter().enumerate() {
            head.send(Parcel { index, body })
                .map_err(|_| EngineError::WorkerDisconnected { worker: 0 })?;
        }

        let last = self.ranges.len() - 1;
        let mut bodies = Vec::with_capacity(population);
        for expected in 0..population {
            let Parcel { index, mut body } = self
                .tail
                .recv()
                .map_err(|_| EngineError::WorkerDisconnected { worker: last })?;
            if index != expected {
                return Err(EngineError::ProtocolViolation(format!(
                    "tail yielded body {} where {} was expected",
                    index, expected
                )));
            }
            finish_body(&mut body, dt, &mut sink);
            bodies.push(body);
        }
        self.bodies = bodies;
        Ok(())
    }
}

impl Engine for SystolicEngine {
    fn name(&self) -> &str {
        "systolic"
    }

    fn workers(&self) -> usize {
        self.config.workers
    }

    fn ticks(&self) -> u64 {
        self.ticks
    }

    fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    fn advance(&mut self, dt: f64, sink: Option<&mut dyn RenderSink>) -> Result<()> {
        check_timestep(dt)?;
        if self.poisoned {
            return Err(EngineError::Poisoned);
        }
        self.poisoned = true;
        self.tick(dt, sink)?;
        self.poisoned = false;
        self.ticks += 1;
        if self.config.log_ticks {
            log::debug!(
                "systolic tick {} done: n={}, p={}, dt={:e}",
                self.ticks,
                self.bodies.len(),
                self.config.workers,
                dt
            );
        }
        Ok(())
    }
}

impl Drop for SystolicEngine {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
