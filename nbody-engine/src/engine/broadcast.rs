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
//! Broadcast-exchange engine
//!
//! Each of the P workers owns a fixed, contiguous partition of the bodies.
//! Worker 0 runs on the coordinator's thread; workers 1..P are persistent
//! threads. A tick goes:
//!
//! ```text
//! coordinator: hand partition k to worker k ──► start signal
//! worker k:    publish snapshot of partition k to every peer inbox
//!              receive P-1 peer snapshots
//!              accumulate forces, sources in worker order
//!              return partition k ──► completion barrier
//! coordinator: wait for P-1 completions, then integrate all bodies
//! ```
//!
//! Snapshots are published from the freshly integrated state at the top
//! of the tick, so every worker computes against the same positions.
//! Sources are walked in worker order with the worker's own partition in
//! its slot, which means each body sums its contributions in ascending
//! global index order whatever P is.

use std::ops::Range;
use std::sync::mpsc::{sync_channel, Receiver, RecvTimeoutError, SyncSender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::body::{Body, GravityParams};
use crate::config::EngineConfig;
use crate::engine::{check_timestep, finish_body, validate_population, Engine};
use crate::error::{EngineError, Result};
use crate::partition::PartitionScheme;
use crate::render::RenderSink;

/// How often the completion barrier checks for workers that died mid-tick
const BARRIER_POLL: Duration = Duration::from_millis(20);

/// How long a poisoned engine waits for workers to wind down before detaching them
const SHUTDOWN_GRACE: Duration = Duration::from_millis(250);

/// Immutable copy of one partition, shared with every peer
#[derive(Debug)]
struct PartitionSnapshot {
    source: usize,
    bodies: Vec<Body>,
}

type Snapshot = Arc<PartitionSnapshot>;

/// Partition handed back through the completion barrier
struct Completion {
    worker: usize,
    bodies: Vec<Body>,
    outcome: Result<()>,
}

/// One worker's view of the snapshot exchange
struct Exchange {
    id: usize,
    workers: usize,
    inbox: Receiver<Snapshot>,
    peers: Vec<(usize, SyncSender<Snapshot>)>,
    gravity: GravityParams,
}

impl Exchange {
    /// Compute phase for one partition
    fn run(&self, local: &mut [Body]) -> Result<()> {
        let own = Arc::new(PartitionSnapshot {
            source: self.id,
            bodies: local.to_vec(),
        });
        for (peer, inbox) in &self.peers {
            inbox
                .send(Arc::clone(&own))
                .map_err(|_| EngineError::WorkerDisconnected { worker: *peer })?;
        }

        let mut sources: Vec<Option<Snapshot>> = vec![None; self.workers];
        for received in 0..self.peers.len() {
            let snapshot = self.inbox.recv().map_err(|_| {
                EngineError::ProtocolViolation(format!(
                    "worker {} inbox closed after {} of {} snapshots",
                    self.id,
                    received,
                    self.peers.len()
                ))
            })?;
            assert!(
                snapshot.source < self.workers,
                "worker {} received a snapshot from unknown worker {}",
                self.id,
                snapshot.source
            );
            let slot = &mut sources[snapshot.source];
            if slot.is_some() || snapshot.source == self.id {
                return Err(EngineError::ProtocolViolation(format!(
                    "worker {} received an unexpected snapshot from worker {}",
                    self.id, snapshot.source
                )));
            }
            *slot = Some(snapshot);
        }
        sources[self.id] = Some(own);

        for (source, snapshot) in sources.iter().enumerate() {
            let snapshot = snapshot.as_ref().ok_or_else(|| {
                EngineError::ProtocolViolation(format!(
                    "worker {} is missing the snapshot of worker {}",
                    self.id, source
                ))
            })?;
            if source == self.id {
                accumulate_within(local, &snapshot.bodies, &self.gravity);
            } else {
                accumulate_from(local, &snapshot.bodies, &self.gravity);
            }
        }
        Ok(())
    }
}

/// Forces between bodies of the same partition, self-pairs excluded
fn accumulate_within(local: &mut [Body], snapshot: &[Body], gravity: &GravityParams) {
    for (i, body) in local.iter_mut().enumerate() {
        for (j, other) in snapshot.iter().enumerate() {
            if i != j {
                body.add_force_with(other, gravity);
            }
        }
    }
}

/// Forces a foreign partition exerts on the local one
fn accumulate_from(local: &mut [Body], foreign: &[Body], gravity: &GravityParams) {
    for body in local.iter_mut() {
        for other in foreign {
            body.add_force_with(other, gravity);
        }
    }
}

fn worker_loop(exchange: Exchange, start: Receiver<Vec<Body>>, done: SyncSender<Completion>) {
    let worker = exchange.id;
    while let Ok(mut bodies) = start.recv() {
        let outcome = exchange.run(&mut bodies);
        let failed = outcome.is_err();
        if done.send(Completion { worker, bodies, outcome }).is_err() || failed {
            break;
        }
    }
    log::debug!("broadcast worker {} exiting", worker);
}

/// Engine where workers own fixed partitions and swap snapshots each tick
///
/// # Example
///
/// ```
/// use nbody_engine::body::Body;
/// use nbody_engine::config::EngineConfig;
/// use nbody_engine::engine::{BroadcastEngine, Engine};
/// use nbody_engine::render::ColorHint;
///
/// let bodies = vec![
///     Body::at_rest([0.0, 0.0], 1e30, ColorHint::default()),
///     Body::at_rest([1e11, 0.0], 1e24, ColorHint::default()),
///     Body::at_rest([0.0, 1e11], 1e24, ColorHint::default()),
/// ];
/// let mut engine = BroadcastEngine::new(EngineConfig::new(2), bodies).unwrap();
/// engine.advance(1e3, None).unwrap();
/// assert!(engine.bodies()[1].velocity()[0] < 0.0);
/// ```
pub struct BroadcastEngine {
    config: EngineConfig,
    ranges: Vec<Range<usize>>,
    bodies: Vec<Body>,
    coordinator: Exchange,
    starts: Vec<SyncSender<Vec<Body>>>,
    done: Receiver<Completion>,
    handles: Vec<JoinHandle<()>>,
    ticks: u64,
    poisoned: bool,
    stopped: bool,
}

impl BroadcastEngine {
    /// Validate the population, partition it and start P-1 worker threads
    pub fn new(config: EngineConfig, bodies: Vec<Body>) -> Result<Self> {
        config.validate()?;
        validate_population(&bodies)?;
        let workers = config.workers;
        let ranges = PartitionScheme::Broadcast.validate(bodies.len(), workers)?;

        // Every inbox receives exactly P-1 snapshots per tick.
        let capacity = (workers - 1).max(1);
        let (inbox_txs, inbox_rxs): (Vec<_>, Vec<_>) =
            (0..workers).map(|_| sync_channel::<Snapshot>(capacity)).unzip();
        let (done_tx, done_rx) = sync_channel::<Completion>(workers);

        let mut exchanges: Vec<Exchange> = inbox_rxs
            .into_iter()
            .enumerate()
            .map(|(id, inbox)| Exchange {
                id,
                workers,
                inbox,
                peers: inbox_txs
                    .iter()
                    .enumerate()
                    .filter(|(peer, _)| *peer != id)
                    .map(|(peer, tx)| (peer, tx.clone()))
                    .collect(),
                gravity: config.gravity,
            })
            .collect();
        drop(inbox_txs);

        let remote = exchanges.split_off(1);
        let coordinator = exchanges.remove(0);

        let mut starts = Vec::with_capacity(workers - 1);
        let mut handles = Vec::with_capacity(workers - 1);
        for exchange in remote {
            let id = exchange.id;
            let (start_tx, start_rx) = sync_channel::<Vec<Body>>(1);
            let done = done_tx.clone();
            let handle = thread::Builder::new()
                .name(format!("broadcast-{}", id))
                .spawn(move || worker_loop(exchange, start_rx, done))
                .map_err(|err| EngineError::WorkerSpawn {
                    worker: id,
                    reason: err.to_string(),
                })?;
            starts.push(start_tx);
            handles.push(handle);
        }

        log::info!(
            "broadcast engine started: n={}, p={}, partition sizes {:?}",
            bodies.len(),
            workers,
            ranges.iter().map(|r| r.len()).collect::<Vec<_>>()
        );

        Ok(BroadcastEngine {
            config,
            ranges,
            bodies,
            coordinator,
            starts,
            done: done_rx,
            handles,
            ticks: 0,
            poisoned: false,
            stopped: false,
        })
    }

    /// Partition owned by each worker
    pub fn partitions(&self) -> &[Range<usize>] {
        &self.ranges
    }

    /// Stop the workers and report any that panicked
    pub fn shutdown(mut self) -> Result<()> {
        self.stop()
    }

    fn stop(&mut self) -> Result<()> {
        if self.stopped {
            return Ok(());
        }
        self.stopped = true;
        // Closing the start channels ends every idle worker loop.
        self.starts.clear();
        let poisoned = self.poisoned;
        if poisoned {
            // Workers stuck mid-exchange may be waiting on the coordinator's senders.
            self.coordinator.peers.clear();
            let deadline = Instant::now() + SHUTDOWN_GRACE;
            while Instant::now() < deadline && !self.handles.iter().all(|h| h.is_finished()) {
                thread::sleep(Duration::from_millis(1));
            }
        }

        let spawned = self.handles.len();
        let mut joined = 0;
        let mut result = Ok(());
        for (offset, handle) in self.handles.drain(..).enumerate() {
            let worker = offset + 1;
            if poisoned && !handle.is_finished() {
                log::warn!("broadcast worker {} still busy after a failed tick; detaching", worker);
                continue;
            }
            joined += 1;
            if handle.join().is_err() {
                log::warn!("broadcast worker {} panicked", worker);
                result = Err(EngineError::WorkerPanicked { worker });
            }
        }
        log::info!(
            "broadcast engine stopped: p={}, {} of {} worker threads joined",
            self.config.workers,
            joined,
            spawned
        );
        result
    }

    /// First worker that exited without handing back its partition
    fn vanished_worker(&self, parts: &[Option<Vec<Body>>]) -> Option<usize> {
        (1..parts.len()).find(|&worker| {
            parts[worker].is_none() && self.handles.get(worker - 1).map_or(true, |h| h.is_finished())
        })
    }

    fn tick(&mut self, dt: f64, mut sink: Option<&mut dyn RenderSink>) -> Result<()> {
        let mut rest = std::mem::take(&mut self.bodies);
        let mut parts: Vec<Option<Vec<Body>>> = vec![None; self.ranges.len()];
        for (id, range) in self.ranges.iter().enumerate().rev() {
            parts[id] = Some(rest.split_off(range.start));
        }

        for (offset, start) in self.starts.iter().enumerate() {
            let worker = offset + 1;
            let part = parts[worker].take().unwrap_or_default();
            start
                .send(part)
                .map_err(|_| EngineError::WorkerDisconnected { worker })?;
        }

        let mut own = parts[0].take().unwrap_or_default();
        self.coordinator.run(&mut own)?;
        parts[0] = Some(own);

        for _ in 0..self.starts.len() {
            let completion = loop {
                match self.done.recv_timeout(BARRIER_POLL) {
                    Ok(completion) => break completion,
                    Err(RecvTimeoutError::Timeout) => {
                        if let Some(worker) = self.vanished_worker(&parts) {
                            // A worker sends its completion before it exits.
                            match self.done.try_recv() {
                                Ok(completion) => break completion,
                                Err(_) => return Err(EngineError::WorkerDisconnected { worker }),
                            }
                        }
                    }
                    Err(RecvTimeoutError::Disconnected) => {
                        return Err(EngineError::ProtocolViolation(
                            "completion channel closed".to_string(),
                        ))
                    }
                }
            };
            completion.outcome?;
            let worker = completion.worker;
            if parts[worker].is_some() {
                return Err(EngineError::ProtocolViolation(format!(
                    "worker {} completed twice in one tick",
                    worker
                )));
            }
            if completion.bodies.len() != self.ranges[worker].len() {
                return Err(EngineError::ProtocolViolation(format!(
                    "worker {} returned {} bodies, expected {}",
                    worker,
                    completion.bodies.len(),
                    self.ranges[worker].len()
                )));
            }
            parts[worker] = Some(completion.bodies);
        }

        // Barrier passed: no worker holds a body any more.
        let mut bodies = Vec::with_capacity(self.ranges.last().map_or(0, |r| r.end));
        for part in parts.into_iter().flatten() {
            for mut body in part {
                finish_body(&mut body, dt, &mut sink);
                bodies.push(body);
            }
        }
        self.bodies = bodies;
        Ok(())
    }
}

impl Engine for BroadcastEngine {
    fn name(&self) -> &str {
        "broadcast"
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
                "broadcast tick {} done: n={}, p={}, dt={:e}",
                self.ticks,
                self.bodies.len(),
                self.config.workers,
                dt
            );
        }
        Ok(())
    }
}

impl Drop for BroadcastEngine {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
