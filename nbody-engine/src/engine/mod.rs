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
//! Parallel force engines
//!
//! Every engine owns the N bodies of a simulation and advances them one
//! tick at a time through [`Engine::advance`]. A tick has two phases:
//!
//! 1. **Compute**: workers accumulate pairwise forces. Only workers touch
//!    force accumulators.
//! 2. **Integrate**: the coordinator (the caller's thread) runs
//!    `update`, the render hook and `reset_force` on every body in index
//!    order. Only the coordinator touches bodies.
//!
//! The phases never overlap. Bodies are handed between threads by value
//! over channels, so at any instant a body has exactly one owner and
//! therefore one writer. No body is ever behind a lock.
//!
//! # Architectures
//!
//! - [`BroadcastEngine`]: each worker owns a fixed partition and swaps
//!   partition snapshots with every other worker each tick.
//! - [`SystolicEngine`]: workers form a ring of stages; all bodies flow
//!   through every stage once per tick.
//! - [`ReferenceEngine`]: the plain all-pairs loop, used as an oracle.

use std::fmt;
use std::str::FromStr;

use crate::body::Body;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::render::RenderSink;

mod broadcast;
mod reference;
mod systolic;

pub use broadcast::BroadcastEngine;
pub use reference::ReferenceEngine;
pub use systolic::SystolicEngine;

/// A parallel N-body force engine
pub trait Engine: Send {
    /// Human-readable architecture name
    fn name(&self) -> &str;

    /// Number of workers computing forces
    fn workers(&self) -> usize;

    /// Number of completed ticks
    fn ticks(&self) -> u64;

    /// Bodies in index order, final for the last completed tick
    fn bodies(&self) -> &[Body];

    /// Run one compute + integrate cycle of length `dt`
    ///
    /// When `sink` is present each body is plotted once, in index order,
    /// after integration. Returns once every body is final and safe to
    /// read through [`Engine::bodies`].
    fn advance(&mut self, dt: f64, sink: Option<&mut dyn RenderSink>) -> Result<()>;
}

/// Engine selector for command-line glue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Architecture {
    /// Partition snapshots exchanged between all workers
    Broadcast,
    /// Bodies streamed through a ring of stages
    Systolic,
    /// Single all-pairs loop
    Reference,
}

impl Architecture {
    /// Build an engine of this architecture
    pub fn build(self, config: EngineConfig, bodies: Vec<Body>) -> Result<Box<dyn Engine>> {
        Ok(match self {
            Architecture::Broadcast => Box::new(BroadcastEngine::new(config, bodies)?),
            Architecture::Systolic => Box::new(SystolicEngine::new(config, bodies)?),
            Architecture::Reference => Box::new(ReferenceEngine::new(config, bodies)?),
        })
    }

    /// Canonical lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Architecture::Broadcast => "broadcast",
            Architecture::Systolic => "systolic",
            Architecture::Reference => "reference",
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Architecture {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "broadcast" | "direct" => Ok(Architecture::Broadcast),
            "systolic" | "pipeline" => Ok(Architecture::Systolic),
            "reference" | "naive" => Ok(Architecture::Reference),
            _ => Err(EngineError::UnknownArchitecture(s.to_string())),
        }
    }
}

/// Reject empty populations and bodies with invalid state
pub(crate) fn validate_population(bodies: &[Body]) -> Result<()> {
    if bodies.is_empty() {
        return Err(EngineError::EmptyPopulation);
    }
    for (index, body) in bodies.iter().enumerate() {
        body.validate()
            .map_err(|reason| EngineError::InvalidBody { index, reason })?;
    }
    Ok(())
}

pub(crate) fn check_timestep(dt: f64) -> Result<()> {
    if dt > 0.0 && dt.is_finite() {
        Ok(())
    } else {
        Err(EngineError::InvalidTimestep(dt))
    }
}

/// Integrate phase for one body: update, plot, reset
pub(crate) fn finish_body(body: &mut Body, dt: f64, sink: &mut Option<&mut dyn RenderSink>) {
    body.update(dt);
    if let Some(sink) = sink.as_deref_mut() {
        body.plot(sink);
    }
    body.reset_force();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::ColorHint;

    #[test]
    fn test_architecture_from_str() {
        assert_eq!("broadcast".parse::<Architecture>(), Ok(Architecture::Broadcast));
        assert_eq!("direct".parse::<Architecture>(), Ok(Architecture::Broadcast));
        assert_eq!("Pipeline".parse::<Architecture>(), Ok(Architecture::Systolic));
        assert_eq!("reference".parse::<Architecture>(), Ok(Architecture::Reference));
        assert_eq!(
            "octree".parse::<Architecture>(),
            Err(EngineError::UnknownArchitecture("octree".to_string()))
        );
    }

    #[test]
    fn test_architecture_display_round_trip() {
        for arch in [Architecture::Broadcast, Architecture::Systolic, Architecture::Reference] {
            assert_eq!(arch.to_string().parse::<Architecture>(), Ok(arch));
        }
    }

    #[test]
    fn test_validate_population() {
        assert_eq!(validate_population(&[]), Err(EngineError::EmptyPopulation));

        let good = Body::at_rest([0.0, 0.0], 1.0, ColorHint::default());
        let bad = Body::at_rest([f64::NAN, 0.0], 1.0, ColorHint::default());
        assert!(validate_population(&[good]).is_ok());
        assert!(matches!(
            validate_population(&[good, bad]),
            Err(EngineError::InvalidBody { index: 1, .. })
        ));
    }

    #[test]
    fn test_check_timestep() {
        assert!(check_timestep(1e11).is_ok());
        assert_eq!(check_timestep(0.0), Err(EngineError::InvalidTimestep(0.0)));
        assert_eq!(check_timestep(-1.0), Err(EngineError::InvalidTimestep(-1.0)));
        assert!(check_timestep(f64::NAN).is_err());
        assert!(check_timestep(f64::INFINITY).is_err());
    }

    #[test]
    fn test_build_every_architecture() {
        let bodies = vec![
            Body::at_rest([0.0, 0.0], 1e30, ColorHint::default()),
            Body::at_rest([1e11, 0.0], 1e24, ColorHint::default()),
        ];
        for arch in [Architecture::Broadcast, Architecture::Systolic, Architecture::Reference] {
            let mut engine = arch.build(EngineConfig::new(2), bodies.clone()).unwrap();
            assert_eq!(engine.bodies().len(), 2);
            engine.advance(1e3, None).unwrap();
            assert_eq!(engine.ticks(), 1);
        }
    }
}
