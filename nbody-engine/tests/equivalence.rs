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
//! Parallel engines against the all-pairs reference
//!
//! Both parallel engines must reproduce the plain O(N²) loop. The
//! broadcast engine sums every body's contributions in ascending index
//! order for any worker count, so it matches bit for bit. The systolic
//! ring visits partitions in ring order and matches to rounding.

use nbody_engine::body::{Body, DEFAULT_TIMESTEP};
use nbody_engine::config::EngineConfig;
use nbody_engine::engine::Architecture;
use nbody_engine::initializer::GalaxyInitializer;
use nbody_engine::render::{ColorHint, RenderSink};
use rand::SeedableRng;
use rand_chacha::ChaChaRng;

fn galaxy(n: usize, seed: u64) -> Vec<Body> {
    GalaxyInitializer::default().generate(n, &mut ChaChaRng::seed_from_u64(seed))
}

fn run(arch: Architecture, workers: usize, bodies: Vec<Body>, ticks: usize) -> Vec<Body> {
    let mut engine = arch.build(EngineConfig::new(workers), bodies).unwrap();
    for _ in 0..ticks {
        engine.advance(DEFAULT_TIMESTEP, None).unwrap();
    }
    engine.bodies().to_vec()
}

/// Largest absolute position and velocity components, for tolerances
fn scales(bodies: &[Body]) -> (f64, f64) {
    bodies.iter().fold((0.0_f64, 0.0_f64), |(p, v), b| {
        let [x, y] = b.position();
        let [vx, vy] = b.velocity();
        (p.max(x.abs()).max(y.abs()), v.max(vx.abs()).max(vy.abs()))
    })
}

fn assert_close(actual: &[Body], expected: &[Body], relative: f64) {
    assert_eq!(actual.len(), expected.len());
    let (position_scale, velocity_scale) = scales(expected);
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        for axis in 0..2 {
            let dp = (a.position()[axis] - e.position()[axis]).abs();
            let dv = (a.velocity()[axis] - e.velocity()[axis]).abs();
            assert!(dp <= relative * position_scale, "body {} position off by {}", i, dp);
            assert!(dv <= relative * velocity_scale, "body {} velocity off by {}", i, dv);
        }
        assert_eq!(a.mass(), e.mass());
        assert_eq!(a.color(), e.color());
    }
}

#[test]
fn test_single_worker_matches_reference_exactly() {
    let bodies = galaxy(50, 2024);
    let expected = run(Architecture::Reference, 1, bodies.clone(), 10);

    for arch in [Architecture::Broadcast, Architecture::Systolic] {
        let actual = run(arch, 1, bodies.clone(), 10);
        assert_eq!(actual, expected, "{} with P=1 diverged from reference", arch);
    }
}

#[test]
fn test_broadcast_bit_identical_for_any_worker_count() {
    let bodies = galaxy(50, 99);
    let expected = run(Architecture::Reference, 1, bodies.clone(), 10);

    for workers in 1..=7 {
        let actual = run(Architecture::Broadcast, workers, bodies.clone(), 10);
        assert_eq!(actual, expected, "broadcast with P={} diverged", workers);
    }
}

#[test]
fn test_systolic_matches_reference_for_many_workers() {
    let bodies = galaxy(50, 7);
    let expected = run(Architecture::Reference, 1, bodies.clone(), 10);

    for workers in [2, 3, 4, 7, 16] {
        let actual = run(Architecture::Systolic, workers, bodies.clone(), 10);
        assert_close(&actual, &expected, 1e-9);
    }
}

#[test]
fn test_p1_and_p4_agree() {
    let bodies = galaxy(40, 5);
    for arch in [Architecture::Broadcast, Architecture::Systolic] {
        let one = run(arch, 1, bodies.clone(), 1);
        let four = run(arch, 4, bodies.clone(), 1);
        assert_close(&four, &one, 1e-12);
    }
}

#[test]
fn test_repeated_runs_are_deterministic() {
    let bodies = galaxy(60, 31337);
    for arch in [Architecture::Broadcast, Architecture::Systolic] {
        let first = run(arch, 4, bodies.clone(), 5);
        let second = run(arch, 4, bodies.clone(), 5);
        assert_eq!(first, second, "{} is not deterministic", arch);
    }
}

#[test]
fn test_advance_continues_where_previous_left_off() {
    let bodies = galaxy(30, 12);
    for arch in [Architecture::Broadcast, Architecture::Systolic] {
        let straight = run(arch, 3, bodies.clone(), 6);
        let halfway = run(arch, 3, bodies.clone(), 3);
        let resumed = run(arch, 3, halfway, 3);
        assert_eq!(straight, resumed);
    }
}

#[derive(Default)]
struct Recorder {
    points: Vec<(f64, f64, ColorHint)>,
}

impl RenderSink for Recorder {
    fn plot(&mut self, x: f64, y: f64, color: ColorHint) {
        self.points.push((x, y, color));
    }
}

#[test]
fn test_render_hook_sees_every_body_once_in_order() {
    let bodies = galaxy(25, 8);
    for arch in [Architecture::Broadcast, Architecture::Systolic, Architecture::Reference] {
        let mut engine = arch.build(EngineConfig::new(3), bodies.clone()).unwrap();
        let mut recorder = Recorder::default();
        engine.advance(DEFAULT_TIMESTEP, Some(&mut recorder)).unwrap();

        let expected: Vec<(f64, f64, ColorHint)> = engine
            .bodies()
            .iter()
            .map(|b| (b.x(), b.y(), b.color()))
            .collect();
        assert_eq!(recorder.points, expected, "{} plotted out of order", arch);
    }
}
