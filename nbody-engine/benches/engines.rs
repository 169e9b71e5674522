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
//! Benchmarks comparing engine architectures
//!
//! These benchmarks measure:
//! - Tick throughput for each architecture across worker counts
//! - Overhead of the render hook relative to pure benchmark mode

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use nbody_engine::body::{Body, DEFAULT_TIMESTEP};
use nbody_engine::config::EngineConfig;
use nbody_engine::engine::Architecture;
use nbody_engine::initializer::GalaxyInitializer;
use nbody_engine::render::Raster;
use rand::SeedableRng;
use rand_chacha::ChaChaRng;

fn galaxy(n: usize) -> Vec<Body> {
    GalaxyInitializer::default().generate(n, &mut ChaChaRng::seed_from_u64(42))
}

fn bench_tick_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick_throughput");

    for body_count in [256, 1024].iter() {
        // Pair interactions per tick
        group.throughput(Throughput::Elements((*body_count * (*body_count - 1)) as u64));

        let mut reference = Architecture::Reference
            .build(EngineConfig::default(), galaxy(*body_count))
            .unwrap();
        group.bench_with_input(BenchmarkId::new("reference", body_count), body_count, |b, _| {
            b.iter(|| reference.advance(black_box(DEFAULT_TIMESTEP), None).unwrap());
        });

        for workers in [1, 2, 4, 8] {
            for arch in [Architecture::Broadcast, Architecture::Systolic] {
                let mut engine = arch
                    .build(EngineConfig::new(workers), galaxy(*body_count))
                    .unwrap();
                group.bench_with_input(
                    BenchmarkId::new(format!("{}/p{}", arch, workers), body_count),
                    body_count,
                    |b, _| {
                        b.iter(|| engine.advance(black_box(DEFAULT_TIMESTEP), None).unwrap());
                    },
                );
            }
        }
    }

    group.finish();
}

fn bench_render_hook(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_hook");
    let body_count = 512;

    for arch in [Architecture::Broadcast, Architecture::Systolic] {
        group.bench_function(format!("{}/headless", arch), |b| {
            let mut engine = arch.build(EngineConfig::new(4), galaxy(body_count)).unwrap();
            b.iter(|| engine.advance(DEFAULT_TIMESTEP, None).unwrap());
        });

        group.bench_function(format!("{}/raster", arch), |b| {
            let mut engine = arch.build(EngineConfig::new(4), galaxy(body_count)).unwrap();
            let mut raster = Raster::new(250);
            b.iter(|| {
                raster.clear();
                engine.advance(DEFAULT_TIMESTEP, Some(&mut raster)).unwrap();
                black_box(raster.occupancy())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_tick_throughput, bench_render_hook);
criterion_main!(benches);
