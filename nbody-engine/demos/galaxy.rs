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
//! Galaxy Simulation Demo
//!
//! Runs a galaxy of N bodies around a heavy central mass on either engine
//! architecture and reports the best wall-clock time over several runs.
//!
//! # Running
//!
//! ```bash
//! # Broadcast engine, 4 workers, 1000 bodies, 100 steps
//! cargo run --example galaxy --release -- -p 4 -n 1000 --steps 100
//!
//! # Systolic ring, rasterising every frame
//! cargo run --example galaxy --release -- --arch systolic -p 8 --render
//!
//! # Per-tick logging
//! RUST_LOG=debug cargo run --example galaxy -- --steps 3 --log-ticks
//! ```

use std::time::{Duration, Instant};

use clap::Parser;
use nbody_engine::body::DEFAULT_TIMESTEP;
use nbody_engine::config::EngineConfig;
use nbody_engine::diagnostics::{kinetic_energy, momentum_scale, total_momentum};
use nbody_engine::engine::Architecture;
use nbody_engine::initializer::GalaxyInitializer;
use nbody_engine::render::{Raster, DEFAULT_RESOLUTION};
use rand::SeedableRng;
use rand_chacha::ChaChaRng;

/// Command-line options
#[derive(Parser, Debug)]
#[command(about = "Parallel N-body galaxy simulation")]
struct Args {
    /// Number of workers
    #[arg(short = 'p', long, default_value_t = 1)]
    parallelism: usize,

    /// Number of bodies
    #[arg(short = 'n', long, default_value_t = 1000)]
    bodies: usize,

    /// Steps per run
    #[arg(long, default_value_t = 1000)]
    steps: usize,

    /// Number of timed runs; the best one is reported
    #[arg(long, default_value_t = 10)]
    tests: usize,

    /// Engine architecture: broadcast (direct) or systolic (pipeline)
    #[arg(long, default_value = "broadcast")]
    arch: Architecture,

    /// Seed for the initial population
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Rasterise every frame instead of running headless
    #[arg(long)]
    render: bool,

    /// Log every tick at debug level
    #[arg(long)]
    log_ticks: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut rng = ChaChaRng::seed_from_u64(args.seed);
    let bodies = GalaxyInitializer::default().generate(args.bodies, &mut rng);

    let mut config = EngineConfig::new(args.parallelism);
    if args.log_ticks {
        config = config.with_tick_logging();
    }

    let mut engine = match args.arch.build(config, bodies) {
        Ok(engine) => engine,
        Err(err) => {
            eprintln!("Error: {}", err);
            std::process::exit(1);
        }
    };

    println!("==========================================================");
    println!("       Galaxy N-Body Simulation");
    println!("==========================================================");
    println!("  Architecture: {}", engine.name());
    println!("  Workers:      {}", engine.workers());
    println!("  Bodies:       {}", engine.bodies().len());
    println!("  Steps/run:    {}", args.steps);
    println!();

    let mut best = Duration::MAX;
    let mut raster = Raster::new(DEFAULT_RESOLUTION);
    for run in 0..args.tests.max(1) {
        let start = Instant::now();
        for _ in 0..args.steps {
            let result = if args.render {
                raster.clear();
                engine.advance(DEFAULT_TIMESTEP, Some(&mut raster))
            } else {
                engine.advance(DEFAULT_TIMESTEP, None)
            };
            if let Err(err) = result {
                eprintln!("Error: tick {} failed: {}", engine.ticks() + 1, err);
                std::process::exit(1);
            }
        }
        let elapsed = start.elapsed();
        println!("  run {:>3}: {:>10} µs", run, elapsed.as_micros());
        best = best.min(elapsed);
    }

    let [px, py] = total_momentum(engine.bodies());
    println!();
    println!("Best run: {} µs", best.as_micros());
    println!("Kinetic energy:    {:.6e} J", kinetic_energy(engine.bodies()));
    println!(
        "Net momentum:      ({:.3e}, {:.3e}) of scale {:.3e}",
        px,
        py,
        momentum_scale(engine.bodies())
    );
    if args.render {
        println!(
            "Last frame:        {} lit pixels, {} bodies off-frame",
            raster.occupancy(),
            raster.clipped()
        );
    }
}
