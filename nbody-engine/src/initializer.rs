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
//! Seedable galaxy initializer
//!
//! Produces one heavy body at rest at the origin followed by N-1 bodies on
//! roughly circular orbits around it. The random source is passed in, so a
//! seeded generator reproduces the same population every time.
//!
//! # Example
//!
//! ```
//! use nbody_engine::initializer::GalaxyInitializer;
//! use rand::SeedableRng;
//! use rand_chacha::ChaChaRng;
//!
//! let mut rng = ChaChaRng::seed_from_u64(42);
//! let bodies = GalaxyInitializer::default().generate(100, &mut rng);
//! assert_eq!(bodies.len(), 100);
//! assert_eq!(bodies[0].position(), [0.0, 0.0]);
//! ```

use std::f64::consts::FRAC_PI_2;

use rand::Rng;

use crate::body::{Body, SOLAR_MASS};
use crate::render::{ColorHint, DEFAULT_WORLD_RADIUS};

/// Palette entry for the central body
const CENTRAL_COLOR: u8 = 7;

/// Rate of the exponential used for radial placement
const RADIAL_LAMBDA: f64 = -1.8;

/// Gravitational constant used for the circular-orbit speed
const ORBIT_G: f64 = 6.67e-11;

/// Upper bound of the random body mass term
const MASS_SPAN: f64 = SOLAR_MASS * 10.0 + 1e20;

/// Galaxy sampler
#[derive(Debug, Clone, PartialEq)]
pub struct GalaxyInitializer {
    /// Mass of the body at index 0
    pub central_mass: f64,
    /// Scale of the radial distribution in meters
    pub radius: f64,
}

impl Default for GalaxyInitializer {
    fn default() -> Self {
        GalaxyInitializer {
            central_mass: 1e6 * SOLAR_MASS,
            radius: DEFAULT_WORLD_RADIUS,
        }
    }
}

impl GalaxyInitializer {
    /// Generate `n` bodies; index 0 is the central body
    pub fn generate<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Vec<Body> {
        let mut bodies = Vec::with_capacity(n);
        if n == 0 {
            return bodies;
        }
        bodies.push(Body::at_rest(
            [0.0, 0.0],
            self.central_mass,
            ColorHint::new(CENTRAL_COLOR),
        ));
        bodies.extend((1..n).map(|_| self.orbiting_body(rng)));
        bodies
    }

    fn orbiting_body<R: Rng + ?Sized>(&self, rng: &mut R) -> Body {
        let px = self.radius * exponential(rng, RADIAL_LAMBDA) * (0.5 - rng.gen::<f64>());
        let py = self.radius * exponential(rng, RADIAL_LAMBDA) * (0.5 - rng.gen::<f64>());

        let [mut vx, mut vy] = self.orbital_velocity(px, py);
        // Orbit direction is a coin flip.
        if rng.gen::<f64>() <= 0.5 {
            vx = -vx;
            vy = -vy;
        }

        let mass = rng.gen::<f64>() * SOLAR_MASS * 10.0 + 1e20;
        let shade = (mass * 6.0 / MASS_SPAN) as u8 + 1;
        Body::new([px, py], [vx, vy], mass, ColorHint::new(shade))
    }

    /// Tangential velocity of a circular orbit at `(rx, ry)`
    ///
    /// A body sitting exactly on the centre gets no velocity.
    fn orbital_velocity(&self, rx: f64, ry: f64) -> [f64; 2] {
        let r = (rx * rx + ry * ry).sqrt();
        if r == 0.0 {
            return [0.0, 0.0];
        }
        let speed = (ORBIT_G * self.central_mass / r).sqrt();
        let theta = FRAC_PI_2 - (ry / rx).abs().atan();
        [
            -ry.signum() * theta.cos() * speed,
            rx.signum() * theta.sin() * speed,
        ]
    }
}

fn exponential<R: Rng + ?Sized>(rng: &mut R, lambda: f64) -> f64 {
    -(1.0 - rng.gen::<f64>()).ln() / lambda
}
