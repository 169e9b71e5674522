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
//! Conserved-quantity diagnostics
//!
//! Summaries used to sanity-check a run: total momentum should stay put
//! in an isolated system, and total energy should drift only slowly.

use crate::body::{Body, GravityParams};

/// Total linear momentum `Σ m v`
pub fn total_momentum(bodies: &[Body]) -> [f64; 2] {
    bodies.iter().fold([0.0, 0.0], |acc, body| {
        let [px, py] = body.momentum();
        [acc[0] + px, acc[1] + py]
    })
}

/// Sum of `|m v|` over all bodies, a scale for momentum tolerances
pub fn momentum_scale(bodies: &[Body]) -> f64 {
    bodies
        .iter()
        .map(|body| {
            let [px, py] = body.momentum();
            (px * px + py * py).sqrt()
        })
        .sum()
}

/// Total mass
pub fn total_mass(bodies: &[Body]) -> f64 {
    bodies.iter().map(Body::mass).sum()
}

/// Mass-weighted mean position, or None for an empty slice
pub fn center_of_mass(bodies: &[Body]) -> Option<[f64; 2]> {
    let mass = total_mass(bodies);
    if bodies.is_empty() || mass == 0.0 {
        return None;
    }
    let [mx, my] = bodies.iter().fold([0.0, 0.0], |acc, body| {
        [acc[0] + body.mass() * body.x(), acc[1] + body.mass() * body.y()]
    });
    Some([mx / mass, my / mass])
}

/// Total kinetic energy `Σ ½ m v²`
pub fn kinetic_energy(bodies: &[Body]) -> f64 {
    bodies.iter().map(Body::kinetic_energy).sum()
}

/// Softened potential energy `-Σ G m_i m_j / sqrt(r² + ε²)` over pairs
pub fn potential_energy(bodies: &[Body], gravity: &GravityParams) -> f64 {
    let eps_sq = gravity.softening() * gravity.softening();
    let mut total = 0.0;
    for (i, a) in bodies.iter().enumerate() {
        for b in &bodies[i + 1..] {
            let r = a.distance_to(b);
            total -= gravity.g() * a.mass() * b.mass() / (r * r + eps_sq).sqrt();
        }
    }
    total
}

/// Kinetic plus potential energy
pub fn total_energy(bodies: &[Body], gravity: &GravityParams) -> f64 {
    kinetic_energy(bodies) + potential_energy(bodies, gravity)
}
