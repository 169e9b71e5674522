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
//! Point masses and the pairwise gravity kernel
//!
//! A [`Body`] carries position, velocity, a force accumulator and a mass.
//! Every tick follows the same life cycle, driven by whichever engine owns
//! the body at the time:
//!
//! ```text
//! reset_force()  ->  add_force(other) for every other body  ->  update(dt)
//! ```
//!
//! # Softened gravity
//!
//! The force exerted by `other` on `self` is
//!
//! **F = G * m_self * m_other / (r² + ε²)**
//!
//! applied along the unit vector from `self` to `other`. The softening ε
//! bounds the magnitude as two bodies approach each other. Exactly
//! coincident bodies have no direction and contribute nothing.
//!
//! [`Body::add_force`] only updates `self`. Newton's third law is realised
//! by the caller issuing the reciprocal call (or, in the systolic ring, by
//! the reciprocal visit at the other body's home stage).

use crate::error::{EngineError, Result};
use crate::render::{marker_radius, ColorHint, RenderSink};

/// Gravitational constant used by the galaxy simulation (m³/(kg⋅s²))
pub const GRAVITATIONAL_CONSTANT: f64 = 6.673e-11;

/// Default softening distance in meters
pub const DEFAULT_SOFTENING: f64 = 3e4;

/// Mass of the Sun in kilograms
pub const SOLAR_MASS: f64 = 1.98892e30;

/// Default tick length in seconds
pub const DEFAULT_TIMESTEP: f64 = 1e11;

/// Parameters of the softened gravity kernel
///
/// # Example
///
/// ```
/// use nbody_engine::body::{GravityParams, GRAVITATIONAL_CONSTANT, DEFAULT_SOFTENING};
///
/// let params = GravityParams::default();
/// assert_eq!(params.g(), GRAVITATIONAL_CONSTANT);
/// assert_eq!(params.softening(), DEFAULT_SOFTENING);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GravityParams {
    g: f64,
    softening: f64,
}

impl GravityParams {
    /// Create gravity parameters
    ///
    /// `g` must be non-negative and finite; `softening` must be positive
    /// and finite so the kernel never divides by zero.
    pub fn new(g: f64, softening: f64) -> Result<Self> {
        if !(g >= 0.0 && g.is_finite()) {
            return Err(EngineError::InvalidGravity(format!(
                "gravitational constant must be non-negative and finite, got {}",
                g
            )));
        }
        if !(softening > 0.0 && softening.is_finite()) {
            return Err(EngineError::InvalidGravity(format!(
                "softening must be positive and finite, got {}",
                softening
            )));
        }
        Ok(GravityParams { g, softening })
    }

    /// Gravitational constant
    pub fn g(&self) -> f64 {
        self.g
    }

    /// Softening distance ε
    pub fn softening(&self) -> f64 {
        self.softening
    }
}

impl Default for GravityParams {
    fn default() -> Self {
        GravityParams {
            g: GRAVITATIONAL_CONSTANT,
            softening: DEFAULT_SOFTENING,
        }
    }
}

/// A point mass in the plane
///
/// # Example
///
/// ```
/// use nbody_engine::body::Body;
/// use nbody_engine::render::ColorHint;
///
/// let mut a = Body::new([0.0, 0.0], [0.0, 0.0], 1e24, ColorHint::default());
/// let b = Body::new([1e9, 0.0], [0.0, 0.0], 1e24, ColorHint::default());
///
/// a.add_force(&b);
/// assert!(a.force()[0] > 0.0);
///
/// a.update(1.0);
/// assert!(a.velocity()[0] > 0.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    rx: f64,
    ry: f64,
    vx: f64,
    vy: f64,
    fx: f64,
    fy: f64,
    mass: f64,
    color: ColorHint,
}

impl Body {
    /// Create a body with a zeroed force accumulator
    ///
    /// # Panics
    ///
    /// Panics if `mass` is not positive and finite
    pub fn new(position: [f64; 2], velocity: [f64; 2], mass: f64, color: ColorHint) -> Self {
        assert!(mass > 0.0 && mass.is_finite(), "Mass must be positive and finite");
        Body {
            rx: position[0],
            ry: position[1],
            vx: velocity[0],
            vy: velocity[1],
            fx: 0.0,
            fy: 0.0,
            mass,
            color,
        }
    }

    /// Create a body at rest
    pub fn at_rest(position: [f64; 2], mass: f64, color: ColorHint) -> Self {
        Self::new(position, [0.0, 0.0], mass, color)
    }

    /// X coordinate
    pub fn x(&self) -> f64 {
        self.rx
    }

    /// Y coordinate
    pub fn y(&self) -> f64 {
        self.ry
    }

    /// Position as `[x, y]`
    pub fn position(&self) -> [f64; 2] {
        [self.rx, self.ry]
    }

    /// Velocity as `[vx, vy]`
    pub fn velocity(&self) -> [f64; 2] {
        [self.vx, self.vy]
    }

    /// Accumulated force as `[fx, fy]`
    pub fn force(&self) -> [f64; 2] {
        [self.fx, self.fy]
    }

    /// Mass in kilograms
    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Presentation hint, carried opaquely by the engines
    pub fn color(&self) -> ColorHint {
        self.color
    }

    /// Check that mass is positive and all state is finite
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !(self.mass > 0.0 && self.mass.is_finite()) {
            return Err(format!("mass must be positive and finite, got {}", self.mass));
        }
        let state = [self.rx, self.ry, self.vx, self.vy, self.fx, self.fy];
        if state.iter().any(|v| !v.is_finite()) {
            return Err("position, velocity and force must be finite".to_string());
        }
        Ok(())
    }

    /// Zero the force accumulator
    ///
    /// Called once per tick, after integration, so the next tick starts clean.
    pub fn reset_force(&mut self) {
        self.fx = 0.0;
        self.fy = 0.0;
    }

    /// Add the force `other` exerts on `self` using the default kernel
    pub fn add_force(&mut self, other: &Body) {
        self.add_force_with(other, &GravityParams::default());
    }

    /// Add the force `other` exerts on `self`
    ///
    /// Only `self` is updated.
    pub fn add_force_with(&mut self, other: &Body, params: &GravityParams) {
        let dx = other.rx - self.rx;
        let dy = other.ry - self.ry;
        let dist = (dx * dx + dy * dy).sqrt();
        // Coincident bodies: no direction to push along.
        if dist == 0.0 {
            return;
        }
        let eps = params.softening;
        let f = (params.g * self.mass * other.mass) / (dist * dist + eps * eps);
        self.fx += f * dx / dist;
        self.fy += f * dy / dist;
    }

    /// Advance velocity then position by `dt` from the accumulated force
    ///
    /// Must only be called once every contribution for the tick is in.
    pub fn update(&mut self, dt: f64) {
        self.vx += dt * self.fx / self.mass;
        self.vy += dt * self.fy / self.mass;
        self.rx += dt * self.vx;
        self.ry += dt * self.vy;
    }

    /// Hand this body's position to a render sink
    pub fn plot(&self, sink: &mut dyn RenderSink) {
        sink.plot_sized(self.rx, self.ry, marker_radius(self.mass), self.color);
    }

    /// Euclidean distance to another body
    pub fn distance_to(&self, other: &Body) -> f64 {
        let dx = self.rx - other.rx;
        let dy = self.ry - other.ry;
        (dx * dx + dy * dy).sqrt()
    }

    /// Linear momentum `m * v`
    pub fn momentum(&self) -> [f64; 2] {
        [self.mass * self.vx, self.mass * self.vy]
    }

    /// Kinetic energy `0.5 * m * v²`
    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.mass * (self.vx * self.vx + self.vy * self.vy)
    }
}

impl std::fmt::Display for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:e} rx, {:e} ry, {:e} vx, {:e} vy, {:e} mass",
            self.rx, self.ry, self.vx, self.vy, self.mass
        )
    }
}
