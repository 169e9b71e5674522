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
//! Render sink boundary
//!
//! The engines call [`RenderSink::plot`] once per body per tick, after the
//! body has been integrated. Passing `None` instead of a sink skips drawing
//! entirely, which is what benchmarks do.
//!
//! [`Raster`] is a minimal sink that maps world coordinates onto a square
//! grid of palette indices, drawing each body as a disc sized by its mass.
//! Encoding frames into an image format is left to the caller.

use crate::body::SOLAR_MASS;

/// RGB palette indexed by [`ColorHint`]
///
/// Entry 0 is the background; entries 1-6 grade by body mass, 7 marks the
/// central body.
pub const PALETTE: [[u8; 3]; 8] = [
    [0, 0, 0],
    [255, 255, 153],
    [255, 214, 122],
    [255, 173, 92],
    [255, 133, 61],
    [255, 92, 31],
    [255, 51, 0],
    [255, 0, 0],
];

/// Default half-width of the visible universe in meters
pub const DEFAULT_WORLD_RADIUS: f64 = 1e18;

/// Default raster edge length in pixels
pub const DEFAULT_RESOLUTION: usize = 250;

/// Disc radius for bodies heavier than any sampled star
pub const MAX_MARKER_RADIUS: usize = 7;

/// Disc radius in pixels for a body of the given mass
///
/// Sampled stars get 1-4 pixels in proportion to mass; anything heavier
/// than the sampling range (the central body) jumps to
/// [`MAX_MARKER_RADIUS`].
pub fn marker_radius(mass: f64) -> usize {
    let radius = (mass * 3.0 / (SOLAR_MASS * 10.0 + 1e20)) as usize + 1;
    if radius > 4 {
        MAX_MARKER_RADIUS
    } else {
        radius
    }
}

/// Palette index attached to a body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ColorHint(u8);

impl ColorHint {
    /// Wrap a palette index, clamped into the palette
    pub fn new(index: u8) -> Self {
        ColorHint(index.min(PALETTE.len() as u8 - 1))
    }

    /// Palette index
    pub fn index(&self) -> u8 {
        self.0
    }

    /// RGB triple from [`PALETTE`]
    pub fn rgb(&self) -> [u8; 3] {
        PALETTE[self.0 as usize]
    }
}

/// Consumer of per-body positions after each tick
pub trait RenderSink {
    /// Draw one body at world coordinates `(x, y)`
    fn plot(&mut self, x: f64, y: f64, color: ColorHint);

    /// Draw one body as a disc of `radius` pixels
    ///
    /// Sinks that ignore marker size can rely on the default, which
    /// forwards to [`RenderSink::plot`].
    fn plot_sized(&mut self, x: f64, y: f64, _radius: usize, color: ColorHint) {
        self.plot(x, y, color);
    }
}

/// Square grid of palette indices
#[derive(Debug, Clone)]
pub struct Raster {
    resolution: usize,
    world_radius: f64,
    pixels: Vec<u8>,
    plotted: usize,
    clipped: usize,
}

impl Raster {
    /// Create a blank raster with the default world radius
    ///
    /// # Panics
    ///
    /// Panics if `resolution` is zero
    pub fn new(resolution: usize) -> Self {
        Self::with_world_radius(resolution, DEFAULT_WORLD_RADIUS)
    }

    /// Create a blank raster covering `[-world_radius/2, world_radius/2]`
    ///
    /// # Panics
    ///
    /// Panics if `resolution` is zero or `world_radius` is not positive
    pub fn with_world_radius(resolution: usize, world_radius: f64) -> Self {
        assert!(resolution > 0, "Resolution must be positive");
        assert!(
            world_radius > 0.0 && world_radius.is_finite(),
            "World radius must be positive and finite"
        );
        Raster {
            resolution,
            world_radius,
            pixels: vec![0; resolution * resolution],
            plotted: 0,
            clipped: 0,
        }
    }

    /// Edge length in pixels
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    /// Palette index at pixel `(px, py)`, or None when out of range
    pub fn pixel(&self, px: usize, py: usize) -> Option<u8> {
        if px < self.resolution && py < self.resolution {
            Some(self.pixels[py * self.resolution + px])
        } else {
            None
        }
    }

    /// Row-major palette indices
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Number of plots that landed on the grid
    pub fn plotted(&self) -> usize {
        self.plotted
    }

    /// Number of plots that fell outside the grid
    pub fn clipped(&self) -> usize {
        self.clipped
    }

    /// Number of non-background pixels
    pub fn occupancy(&self) -> usize {
        self.pixels.iter().filter(|&&p| p != 0).count()
    }

    /// Reset every pixel to the background and zero the counters
    pub fn clear(&mut self) {
        self.pixels.iter_mut().for_each(|p| *p = 0);
        self.plotted = 0;
        self.clipped = 0;
    }

    /// Pixel coordinate of a world coordinate, possibly off the grid
    fn to_pixel(&self, coordinate: f64) -> Option<i64> {
        let p = (coordinate * self.resolution as f64 / self.world_radius).round();
        if p.is_finite() {
            Some(p as i64 + (self.resolution / 2) as i64)
        } else {
            None
        }
    }

    fn set(&mut self, px: i64, py: i64, index: u8) {
        let res = self.resolution as i64;
        if (0..res).contains(&px) && (0..res).contains(&py) {
            self.pixels[(py * res + px) as usize] = index;
        }
    }
}

impl RenderSink for Raster {
    fn plot(&mut self, x: f64, y: f64, color: ColorHint) {
        self.plot_sized(x, y, 0, color);
    }

    /// Counts as plotted when the disc centre lands on the grid; the
    /// rest of the disc is cut at the edges.
    fn plot_sized(&mut self, x: f64, y: f64, radius: usize, color: ColorHint) {
        let (cx, cy) = match (self.to_pixel(x), self.to_pixel(y)) {
            (Some(cx), Some(cy)) => (cx, cy),
            _ => {
                self.clipped += 1;
                return;
            }
        };
        let res = self.resolution as i64;
        if !((0..res).contains(&cx) && (0..res).contains(&cy)) {
            self.clipped += 1;
            return;
        }
        let r = radius as i64;
        for dy in -r..=r {
            for dx in -r..=r {
                if dx * dx + dy * dy <= r * r {
                    self.set(cx + dx, cy + dy, color.index());
                }
            }
        }
        self.plotted += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_hint_clamps() {
        assert_eq!(ColorHint::new(3).index(), 3);
        assert_eq!(ColorHint::new(200).index(), 7);
        assert_eq!(ColorHint::new(7).rgb(), [255, 0, 0]);
        assert_eq!(ColorHint::default().rgb(), [0, 0, 0]);
    }

    #[test]
    fn test_origin_maps_to_center() {
        let mut raster = Raster::new(DEFAULT_RESOLUTION);
        raster.plot(0.0, 0.0, ColorHint::new(7));
        assert_eq!(raster.pixel(125, 125), Some(7));
        assert_eq!(raster.plotted(), 1);
        assert_eq!(raster.occupancy(), 1);
    }

    #[test]
    fn test_out_of_frame_is_clipped() {
        let mut raster = Raster::new(10);
        raster.plot(DEFAULT_WORLD_RADIUS, 0.0, ColorHint::new(1));
        raster.plot(f64::NAN, 0.0, ColorHint::new(1));
        assert_eq!(raster.plotted(), 0);
        assert_eq!(raster.clipped(), 2);
        assert_eq!(raster.occupancy(), 0);
    }

    #[test]
    fn test_clear() {
        let mut raster = Raster::with_world_radius(4, 4.0);
        raster.plot(1.0, -1.0, ColorHint::new(2));
        assert_eq!(raster.pixel(3, 1), Some(2));
        raster.clear();
        assert_eq!(raster.occupancy(), 0);
        assert_eq!(raster.plotted(), 0);
    }

    #[test]
    fn test_marker_radius_scales_with_mass() {
        assert_eq!(marker_radius(1e24), 1);
        assert_eq!(marker_radius(SOLAR_MASS * 5.0), 2);
        assert_eq!(marker_radius(SOLAR_MASS * 10.0 + 1e20), 4);
        assert_eq!(marker_radius(1e6 * SOLAR_MASS), MAX_MARKER_RADIUS);
    }

    #[test]
    fn test_disc_marker() {
        let mut raster = Raster::new(DEFAULT_RESOLUTION);
        raster.plot_sized(0.0, 0.0, 2, ColorHint::new(3));
        assert_eq!(raster.occupancy(), 13);
        assert_eq!(raster.pixel(127, 125), Some(3));
        assert_eq!(raster.pixel(127, 127), Some(0));
        assert_eq!(raster.plotted(), 1);
    }

    #[test]
    fn test_disc_cut_at_edge() {
        let mut raster = Raster::with_world_radius(10, 10.0);
        raster.plot_sized(-5.0, -5.0, 1, ColorHint::new(4));
        assert_eq!(raster.pixel(0, 0), Some(4));
        assert_eq!(raster.occupancy(), 3);
        assert_eq!(raster.plotted(), 1);
        assert_eq!(raster.clipped(), 0);
    }

    #[test]
    #[should_panic(expected = "Resolution must be positive")]
    fn test_zero_resolution() {
        Raster::new(0);
    }
}
