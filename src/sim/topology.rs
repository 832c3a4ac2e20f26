// src/sim/topology.rs
//! Particle grid topology and triangulation
//!
//! The cloth is an N x N particle grid flattened row-major
//! (`index = y * N + x`). This module derives everything that is fixed for
//! the lifetime of a simulation: particle count, spring rest lengths, and
//! the triangle index stream the renderer draws with.

use cgmath::Vector3;

/// Spring rest lengths per category, derived once from the cloth size
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RestLengths {
    /// Adjacent grid neighbor
    pub structural: f32,
    /// Diagonal neighbor (structural * sqrt 2)
    pub shear: f32,
    /// Two-hop neighbor (structural * 2)
    pub bend: f32,
}

impl From<RestLengths> for Vector3<f32> {
    fn from(lengths: RestLengths) -> Self {
        Vector3::new(lengths.structural, lengths.shear, lengths.bend)
    }
}

/// Fixed grid topology for one cloth instance
#[derive(Clone, Debug)]
pub struct ClothGrid {
    resolution: u32,
    size: f32,
}

impl ClothGrid {
    /// Creates the topology for a `resolution` x `resolution` grid spanning
    /// `size` meters per edge. `resolution < 2` is a caller bug.
    pub fn new(resolution: u32, size: f32) -> Self {
        assert!(resolution >= 2, "cloth grid needs at least 2x2 vertices");
        Self { resolution, size }
    }

    /// Vertex count per grid dimension
    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Total particle count (N squared)
    pub fn particle_count(&self) -> u32 {
        self.resolution * self.resolution
    }

    /// Number of triangles in the index stream
    pub fn triangle_count(&self) -> u32 {
        2 * (self.resolution - 1) * (self.resolution - 1)
    }

    /// Rest lengths derived from the physical cloth size
    pub fn rest_lengths(&self) -> RestLengths {
        let structural = self.size / (self.resolution - 1) as f32;
        RestLengths {
            structural,
            shear: structural * std::f32::consts::SQRT_2,
            bend: structural * 2.0,
        }
    }

    /// Builds the triangle index stream covering every unit quad
    ///
    /// Each quad with lower-left vertex `v` contributes `{v, v+1, v+N}` and
    /// `{v+N, v+1, v+N+1}`, so the stream has `6 * (N-1)^2` entries.
    pub fn build_indices(&self) -> Vec<u32> {
        let n = self.resolution;
        let quad_count = (n - 1) * (n - 1);
        let mut indices = vec![0u32; (quad_count * 6) as usize];
        for x in 0..n - 1 {
            for y in 0..n - 1 {
                let vertex = y * n + x;
                let up = vertex + n;
                let offset = ((y * (n - 1) + x) * 6) as usize;
                indices[offset] = vertex;
                indices[offset + 1] = vertex + 1;
                indices[offset + 2] = up;
                indices[offset + 3] = up;
                indices[offset + 4] = vertex + 1;
                indices[offset + 5] = up + 1;
            }
        }
        indices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_stream_length_and_bounds() {
        for n in 2..=33u32 {
            let grid = ClothGrid::new(n, 4.0);
            let indices = grid.build_indices();
            assert_eq!(indices.len() as u32, 6 * (n - 1) * (n - 1));
            assert_eq!(grid.triangle_count() * 3, indices.len() as u32);
            assert!(indices.iter().all(|&i| i < grid.particle_count()));
        }
    }

    #[test]
    fn quads_cover_their_corners() {
        let n = 5u32;
        let grid = ClothGrid::new(n, 4.0);
        let indices = grid.build_indices();
        for x in 0..n - 1 {
            for y in 0..n - 1 {
                let v = y * n + x;
                let offset = ((y * (n - 1) + x) * 6) as usize;
                let quad = &indices[offset..offset + 6];
                assert_eq!(quad[..3], [v, v + 1, v + n]);
                assert_eq!(quad[3..], [v + n, v + 1, v + n + 1]);
                // Both triangles together touch all four corners.
                for corner in [v, v + 1, v + n, v + n + 1] {
                    assert!(quad.contains(&corner));
                }
            }
        }
    }

    #[test]
    fn rest_length_relations_hold() {
        for (n, size) in [(2u32, 0.5f32), (32, 4.0), (64, 10.0), (7, 1.25)] {
            let lengths = ClothGrid::new(n, size).rest_lengths();
            assert_eq!(lengths.structural, size / (n - 1) as f32);
            assert!((lengths.shear - lengths.structural * 2.0f32.sqrt()).abs() < 1e-6);
            assert!((lengths.bend - lengths.structural * 2.0).abs() < 1e-6);
        }
    }

    #[test]
    fn smallest_grid_is_a_single_quad() {
        let grid = ClothGrid::new(2, 1.0);
        assert_eq!(grid.particle_count(), 4);
        assert_eq!(grid.build_indices(), vec![0, 1, 2, 2, 1, 3]);
    }

    #[test]
    #[should_panic]
    fn degenerate_grid_panics() {
        ClothGrid::new(1, 1.0);
    }
}
