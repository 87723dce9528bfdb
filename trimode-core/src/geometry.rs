//! The triangle every backend draws.

use bytemuck::{Pod, Zeroable};

/// A vertex: NDC position plus linear RGB color.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// Position in normalized device coordinates.
    pub position: [f32; 2],
    /// Color, each channel in `0.0..=1.0`.
    pub color: [f32; 3],
}

/// Number of `f32` values per interleaved vertex (`x, y, r, g, b`).
pub const FLOATS_PER_VERTEX: usize = 5;

/// The triangle, counter-clockwise, red top / green bottom-left / blue bottom-right.
pub const TRIANGLE: [Vertex; 3] = [
    Vertex {
        position: [0.0, 0.5],
        color: [1.0, 0.0, 0.0],
    },
    Vertex {
        position: [-0.5, -0.5],
        color: [0.0, 1.0, 0.0],
    },
    Vertex {
        position: [0.5, -0.5],
        color: [0.0, 0.0, 1.0],
    },
];

/// The triangle as a flat `[x, y, r, g, b, ...]` array for GL-style uploads.
#[must_use]
pub fn interleaved_vertices() -> [f32; FLOATS_PER_VERTEX * 3] {
    let mut out = [0.0; FLOATS_PER_VERTEX * 3];
    for (chunk, vertex) in out.chunks_exact_mut(FLOATS_PER_VERTEX).zip(TRIANGLE.iter()) {
        chunk[..2].copy_from_slice(&vertex.position);
        chunk[2..].copy_from_slice(&vertex.color);
    }
    out
}

/// Single fill color for renderers without per-vertex interpolation.
///
/// This is the mean of the three vertex colors.
#[must_use]
pub fn flat_color() -> [f32; 3] {
    let mut sum = [0.0_f32; 3];
    for vertex in &TRIANGLE {
        for (acc, channel) in sum.iter_mut().zip(vertex.color) {
            *acc += channel;
        }
    }
    sum.map(|c| c / 3.0)
}
