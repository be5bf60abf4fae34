use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{HeightField, TerrainError};

/// Weights used when a sample carries no material information at all.
pub const FALLBACK_BLEND_WEIGHTS: [f32; 3] = [1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0];

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct TerrainConfig {
    /// world distance between neighbouring vertices
    pub grid_scale: f32,
    /// vertical exaggeration applied to the height channel
    pub height_scale: f32,
    /// how often ground textures repeat, in UV units per vertex
    pub tex_coord_scale: f32,
}
impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            grid_scale: 30.0,
            height_scale: 640.0,
            tex_coord_scale: 0.1,
        }
    }
}

/// Per-pixel 4 channel samples in [0, 1]. RGB carry material weights, A carries height.
pub trait ChannelSource {
    fn dimensions(&self) -> (u32, u32);
    fn sample(&self, x: u32, y: u32) -> [f32; 4];
}

impl ChannelSource for image::Rgba32FImage {
    fn dimensions(&self) -> (u32, u32) {
        image::ImageBuffer::dimensions(self)
    }

    fn sample(&self, x: u32, y: u32) -> [f32; 4] {
        self.get_pixel(x, y).0
    }
}

/// Plain in-memory channel grid, row-major.
#[derive(Debug, Clone)]
pub struct ChannelGrid {
    width: u32,
    height: u32,
    samples: Vec<[f32; 4]>,
}
impl ChannelGrid {
    pub fn new(width: u32, height: u32, samples: Vec<[f32; 4]>) -> Result<Self, TerrainError> {
        if samples.len() != width as usize * height as usize {
            return Err(TerrainError::construction(format!(
                "channel grid {}x{} needs {} samples, got {}",
                width,
                height,
                width as usize * height as usize,
                samples.len()
            )));
        }
        Ok(Self { width, height, samples })
    }

    /// Builds a grid from 8 bit RGBA bytes, dividing every channel by 255.
    pub fn from_rgba8(width: u32, height: u32, bytes: &[u8]) -> Result<Self, TerrainError> {
        if bytes.len() % 4 != 0 {
            return Err(TerrainError::construction("rgba8 data must be a multiple of 4 bytes"));
        }
        let samples = bytes
            .chunks_exact(4)
            .map(|px| {
                [
                    px[0] as f32 / 255.0,
                    px[1] as f32 / 255.0,
                    px[2] as f32 / 255.0,
                    px[3] as f32 / 255.0,
                ]
            })
            .collect();
        Self::new(width, height, samples)
    }
}
impl ChannelSource for ChannelGrid {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn sample(&self, x: u32, y: u32) -> [f32; 4] {
        self.samples[(y * self.width + x) as usize]
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TerrainVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coords: [f32; 2],
    /// non-negative, sums to 1
    pub blend_weights: [f32; 3],
}

pub struct TerrainMesh {
    pub vertices: Vec<TerrainVertex>,
    /// triangle list, two triangles per grid cell
    pub indices: Vec<u32>,
    /// runtime height query sidecar over the same grid
    pub height_field: HeightField,
}

/// Clamps the material channels to [0, 1] and rescales them to sum to 1.
/// Samples with no weight at all fall back to an even split.
pub fn normalize_blend_weights(channels: [f32; 3]) -> Option<[f32; 3]> {
    let clamped = channels.map(|c| if c.is_finite() { c.clamp(0.0, 1.0) } else { 0.0 });
    let sum: f32 = clamped.iter().sum();
    if sum <= f32::EPSILON {
        return None;
    }
    Some(clamped.map(|c| c / sum))
}

/// Corner order per cell: top-left, top-right, bottom-right, then top-left, bottom-right, bottom-left.
pub fn grid_indices(width: u32, height: u32) -> Vec<u32> {
    let mut indices = Vec::with_capacity((width as usize - 1) * (height as usize - 1) * 6);
    for y in 0..height - 1 {
        for x in 0..width - 1 {
            let top_left = y * width + x;
            let top_right = top_left + 1;
            let bottom_left = top_left + width;
            let bottom_right = bottom_left + 1;
            indices.extend_from_slice(&[
                top_left,
                top_right,
                bottom_right,
                top_left,
                bottom_right,
                bottom_left,
            ]);
        }
    }
    indices
}

/// Smooth vertex normals from accumulated face normals, oriented up the Y axis.
pub fn generate_smooth_normals(positions: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];
    for triangle in indices.chunks_exact(3) {
        let i0 = triangle[0] as usize;
        let i1 = triangle[1] as usize;
        let i2 = triangle[2] as usize;
        let p0 = positions[i0];
        let edge1 = positions[i1] - p0;
        let edge2 = positions[i2] - p0;
        // rows grow along +Z, so the tl->tr->br winding needs the reversed cross to face up
        let face = edge2.cross(edge1);
        normals[i0] += face;
        normals[i1] += face;
        normals[i2] += face;
    }
    normals.into_iter().map(|n| n.normalize_or(Vec3::Y)).collect()
}

pub fn generate_terrain(
    source: &impl ChannelSource,
    config: &TerrainConfig,
) -> Result<TerrainMesh, TerrainError> {
    let (width, height) = source.dimensions();
    if width < 2 || height < 2 {
        return Err(TerrainError::construction(format!(
            "terrain bitmap must be at least 2x2, got {}x{}",
            width, height
        )));
    }
    if !(config.grid_scale.is_finite() && config.grid_scale > 0.0) {
        return Err(TerrainError::construction(format!(
            "grid scale must be positive, got {}",
            config.grid_scale
        )));
    }

    let half_width = (width - 1) as f32 / 2.0;
    let half_height = (height - 1) as f32 / 2.0;
    let vertex_count = width as usize * height as usize;

    let mut positions = Vec::with_capacity(vertex_count);
    let mut tex_coords = Vec::with_capacity(vertex_count);
    let mut weights = Vec::with_capacity(vertex_count);
    let mut fallback_count = 0usize;

    for y in 0..height {
        for x in 0..width {
            let [r, g, b, a] = source.sample(x, y);
            positions.push(Vec3::new(
                (x as f32 - half_width) * config.grid_scale,
                (a - 1.0) * config.height_scale,
                (y as f32 - half_height) * config.grid_scale,
            ));
            tex_coords.push(Vec2::new(x as f32, y as f32) * config.tex_coord_scale);
            weights.push(normalize_blend_weights([r, g, b]).unwrap_or_else(|| {
                fallback_count += 1;
                FALLBACK_BLEND_WEIGHTS
            }));
        }
    }

    if fallback_count > 0 {
        warn!(
            fallback_count,
            "terrain samples without material weights, using an even blend"
        );
    }

    let indices = grid_indices(width, height);
    let normals = generate_smooth_normals(&positions, &indices);

    let vertices = positions
        .iter()
        .zip(&normals)
        .zip(tex_coords.iter().zip(&weights))
        .map(|((position, normal), (tex_coord, weight))| TerrainVertex {
            position: position.to_array(),
            normal: normal.to_array(),
            tex_coords: tex_coord.to_array(),
            blend_weights: *weight,
        })
        .collect();

    let height_field = HeightField::new(
        config.grid_scale,
        width as usize,
        height as usize,
        positions.iter().map(|p| p.y).collect(),
        normals,
    )?;

    debug!(width, height, ?config, "terrain height field built");
    info!(
        vertices = vertex_count,
        triangles = indices.len() / 3,
        "terrain generated"
    );

    Ok(TerrainMesh { vertices, indices, height_field })
}
