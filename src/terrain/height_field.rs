use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use glam::{Vec2, Vec3};
use tracing::debug;

use super::TerrainError;
use crate::utils::{ensure_parent_dir_exists, lerpf32};

/// Distance in cells below which a query is treated as lying on a grid line.
const GRID_SNAP: f32 = 1e-4;

/// Result of a terrain height query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeightSample {
    pub height: f32,
    pub normal: Vec3,
    /// false when the query fell outside the field; `height` is then the caller's own y
    pub on_map: bool,
}

/// Immutable grid of height and normal samples, centered on the owning node's origin.
///
/// Sample `(col, row)` sits at world `origin + (col * scale, row * scale)` in XZ.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightField {
    scale: f32,
    cols: usize,
    rows: usize,
    /// row-major
    heights: Vec<f32>,
    /// row-major
    normals: Vec<Vec3>,
    origin: Vec2,
}

impl HeightField {
    pub fn new(
        scale: f32,
        cols: usize,
        rows: usize,
        heights: Vec<f32>,
        normals: Vec<Vec3>,
    ) -> Result<Self, TerrainError> {
        if cols < 2 || rows < 2 {
            return Err(TerrainError::construction(format!(
                "height field must be at least 2x2, got {}x{}",
                cols, rows
            )));
        }
        if !(scale.is_finite() && scale > 0.0) {
            return Err(TerrainError::construction(format!(
                "height field scale must be positive, got {}",
                scale
            )));
        }
        let count = cols * rows;
        if heights.len() != count || normals.len() != count {
            return Err(TerrainError::construction(format!(
                "expected {} samples, got {} heights and {} normals",
                count,
                heights.len(),
                normals.len()
            )));
        }
        let origin = Vec2::new(
            -((cols - 1) as f32) / 2.0 * scale,
            -((rows - 1) as f32) / 2.0 * scale,
        );
        Ok(Self { scale, cols, rows, heights, normals, origin })
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// World extent along X.
    pub fn width(&self) -> f32 {
        (self.cols - 1) as f32 * self.scale
    }

    /// World extent along Z.
    pub fn height(&self) -> f32 {
        (self.rows - 1) as f32 * self.scale
    }

    /// World XZ of the top-left sample.
    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn height_at(&self, col: usize, row: usize) -> f32 {
        self.heights[row * self.cols + col]
    }

    pub fn normal_at(&self, col: usize, row: usize) -> Vec3 {
        self.normals[row * self.cols + col]
    }

    fn to_local(&self, position: Vec3) -> Vec2 {
        Vec2::new(position.x, position.z) - self.origin
    }

    /// Open interval test, points on the outer edge are off the map.
    pub fn contains(&self, position: Vec3) -> bool {
        let local = self.to_local(position);
        local.x > 0.0 && local.x < self.width() && local.y > 0.0 && local.y < self.height()
    }

    /// Bilinear height and normal at `position`. Never fails: off-map queries
    /// hand back `position.y` with `on_map == false`.
    pub fn sample_height(&self, position: Vec3) -> HeightSample {
        if !self.contains(position) {
            return HeightSample { height: position.y, normal: Vec3::Y, on_map: false };
        }

        let cell = self.to_local(position) / self.scale;
        // grid-aligned queries hit the stored sample exactly despite rounding in the division
        let nearest = cell.round();
        let cell = Vec2::select((cell - nearest).abs().cmplt(Vec2::splat(GRID_SNAP)), nearest, cell);
        // rounding can land exactly on the last row/column
        let left = (cell.x.floor() as usize).min(self.cols - 2);
        let top = (cell.y.floor() as usize).min(self.rows - 2);
        let fx = (cell.x - left as f32).clamp(0.0, 1.0);
        let fz = (cell.y - top as f32).clamp(0.0, 1.0);

        let top_height = lerpf32(self.height_at(left, top), self.height_at(left + 1, top), fx);
        let bottom_height = lerpf32(
            self.height_at(left, top + 1),
            self.height_at(left + 1, top + 1),
            fx,
        );
        let height = lerpf32(top_height, bottom_height, fz);

        let top_normal = self.normal_at(left, top).lerp(self.normal_at(left + 1, top), fx);
        let bottom_normal = self
            .normal_at(left, top + 1)
            .lerp(self.normal_at(left + 1, top + 1), fx);
        let normal = top_normal.lerp(bottom_normal, fz).normalize_or(Vec3::Y);

        HeightSample { height, normal, on_map: true }
    }

    /// Little-endian layout: scale f32, cols i32, rows i32, heights, then normals as xyz triples.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(&self.scale.to_le_bytes())?;
        writer.write_all(&(self.cols as i32).to_le_bytes())?;
        writer.write_all(&(self.rows as i32).to_le_bytes())?;
        for height in &self.heights {
            writer.write_all(&height.to_le_bytes())?;
        }
        for normal in &self.normals {
            for component in normal.to_array() {
                writer.write_all(&component.to_le_bytes())?;
            }
        }
        Ok(())
    }

    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, TerrainError> {
        let scale = read_f32(reader)?;
        let cols = read_i32(reader)?;
        let rows = read_i32(reader)?;
        if cols < 2 || rows < 2 {
            return Err(TerrainError::construction(format!(
                "height field must be at least 2x2, got {}x{}",
                cols, rows
            )));
        }
        let (cols, rows) = (cols as usize, rows as usize);
        let count = cols
            .checked_mul(rows)
            .filter(|count| count.checked_mul(12).is_some())
            .ok_or_else(|| TerrainError::construction("height field dimensions overflow"))?;

        let heights = read_f32_vec(reader, count)?;
        let normals = read_f32_vec(reader, count * 3)?
            .chunks_exact(3)
            .map(Vec3::from_slice)
            .collect();

        Self::new(scale, cols, rows, heights, normals)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), TerrainError> {
        let path = path.as_ref();
        ensure_parent_dir_exists(path)?;
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        debug!(path = %path.display(), cols = self.cols, rows = self.rows, "height field saved");
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, TerrainError> {
        let path = path.as_ref();
        let mut reader = BufReader::new(File::open(path)?);
        let field = Self::read_from(&mut reader)?;
        debug!(path = %path.display(), cols = field.cols, rows = field.rows, "height field loaded");
        Ok(field)
    }
}

fn read_f32<R: Read>(reader: &mut R) -> std::io::Result<f32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(f32::from_le_bytes(buf))
}

fn read_i32<R: Read>(reader: &mut R) -> std::io::Result<i32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

/// Reads at most `count` floats, so a corrupt header cannot size the buffer up front.
fn read_f32_vec<R: Read>(reader: &mut R, count: usize) -> Result<Vec<f32>, TerrainError> {
    let expected = count * 4;
    let mut buf = vec![];
    reader.by_ref().take(expected as u64).read_to_end(&mut buf)?;
    if buf.len() != expected {
        return Err(TerrainError::construction(format!(
            "height field data truncated: expected {} bytes, found {}",
            expected,
            buf.len()
        )));
    }
    Ok(buf
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}
