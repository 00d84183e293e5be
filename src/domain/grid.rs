/// Grid level model.
///
/// ## Level data format
///
///   ```json
///   { "name": "Tutorial", "width": 7, "height": 7,
///     "start": { "x": 1, "z": 1 },
///     "grid": [[1,1,1,1,1,1,1], ...],
///     "keys": [{ "x": 3, "z": 1 }],
///     "portal": { "x": 5, "z": 5 } }
///   ```
///
/// Rows are indexed `grid[z][x]`; `0` = floor, `1` = wall.
/// `keys` and `portal` are optional; missing markers are placed at load time.
///
/// ## World mapping
///
/// Cell (x, z) is centered at `(x + 0.5, _, z + 0.5)`. Each wall cell becomes
/// one `WALL_HEIGHT`-tall unit box standing on the floor plane (y = 0).

use std::collections::VecDeque;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::cell::Cell;
use super::generate::LevelGenerationError;
use super::geometry::Aabb;

pub const WALL_HEIGHT: f32 = 2.0;

/// A grid coordinate on the floor plane.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct CellPos {
    pub x: usize,
    pub z: usize,
}

impl CellPos {
    pub const fn new(x: usize, z: usize) -> Self {
        CellPos { x, z }
    }

    pub fn manhattan(self, other: CellPos) -> usize {
        self.x.abs_diff(other.x) + self.z.abs_diff(other.z)
    }

    /// World position of the cell center at height `y`.
    pub fn center(self, y: f32) -> Vec3 {
        Vec3::new(self.x as f32 + 0.5, y, self.z as f32 + 0.5)
    }
}

/// Serialized level description (authored, file-loaded or generated).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelData {
    pub name: String,
    pub width: usize,
    pub height: usize,
    pub start: CellPos,
    pub grid: Vec<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keys: Option<Vec<CellPos>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portal: Option<CellPos>,
}

#[derive(Debug, thiserror::Error)]
pub enum LevelError {
    #[error("invalid level index {index} (have {count} levels)")]
    InvalidIndex { index: isize, count: usize },

    #[error("grid is {rows} rows, declared height {height}")]
    HeightMismatch { rows: usize, height: usize },

    #[error("row {row} has {len} cells, declared width {width}")]
    WidthMismatch { row: usize, len: usize, width: usize },

    #[error("unknown cell code {code} at ({x}, {z})")]
    UnknownCell { code: u8, x: usize, z: usize },

    #[error("start ({x}, {z}) is outside the grid")]
    StartOutOfBounds { x: usize, z: usize },

    #[error("start ({x}, {z}) is a wall")]
    StartOnWall { x: usize, z: usize },

    #[error("{what} at ({x}, {z}) is outside the grid or on a wall")]
    MarkerNotOnFloor { what: &'static str, x: usize, z: usize },

    #[error(transparent)]
    Generation(#[from] LevelGenerationError),
}

/// Renderable wall box: where the scene should draw a wall.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct WallPlacement {
    pub cell: CellPos,
    pub center: Vec3,
    pub size: Vec3,
}

impl WallPlacement {
    pub fn collider(&self) -> Aabb {
        Aabb::from_center_size(self.center, self.size)
    }
}

/// Validated grid of cells.
#[derive(Clone, Debug, Default)]
pub struct Grid {
    pub width: usize,
    pub height: usize,
    pub cells: Vec<Vec<Cell>>,
    pub start: CellPos,
}

impl Default for CellPos {
    fn default() -> Self {
        CellPos::new(0, 0)
    }
}

impl Grid {
    /// Validate level data and build the cell grid.
    pub fn from_level(data: &LevelData) -> Result<Grid, LevelError> {
        if data.grid.len() != data.height {
            return Err(LevelError::HeightMismatch { rows: data.grid.len(), height: data.height });
        }

        let mut cells = Vec::with_capacity(data.height);
        for (z, row) in data.grid.iter().enumerate() {
            if row.len() != data.width {
                return Err(LevelError::WidthMismatch { row: z, len: row.len(), width: data.width });
            }
            let mut out = Vec::with_capacity(row.len());
            for (x, &code) in row.iter().enumerate() {
                let cell = Cell::from_code(code).ok_or(LevelError::UnknownCell { code, x, z })?;
                out.push(cell);
            }
            cells.push(out);
        }

        let grid = Grid { width: data.width, height: data.height, cells, start: data.start };

        let (sx, sz) = (data.start.x, data.start.z);
        if !grid.in_bounds(sx, sz) {
            return Err(LevelError::StartOutOfBounds { x: sx, z: sz });
        }
        if grid.cell_at(sx, sz).is_solid() {
            return Err(LevelError::StartOnWall { x: sx, z: sz });
        }

        if let Some(keys) = &data.keys {
            for k in keys {
                grid.require_floor("key", *k)?;
            }
        }
        if let Some(p) = data.portal {
            grid.require_floor("portal", p)?;
        }

        Ok(grid)
    }

    fn require_floor(&self, what: &'static str, pos: CellPos) -> Result<(), LevelError> {
        if self.is_floor(pos.x, pos.z) {
            Ok(())
        } else {
            Err(LevelError::MarkerNotOnFloor { what, x: pos.x, z: pos.z })
        }
    }

    #[inline]
    pub fn in_bounds(&self, x: usize, z: usize) -> bool {
        x < self.width && z < self.height
    }

    /// Cell at (x, z). Out of bounds reads as wall.
    #[inline]
    pub fn cell_at(&self, x: usize, z: usize) -> Cell {
        if self.in_bounds(x, z) {
            self.cells[z][x]
        } else {
            Cell::Wall
        }
    }

    #[inline]
    pub fn is_floor(&self, x: usize, z: usize) -> bool {
        self.cell_at(x, z).is_floor()
    }

    /// Player spawn point: start cell center at eye height.
    pub fn start_position(&self, eye_height: f32) -> Vec3 {
        self.start.center(eye_height)
    }

    /// One placement per wall cell, row-major.
    pub fn wall_placements(&self) -> Vec<WallPlacement> {
        let mut out = vec![];
        for (z, row) in self.cells.iter().enumerate() {
            for (x, cell) in row.iter().enumerate() {
                if cell.is_solid() {
                    let pos = CellPos::new(x, z);
                    out.push(WallPlacement {
                        cell: pos,
                        center: pos.center(WALL_HEIGHT * 0.5),
                        size: Vec3::new(1.0, WALL_HEIGHT, 1.0),
                    });
                }
            }
        }
        out
    }

    /// Static collider boxes, one per wall cell.
    pub fn wall_colliders(&self) -> Vec<Aabb> {
        self.wall_placements().iter().map(WallPlacement::collider).collect()
    }

    /// Floor cells 4-connected to the start cell.
    /// `reachable[z][x] == true` ↔ the player can walk from start to (x, z).
    pub fn reachable_from_start(&self) -> Vec<Vec<bool>> {
        let mut seen = vec![vec![false; self.width]; self.height];
        if !self.is_floor(self.start.x, self.start.z) {
            return seen;
        }

        let mut queue = VecDeque::new();
        seen[self.start.z][self.start.x] = true;
        queue.push_back(self.start);

        while let Some(p) = queue.pop_front() {
            let mut neighbors = Vec::with_capacity(4);
            if p.x > 0 { neighbors.push(CellPos::new(p.x - 1, p.z)); }
            if p.z > 0 { neighbors.push(CellPos::new(p.x, p.z - 1)); }
            neighbors.push(CellPos::new(p.x + 1, p.z));
            neighbors.push(CellPos::new(p.x, p.z + 1));

            for n in neighbors {
                if self.is_floor(n.x, n.z) && !seen[n.z][n.x] {
                    seen[n.z][n.x] = true;
                    queue.push_back(n);
                }
            }
        }
        seen
    }

    /// Encode the cells back to level-data rows.
    pub fn to_rows(&self) -> Vec<Vec<u8>> {
        self.cells.iter().map(|row| row.iter().map(|c| c.code()).collect()).collect()
    }
}
