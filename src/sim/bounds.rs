//! World bounds derived from the viewport
//!
//! Recomputed synchronously on every resize, never during a tick. No aspect
//! ratio is assumed: the arena uses the shorter side, the court and grid
//! stretch to fill.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::state::{Cell, Side};
use crate::tuning::Tuning;

/// Size of the host canvas in world units (CSS pixels)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        // Guard against zero-sized or NaN canvases during page layout
        let sane = |v: f32| if v.is_finite() { v.max(1.0) } else { 1.0 };
        Self {
            width: sane(width),
            height: sane(height),
        }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280.0, 720.0)
    }
}

/// Circular sumo platform
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArenaBounds {
    pub center: Vec2,
    pub radius: f32,
}

/// Volleyball court, y grows downward
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CourtBounds {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    /// Slimes rest on this line; the ball scores when it reaches it
    pub ground: f32,
    pub net_x: f32,
    /// Upper end of the net; the net spans `net_top..=ground`
    pub net_top: f32,
}

impl CourtBounds {
    /// Which half of the court an x coordinate lies in
    pub fn side_of(&self, x: f32) -> Side {
        if x < self.net_x { Side::Left } else { Side::Right }
    }

    /// Horizontal range a body of `radius` may occupy on its own half
    pub fn half_range(&self, side: Side, radius: f32, net_half_width: f32) -> (f32, f32) {
        let (lo, hi) = match side {
            Side::Left => (self.left + radius, self.net_x - net_half_width - radius),
            Side::Right => (self.net_x + net_half_width + radius, self.right - radius),
        };
        // Narrow viewports: collapse to the middle of the half
        if hi < lo {
            let mid = (lo + hi) / 2.0;
            (mid, mid)
        } else {
            (lo, hi)
        }
    }

    /// Centre of a side's half, where serves hang and players spawn
    pub fn quarter_x(&self, side: Side) -> f32 {
        let width = self.right - self.left;
        match side {
            Side::Left => self.left + width * 0.25,
            Side::Right => self.left + width * 0.75,
        }
    }

    pub fn height(&self) -> f32 {
        self.ground - self.top
    }
}

/// Snake board: `cols` x `rows` cells centred in the viewport
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridBounds {
    pub cols: i32,
    pub rows: i32,
    pub cell_size: f32,
    /// World position of cell (0, 0)'s top-left corner
    pub origin: Vec2,
}

impl GridBounds {
    pub fn contains(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.x < self.cols && cell.y >= 0 && cell.y < self.rows
    }

    /// World position of a cell's centre
    pub fn cell_center(&self, cell: Cell) -> Vec2 {
        self.origin + (Vec2::new(cell.x as f32, cell.y as f32) + Vec2::splat(0.5)) * self.cell_size
    }
}

/// Everything derived from one viewport size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub viewport: Viewport,
    pub arena: ArenaBounds,
    pub court: CourtBounds,
    pub grid: GridBounds,
}

impl Bounds {
    pub fn from_viewport(viewport: Viewport, tuning: &Tuning) -> Self {
        let w = viewport.width;
        let h = viewport.height;

        let arena = ArenaBounds {
            center: viewport.center(),
            radius: w.min(h) * tuning.arena.radius_fraction,
        };

        let ns = &tuning.net_sport;
        let left = ns.padding.min(w / 2.0);
        let right = (w - ns.padding).max(left);
        let top = (ns.padding + ns.header).min(h / 2.0);
        let ground = (h - ns.padding).max(top);
        let court = CourtBounds {
            left,
            right,
            top,
            ground,
            net_x: w / 2.0,
            net_top: ground - (ground - top) * ns.net_height_fraction,
        };

        let cell = tuning.grid.cell_size;
        let cols = ((w / cell).floor() as i32).max(1);
        let rows = ((h / cell).floor() as i32).max(1);
        let grid = GridBounds {
            cols,
            rows,
            cell_size: cell,
            origin: Vec2::new(
                (w - cols as f32 * cell) / 2.0,
                (h - rows as f32 * cell) / 2.0,
            ),
        };

        Self {
            viewport,
            arena,
            court,
            grid,
        }
    }
}
