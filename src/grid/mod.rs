//! Decorative dot grid drawn behind the viewport. Dots near the pointer grow
//! and shift from blue toward red.

use crate::config::GridConfig;
use glam::Vec2;

/// Extra diameter a dot gains with the pointer right on top of it.
const HOVER_GROWTH: f32 = 10.0;
const BACKGROUND_GRAY: u8 = 30;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dot {
    pub center: Vec2,
    pub diameter: f32,
    pub color: [u8; 4],
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Cell {
    center: Vec2,
    base_diameter: f32,
}

#[derive(Debug, Clone)]
pub struct DotGrid {
    cols: u32,
    rows: u32,
    alpha: u8,
    width: f32,
    cells: Vec<Cell>,
}

impl DotGrid {
    pub fn new(config: &GridConfig) -> Self {
        Self {
            cols: config.cols.max(1),
            rows: config.rows.max(1),
            alpha: config.alpha,
            width: 0.0,
            cells: Vec::new(),
        }
    }

    /// Recomputes cell centres for a new canvas size.
    pub fn layout(&mut self, width: f32, height: f32) {
        let cell_w = width / self.cols as f32;
        let cell_h = height / self.rows as f32;
        self.width = width;
        self.cells.clear();
        for i in 0..self.cols {
            for j in 0..self.rows {
                self.cells.push(Cell {
                    center: Vec2::new(
                        i as f32 * cell_w + cell_w / 2.0,
                        j as f32 * cell_h + cell_h / 2.0,
                    ),
                    base_diameter: cell_w / 3.0,
                });
            }
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn background(&self) -> [u8; 4] {
        [BACKGROUND_GRAY, BACKGROUND_GRAY, BACKGROUND_GRAY, self.alpha]
    }

    /// Dots for the current pointer position, relative to the grid origin.
    /// Without a pointer every dot sits at rest.
    pub fn dots(&self, pointer: Option<Vec2>) -> Vec<Dot> {
        let max_dist = self.width / self.cols as f32;
        self.cells
            .iter()
            .map(|cell| {
                let d = pointer.map_or(f32::INFINITY, |p| p.distance(cell.center));
                let t = if max_dist > 0.0 {
                    d.clamp(0.0, max_dist) / max_dist
                } else {
                    1.0
                };
                let c = lerp(255.0, 100.0, t);
                Dot {
                    center: cell.center,
                    diameter: cell.base_diameter + lerp(HOVER_GROWTH, 0.0, t),
                    color: [c.round() as u8, 150, (255.0 - c).round() as u8, self.alpha],
                }
            })
            .collect()
    }
}

fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t
}
