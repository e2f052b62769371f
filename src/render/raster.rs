//! CPU rasteriser for the viewport frame.
//!
//! Flat shaded, depth tested triangles plus unshaded overlay lines. The frame
//! is cleared to transparent so whatever sits behind the viewport shows
//! through where the model does not cover it.

use crate::config::LightConfig;
use glam::{Vec2, Vec3};
use image::{Rgba, RgbaImage};

pub struct Frame {
    image: RgbaImage,
    depth: Vec<f32>,
}

impl Frame {
    pub fn new(width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            image: RgbaImage::new(width, height),
            depth: vec![f32::INFINITY; (width * height) as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width.max(1) != self.width() || height.max(1) != self.height() {
            *self = Self::new(width, height);
        }
    }

    pub fn clear(&mut self) {
        for pixel in self.image.pixels_mut() {
            *pixel = Rgba([0, 0, 0, 0]);
        }
        self.depth.fill(f32::INFINITY);
    }

    /// `points` are pixel x, pixel y and depth in 0..1.
    pub fn fill_triangle(&mut self, points: [Vec3; 3], color: [u8; 4]) {
        let [a, b, c] = points;
        let area = edge(a.truncate(), b.truncate(), c.truncate());
        if area.abs() < 1e-8 {
            return;
        }
        let w = self.width() as f32;
        let h = self.height() as f32;
        let min_x = a.x.min(b.x).min(c.x).floor().max(0.0) as u32;
        let min_y = a.y.min(b.y).min(c.y).floor().max(0.0) as u32;
        let max_x = a.x.max(b.x).max(c.x).ceil().min(w - 1.0);
        let max_y = a.y.max(b.y).max(c.y).ceil().min(h - 1.0);
        if max_x < 0.0 || max_y < 0.0 {
            return;
        }
        let (max_x, max_y) = (max_x as u32, max_y as u32);
        let width = self.width();
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                let w0 = edge(b.truncate(), c.truncate(), p) / area;
                let w1 = edge(c.truncate(), a.truncate(), p) / area;
                let w2 = 1.0 - w0 - w1;
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }
                let z = a.z * w0 + b.z * w1 + c.z * w2;
                if !(0.0..=1.0).contains(&z) {
                    continue;
                }
                let index = (y * width + x) as usize;
                if z < self.depth[index] {
                    self.depth[index] = z;
                    self.image.put_pixel(x, y, Rgba(color));
                }
            }
        }
    }

    /// Overlay line, drawn on top of everything without depth.
    pub fn draw_line(&mut self, from: Vec2, to: Vec2, thickness: f32, color: [u8; 4]) {
        let delta = to - from;
        let steps = delta.abs().max_element().ceil().max(1.0) as u32;
        let radius = (thickness * 0.5).max(0.5);
        for i in 0..=steps {
            let p = from + delta * (i as f32 / steps as f32);
            self.stamp(p, radius, color);
        }
    }

    fn stamp(&mut self, center: Vec2, radius: f32, color: [u8; 4]) {
        let r = radius.ceil() as i64;
        let (cx, cy) = (center.x.floor() as i64, center.y.floor() as i64);
        for y in (cy - r + 1)..=(cy + r - 1).max(cy) {
            for x in (cx - r + 1)..=(cx + r - 1).max(cx) {
                if x < 0 || y < 0 || x >= self.width() as i64 || y >= self.height() as i64 {
                    continue;
                }
                self.image.put_pixel(x as u32, y as u32, Rgba(color));
            }
        }
    }
}

fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

/// Ambient plus one directional light, both white.
#[derive(Debug, Clone, Copy)]
pub struct Lighting {
    pub ambient: f32,
    pub directional: f32,
    /// Unit vector pointing from the surface toward the light.
    pub to_light: Vec3,
}

impl Lighting {
    pub fn from_config(config: &LightConfig) -> Self {
        let to_light = Vec3::from_array(config.directional_position).normalize_or_zero();
        Self {
            ambient: config.ambient_intensity,
            directional: config.directional_intensity,
            to_light: if to_light == Vec3::ZERO { Vec3::Y } else { to_light },
        }
    }

    /// `normal` must already face the viewer.
    pub fn shade(&self, normal: Vec3, tint: [f32; 3]) -> [u8; 4] {
        let intensity = self.ambient + self.directional * normal.dot(self.to_light).max(0.0);
        let [r, g, b] = tint.map(|c| ((c * intensity).clamp(0.0, 1.0) * 255.0).round() as u8);
        [r, g, b, 255]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleared_frame_is_transparent() {
        let mut frame = Frame::new(4, 4);
        frame.fill_triangle(
            [Vec3::new(0.0, 0.0, 0.5), Vec3::new(4.0, 0.0, 0.5), Vec3::new(0.0, 4.0, 0.5)],
            [255, 0, 0, 255],
        );
        frame.clear();
        assert!(frame.image().pixels().all(|p| p.0[3] == 0));
    }

    #[test]
    fn nearer_triangle_wins_regardless_of_order() {
        let mut frame = Frame::new(8, 8);
        let quad = |z: f32| {
            [
                Vec3::new(-1.0, -1.0, z),
                Vec3::new(20.0, -1.0, z),
                Vec3::new(-1.0, 20.0, z),
            ]
        };
        frame.fill_triangle(quad(0.2), [0, 255, 0, 255]);
        frame.fill_triangle(quad(0.6), [255, 0, 0, 255]);
        assert_eq!(frame.image().get_pixel(1, 1).0, [0, 255, 0, 255]);
    }

    #[test]
    fn triangle_covers_interior_only() {
        let mut frame = Frame::new(10, 10);
        frame.fill_triangle(
            [Vec3::new(0.0, 0.0, 0.5), Vec3::new(10.0, 0.0, 0.5), Vec3::new(0.0, 10.0, 0.5)],
            [9, 9, 9, 255],
        );
        assert_eq!(frame.image().get_pixel(1, 1).0[3], 255);
        assert_eq!(frame.image().get_pixel(9, 9).0[3], 0);
    }

    #[test]
    fn lines_ignore_depth_and_stay_in_bounds() {
        let mut frame = Frame::new(6, 6);
        frame.draw_line(Vec2::new(-10.0, 3.0), Vec2::new(20.0, 3.0), 2.0, [1, 2, 3, 255]);
        assert_eq!(frame.image().get_pixel(0, 3).0, [1, 2, 3, 255]);
        assert_eq!(frame.image().get_pixel(5, 3).0, [1, 2, 3, 255]);
    }

    #[test]
    fn light_facing_surface_is_brighter() {
        let lighting = Lighting::from_config(&LightConfig::default());
        let lit = lighting.shade(lighting.to_light, [1.0, 1.0, 1.0]);
        let unlit = lighting.shade(-lighting.to_light, [1.0, 1.0, 1.0]);
        assert_eq!(lit, [255, 255, 255, 255]);
        assert_eq!(unlit, [128, 128, 128, 255]);
    }
}
