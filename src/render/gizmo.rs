//! Transform gizmo: handle layout, screen-space picking and drag math.
//!
//! Handles are laid out along the world axes around the object origin.
//! Picking happens in whatever pixel grid the projector describes, so the
//! same polylines serve both drawing into the frame and hit testing against
//! the pointer.

use crate::render::camera::ScreenProjector;
use crate::scene::{clamp_scale, Axis, ManipulableObject};
use glam::{Vec2, Vec3};

const RING_SEGMENTS: usize = 48;
const PICK_RADIUS_PX: f32 = 8.0;
/// Handle length as a fraction of the eye-to-origin distance.
const SCREEN_SIZE_FACTOR: f32 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GizmoMode {
    #[default]
    Translate,
    Rotate,
    Scale,
}

impl GizmoMode {
    pub const ALL: [GizmoMode; 3] = [GizmoMode::Translate, GizmoMode::Rotate, GizmoMode::Scale];

    pub fn label(self) -> &'static str {
        match self {
            GizmoMode::Translate => "Translate",
            GizmoMode::Rotate => "Rotate",
            GizmoMode::Scale => "Scale",
        }
    }
}

/// Interaction state of the gizmo attached to the model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GizmoSession {
    /// A handle drag is in progress.
    pub active: bool,
    pub mode: GizmoMode,
    /// Hidden while capturing a clean frame for export.
    pub visible: bool,
    /// Handle under the pointer or being dragged.
    pub hot_axis: Option<Axis>,
}

impl Default for GizmoSession {
    fn default() -> Self {
        Self {
            active: false,
            mode: GizmoMode::Translate,
            visible: true,
            hot_axis: None,
        }
    }
}

pub fn handle_length(projector: &ScreenProjector, origin: Vec3) -> f32 {
    (projector.eye - origin).length().max(1e-3) * SCREEN_SIZE_FACTOR
}

/// World-space polyline for each axis handle in the given mode.
pub fn handle_polylines(mode: GizmoMode, origin: Vec3, length: f32) -> Vec<(Axis, Vec<Vec3>)> {
    Axis::ALL
        .iter()
        .map(|&axis| {
            let points = match mode {
                GizmoMode::Translate | GizmoMode::Scale => {
                    vec![origin, origin + axis.unit() * length]
                }
                GizmoMode::Rotate => ring_points(origin, axis, length),
            };
            (axis, points)
        })
        .collect()
}

fn ring_points(origin: Vec3, axis: Axis, radius: f32) -> Vec<Vec3> {
    let normal = axis.unit();
    let u = normal.any_orthonormal_vector();
    let v = normal.cross(u);
    (0..=RING_SEGMENTS)
        .map(|i| {
            let angle = i as f32 / RING_SEGMENTS as f32 * std::f32::consts::TAU;
            origin + (u * angle.cos() + v * angle.sin()) * radius
        })
        .collect()
}

/// Closest handle within the pick radius of `pointer`, if any.
pub fn pick_handle(
    mode: GizmoMode,
    object: &ManipulableObject,
    projector: &ScreenProjector,
    pointer: Vec2,
) -> Option<Axis> {
    let origin = object.position;
    let length = handle_length(projector, origin);
    let mut best: Option<(Axis, f32)> = None;
    for (axis, points) in handle_polylines(mode, origin, length) {
        let screen: Vec<Vec2> = points
            .iter()
            .filter_map(|p| projector.project_2d(*p))
            .collect();
        for pair in screen.windows(2) {
            let distance = distance_to_segment(pointer, pair[0], pair[1]);
            if distance <= PICK_RADIUS_PX && best.map_or(true, |(_, d)| distance < d) {
                best = Some((axis, distance));
            }
        }
    }
    best.map(|(axis, _)| axis)
}

fn distance_to_segment(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

/// An in-progress handle drag. Writes straight into the object; the caller
/// is responsible for telling the binding controller afterwards.
#[derive(Debug, Clone)]
pub struct GizmoDrag {
    mode: GizmoMode,
    axis: Axis,
    start_pointer: Vec2,
    start_value: Vec3,
    origin_px: Vec2,
    /// Screen displacement of moving one world unit along the axis.
    unit_px: Vec2,
    handle_length: f32,
    /// +1 when the axis points toward the eye.
    facing: f32,
    last_angle: f32,
    accumulated_angle: f32,
}

impl GizmoDrag {
    pub fn begin(
        mode: GizmoMode,
        axis: Axis,
        pointer: Vec2,
        object: &ManipulableObject,
        projector: &ScreenProjector,
    ) -> Option<Self> {
        let origin = object.position;
        let origin_px = projector.project_2d(origin)?;
        let tip_px = projector.project_2d(origin + axis.unit())?;
        let unit_px = tip_px - origin_px;
        if mode != GizmoMode::Rotate && unit_px.length_squared() < 1e-6 {
            // axis points straight at the eye
            return None;
        }
        let start_value = match mode {
            GizmoMode::Translate => object.position,
            GizmoMode::Rotate => object.rotation,
            GizmoMode::Scale => object.scale,
        };
        let facing = if axis.unit().dot(projector.eye - origin) >= 0.0 {
            1.0
        } else {
            -1.0
        };
        let start_angle = angle_around(pointer, origin_px);
        Some(Self {
            mode,
            axis,
            start_pointer: pointer,
            start_value,
            origin_px,
            unit_px,
            handle_length: handle_length(projector, origin),
            facing,
            last_angle: start_angle,
            accumulated_angle: 0.0,
        })
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn update(&mut self, pointer: Vec2, object: &mut ManipulableObject) {
        let i = self.axis.index();
        match self.mode {
            GizmoMode::Translate => {
                let mut position = self.start_value;
                position[i] += self.axis_travel(pointer);
                object.position = position;
            }
            GizmoMode::Scale => {
                let factor = 1.0 + self.axis_travel(pointer) / self.handle_length.max(1e-3);
                let mut scale = self.start_value;
                scale[i] = clamp_scale(self.start_value[i] * factor);
                object.scale = scale;
            }
            GizmoMode::Rotate => {
                let angle = angle_around(pointer, self.origin_px);
                self.accumulated_angle += wrap_pi(angle - self.last_angle);
                self.last_angle = angle;
                // screen angles run clockwise because y points down
                let mut rotation = self.start_value;
                rotation[i] -= self.accumulated_angle * self.facing;
                object.rotation = rotation;
            }
        }
    }

    /// World units travelled along the axis since the drag started.
    fn axis_travel(&self, pointer: Vec2) -> f32 {
        let delta = pointer - self.start_pointer;
        delta.dot(self.unit_px) / self.unit_px.length_squared().max(1e-6)
    }
}

fn angle_around(pointer: Vec2, origin: Vec2) -> f32 {
    let d = pointer - origin;
    d.y.atan2(d.x)
}

fn wrap_pi(angle: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    (angle + PI).rem_euclid(TAU) - PI
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CameraConfig, OrbitConfig};
    use crate::render::camera::OrbitCamera;
    use crate::scene::MIN_SCALE;

    fn projector() -> ScreenProjector {
        OrbitCamera::new(&CameraConfig::default(), &OrbitConfig::default())
            .projector(800.0, 600.0)
    }

    #[test]
    fn pointer_on_x_handle_picks_x() {
        let projector = projector();
        let object = ManipulableObject::default();
        let length = handle_length(&projector, object.position);
        let mid = projector
            .project_2d(Vec3::X * length * 0.5)
            .unwrap();
        assert_eq!(
            pick_handle(GizmoMode::Translate, &object, &projector, mid),
            Some(Axis::X)
        );
        assert_eq!(
            pick_handle(GizmoMode::Translate, &object, &projector, Vec2::new(5.0, 5.0)),
            None
        );
    }

    #[test]
    fn translate_drag_follows_pointer_along_axis() {
        let projector = projector();
        let mut object = ManipulableObject::default();
        let origin_px = projector.project_2d(Vec3::ZERO).unwrap();
        let unit_px = projector.project_2d(Vec3::X).unwrap() - origin_px;
        let mut drag =
            GizmoDrag::begin(GizmoMode::Translate, Axis::X, origin_px, &object, &projector)
                .unwrap();
        drag.update(origin_px + unit_px * 2.0 + Vec2::new(0.0, 40.0), &mut object);
        assert!((object.position.x - 2.0).abs() < 1e-3);
        assert_eq!(object.position.y, 0.0);
        assert_eq!(object.position.z, 0.0);
    }

    #[test]
    fn scale_drag_never_collapses() {
        let projector = projector();
        let mut object = ManipulableObject::default();
        let origin_px = projector.project_2d(Vec3::ZERO).unwrap();
        let mut drag =
            GizmoDrag::begin(GizmoMode::Scale, Axis::Y, origin_px, &object, &projector).unwrap();
        drag.update(origin_px + Vec2::new(0.0, 5_000.0), &mut object);
        assert_eq!(object.scale.y, MIN_SCALE);
        assert_eq!(object.scale.x, 1.0);
    }

    #[test]
    fn rotate_drag_accumulates_past_full_turn() {
        let projector = projector();
        let mut object = ManipulableObject::default();
        let origin_px = projector.project_2d(Vec3::ZERO).unwrap();
        let start = origin_px + Vec2::new(50.0, 0.0);
        let mut drag =
            GizmoDrag::begin(GizmoMode::Rotate, Axis::Z, start, &object, &projector).unwrap();
        let steps = 64;
        for i in 1..=steps * 2 {
            let angle = i as f32 / steps as f32 * std::f32::consts::TAU;
            drag.update(origin_px + Vec2::new(angle.cos(), angle.sin()) * 50.0, &mut object);
        }
        // two clockwise screen turns seen from +Z
        assert!((object.rotation.z + 2.0 * std::f32::consts::TAU).abs() < 1e-3);
    }

    #[test]
    fn translate_along_view_axis_is_refused() {
        let projector = projector();
        let object = ManipulableObject::default();
        let origin_px = projector.project_2d(Vec3::ZERO).unwrap();
        assert!(
            GizmoDrag::begin(GizmoMode::Translate, Axis::Z, origin_px, &object, &projector)
                .is_none()
        );
    }
}
