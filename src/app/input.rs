use crate::render::GizmoDrag;
use glam::Vec2;

/// Points of wheel travel that count as one zoom step.
const POINTS_PER_ZOOM_STEP: f32 = 50.0;

/// Who owns the current primary-button drag in the viewport.
#[derive(Debug, Clone)]
pub enum PointerDrag {
    Orbit { last: Vec2 },
    Gizmo(GizmoDrag),
}

impl PointerDrag {
    pub fn is_gizmo(&self) -> bool {
        matches!(self, PointerDrag::Gizmo(_))
    }
}

/// Positive when scrolling up, which moves the camera in.
pub fn wheel_steps(scroll_y_points: f32) -> f32 {
    scroll_y_points / POINTS_PER_ZOOM_STEP
}
