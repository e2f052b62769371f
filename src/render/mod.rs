pub mod camera;
mod egui_overlay;
pub mod gizmo;
pub mod raster;

pub use camera::{OrbitCamera, OrbitControl, ScreenProjector};
pub use egui_overlay::EguiOverlay;
pub use gizmo::{GizmoDrag, GizmoMode, GizmoSession};

use crate::config::ViewerConfig;
use crate::scene::{Axis, ManipulableObject, SceneNode};
use glam::{Vec2, Vec3};
use raster::{Frame, Lighting};

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to create window surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("no compatible GPU adapter found")]
    NoAdapter,
    #[error("failed to create GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("surface is not supported by the selected adapter")]
    UnsupportedSurface,
}

/// Owner of camera, lights and the drawn frame.
///
/// Callers hand in the current object on every render; the host never keeps
/// its own copy of the transform.
pub trait SceneHost {
    fn render_frame(&mut self, object: Option<&ManipulableObject>, gizmo: &GizmoSession);
    fn attach_manipulator(&mut self, object: &ManipulableObject) -> GizmoSession;
    fn set_viewport_size(&mut self, width: u32, height: u32);
    fn dispose(&mut self);
}

const GIZMO_LINE_PX: f32 = 3.0;
const GIZMO_TIP_PX: f32 = 9.0;
const HOT_COLOR: [u8; 4] = [255, 220, 40, 255];

fn axis_color(axis: Axis) -> [u8; 4] {
    match axis {
        Axis::X => [230, 64, 64, 255],
        Axis::Y => [72, 200, 88, 255],
        Axis::Z => [64, 128, 235, 255],
    }
}

/// [`SceneHost`] that rasterises on the CPU into an RGBA frame.
pub struct SoftwareSceneHost {
    frame: Frame,
    node: Option<SceneNode>,
    camera: OrbitCamera,
    lighting: Lighting,
    viewport: (u32, u32),
    pixel_ratio: f32,
    max_pixel_ratio: f32,
    frames_rendered: u64,
    disposed: bool,
}

impl SoftwareSceneHost {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            frame: Frame::new(1, 1),
            node: None,
            camera: OrbitCamera::new(&config.camera, &config.orbit),
            lighting: Lighting::from_config(&config.lights),
            viewport: (1, 1),
            pixel_ratio: 1.0,
            max_pixel_ratio: config.render.max_pixel_ratio.max(0.25),
            frames_rendered: 0,
            disposed: false,
        }
    }

    /// Adds the loaded model and frames the camera on it.
    pub fn set_node(&mut self, node: SceneNode) {
        log::info!(
            "scene node '{}' added: {} triangles, extent {:?}",
            node.name,
            node.triangle_count(),
            node.bounds.extent()
        );
        self.camera.frame_bounds(&node.bounds);
        self.node = Some(node);
    }

    #[cfg(test)]
    pub fn node(&self) -> Option<&SceneNode> {
        self.node.as_ref()
    }

    #[cfg(test)]
    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut OrbitCamera {
        &mut self.camera
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    #[cfg(test)]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Device pixels per logical pixel, capped at the configured maximum.
    pub fn set_pixel_ratio(&mut self, ratio: f32) {
        let ratio = ratio.clamp(0.25, self.max_pixel_ratio);
        if (ratio - self.pixel_ratio).abs() > f32::EPSILON {
            self.pixel_ratio = ratio;
            self.resize_frame();
        }
    }

    #[cfg(test)]
    pub fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    /// Projector in logical viewport pixels, used for pointer picking.
    pub fn viewport_projector(&self) -> ScreenProjector {
        self.camera
            .projector(self.viewport.0 as f32, self.viewport.1 as f32)
    }

    fn resize_frame(&mut self) {
        let width = (self.viewport.0 as f32 * self.pixel_ratio).round() as u32;
        let height = (self.viewport.1 as f32 * self.pixel_ratio).round() as u32;
        self.frame.resize(width, height);
    }

    fn draw_node(&mut self, object: &ManipulableObject, projector: &ScreenProjector) {
        let Some(node) = &self.node else {
            return;
        };
        let model = object.model_matrix();
        for tri in node.triangles() {
            let world = tri.map(|p| model.transform_point3(p));
            let mut normal = (world[1] - world[0])
                .cross(world[2] - world[0])
                .normalize_or_zero();
            if normal == Vec3::ZERO {
                continue;
            }
            let centroid = (world[0] + world[1] + world[2]) / 3.0;
            // two sided: light the side that faces the eye
            if normal.dot(projector.eye - centroid) < 0.0 {
                normal = -normal;
            }
            let (Some(a), Some(b), Some(c)) = (
                projector.project(world[0]),
                projector.project(world[1]),
                projector.project(world[2]),
            ) else {
                continue;
            };
            let color = self.lighting.shade(normal, object.tint);
            self.frame.fill_triangle([a, b, c], color);
        }
    }

    fn draw_gizmo(
        &mut self,
        object: &ManipulableObject,
        gizmo: &GizmoSession,
        projector: &ScreenProjector,
    ) {
        let origin = object.position;
        let length = gizmo::handle_length(projector, origin);
        let line = GIZMO_LINE_PX * self.pixel_ratio;
        for (axis, points) in gizmo::handle_polylines(gizmo.mode, origin, length) {
            let color = if gizmo.hot_axis == Some(axis) {
                HOT_COLOR
            } else {
                axis_color(axis)
            };
            let screen: Vec<Vec2> = points
                .iter()
                .filter_map(|p| projector.project_2d(*p))
                .collect();
            for pair in screen.windows(2) {
                self.frame.draw_line(pair[0], pair[1], line, color);
            }
            if gizmo.mode != GizmoMode::Rotate {
                if let Some(tip) = screen.last() {
                    // arrowhead for translate, block for scale
                    let size = match gizmo.mode {
                        GizmoMode::Scale => GIZMO_TIP_PX * 1.2,
                        _ => GIZMO_TIP_PX,
                    } * self.pixel_ratio;
                    self.frame.draw_line(*tip, *tip, size, color);
                }
            }
        }
    }
}

impl SceneHost for SoftwareSceneHost {
    fn render_frame(&mut self, object: Option<&ManipulableObject>, gizmo: &GizmoSession) {
        if self.disposed {
            return;
        }
        self.frame.clear();
        let projector = self
            .camera
            .projector(self.frame.width() as f32, self.frame.height() as f32);
        if let Some(object) = object {
            self.draw_node(object, &projector);
            if gizmo.visible {
                self.draw_gizmo(object, gizmo, &projector);
            }
        }
        self.frames_rendered += 1;
        log::trace!("frame {} rendered", self.frames_rendered);
    }

    fn attach_manipulator(&mut self, object: &ManipulableObject) -> GizmoSession {
        log::debug!("gizmo attached at {:?}", object.position);
        GizmoSession::default()
    }

    fn set_viewport_size(&mut self, width: u32, height: u32) {
        self.viewport = (width.max(1), height.max(1));
        self.resize_frame();
    }

    fn dispose(&mut self) {
        self.disposed = true;
        self.node = None;
        self.frame = Frame::new(1, 1);
    }
}
