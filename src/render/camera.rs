use crate::config::{CameraConfig, OrbitConfig};
use crate::scene::Bounds;
use glam::{Mat4, Vec2, Vec3, Vec4Swizzles};

const POLAR_MARGIN: f32 = 0.01;
const ZOOM_STEP: f32 = 0.95;

/// Anything that interprets pointer drags as camera motion and can be
/// switched off while another consumer owns the pointer.
pub trait OrbitControl {
    fn set_enabled(&mut self, enabled: bool);
}

/// Orbit camera around a fixed target with optional damping.
///
/// Pointer deltas accumulate into a pending spherical delta which
/// [`OrbitCamera::update`] bleeds off by `damping_factor` each frame.
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub distance: f32,
    pub yaw: f32,
    pub pitch: f32,
    pending_yaw: f32,
    pending_pitch: f32,
    enabled: bool,
    fov_y_deg: f32,
    near: f32,
    far: f32,
    settings: OrbitConfig,
}

impl OrbitCamera {
    pub fn new(camera: &CameraConfig, orbit: &OrbitConfig) -> Self {
        Self {
            target: Vec3::ZERO,
            distance: camera
                .start_distance
                .clamp(orbit.min_distance, orbit.max_distance),
            yaw: 0.0,
            pitch: 0.0,
            pending_yaw: 0.0,
            pending_pitch: 0.0,
            enabled: true,
            fov_y_deg: camera.fov_deg,
            near: camera.near,
            far: camera.far,
            settings: orbit.clone(),
        }
    }

    #[cfg(test)]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn eye(&self) -> Vec3 {
        let cos_pitch = self.pitch.cos();
        let offset = Vec3::new(
            cos_pitch * self.yaw.sin(),
            self.pitch.sin(),
            cos_pitch * self.yaw.cos(),
        );
        self.target + offset * self.distance
    }

    /// Pointer drag in logical pixels. One viewport height is a full turn.
    pub fn rotate(&mut self, delta_px: Vec2, viewport_height: f32) {
        if !self.enabled {
            return;
        }
        let height = viewport_height.max(1.0);
        let scale = std::f32::consts::TAU / height * self.settings.rotate_speed;
        self.pending_yaw -= delta_px.x * scale;
        self.pending_pitch += delta_px.y * scale;
        if !self.damped() {
            self.apply_pending(1.0);
        }
    }

    /// Positive steps move the camera closer.
    pub fn zoom(&mut self, steps: f32) {
        if !self.enabled || !self.settings.enable_zoom {
            return;
        }
        self.distance = (self.distance * ZOOM_STEP.powf(steps))
            .clamp(self.settings.min_distance, self.settings.max_distance);
    }

    pub fn pan(&mut self, delta_px: Vec2, viewport_height: f32) {
        if !self.enabled || !self.settings.enable_pan {
            return;
        }
        let (_, right, up) = self.basis();
        let world_per_px = 2.0 * self.distance * (self.fov_y_deg.to_radians() * 0.5).tan()
            / viewport_height.max(1.0);
        self.target += (-right * delta_px.x + up * delta_px.y) * world_per_px;
    }

    /// Advances damping. Returns true while the camera is still moving.
    pub fn update(&mut self) -> bool {
        if !self.damped() {
            return false;
        }
        let moving = self.pending_yaw.abs() > 1e-5 || self.pending_pitch.abs() > 1e-5;
        self.apply_pending(self.settings.damping_factor);
        moving
    }

    pub fn frame_bounds(&mut self, bounds: &Bounds) {
        let radius = bounds.radius();
        let distance = if radius > 0.0 { radius * 3.0 } else { 3.0 };
        self.target = Vec3::ZERO;
        self.distance = distance.clamp(self.settings.min_distance, self.settings.max_distance);
    }

    pub fn basis(&self) -> (Vec3, Vec3, Vec3) {
        let forward = (self.target - self.eye()).normalize_or_zero();
        let right = forward.cross(Vec3::Y).normalize_or_zero();
        let up = right.cross(forward).normalize_or_zero();
        (forward, right, up)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_y_deg.to_radians(),
            aspect.max(1e-3),
            self.near,
            self.far,
        )
    }

    pub fn projector(&self, width: f32, height: f32) -> ScreenProjector {
        let width = width.max(1.0);
        let height = height.max(1.0);
        ScreenProjector {
            view_proj: self.projection_matrix(width / height) * self.view_matrix(),
            eye: self.eye(),
            size: Vec2::new(width, height),
        }
    }

    fn damped(&self) -> bool {
        self.settings.enable_damping && self.settings.damping_factor > 0.0
    }

    fn apply_pending(&mut self, factor: f32) {
        self.yaw += self.pending_yaw * factor;
        self.pitch += self.pending_pitch * factor;
        self.pending_yaw *= 1.0 - factor;
        self.pending_pitch *= 1.0 - factor;
        wrap_yaw(&mut self.yaw);
        let limit = std::f32::consts::FRAC_PI_2 - POLAR_MARGIN;
        self.pitch = self.pitch.clamp(-limit, limit);
    }
}

impl OrbitControl for OrbitCamera {
    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

/// World to screen mapping for one viewport size. Screen y grows downward.
#[derive(Debug, Clone, Copy)]
pub struct ScreenProjector {
    pub view_proj: Mat4,
    pub eye: Vec3,
    pub size: Vec2,
}

impl ScreenProjector {
    /// Returns pixel x, pixel y and depth in 0..1, or `None` behind the eye.
    pub fn project(&self, world: Vec3) -> Option<Vec3> {
        let clip = self.view_proj * world.extend(1.0);
        if clip.w <= 1e-5 {
            return None;
        }
        let ndc = clip.xyz() / clip.w;
        Some(Vec3::new(
            (ndc.x * 0.5 + 0.5) * self.size.x,
            (0.5 - ndc.y * 0.5) * self.size.y,
            ndc.z,
        ))
    }

    pub fn project_2d(&self, world: Vec3) -> Option<Vec2> {
        self.project(world).map(|p| p.truncate())
    }
}

fn wrap_yaw(yaw: &mut f32) {
    const TWO_PI: f32 = std::f32::consts::PI * 2.0;
    if yaw.is_finite() {
        *yaw = (*yaw + std::f32::consts::PI).rem_euclid(TWO_PI) - std::f32::consts::PI;
    }
}

#[cfg(test)]
mod tests {
    use super::{OrbitCamera, OrbitControl};
    use crate::config::{CameraConfig, OrbitConfig};
    use glam::{Vec2, Vec3};

    fn camera() -> OrbitCamera {
        OrbitCamera::new(&CameraConfig::default(), &OrbitConfig::default())
    }

    #[test]
    fn starts_on_positive_z_at_configured_distance() {
        let camera = camera();
        assert!((camera.eye() - Vec3::new(0.0, 0.0, 5.0)).length() < 1e-5);
    }

    #[test]
    fn zoom_respects_distance_limits() {
        let mut camera = camera();
        camera.zoom(500.0);
        assert!((camera.distance - 2.0).abs() < 1e-5);
        camera.zoom(-500.0);
        assert!((camera.distance - 10.0).abs() < 1e-5);
    }

    #[test]
    fn disabled_camera_ignores_input() {
        let mut camera = camera();
        camera.set_enabled(false);
        camera.rotate(Vec2::new(200.0, 50.0), 600.0);
        camera.zoom(3.0);
        while camera.update() {}
        assert_eq!(camera.yaw, 0.0);
        assert_eq!(camera.pitch, 0.0);
        assert_eq!(camera.distance, 5.0);
        assert!(!camera.is_enabled());
    }

    #[test]
    fn damping_converges_and_stays_finite() {
        let mut camera = camera();
        camera.rotate(Vec2::new(120.0, 400.0), 600.0);
        let mut frames = 0;
        while camera.update() {
            frames += 1;
            assert!(frames < 10_000);
        }
        assert!(camera.yaw.is_finite());
        assert!(camera.pitch.abs() < std::f32::consts::FRAC_PI_2);
    }

    #[test]
    fn pan_is_disabled_by_default() {
        let mut camera = camera();
        camera.pan(Vec2::new(30.0, 30.0), 600.0);
        assert_eq!(camera.target, Vec3::ZERO);
    }

    #[test]
    fn target_projects_to_viewport_center() {
        let camera = camera();
        let projector = camera.projector(800.0, 600.0);
        let center = projector.project_2d(Vec3::ZERO).unwrap();
        assert!((center - Vec2::new(400.0, 300.0)).length() < 1e-3);
        assert!(projector.project(Vec3::new(0.0, 0.0, 10.0)).is_none());
    }
}
