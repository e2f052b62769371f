//! Everything one viewer window owns, passed explicitly instead of living in
//! globals. Nothing here touches winit or the GPU, so the whole interaction
//! flow runs headless in tests.

use super::input::{wheel_steps, PointerDrag};
use crate::assets::{AssetLoader, AssetSource, LoadEvent, PendingLoad};
use crate::binding::{FieldId, TransformBindingController, WidgetKind};
use crate::config::ViewerConfig;
use crate::export::{self, ExportError};
use crate::grid::DotGrid;
use crate::render::{gizmo, GizmoDrag, GizmoMode, SceneHost, SoftwareSceneHost};
use crate::scene::{ManipulableObject, TransformGroup};
use glam::Vec2;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub enum LoadStatus {
    Loading { loaded: u64, total: Option<u64> },
    Ready,
    Failed(String),
}

impl LoadStatus {
    /// Text for the viewport placeholder, if one should be shown.
    pub fn placeholder(&self) -> Option<String> {
        match self {
            LoadStatus::Loading { loaded, total } => Some(match total {
                Some(total) if *total > 0 => {
                    format!("Loading model... {}%", loaded * 100 / total)
                }
                _ if *loaded > 0 => format!("Loading model... {} KiB", loaded / 1024),
                _ => "Loading model...".to_string(),
            }),
            LoadStatus::Ready => None,
            LoadStatus::Failed(reason) => Some(format!("Error loading model\n{}", reason)),
        }
    }
}

pub struct Session {
    config: ViewerConfig,
    host: SoftwareSceneHost,
    controller: TransformBindingController,
    object: Option<ManipulableObject>,
    pending: Option<PendingLoad>,
    load_status: LoadStatus,
    grid: DotGrid,
    drag: Option<PointerDrag>,
    status: Option<String>,
    live: bool,
}

impl Session {
    /// Session with the configured model already loading.
    pub fn start(config: ViewerConfig) -> Self {
        let source = match &config.model.path {
            Some(path) => AssetSource::Path(path.clone()),
            None => AssetSource::Url(config.model.url.clone()),
        };
        let pending = AssetLoader::spawn(source);
        Self::with_pending(config, pending)
    }

    pub fn with_pending(config: ViewerConfig, pending: PendingLoad) -> Self {
        Self {
            host: SoftwareSceneHost::new(&config),
            controller: TransformBindingController::new(),
            object: None,
            pending: Some(pending),
            load_status: LoadStatus::Loading {
                loaded: 0,
                total: None,
            },
            grid: DotGrid::new(&config.grid),
            drag: None,
            status: None,
            live: true,
            config,
        }
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn host(&self) -> &SoftwareSceneHost {
        &self.host
    }

    pub fn controller(&self) -> &TransformBindingController {
        &self.controller
    }

    #[cfg(test)]
    pub fn object(&self) -> Option<&ManipulableObject> {
        self.object.as_ref()
    }

    pub fn grid(&self) -> &DotGrid {
        &self.grid
    }

    pub fn load_status(&self) -> &LoadStatus {
        &self.load_status
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Drains loader events. A resolution that arrives after teardown is
    /// dropped without touching the controller.
    pub fn poll_load(&mut self) {
        let Some(pending) = &mut self.pending else {
            return;
        };
        while let Some(event) = pending.poll() {
            match event {
                LoadEvent::Progress { loaded, total } => {
                    log::debug!("model download: {} / {:?} bytes", loaded, total);
                    if self.live {
                        self.load_status = LoadStatus::Loading { loaded, total };
                    }
                }
                LoadEvent::Resolved(node) => {
                    if !self.live {
                        log::info!("Ignoring model '{}' loaded after teardown", node.name);
                        continue;
                    }
                    self.host.set_node(node);
                    self.object = Some(ManipulableObject::default());
                    self.controller.bind(self.object.as_ref(), &mut self.host);
                    self.load_status = LoadStatus::Ready;
                }
                LoadEvent::Failed(err) => {
                    log::warn!("Model load failed: {}", err);
                    if self.live {
                        self.load_status = LoadStatus::Failed(err.to_string());
                    }
                }
            }
        }
        if pending.is_settled() {
            self.pending = None;
        }
    }

    /// One scene tick: loader events, camera damping, readout refresh and a
    /// render. Does nothing once torn down.
    pub fn tick(&mut self) {
        self.poll_load();
        if !self.live {
            return;
        }
        self.host.camera_mut().update();
        self.controller.tick(self.object.as_ref(), &mut self.host);
    }

    /// Viewport size in logical points plus the window's device pixel ratio.
    pub fn set_viewport(&mut self, width: f32, height: f32, pixel_ratio: f32) {
        if !self.live {
            return;
        }
        self.host.set_pixel_ratio(pixel_ratio);
        self.host
            .set_viewport_size(width.round().max(1.0) as u32, height.round().max(1.0) as u32);
        self.grid.layout(width, height);
        log::debug!("viewport resized to {:.0}x{:.0} @{:.2}", width, height, pixel_ratio);
    }

    pub fn widget_input(&mut self, field: FieldId, source: WidgetKind, raw: &str) {
        let Some(object) = self.object.as_mut() else {
            return;
        };
        self.controller
            .on_widget_input(object, &mut self.host, field, source, raw);
    }

    pub fn widget_focus(&mut self, field: FieldId, kind: WidgetKind, focused: bool) {
        self.controller.set_widget_focus(field, kind, focused);
    }

    pub fn reset(&mut self, group: TransformGroup) {
        if let Some(object) = self.object.as_mut() {
            self.controller.reset_field(object, &mut self.host, group);
        }
    }

    pub fn set_gizmo_mode(&mut self, mode: GizmoMode) {
        self.controller.set_gizmo_mode(mode);
    }

    /// Primary button went down at `pos` (viewport points). A gizmo handle
    /// under the pointer takes the drag; otherwise the camera orbits.
    pub fn pointer_pressed(&mut self, pos: Vec2) {
        if !self.live {
            return;
        }
        let projector = self.host.viewport_projector();
        let gizmo_drag = self.object.as_ref().and_then(|object| {
            let session = self.controller.gizmo();
            if !self.controller.is_bound() || !session.visible {
                return None;
            }
            let axis = gizmo::pick_handle(session.mode, object, &projector, pos)?;
            GizmoDrag::begin(session.mode, axis, pos, object, &projector)
        });
        match gizmo_drag {
            Some(drag) => {
                self.controller.set_hot_axis(Some(drag.axis()));
                self.controller
                    .on_gizmo_drag_state_changed(true, self.host.camera_mut());
                self.drag = Some(PointerDrag::Gizmo(drag));
            }
            None => self.drag = Some(PointerDrag::Orbit { last: pos }),
        }
    }

    pub fn pointer_moved(&mut self, pos: Vec2) {
        if !self.live {
            return;
        }
        match &mut self.drag {
            Some(PointerDrag::Gizmo(drag)) => {
                let Some(object) = self.object.as_mut() else {
                    return;
                };
                drag.update(pos, object);
                self.controller.on_gizmo_change(object, &mut self.host);
            }
            Some(PointerDrag::Orbit { last }) => {
                let delta = pos - *last;
                *last = pos;
                let height = self.host.viewport_projector().size.y;
                self.host.camera_mut().rotate(delta, height);
            }
            None => self.hover(Some(pos)),
        }
    }

    pub fn pointer_released(&mut self) {
        if let Some(drag) = self.drag.take() {
            if drag.is_gizmo() {
                self.controller
                    .on_gizmo_drag_state_changed(false, self.host.camera_mut());
            }
        }
    }

    /// Highlights the handle under an idle pointer.
    pub fn hover(&mut self, pos: Option<Vec2>) {
        if self.drag.is_some() {
            return;
        }
        let hot = match (pos, self.object.as_ref()) {
            (Some(pos), Some(object)) if self.controller.is_bound() => {
                let projector = self.host.viewport_projector();
                gizmo::pick_handle(self.controller.gizmo().mode, object, &projector, pos)
            }
            _ => None,
        };
        self.controller.set_hot_axis(hot);
    }

    /// Only moves the camera when panning is enabled in the config.
    pub fn pan(&mut self, delta: Vec2) {
        if self.live {
            let height = self.host.viewport_projector().size.y;
            self.host.camera_mut().pan(delta, height);
        }
    }

    pub fn scroll(&mut self, scroll_y_points: f32) {
        if self.live {
            self.host.camera_mut().zoom(wheel_steps(scroll_y_points));
        }
    }

    /// Writes the current view without the gizmo. Visibility is restored
    /// whatever the outcome; a failure is reported once on the status line.
    pub fn export_to(&mut self, path: &Path) -> Result<(), ExportError> {
        let was_visible = self.controller.gizmo().visible;
        self.controller.set_gizmo_visible(false);
        let result = if self.controller.is_bound() {
            self.host
                .render_frame(self.object.as_ref(), self.controller.gizmo());
            export::export_frame(
                self.host.frame().image(),
                self.config.export.margin_mm,
                path,
            )
        } else {
            Err(ExportError::EmptyFrame)
        };
        self.controller.set_gizmo_visible(was_visible);
        self.host
            .render_frame(self.object.as_ref(), self.controller.gizmo());
        match &result {
            Ok(()) => self.status = Some(format!("Exported {}", path.display())),
            Err(err) => {
                log::warn!("Export failed: {}", err);
                self.status = Some(format!("Export failed: {}", err));
            }
        }
        result
    }

    /// Asks for a destination, then exports. Cancelling the dialog is a no-op.
    pub fn export_with_dialog(&mut self) {
        let default_name = export::export_file_name(
            &self.config.export.file_prefix,
            chrono::Local::now().naive_local(),
        );
        let Some(path) = rfd::FileDialog::new()
            .add_filter("PDF", &["pdf"])
            .set_file_name(default_name.as_str())
            .save_file()
        else {
            return;
        };
        // success and failure both land on the status line
        let _ = self.export_to(&path);
    }

    /// Stops all interaction and releases the scene. Safe to call twice.
    pub fn teardown(&mut self) {
        if !self.live {
            return;
        }
        log::info!("Tearing down viewer session");
        self.live = false;
        self.drag = None;
        self.controller.unbind();
        self.object = None;
        self.host.dispose();
    }
}
