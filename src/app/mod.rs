mod egui_host;
mod input;
mod session;
mod timing;

use session::Session;

use crate::config::ViewerConfig;
use crate::render::{EguiOverlay, RenderError};
use crate::ui::{UiAction, UiState, ViewerView};
use egui_host::{EguiHost, ViewportTexture};
use timing::FrameTiming;

use std::sync::Arc;
use std::time::Instant;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowAttributes, WindowId};

const WINDOW_TITLE: &str = "tweakview";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

struct Gpu {
    window: Arc<Window>,
    egui: EguiHost,
    overlay: EguiOverlay,
}

pub struct App {
    config: ViewerConfig,
    gpu: Option<Gpu>,
    session: Option<Session>,
    ui: UiState,
    viewport_texture: ViewportTexture,
    timing: FrameTiming,
    next_frame_time: Instant,
    startup_error: Option<AppError>,
}

impl App {
    fn new(config: ViewerConfig) -> Self {
        let timing = FrameTiming::new(WINDOW_TITLE.to_string(), config.render.target_fps);
        Self {
            config,
            gpu: None,
            session: None,
            ui: UiState::new(),
            viewport_texture: ViewportTexture::default(),
            timing,
            next_frame_time: Instant::now(),
            startup_error: None,
        }
    }

    fn init_gpu(&mut self, event_loop: &ActiveEventLoop) -> Result<(), AppError> {
        let attrs = WindowAttributes::default()
            .with_title(WINDOW_TITLE)
            .with_inner_size(LogicalSize::new(1280.0, 800.0))
            .with_resizable(true);
        let window = Arc::new(event_loop.create_window(attrs)?);
        let overlay = EguiOverlay::new(window.clone())?;
        let egui = EguiHost::new(&window);
        self.gpu = Some(Gpu {
            window,
            egui,
            overlay,
        });
        Ok(())
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(session) = &mut self.session {
            session.teardown();
        }
        event_loop.exit();
    }

    fn redraw(&mut self) {
        let (Some(gpu), Some(session)) = (&mut self.gpu, &mut self.session) else {
            return;
        };
        let now = Instant::now();
        if self.timing.tick(now) {
            session.tick();
        }
        self.timing.update_title(Some(&gpu.window), now);

        let frame = session.host().frame();
        self.viewport_texture.upload(
            gpu.egui.context(),
            frame.image(),
            session.host().frames_rendered(),
        );

        let view = ViewerView {
            controller: session.controller(),
            grid: session.grid(),
            viewport_texture: self.viewport_texture.id(),
            placeholder: session.load_status().placeholder(),
            status: session.status(),
        };
        let ui = &mut self.ui;
        let mut actions = Vec::new();
        let output = gpu.egui.run_ui(&gpu.window, |ctx| {
            actions = ui.show(ctx, &view);
        });
        gpu.overlay.paint(
            &output.clipped_primitives,
            &output.textures_delta,
            output.pixels_per_point,
        );

        let pixel_ratio = gpu.window.scale_factor() as f32;
        for action in actions {
            apply_action(session, action, pixel_ratio);
        }
    }
}

fn apply_action(session: &mut Session, action: UiAction, pixel_ratio: f32) {
    match action {
        UiAction::WidgetInput { field, source, raw } => session.widget_input(field, source, &raw),
        UiAction::WidgetFocus {
            field,
            kind,
            focused,
        } => session.widget_focus(field, kind, focused),
        UiAction::Reset(group) => session.reset(group),
        UiAction::SetGizmoMode(mode) => session.set_gizmo_mode(mode),
        UiAction::Export => session.export_with_dialog(),
        UiAction::ViewportResized(size) => session.set_viewport(size.x, size.y, pixel_ratio),
        UiAction::PointerPressed(pos) => session.pointer_pressed(pos),
        UiAction::PointerMoved(pos) => session.pointer_moved(pos),
        UiAction::PointerReleased => session.pointer_released(),
        UiAction::Hover(pos) => session.hover(pos),
        UiAction::Pan(delta) => session.pan(delta),
        UiAction::Scroll(delta) => session.scroll(delta),
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() {
            return;
        }
        if let Err(err) = self.init_gpu(event_loop) {
            log::error!("Startup failed: {}", err);
            self.startup_error = Some(err);
            event_loop.exit();
            return;
        }
        if self.session.is_none() {
            self.session = Some(Session::start(self.config.clone()));
        }
        self.next_frame_time = Instant::now();
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let consumed = match &mut self.gpu {
            Some(gpu) => gpu.egui.on_window_event(&gpu.window, &event),
            None => false,
        };
        match event {
            WindowEvent::CloseRequested => self.shutdown(event_loop),
            WindowEvent::KeyboardInput { event, .. } if !consumed => {
                if event.physical_key == PhysicalKey::Code(KeyCode::Escape) {
                    self.shutdown(event_loop);
                }
            }
            WindowEvent::Resized(size) => {
                if let Some(gpu) = &mut self.gpu {
                    gpu.overlay.resize(size.width, size.height);
                }
            }
            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(gpu) = &mut self.gpu {
                    let size = gpu.window.inner_size();
                    gpu.overlay.resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => self.redraw(),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if !self.session.as_ref().is_some_and(|s| s.is_live()) {
            return;
        }
        let now = Instant::now();
        if now >= self.next_frame_time {
            if let Some(gpu) = &self.gpu {
                gpu.window.request_redraw();
            }
            self.next_frame_time = now + self.timing.frame_duration();
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_frame_time));
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(session) = &mut self.session {
            session.teardown();
        }
    }
}

pub fn run(config: ViewerConfig) -> Result<(), AppError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;
    match app.startup_error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
