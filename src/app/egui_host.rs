use egui_winit::winit::event::WindowEvent;
use image::RgbaImage;
use winit::window::Window;

pub struct EguiFrameOutput {
    pub clipped_primitives: Vec<egui::ClippedPrimitive>,
    pub textures_delta: egui::TexturesDelta,
    pub pixels_per_point: f32,
}

pub struct EguiHost {
    context: egui::Context,
    winit_state: egui_winit::State,
}

impl EguiHost {
    pub fn new(window: &Window) -> Self {
        let context = egui::Context::default();
        let winit_state = egui_winit::State::new(
            context.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            window.theme(),
            None,
        );

        Self {
            context,
            winit_state,
        }
    }

    pub fn context(&self) -> &egui::Context {
        &self.context
    }

    /// Returns true when egui consumed the event.
    pub fn on_window_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        self.winit_state.on_window_event(window, event).consumed
    }

    pub fn run_ui<F>(&mut self, window: &Window, run_ui: F) -> EguiFrameOutput
    where
        F: FnMut(&egui::Context),
    {
        let raw_input = self.winit_state.take_egui_input(window);
        let full_output = self.context.run(raw_input, run_ui);
        self.winit_state
            .handle_platform_output(window, full_output.platform_output);
        let pixels_per_point = full_output.pixels_per_point;
        let clipped_primitives = self
            .context
            .tessellate(full_output.shapes, pixels_per_point);

        EguiFrameOutput {
            clipped_primitives,
            textures_delta: full_output.textures_delta,
            pixels_per_point,
        }
    }
}

/// The software-rendered viewport frame as an egui texture.
#[derive(Default)]
pub struct ViewportTexture {
    handle: Option<egui::TextureHandle>,
    uploaded_frame: Option<u64>,
}

impl ViewportTexture {
    pub fn id(&self) -> Option<egui::TextureId> {
        self.handle.as_ref().map(|handle| handle.id())
    }

    /// Uploads `image` unless frame `serial` is already on the GPU.
    pub fn upload(&mut self, context: &egui::Context, image: &RgbaImage, serial: u64) {
        if self.uploaded_frame == Some(serial) {
            return;
        }
        let size = [image.width() as usize, image.height() as usize];
        let color_image = egui::ColorImage::from_rgba_unmultiplied(size, image.as_raw());
        match &mut self.handle {
            Some(handle) => handle.set(color_image, egui::TextureOptions::LINEAR),
            None => {
                self.handle = Some(context.load_texture(
                    "viewport",
                    color_image,
                    egui::TextureOptions::LINEAR,
                ));
            }
        }
        self.uploaded_frame = Some(serial);
    }
}
