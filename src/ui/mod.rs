//! egui panels. Drawing only reads session state; every user intent comes
//! back as a [`UiAction`] for the app to apply after the frame.

use crate::binding::{FieldId, FieldTarget, TransformBindingController, WidgetKind};
use crate::grid::DotGrid;
use crate::render::GizmoMode;
use crate::scene::TransformGroup;
use glam::Vec2;

const PANEL_WIDTH: f32 = 280.0;
const NUMBER_FIELD_WIDTH: f32 = 56.0;

#[derive(Debug, Clone, PartialEq)]
pub enum UiAction {
    WidgetInput {
        field: FieldId,
        source: WidgetKind,
        raw: String,
    },
    WidgetFocus {
        field: FieldId,
        kind: WidgetKind,
        focused: bool,
    },
    Reset(TransformGroup),
    SetGizmoMode(GizmoMode),
    Export,
    /// Viewport size in points.
    ViewportResized(Vec2),
    PointerPressed(Vec2),
    PointerMoved(Vec2),
    PointerReleased,
    Hover(Option<Vec2>),
    /// Secondary-button drag delta in points.
    Pan(Vec2),
    Scroll(f32),
}

/// What the panels show this frame.
pub struct ViewerView<'a> {
    pub controller: &'a TransformBindingController,
    pub grid: &'a DotGrid,
    pub viewport_texture: Option<egui::TextureId>,
    pub placeholder: Option<String>,
    pub status: Option<&'a str>,
}

#[derive(Default)]
pub struct UiState {
    viewport_size: Option<egui::Vec2>,
}

impl UiState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&mut self, ctx: &egui::Context, view: &ViewerView) -> Vec<UiAction> {
        let mut actions = Vec::new();
        egui::SidePanel::right("transform_panel")
            .resizable(false)
            .exact_width(PANEL_WIDTH)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    transform_panel(ui, view, &mut actions);
                });
            });
        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                self.viewport(ui, view, &mut actions);
            });
        actions
    }

    fn viewport(&mut self, ui: &mut egui::Ui, view: &ViewerView, actions: &mut Vec<UiAction>) {
        let (rect, response) =
            ui.allocate_exact_size(ui.available_size(), egui::Sense::click_and_drag());
        if self.viewport_size != Some(rect.size()) {
            self.viewport_size = Some(rect.size());
            actions.push(UiAction::ViewportResized(Vec2::new(rect.width(), rect.height())));
        }
        let local = |pos: egui::Pos2| Vec2::new(pos.x - rect.min.x, pos.y - rect.min.y);

        let painter = ui.painter_at(rect);
        let [r, g, b, a] = view.grid.background();
        painter.rect_filled(rect, 0.0, egui::Color32::from_rgba_unmultiplied(r, g, b, a));
        for dot in view.grid.dots(response.hover_pos().map(local)) {
            let [r, g, b, a] = dot.color;
            painter.circle_filled(
                rect.min + egui::vec2(dot.center.x, dot.center.y),
                dot.diameter * 0.5,
                egui::Color32::from_rgba_unmultiplied(r, g, b, a),
            );
        }
        if let Some(texture) = view.viewport_texture {
            painter.image(
                texture,
                rect,
                egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                egui::Color32::WHITE,
            );
        }
        if let Some(text) = &view.placeholder {
            painter.text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                text,
                egui::FontId::proportional(18.0),
                egui::Color32::WHITE,
            );
        }

        let primary = egui::PointerButton::Primary;
        if response.drag_started_by(primary) {
            let origin = ui
                .input(|i| i.pointer.press_origin())
                .or_else(|| response.interact_pointer_pos());
            if let Some(origin) = origin {
                actions.push(UiAction::PointerPressed(local(origin)));
            }
        }
        if response.dragged_by(primary) {
            if let Some(pos) = response.interact_pointer_pos() {
                actions.push(UiAction::PointerMoved(local(pos)));
            }
        } else if response.drag_stopped_by(primary) {
            actions.push(UiAction::PointerReleased);
        } else {
            actions.push(UiAction::Hover(response.hover_pos().map(local)));
        }
        if response.dragged_by(egui::PointerButton::Secondary) {
            let delta = response.drag_delta();
            actions.push(UiAction::Pan(Vec2::new(delta.x, delta.y)));
        }
        if response.hovered() {
            let scroll = ui.input(|i| i.smooth_scroll_delta.y);
            if scroll != 0.0 {
                actions.push(UiAction::Scroll(scroll));
            }
        }
    }
}

fn transform_panel(ui: &mut egui::Ui, view: &ViewerView, actions: &mut Vec<UiAction>) {
    let controller = view.controller;
    let bound = controller.is_bound();
    ui.heading("Transform");
    ui.add_enabled_ui(bound, |ui| {
        for group in TransformGroup::ALL {
            ui.separator();
            ui.horizontal(|ui| {
                ui.strong(group.label());
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.small_button("Reset").clicked() {
                        actions.push(UiAction::Reset(group));
                    }
                });
            });
            for field in FieldId::group_fields(group) {
                field_row(ui, controller, field, actions);
            }
            if group == TransformGroup::Scale {
                field_row(ui, controller, FieldId::ScaleUniform, actions);
            }
        }

        ui.separator();
        ui.horizontal(|ui| {
            ui.strong("Color");
            color_row(ui, controller, actions);
        });

        ui.separator();
        ui.horizontal(|ui| {
            let current = controller.gizmo().mode;
            let dragging = controller.gizmo().active;
            for mode in GizmoMode::ALL {
                let button = ui.add_enabled(
                    !dragging,
                    egui::SelectableLabel::new(mode == current, mode.label()),
                );
                if button.clicked() {
                    actions.push(UiAction::SetGizmoMode(mode));
                }
            }
        });

        ui.separator();
        if ui.button("Export PDF").clicked() {
            actions.push(UiAction::Export);
        }
    });

    if let Some(status) = view.status {
        ui.separator();
        ui.label(status);
    }
}

fn field_row(
    ui: &mut egui::Ui,
    controller: &TransformBindingController,
    field: FieldId,
    actions: &mut Vec<UiAction>,
) {
    let spec = field.spec();
    let binding = controller.binding(field);
    ui.horizontal(|ui| {
        let label = match spec.target {
            FieldTarget::Component { axis, .. } => axis.label(),
            _ => "All",
        };
        ui.label(label);
        if let Some(slider) = &binding.slider {
            let mut value = slider.value;
            let response = ui.add(
                egui::Slider::new(&mut value, spec.slider_range.clone())
                    .clamping(egui::SliderClamping::Never)
                    .show_value(false),
            );
            if response.changed() {
                actions.push(UiAction::WidgetInput {
                    field,
                    source: WidgetKind::Slider,
                    raw: value.to_string(),
                });
            }
        }
        if let Some(number) = &binding.number {
            let mut text = number.text.clone();
            let response = ui.add(
                egui::TextEdit::singleline(&mut text)
                    .id_salt(spec.id)
                    .desired_width(NUMBER_FIELD_WIDTH),
            );
            if response.gained_focus() {
                actions.push(UiAction::WidgetFocus {
                    field,
                    kind: WidgetKind::Number,
                    focused: true,
                });
            }
            if response.changed() {
                actions.push(UiAction::WidgetInput {
                    field,
                    source: WidgetKind::Number,
                    raw: text,
                });
            }
            if response.lost_focus() {
                actions.push(UiAction::WidgetFocus {
                    field,
                    kind: WidgetKind::Number,
                    focused: false,
                });
            }
        } else if let Some(text) = binding.display_text() {
            ui.label(text);
        }
    });
}

fn color_row(ui: &mut egui::Ui, controller: &TransformBindingController, actions: &mut Vec<UiAction>) {
    let Some(color) = &controller.binding(FieldId::Color).color else {
        return;
    };
    let mut srgb = to_srgb8(color.rgb);
    if ui.color_edit_button_srgb(&mut srgb).changed() {
        actions.push(UiAction::WidgetInput {
            field: FieldId::Color,
            source: WidgetKind::ColorPicker,
            raw: picker_hex(srgb),
        });
    }
    ui.monospace(&color.hex);
}

/// Tint channels are stored as sRGB fractions, the same encoding as the hex.
fn to_srgb8(rgb: [f32; 3]) -> [u8; 3] {
    rgb.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
}

fn picker_hex(srgb: [u8; 3]) -> String {
    crate::binding::format_hex(srgb.map(|c| c as f32 / 255.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridConfig;

    fn run(ui: &mut UiState, ctx: &egui::Context, view: &ViewerView) -> Vec<UiAction> {
        let mut actions = Vec::new();
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            actions = ui.show(ctx, view);
        });
        actions
    }

    #[test]
    fn colour_picker_hex_is_srgb() {
        assert_eq!(picker_hex([0x33, 0x66, 0x99]), "#336699");
        assert_eq!(to_srgb8([0.2, 0.4, 0.6]), [0x33, 0x66, 0x99]);
        let tint = crate::binding::parse_hex("#7f1a00").unwrap();
        assert_eq!(picker_hex(to_srgb8(tint)), "#7f1a00");
    }

    #[test]
    fn viewport_size_is_reported_once() {
        let controller = TransformBindingController::new();
        let mut grid = DotGrid::new(&GridConfig::default());
        grid.layout(100.0, 100.0);
        let view = ViewerView {
            controller: &controller,
            grid: &grid,
            viewport_texture: None,
            placeholder: Some("Loading model...".to_string()),
            status: None,
        };
        let ctx = egui::Context::default();
        let mut ui = UiState::new();

        let first = run(&mut ui, &ctx, &view);
        assert!(first
            .iter()
            .any(|action| matches!(action, UiAction::ViewportResized(_))));
        assert!(first.contains(&UiAction::Hover(None)));

        let second = run(&mut ui, &ctx, &view);
        assert!(!second
            .iter()
            .any(|action| matches!(action, UiAction::ViewportResized(_))));
    }
}
