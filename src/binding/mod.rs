//! Transform binding controller.
//!
//! Keeps the model transform, the panel widgets and the gizmo in agreement.
//! The object is the only authority: widget input writes into the object and
//! then fans out to the other widgets of that field, gizmo motion reads from
//! the object and fans out to every widget. No widget reads another widget.

mod fields;

pub use fields::{FieldId, FieldSpec, FieldTarget, FIELD_TABLE};

use crate::render::OrbitControl;
use crate::render::gizmo::{GizmoMode, GizmoSession};
use crate::render::SceneHost;
use crate::scene::{clamp_scale, ManipulableObject, TransformGroup};
use glam::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WidgetKind {
    Slider,
    Number,
    ColorPicker,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SliderWidget {
    pub value: f32,
}

/// Free text number field. Holds whatever the user typed, valid or not.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberWidget {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColorWidget {
    pub rgb: [f32; 3],
    pub hex: String,
}

/// Every widget attached to one logical field.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlBinding {
    pub field: FieldId,
    pub slider: Option<SliderWidget>,
    pub number: Option<NumberWidget>,
    pub color: Option<ColorWidget>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum FieldValue {
    Scalar(f32),
    Rgb([f32; 3]),
}

impl ControlBinding {
    fn new(spec: &FieldSpec) -> Self {
        let (slider, number, color) = match spec.target {
            FieldTarget::Component { group, .. } => (
                Some(SliderWidget {
                    value: group.rest_value(),
                }),
                Some(NumberWidget {
                    text: format_display(group.rest_value()),
                }),
                None,
            ),
            FieldTarget::UniformScale => (Some(SliderWidget { value: 1.0 }), None, None),
            FieldTarget::Tint => (
                None,
                None,
                Some(ColorWidget {
                    rgb: [1.0; 3],
                    hex: format_hex([1.0; 3]),
                }),
            ),
        };
        Self {
            field: spec.field,
            slider,
            number,
            color,
        }
    }

    fn show(&mut self, value: FieldValue, skip: Option<WidgetKind>) {
        match value {
            FieldValue::Scalar(v) => {
                if skip != Some(WidgetKind::Slider) {
                    if let Some(slider) = &mut self.slider {
                        slider.value = v;
                    }
                }
                if skip != Some(WidgetKind::Number) {
                    if let Some(number) = &mut self.number {
                        number.text = format_display(v);
                    }
                }
            }
            FieldValue::Rgb(rgb) => {
                if skip != Some(WidgetKind::ColorPicker) {
                    if let Some(color) = &mut self.color {
                        color.rgb = rgb;
                        color.hex = format_hex(rgb);
                    }
                }
            }
        }
    }

    /// Text the field currently shows, preferring the number field.
    pub fn display_text(&self) -> Option<String> {
        if let Some(number) = &self.number {
            return Some(number.text.clone());
        }
        if let Some(slider) = &self.slider {
            return Some(format_display(slider.value));
        }
        self.color.as_ref().map(|c| c.hex.clone())
    }
}

/// Two decimals for display. The stored value keeps full precision.
pub fn format_display(value: f32) -> String {
    format!("{value:.2}")
}

pub fn format_hex(rgb: [f32; 3]) -> String {
    let [r, g, b] = rgb.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
    format!("#{r:02x}{g:02x}{b:02x}")
}

/// Accepts finite decimal numbers only.
pub fn parse_scalar(raw: &str) -> Option<f32> {
    raw.trim().parse::<f32>().ok().filter(|v| v.is_finite())
}

/// Accepts `#rrggbb` or `rrggbb`.
pub fn parse_hex(raw: &str) -> Option<[f32; 3]> {
    let hex = raw.trim();
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some([
        channel(0)? as f32 / 255.0,
        channel(2)? as f32 / 255.0,
        channel(4)? as f32 / 255.0,
    ])
}

fn field_value(field: FieldId, object: &ManipulableObject) -> FieldValue {
    match field.spec().target {
        FieldTarget::Component { group, axis } => FieldValue::Scalar(object.component(group, axis)),
        FieldTarget::UniformScale => FieldValue::Scalar(object.scale.element_sum() / 3.0),
        FieldTarget::Tint => FieldValue::Rgb(object.tint),
    }
}

pub struct TransformBindingController {
    bindings: Vec<ControlBinding>,
    gizmo: GizmoSession,
    bound: bool,
    focused: Option<(FieldId, WidgetKind)>,
}

impl Default for TransformBindingController {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformBindingController {
    pub fn new() -> Self {
        Self {
            bindings: FIELD_TABLE.iter().map(ControlBinding::new).collect(),
            gizmo: GizmoSession::default(),
            bound: false,
            focused: None,
        }
    }

    pub fn is_bound(&self) -> bool {
        self.bound
    }

    pub fn binding(&self, field: FieldId) -> &ControlBinding {
        &self.bindings[field.index()]
    }

    pub fn gizmo(&self) -> &GizmoSession {
        &self.gizmo
    }

    /// Attaches to a freshly loaded object. Does nothing without one.
    pub fn bind(&mut self, object: Option<&ManipulableObject>, host: &mut dyn SceneHost) -> bool {
        let Some(object) = object else {
            log::debug!("bind skipped: no object loaded yet");
            return false;
        };
        self.gizmo = host.attach_manipulator(object);
        self.bound = true;
        self.focused = None;
        self.refresh(object, None);
        host.render_frame(Some(object), &self.gizmo);
        true
    }

    /// Releases the object. Widgets keep their last values.
    pub fn unbind(&mut self) {
        self.bound = false;
        self.focused = None;
        self.gizmo = GizmoSession::default();
    }

    /// Widget to object. Returns false when the input was discarded.
    pub fn on_widget_input(
        &mut self,
        object: &mut ManipulableObject,
        host: &mut dyn SceneHost,
        field: FieldId,
        source: WidgetKind,
        raw: &str,
    ) -> bool {
        if !self.bound {
            return false;
        }
        if source == WidgetKind::Number {
            // the field keeps what was typed, valid or not
            if let Some(number) = self.bindings[field.index()].number.as_mut() {
                number.text = raw.to_string();
            }
        }
        let keep_source = match field.spec().target {
            FieldTarget::Component { group, axis } => {
                let Some(value) = parse_scalar(raw) else {
                    log::trace!("discarding non-numeric input {raw:?} for {}", field.id());
                    return false;
                };
                let stored = object.set_component(group, axis, value);
                stored == value
            }
            FieldTarget::UniformScale => {
                let Some(value) = parse_scalar(raw) else {
                    log::trace!("discarding non-numeric input {raw:?} for {}", field.id());
                    return false;
                };
                let stored = clamp_scale(value);
                object.scale = Vec3::splat(stored);
                stored == value
            }
            FieldTarget::Tint => {
                let Some(rgb) = parse_hex(raw) else {
                    log::trace!("discarding invalid colour {raw:?}");
                    return false;
                };
                object.tint = rgb;
                true
            }
        };
        // a clamped value is pushed back into the source widget too
        let skip = keep_source.then_some((field, source));
        self.refresh(object, skip);
        host.render_frame(Some(object), &self.gizmo);
        true
    }

    /// Object to widgets after the gizmo mutated the object.
    pub fn on_gizmo_change(&mut self, object: &ManipulableObject, host: &mut dyn SceneHost) {
        if !self.bound {
            return;
        }
        self.refresh(object, None);
        host.render_frame(Some(object), &self.gizmo);
    }

    /// Gizmo drags and camera orbiting never share the pointer.
    pub fn on_gizmo_drag_state_changed(&mut self, dragging: bool, orbit: &mut dyn OrbitControl) {
        self.gizmo.active = dragging;
        if !dragging {
            self.gizmo.hot_axis = None;
        }
        orbit.set_enabled(!dragging);
    }

    pub fn reset_field(
        &mut self,
        object: &mut ManipulableObject,
        host: &mut dyn SceneHost,
        group: TransformGroup,
    ) {
        if !self.bound {
            return;
        }
        object.reset_group(group);
        self.refresh(object, None);
        host.render_frame(Some(object), &self.gizmo);
    }

    /// Once per frame. Renders even before anything is bound.
    pub fn tick(&mut self, object: Option<&ManipulableObject>, host: &mut dyn SceneHost) {
        if let (true, Some(object)) = (self.bound, object) {
            self.refresh(object, None);
        }
        host.render_frame(object.filter(|_| self.bound), &self.gizmo);
    }

    pub fn set_gizmo_mode(&mut self, mode: GizmoMode) {
        if self.gizmo.active {
            return;
        }
        self.gizmo.mode = mode;
        self.gizmo.hot_axis = None;
    }

    pub fn set_gizmo_visible(&mut self, visible: bool) {
        self.gizmo.visible = visible;
    }

    pub fn set_hot_axis(&mut self, axis: Option<crate::scene::Axis>) {
        self.gizmo.hot_axis = axis;
    }

    /// A focused number field is left alone by refreshes so typing is not
    /// overwritten; it is normalised again once focus moves away.
    pub fn set_widget_focus(&mut self, field: FieldId, kind: WidgetKind, focused: bool) {
        if focused {
            self.focused = Some((field, kind));
        } else if self.focused == Some((field, kind)) {
            self.focused = None;
        }
    }

    fn refresh(&mut self, object: &ManipulableObject, skip: Option<(FieldId, WidgetKind)>) {
        let focused = self.focused;
        for binding in &mut self.bindings {
            let field = binding.field;
            let skip_kind = [skip, focused]
                .into_iter()
                .flatten()
                .find(|(f, _)| *f == field)
                .map(|(_, kind)| kind);
            binding.show(field_value(field, object), skip_kind);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Axis, MIN_SCALE};

    #[derive(Default)]
    struct RecordingHost {
        renders: usize,
        rendered_with_object: usize,
        attached: usize,
    }

    impl SceneHost for RecordingHost {
        fn render_frame(&mut self, object: Option<&ManipulableObject>, _gizmo: &GizmoSession) {
            self.renders += 1;
            if object.is_some() {
                self.rendered_with_object += 1;
            }
        }

        fn attach_manipulator(&mut self, _object: &ManipulableObject) -> GizmoSession {
            self.attached += 1;
            GizmoSession::default()
        }

        fn set_viewport_size(&mut self, _width: u32, _height: u32) {}

        fn dispose(&mut self) {}
    }

    struct FakeOrbit {
        enabled: bool,
    }

    impl OrbitControl for FakeOrbit {
        fn set_enabled(&mut self, enabled: bool) {
            self.enabled = enabled;
        }
    }

    fn bound() -> (TransformBindingController, ManipulableObject, RecordingHost) {
        let mut controller = TransformBindingController::new();
        let object = ManipulableObject::default();
        let mut host = RecordingHost::default();
        assert!(controller.bind(Some(&object), &mut host));
        (controller, object, host)
    }

    fn slider(controller: &TransformBindingController, field: FieldId) -> f32 {
        controller.binding(field).slider.as_ref().unwrap().value
    }

    fn number(controller: &TransformBindingController, field: FieldId) -> String {
        controller.binding(field).number.as_ref().unwrap().text.clone()
    }

    #[test]
    fn bind_without_object_is_a_no_op() {
        let mut controller = TransformBindingController::new();
        let mut host = RecordingHost::default();
        assert!(!controller.bind(None, &mut host));
        assert!(!controller.is_bound());
        assert_eq!(host.attached, 0);
        assert_eq!(host.renders, 0);
    }

    #[test]
    fn bind_initialises_widgets_from_object() {
        let mut controller = TransformBindingController::new();
        let mut host = RecordingHost::default();
        let object = ManipulableObject {
            position: Vec3::new(1.5, -2.25, 0.0),
            tint: [1.0, 0.5, 0.0],
            ..Default::default()
        };
        controller.bind(Some(&object), &mut host);
        assert_eq!(number(&controller, FieldId::PosX), "1.50");
        assert_eq!(number(&controller, FieldId::PosY), "-2.25");
        assert_eq!(slider(&controller, FieldId::PosX), 1.5);
        assert_eq!(
            controller.binding(FieldId::Color).color.as_ref().unwrap().hex,
            "#ff8000"
        );
        assert_eq!(host.attached, 1);
    }

    #[test]
    fn widget_input_round_trips_to_object_and_siblings() {
        let (mut controller, mut object, mut host) = bound();
        for (field, raw, expected) in [
            (FieldId::PosX, "1.25", 1.25),
            (FieldId::PosZ, "-3", -3.0),
            (FieldId::RotY, "0.785398", 0.785398),
            (FieldId::ScaleZ, "2.5", 2.5),
        ] {
            let renders = host.renders;
            assert!(controller.on_widget_input(
                &mut object,
                &mut host,
                field,
                WidgetKind::Number,
                raw
            ));
            let FieldTarget::Component { group, axis } = field.spec().target else {
                unreachable!()
            };
            assert_eq!(object.component(group, axis), expected);
            assert_eq!(slider(&controller, field), expected);
            // source field keeps the user's text
            assert_eq!(number(&controller, field), raw);
            assert_eq!(host.renders, renders + 1);
        }
    }

    #[test]
    fn number_input_is_stored_in_its_own_field() {
        let (mut controller, mut object, mut host) = bound();
        controller.on_widget_input(&mut object, &mut host, FieldId::PosY, WidgetKind::Number, "2");
        assert_eq!(number(&controller, FieldId::PosY), "2");
        assert_eq!(slider(&controller, FieldId::PosY), 2.0);

        controller.on_widget_input(&mut object, &mut host, FieldId::PosY, WidgetKind::Number, "2x");
        assert_eq!(object.position.y, 2.0);
        assert_eq!(number(&controller, FieldId::PosY), "2x");
        controller.tick(Some(&object), &mut host);
        assert_eq!(number(&controller, FieldId::PosY), "2.00");
    }

    #[test]
    fn slider_input_updates_number_field_with_two_decimals() {
        let (mut controller, mut object, mut host) = bound();
        controller.on_widget_input(&mut object, &mut host, FieldId::RotX, WidgetKind::Slider, "1.23456");
        assert_eq!(object.rotation.x, 1.23456);
        assert_eq!(number(&controller, FieldId::RotX), "1.23");
    }

    #[test]
    fn gizmo_change_pushes_object_into_every_widget() {
        let (mut controller, mut object, mut host) = bound();
        object.position = Vec3::new(0.333, 1.0, -7.126);
        object.rotation.z = 12.0;
        object.scale.x = 4.0;
        controller.on_gizmo_change(&object, &mut host);
        assert_eq!(number(&controller, FieldId::PosX), "0.33");
        assert_eq!(slider(&controller, FieldId::PosX), 0.333);
        assert_eq!(number(&controller, FieldId::PosZ), "-7.13");
        assert_eq!(number(&controller, FieldId::RotZ), "12.00");
        assert_eq!(number(&controller, FieldId::ScaleX), "4.00");
        assert_eq!(slider(&controller, FieldId::ScaleUniform), 2.0);
        assert_eq!(host.rendered_with_object, 2);
    }

    #[test]
    fn scale_input_is_floored_and_shown_floored() {
        let (mut controller, mut object, mut host) = bound();
        for raw in ["0", "-1", "-0.0001", "0.05"] {
            controller.on_widget_input(&mut object, &mut host, FieldId::ScaleY, WidgetKind::Number, raw);
            assert_eq!(object.scale.y, MIN_SCALE);
            assert_eq!(number(&controller, FieldId::ScaleY), "0.10");
        }
        controller.on_widget_input(&mut object, &mut host, FieldId::ScaleUniform, WidgetKind::Slider, "-4");
        assert_eq!(object.scale, Vec3::splat(MIN_SCALE));
    }

    #[test]
    fn drag_state_toggles_orbit_exclusively() {
        let (mut controller, _object, _host) = bound();
        let mut orbit = FakeOrbit { enabled: true };
        controller.on_gizmo_drag_state_changed(true, &mut orbit);
        assert!(controller.gizmo().active);
        assert!(!orbit.enabled);
        controller.on_gizmo_drag_state_changed(false, &mut orbit);
        assert!(!controller.gizmo().active);
        assert!(orbit.enabled);
    }

    #[test]
    fn reset_scale_is_idempotent() {
        let (mut controller, mut object, mut host) = bound();
        object.scale = Vec3::new(3.0, 0.2, 7.0);
        for _ in 0..2 {
            controller.reset_field(&mut object, &mut host, TransformGroup::Scale);
            assert_eq!(object.scale, Vec3::ONE);
            for field in [FieldId::ScaleX, FieldId::ScaleY, FieldId::ScaleZ] {
                assert_eq!(number(&controller, field), "1.00");
                assert_eq!(slider(&controller, field), 1.0);
            }
        }
    }

    #[test]
    fn reset_position_and_rotation_return_to_zero() {
        let (mut controller, mut object, mut host) = bound();
        object.position = Vec3::splat(2.0);
        object.rotation = Vec3::splat(9.0);
        controller.reset_field(&mut object, &mut host, TransformGroup::Position);
        controller.reset_field(&mut object, &mut host, TransformGroup::Rotation);
        assert_eq!(object.position, Vec3::ZERO);
        assert_eq!(object.rotation, Vec3::ZERO);
        assert_eq!(number(&controller, FieldId::RotY), "0.00");
    }

    #[test]
    fn invalid_input_leaves_object_bit_identical() {
        let (mut controller, mut object, mut host) = bound();
        controller.on_widget_input(&mut object, &mut host, FieldId::PosY, WidgetKind::Number, "0.1");
        let before = object.clone();
        let renders = host.renders;
        for raw in ["abc", "", "1.2.3", "NaN", "inf", "1e99"] {
            assert!(!controller.on_widget_input(
                &mut object,
                &mut host,
                FieldId::PosY,
                WidgetKind::Number,
                raw
            ));
            assert_eq!(object.position.y.to_bits(), before.position.y.to_bits());
        }
        assert!(!controller.on_widget_input(&mut object, &mut host, FieldId::Color, WidgetKind::ColorPicker, "#zzzzzz"));
        assert_eq!(object, before);
        assert_eq!(host.renders, renders);
    }

    #[test]
    fn colour_input_sets_tint() {
        let (mut controller, mut object, mut host) = bound();
        assert!(controller.on_widget_input(
            &mut object,
            &mut host,
            FieldId::Color,
            WidgetKind::ColorPicker,
            "#336699"
        ));
        assert_eq!(object.tint, [0.2, 0.4, 0.6]);
    }

    #[test]
    fn focused_number_field_is_not_overwritten_by_tick() {
        let (mut controller, mut object, mut host) = bound();
        controller.set_widget_focus(FieldId::PosX, WidgetKind::Number, true);
        controller.on_widget_input(&mut object, &mut host, FieldId::PosX, WidgetKind::Number, "1.");
        controller.tick(Some(&object), &mut host);
        assert_eq!(number(&controller, FieldId::PosX), "1.");
        controller.set_widget_focus(FieldId::PosX, WidgetKind::Number, false);
        controller.tick(Some(&object), &mut host);
        assert_eq!(number(&controller, FieldId::PosX), "1.00");
    }

    #[test]
    fn tick_reflects_external_motion_and_renders_unbound() {
        let mut controller = TransformBindingController::new();
        let mut host = RecordingHost::default();
        controller.tick(None, &mut host);
        assert_eq!(host.renders, 1);
        assert_eq!(host.rendered_with_object, 0);

        let mut object = ManipulableObject::default();
        controller.bind(Some(&object), &mut host);
        object.rotation.y += 0.5;
        controller.tick(Some(&object), &mut host);
        assert_eq!(number(&controller, FieldId::RotY), "0.50");
    }

    #[test]
    fn input_before_bind_is_ignored() {
        let mut controller = TransformBindingController::new();
        let mut host = RecordingHost::default();
        let mut object = ManipulableObject::default();
        assert!(!controller.on_widget_input(&mut object, &mut host, FieldId::PosX, WidgetKind::Number, "3"));
        assert_eq!(object.position.x, 0.0);
    }

    #[test]
    fn mode_changes_are_refused_mid_drag() {
        let (mut controller, _object, _host) = bound();
        let mut orbit = FakeOrbit { enabled: true };
        controller.set_gizmo_mode(GizmoMode::Rotate);
        controller.on_gizmo_drag_state_changed(true, &mut orbit);
        controller.set_gizmo_mode(GizmoMode::Scale);
        assert_eq!(controller.gizmo().mode, GizmoMode::Rotate);
        controller.set_hot_axis(Some(Axis::X));
        controller.on_gizmo_drag_state_changed(false, &mut orbit);
        assert_eq!(controller.gizmo().hot_axis, None);
    }
}
