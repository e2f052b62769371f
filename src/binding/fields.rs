use crate::scene::{Axis, TransformGroup};
use std::ops::RangeInclusive;

/// Every editable field, in [`FIELD_TABLE`] order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldId {
    PosX,
    PosY,
    PosZ,
    RotX,
    RotY,
    RotZ,
    ScaleX,
    ScaleY,
    ScaleZ,
    ScaleUniform,
    Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldTarget {
    Component { group: TransformGroup, axis: Axis },
    /// Writes all three scale axes at once.
    UniformScale,
    Tint,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub field: FieldId,
    pub id: &'static str,
    pub target: FieldTarget,
    pub slider_range: RangeInclusive<f32>,
}

const POSITION_RANGE: RangeInclusive<f32> = -5.0..=5.0;
const ROTATION_RANGE: RangeInclusive<f32> = -std::f32::consts::PI..=std::f32::consts::PI;
const SCALE_RANGE: RangeInclusive<f32> = crate::scene::MIN_SCALE..=3.0;

const fn component(
    field: FieldId,
    id: &'static str,
    group: TransformGroup,
    axis: Axis,
    slider_range: RangeInclusive<f32>,
) -> FieldSpec {
    FieldSpec {
        field,
        id,
        target: FieldTarget::Component { group, axis },
        slider_range,
    }
}

pub static FIELD_TABLE: [FieldSpec; 11] = [
    component(FieldId::PosX, "posX", TransformGroup::Position, Axis::X, POSITION_RANGE),
    component(FieldId::PosY, "posY", TransformGroup::Position, Axis::Y, POSITION_RANGE),
    component(FieldId::PosZ, "posZ", TransformGroup::Position, Axis::Z, POSITION_RANGE),
    component(FieldId::RotX, "rotX", TransformGroup::Rotation, Axis::X, ROTATION_RANGE),
    component(FieldId::RotY, "rotY", TransformGroup::Rotation, Axis::Y, ROTATION_RANGE),
    component(FieldId::RotZ, "rotZ", TransformGroup::Rotation, Axis::Z, ROTATION_RANGE),
    component(FieldId::ScaleX, "scaleX", TransformGroup::Scale, Axis::X, SCALE_RANGE),
    component(FieldId::ScaleY, "scaleY", TransformGroup::Scale, Axis::Y, SCALE_RANGE),
    component(FieldId::ScaleZ, "scaleZ", TransformGroup::Scale, Axis::Z, SCALE_RANGE),
    FieldSpec {
        field: FieldId::ScaleUniform,
        id: "scale",
        target: FieldTarget::UniformScale,
        slider_range: SCALE_RANGE,
    },
    FieldSpec {
        field: FieldId::Color,
        id: "color",
        target: FieldTarget::Tint,
        slider_range: 0.0..=1.0,
    },
];

impl FieldId {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn spec(self) -> &'static FieldSpec {
        &FIELD_TABLE[self.index()]
    }

    pub fn id(self) -> &'static str {
        self.spec().id
    }

    /// The three per-axis fields of a group, X first.
    pub fn group_fields(group: TransformGroup) -> [FieldId; 3] {
        match group {
            TransformGroup::Position => [FieldId::PosX, FieldId::PosY, FieldId::PosZ],
            TransformGroup::Rotation => [FieldId::RotX, FieldId::RotY, FieldId::RotZ],
            TransformGroup::Scale => [FieldId::ScaleX, FieldId::ScaleY, FieldId::ScaleZ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_indexed_by_field() {
        for (index, spec) in FIELD_TABLE.iter().enumerate() {
            assert_eq!(spec.field.index(), index);
        }
        let ids: std::collections::HashSet<_> = FIELD_TABLE.iter().map(|spec| spec.id).collect();
        assert_eq!(ids.len(), FIELD_TABLE.len());
    }

    #[test]
    fn group_fields_match_their_targets() {
        for group in TransformGroup::ALL {
            for (axis, field) in Axis::ALL.into_iter().zip(FieldId::group_fields(group)) {
                assert_eq!(field.spec().target, FieldTarget::Component { group, axis });
            }
        }
    }
}
