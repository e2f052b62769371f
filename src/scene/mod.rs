use glam::{EulerRot, Mat4, Quat, Vec3};

/// Smallest scale any axis may hold. Keeps the model matrix invertible.
pub const MIN_SCALE: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    pub fn unit(self) -> Vec3 {
        match self {
            Axis::X => Vec3::X,
            Axis::Y => Vec3::Y,
            Axis::Z => Vec3::Z,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
        }
    }
}

/// The three editable transform groups, each with three axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformGroup {
    Position,
    Rotation,
    Scale,
}

impl TransformGroup {
    pub const ALL: [TransformGroup; 3] = [
        TransformGroup::Position,
        TransformGroup::Rotation,
        TransformGroup::Scale,
    ];

    /// Value every axis of the group returns to on reset.
    pub fn rest_value(self) -> f32 {
        match self {
            TransformGroup::Position | TransformGroup::Rotation => 0.0,
            TransformGroup::Scale => 1.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TransformGroup::Position => "Position",
            TransformGroup::Rotation => "Rotation",
            TransformGroup::Scale => "Scale",
        }
    }
}

/// The loaded model's editable state.
///
/// Rotation is XYZ Euler in radians and is never wrapped. Scale components
/// never drop below [`MIN_SCALE`] when written through [`Self::set_component`].
#[derive(Debug, Clone, PartialEq)]
pub struct ManipulableObject {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
    pub tint: [f32; 3],
}

impl Default for ManipulableObject {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            tint: [1.0, 1.0, 1.0],
        }
    }
}

impl ManipulableObject {
    pub fn group(&self, group: TransformGroup) -> Vec3 {
        match group {
            TransformGroup::Position => self.position,
            TransformGroup::Rotation => self.rotation,
            TransformGroup::Scale => self.scale,
        }
    }

    fn group_mut(&mut self, group: TransformGroup) -> &mut Vec3 {
        match group {
            TransformGroup::Position => &mut self.position,
            TransformGroup::Rotation => &mut self.rotation,
            TransformGroup::Scale => &mut self.scale,
        }
    }

    pub fn component(&self, group: TransformGroup, axis: Axis) -> f32 {
        self.group(group)[axis.index()]
    }

    /// Writes one component and returns the value actually stored.
    pub fn set_component(&mut self, group: TransformGroup, axis: Axis, value: f32) -> f32 {
        let stored = match group {
            TransformGroup::Scale => clamp_scale(value),
            _ => value,
        };
        self.group_mut(group)[axis.index()] = stored;
        stored
    }

    pub fn reset_group(&mut self, group: TransformGroup) {
        *self.group_mut(group) = Vec3::splat(group.rest_value());
    }

    pub fn model_matrix(&self) -> Mat4 {
        compose_transform_matrix(self.position, self.rotation, self.scale)
    }
}

pub fn clamp_scale(value: f32) -> f32 {
    if value.is_nan() {
        MIN_SCALE
    } else {
        value.max(MIN_SCALE)
    }
}

/// T * R * S with rotation applied in XYZ order.
pub fn compose_transform_matrix(position: Vec3, rotation: Vec3, scale: Vec3) -> Mat4 {
    let rotation = Quat::from_euler(EulerRot::XYZ, rotation.x, rotation.y, rotation.z);
    Mat4::from_scale_rotation_translation(scale, rotation, position)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    pub fn from_points(points: &[Vec3]) -> Option<Self> {
        let first = *points.first()?;
        let (min, max) = points
            .iter()
            .fold((first, first), |(min, max), p| (min.min(*p), max.max(*p)));
        Some(Self { min, max })
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn extent(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    pub fn radius(&self) -> f32 {
        self.extent().length()
    }
}

/// A parsed model: every primitive merged into one indexed triangle list.
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub positions: Vec<Vec3>,
    pub indices: Vec<u32>,
    pub bounds: Bounds,
}

impl SceneNode {
    /// Returns `None` when there is nothing to draw.
    pub fn new(name: String, positions: Vec<Vec3>, indices: Vec<u32>) -> Option<Self> {
        if indices.len() < 3 {
            return None;
        }
        let bounds = Bounds::from_points(&positions)?;
        Some(Self {
            name,
            positions,
            indices,
            bounds,
        })
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.indices.chunks_exact(3).filter_map(|tri| {
            Some([
                *self.positions.get(tri[0] as usize)?,
                *self.positions.get(tri[1] as usize)?,
                *self.positions.get(tri[2] as usize)?,
            ])
        })
    }

    /// Moves the geometry so its bounding box is centred on the origin.
    pub fn centered(mut self) -> Self {
        let center = self.bounds.center();
        for p in &mut self.positions {
            *p -= center;
        }
        self.bounds = Bounds {
            min: self.bounds.min - center,
            max: self.bounds.max - center,
        };
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_writes_are_floored() {
        let mut object = ManipulableObject::default();
        assert_eq!(object.set_component(TransformGroup::Scale, Axis::Y, -3.0), MIN_SCALE);
        assert_eq!(object.set_component(TransformGroup::Scale, Axis::Z, 0.0), MIN_SCALE);
        assert_eq!(object.set_component(TransformGroup::Scale, Axis::X, f32::NAN), MIN_SCALE);
        assert!(object.scale.min_element() >= MIN_SCALE);
    }

    #[test]
    fn rotation_is_not_wrapped() {
        let mut object = ManipulableObject::default();
        object.set_component(TransformGroup::Rotation, Axis::X, 20.0);
        assert_eq!(object.rotation.x, 20.0);
    }

    #[test]
    fn reset_restores_rest_values() {
        let mut object = ManipulableObject {
            position: Vec3::new(1.0, 2.0, 3.0),
            rotation: Vec3::new(0.5, 0.5, 0.5),
            scale: Vec3::new(2.0, 3.0, 4.0),
            tint: [0.2, 0.3, 0.4],
        };
        for group in TransformGroup::ALL {
            object.reset_group(group);
        }
        assert_eq!(object.position, Vec3::ZERO);
        assert_eq!(object.rotation, Vec3::ZERO);
        assert_eq!(object.scale, Vec3::ONE);
        assert_eq!(object.tint, [0.2, 0.3, 0.4]);
    }

    #[test]
    fn model_matrix_places_origin_at_position() {
        let object = ManipulableObject {
            position: Vec3::new(1.0, -2.0, 0.5),
            rotation: Vec3::new(0.3, 1.2, -0.7),
            scale: Vec3::new(2.0, 2.0, 2.0),
            ..Default::default()
        };
        let origin = object.model_matrix().transform_point3(Vec3::ZERO);
        assert!((origin - object.position).length() < 1e-5);
    }

    #[test]
    fn centered_node_has_origin_bounds() {
        let node = SceneNode::new(
            "tri".to_string(),
            vec![
                Vec3::new(2.0, 2.0, 2.0),
                Vec3::new(4.0, 2.0, 2.0),
                Vec3::new(2.0, 6.0, 2.0),
            ],
            vec![0, 1, 2],
        )
        .unwrap()
        .centered();
        assert!(node.bounds.center().length() < 1e-6);
        assert_eq!(node.positions[0], Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(node.triangles().count(), 1);
    }

    #[test]
    fn empty_geometry_is_rejected() {
        assert!(SceneNode::new("empty".to_string(), Vec::new(), Vec::new()).is_none());
    }
}
