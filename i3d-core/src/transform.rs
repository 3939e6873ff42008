/// 3D transformation matrices and rotation state
use nalgebra::{Matrix4, Vector3};

/// Rotation state around three axes (in radians)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationState {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl RotationState {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }
}

impl Default for RotationState {
    fn default() -> Self {
        Self::zero()
    }
}

/// Transform builder for 3D transformations
pub struct Transform;

impl Transform {
    /// Create a rotation matrix from a rotation state
    pub fn rotation_matrix(rotation: &RotationState) -> Matrix4<f32> {
        let rx = Matrix4::new_rotation(Vector3::new(rotation.x, 0.0, 0.0));
        let ry = Matrix4::new_rotation(Vector3::new(0.0, rotation.y, 0.0));
        let rz = Matrix4::new_rotation(Vector3::new(0.0, 0.0, rotation.z));

        // Apply rotations in order: Z, Y, X
        rz * ry * rx
    }

    /// Create a translation matrix
    pub fn translation_matrix(x: f32, y: f32, z: f32) -> Matrix4<f32> {
        Matrix4::new_translation(&Vector3::new(x, y, z))
    }

    /// Create a uniform scale matrix
    pub fn scale_matrix(s: f32) -> Matrix4<f32> {
        Matrix4::new_scaling(s)
    }

    /// Create a model-view-projection matrix
    pub fn mvp_matrix(
        model: &Matrix4<f32>,
        view: &Matrix4<f32>,
        projection: &Matrix4<f32>,
    ) -> Matrix4<f32> {
        projection * view * model
    }
}

/// Placement of a model in the scene: scale, then rotate, then translate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelTransform {
    pub position: Vector3<f32>,
    pub rotation: RotationState,
    pub scale: f32,
}

impl ModelTransform {
    pub fn identity() -> Self {
        Self {
            position: Vector3::zeros(),
            rotation: RotationState::zero(),
            scale: 1.0,
        }
    }

    pub fn rotation_matrix(&self) -> Matrix4<f32> {
        Transform::rotation_matrix(&self.rotation)
    }

    /// World matrix of the model
    pub fn matrix(&self) -> Matrix4<f32> {
        let t = self.position;
        Transform::translation_matrix(t.x, t.y, t.z)
            * self.rotation_matrix()
            * Transform::scale_matrix(self.scale)
    }
}

impl Default for ModelTransform {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    #[test]
    fn test_rotation_state() {
        let state = RotationState::default();
        assert_eq!(state, RotationState::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn test_identity_rotation() {
        let rotation = RotationState::zero();
        let matrix = Transform::rotation_matrix(&rotation);
        assert!((matrix - Matrix4::identity()).norm() < 1e-6);
    }

    #[test]
    fn test_up_axis_correction() {
        // -90 degrees about X maps Z-up onto Y-up
        let rotation = RotationState::new(-std::f32::consts::FRAC_PI_2, 0.0, 0.0);
        let up = Transform::rotation_matrix(&rotation).transform_point(&Point3::new(0.0, 0.0, 1.0));
        assert!((up - Point3::new(0.0, 1.0, 0.0)).norm() < 1e-6);
    }

    #[test]
    fn test_model_matrix_scales_before_translating() {
        let transform = ModelTransform {
            position: Vector3::new(1.0, 0.0, 0.0),
            rotation: RotationState::zero(),
            scale: 0.1,
        };
        let p = transform.matrix().transform_point(&Point3::new(10.0, 0.0, 0.0));
        assert!((p - Point3::new(2.0, 0.0, 0.0)).norm() < 1e-6);
    }
}
