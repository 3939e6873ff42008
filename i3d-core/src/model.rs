/// The renderable model and its measured extent
use std::fmt;
use std::sync::Arc;

use nalgebra::{Matrix4, Vector3};

use crate::geometry::Mesh;
use crate::material::Material;
use crate::transform::ModelTransform;

/// A loaded mesh with its material and placement.
///
/// Not `Clone`: the lifecycle manager owns the only live instance, and
/// [`Model::dispose`] consumes it.
#[derive(Debug)]
pub struct Model {
    geometry: Arc<Mesh>,
    material: Arc<Material>,
    pub transform: ModelTransform,
}

impl Model {
    pub fn new(mesh: Mesh, material: Material, transform: ModelTransform) -> Self {
        Self {
            geometry: Arc::new(mesh),
            material: Arc::new(material),
            transform,
        }
    }

    pub fn geometry(&self) -> &Arc<Mesh> {
        &self.geometry
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    pub fn matrix(&self) -> Matrix4<f32> {
        self.transform.matrix()
    }

    /// Release the geometry and material buffers
    pub fn dispose(self) {
        log::debug!(
            "disposing model ({} triangles)",
            self.geometry.triangles.len()
        );
        drop(self.geometry);
        drop(self.material);
    }
}

/// Bounding-box dimensions of the live model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasuredSize {
    /// Extent along X
    pub length: f32,
    /// Extent along Y
    pub width: f32,
    /// Extent along Z
    pub height: f32,
}

impl From<Vector3<f32>> for MeasuredSize {
    fn from(v: Vector3<f32>) -> Self {
        Self {
            length: v.x,
            width: v.y,
            height: v.z,
        }
    }
}

impl fmt::Display for MeasuredSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Length: {}, Width: {}, Height: {}",
            self.length, self.width, self.height
        )
    }
}
