/// Geometry primitives for 3D rendering
use nalgebra::{Matrix4, Point3, Vector3};

/// A 3D vertex with position and normal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Point3<f32>,
    pub normal: Vector3<f32>,
}

impl Vertex {
    pub fn new(x: f32, y: f32, z: f32, nx: f32, ny: f32, nz: f32) -> Self {
        Self {
            position: Point3::new(x, y, z),
            normal: Vector3::new(nx, ny, nz),
        }
    }
}

/// A triangle face defined by three vertices
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    pub vertices: [Vertex; 3],
}

impl Triangle {
    pub fn new(v0: Vertex, v1: Vertex, v2: Vertex) -> Self {
        Self {
            vertices: [v0, v1, v2],
        }
    }

    /// Calculate the face normal from the triangle's vertices.
    ///
    /// Degenerate triangles yield a zero vector instead of NaNs.
    pub fn calculate_normal(&self) -> Vector3<f32> {
        let v0 = self.vertices[0].position;
        let v1 = self.vertices[1].position;
        let v2 = self.vertices[2].position;

        let edge1 = v1 - v0;
        let edge2 = v2 - v0;

        edge1
            .cross(&edge2)
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Vector3::zeros)
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl BoundingBox {
    /// Smallest box containing every point, `None` when there are no points
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Point3<f32>>,
    {
        let mut points = points.into_iter();
        let first = points.next()?;
        let mut bbox = Self {
            min: first,
            max: first,
        };
        for p in points {
            bbox.expand(&p);
        }
        Some(bbox)
    }

    pub fn expand(&mut self, p: &Point3<f32>) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    pub fn size(&self) -> Vector3<f32> {
        self.max - self.min
    }

    pub fn center(&self) -> Point3<f32> {
        nalgebra::center(&self.min, &self.max)
    }
}

/// A 3D mesh composed of triangles
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    pub fn new() -> Self {
        Self {
            triangles: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            triangles: Vec::with_capacity(capacity),
        }
    }

    pub fn add_triangle(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn positions(&self) -> impl Iterator<Item = Point3<f32>> + '_ {
        self.triangles
            .iter()
            .flat_map(|t| t.vertices.iter().map(|v| v.position))
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.positions())
    }

    /// Bounding box of the mesh after `matrix` is applied to every vertex
    pub fn transformed_bounding_box(&self, matrix: &Matrix4<f32>) -> Option<BoundingBox> {
        BoundingBox::from_points(self.positions().map(|p| matrix.transform_point(&p)))
    }

    /// Translate the vertices so the bounding box center sits at the origin.
    ///
    /// Returns the offset that was applied.
    pub fn center(&mut self) -> Vector3<f32> {
        let Some(bbox) = self.bounding_box() else {
            return Vector3::zeros();
        };
        let offset = -bbox.center().coords;
        for triangle in &mut self.triangles {
            for vertex in &mut triangle.vertices {
                vertex.position += offset;
            }
        }
        offset
    }

    /// Create an axis-aligned box mesh centered at the origin
    pub fn cuboid(sx: f32, sy: f32, sz: f32) -> Self {
        let (hx, hy, hz) = (sx / 2.0, sy / 2.0, sz / 2.0);
        let mut mesh = Self::with_capacity(12);

        let mut quad = |corners: [(f32, f32, f32); 4], n: (f32, f32, f32)| {
            let v = corners.map(|(x, y, z)| Vertex::new(x, y, z, n.0, n.1, n.2));
            mesh.add_triangle(Triangle::new(v[0], v[1], v[2]));
            mesh.add_triangle(Triangle::new(v[0], v[2], v[3]));
        };

        // Front face
        quad([(-hx, -hy, hz), (hx, -hy, hz), (hx, hy, hz), (-hx, hy, hz)], (0.0, 0.0, 1.0));
        // Back face
        quad([(-hx, -hy, -hz), (-hx, hy, -hz), (hx, hy, -hz), (hx, -hy, -hz)], (0.0, 0.0, -1.0));
        // Top face
        quad([(-hx, hy, -hz), (-hx, hy, hz), (hx, hy, hz), (hx, hy, -hz)], (0.0, 1.0, 0.0));
        // Bottom face
        quad([(-hx, -hy, -hz), (hx, -hy, -hz), (hx, -hy, hz), (-hx, -hy, hz)], (0.0, -1.0, 0.0));
        // Right face
        quad([(hx, -hy, -hz), (hx, hy, -hz), (hx, hy, hz), (hx, -hy, hz)], (1.0, 0.0, 0.0));
        // Left face
        quad([(-hx, -hy, -hz), (-hx, -hy, hz), (-hx, hy, hz), (-hx, hy, -hz)], (-1.0, 0.0, 0.0));

        mesh
    }

    /// Create a simple cube mesh for testing
    pub fn cube(size: f32) -> Self {
        Self::cuboid(size, size, size)
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}
