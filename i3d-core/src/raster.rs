/// Software rasterizer and the drawing-surface contract
use std::convert::Infallible;

use nalgebra::{Matrix4, Point3};

use crate::material::{Color, Lighting};
use crate::model::Model;
use crate::projection::{Camera, ScreenPoint};
use crate::scene::Scene;
use crate::transform::Transform;

/// Something that can draw a scene through a camera
pub trait RenderSurface {
    type Error;

    fn resize(&mut self, width: u32, height: u32);
    fn draw_frame(&mut self, scene: &Scene, camera: &Camera) -> Result<(), Self::Error>;
}

/// Color and depth buffers
#[derive(Debug, Clone)]
pub struct Framebuffer {
    width: usize,
    height: usize,
    color: Vec<Color>,
    depth: Vec<f32>,
}

impl Framebuffer {
    pub fn new(width: usize, height: usize) -> Self {
        let size = width * height;
        Self {
            width,
            height,
            color: vec![Color::new(0.0, 0.0, 0.0); size],
            depth: vec![f32::INFINITY; size],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn clear(&mut self, background: Color) {
        self.color.fill(background);
        self.depth.fill(f32::INFINITY);
    }

    pub fn pixel(&self, x: usize, y: usize) -> Color {
        self.color[y * self.width + x]
    }

    /// Whether any geometry was drawn at `(x, y)` this frame
    pub fn covered(&self, x: usize, y: usize) -> bool {
        self.depth[y * self.width + x].is_finite()
    }

    /// Row-major RGBA bytes
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.color.iter().flat_map(|c| c.to_rgba8()).collect()
    }

    fn plot(&mut self, x: usize, y: usize, depth: f32, color: Color) {
        let idx = y * self.width + x;
        if depth < self.depth[idx] {
            self.depth[idx] = depth;
            self.color[idx] = color;
        }
    }
}

/// Z-buffered, flat-shaded triangle rasterizer
#[derive(Debug, Clone)]
pub struct Rasterizer {
    framebuffer: Framebuffer,
}

impl Rasterizer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            framebuffer: Framebuffer::new(width, height),
        }
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    pub fn render(&mut self, scene: &Scene, camera: &Camera) {
        self.framebuffer.clear(scene.background);
        let lighting = scene.lighting();
        let view = camera.view_matrix();
        let projection = camera.projection_matrix();

        for (_, model) in scene.models() {
            self.render_model(model, &lighting, camera, &view, &projection);
        }
    }

    fn render_model(
        &mut self,
        model: &Model,
        lighting: &Lighting,
        camera: &Camera,
        view: &Matrix4<f32>,
        projection: &Matrix4<f32>,
    ) {
        let world = model.matrix();
        let mvp = Transform::mvp_matrix(&world, view, projection);
        let (width, height) = (self.framebuffer.width as u32, self.framebuffer.height as u32);

        for triangle in &model.geometry().triangles {
            // Project vertices to screen space
            let mut screen = [ScreenPoint { x: 0.0, y: 0.0, depth: 0.0 }; 3];
            let mut clipped = false;
            for (out, vertex) in screen.iter_mut().zip(&triangle.vertices) {
                match camera.project_to_screen(&vertex.position, &mvp, width, height) {
                    Some(point) => *out = point,
                    None => clipped = true,
                }
            }
            if clipped {
                continue;
            }

            // Front faces wind clockwise once y points down
            let [a, b, c] = screen;
            let area = (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
            if area >= 0.0 {
                continue;
            }

            let corners = triangle.vertices.map(|v| world.transform_point(&v.position));
            let Some(normal) = (corners[1] - corners[0])
                .cross(&(corners[2] - corners[0]))
                .try_normalize(f32::EPSILON)
            else {
                continue;
            };
            let centroid = Point3::from(
                (corners[0].coords + corners[1].coords + corners[2].coords) / 3.0,
            );
            let color = lighting.shade(model.material(), &centroid, &normal);

            self.rasterize_triangle(&screen, color);
        }
    }

    fn rasterize_triangle(&mut self, coords: &[ScreenPoint; 3], color: Color) {
        let [v0, v1, v2] = *coords;
        let fb = &mut self.framebuffer;
        if fb.width == 0 || fb.height == 0 {
            return;
        }

        // Bounding box
        let min_x = v0.x.min(v1.x).min(v2.x).floor() as i32;
        let max_x = v0.x.max(v1.x).max(v2.x).ceil() as i32;
        let min_y = v0.y.min(v1.y).min(v2.y).floor() as i32;
        let max_y = v0.y.max(v1.y).max(v2.y).ceil() as i32;

        // Clip to screen bounds
        let min_x = min_x.max(0);
        let max_x = max_x.min(fb.width as i32 - 1);
        let min_y = min_y.max(0);
        let max_y = max_y.min(fb.height as i32 - 1);

        // Scanline rasterization
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let px = x as f32 + 0.5;
                let py = y as f32 + 0.5;

                // Barycentric coordinates
                if let Some((w0, w1, w2)) =
                    barycentric((v0.x, v0.y), (v1.x, v1.y), (v2.x, v2.y), (px, py))
                {
                    if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 {
                        // Interpolate depth
                        let depth = w0 * v0.depth + w1 * v1.depth + w2 * v2.depth;
                        fb.plot(x as usize, y as usize, depth, color);
                    }
                }
            }
        }
    }
}

impl RenderSurface for Rasterizer {
    type Error = Infallible;

    fn resize(&mut self, width: u32, height: u32) {
        self.framebuffer = Framebuffer::new(width as usize, height as usize);
    }

    fn draw_frame(&mut self, scene: &Scene, camera: &Camera) -> Result<(), Infallible> {
        self.render(scene, camera);
        Ok(())
    }
}

/// Calculate barycentric coordinates for a point in a triangle
fn barycentric(
    v0: (f32, f32),
    v1: (f32, f32),
    v2: (f32, f32),
    p: (f32, f32),
) -> Option<(f32, f32, f32)> {
    let denom = (v1.1 - v2.1) * (v0.0 - v2.0) + (v2.0 - v1.0) * (v0.1 - v2.1);

    if denom.abs() < 1e-6 {
        return None;
    }

    let w0 = ((v1.1 - v2.1) * (p.0 - v2.0) + (v2.0 - v1.0) * (p.1 - v2.1)) / denom;
    let w1 = ((v2.1 - v0.1) * (p.0 - v2.0) + (v0.0 - v2.0) * (p.1 - v2.1)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some((w0, w1, w2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Mesh, Triangle, Vertex};
    use crate::material::{AmbientLight, Material, PointLight};
    use crate::scene::{Node, SceneHost};
    use crate::transform::ModelTransform;

    fn lit_scene() -> Scene {
        let mut scene = Scene::default();
        scene.add(Node::AmbientLight(AmbientLight {
            color: Color::from_hex(0x444444),
        }));
        scene.add(Node::PointLight(PointLight {
            color: Color::from_hex(0xffffff),
            position: Point3::new(0.0, 50.0, 50.0),
            cast_shadow: true,
        }));
        scene
    }

    fn add_mesh(scene: &mut Scene, mesh: Mesh) {
        scene.add(Node::Model(Model::new(
            mesh,
            Material::lambert(Color::from_hex(0x00ffff)),
            ModelTransform::identity(),
        )));
    }

    #[test]
    fn test_empty_scene_is_background() {
        let mut rasterizer = Rasterizer::new(8, 6);
        rasterizer.draw_frame(&lit_scene(), &Camera::new(8, 6)).unwrap();
        let fb = rasterizer.framebuffer();
        assert!(!fb.covered(4, 3));
        assert_eq!(fb.pixel(4, 3), Color::from_hex(0xffffff));
        assert_eq!(fb.to_rgba8().len(), 8 * 6 * 4);
    }

    #[test]
    fn test_cube_covers_center() {
        let mut scene = lit_scene();
        add_mesh(&mut scene, Mesh::cube(10.0));

        let mut rasterizer = Rasterizer::new(80, 60);
        rasterizer.draw_frame(&scene, &Camera::new(80, 60)).unwrap();
        let fb = rasterizer.framebuffer();

        assert!(fb.covered(40, 30));
        assert!(!fb.covered(0, 0));
        let center = fb.pixel(40, 30);
        assert_eq!(center.r, 0.0);
        assert!(center.g > 0.0 && center.b > 0.0);
    }

    #[test]
    fn test_back_faces_are_culled() {
        // Wound clockwise as seen from the camera
        let v = |x, y, z| Vertex::new(x, y, z, 0.0, 0.0, 0.0);
        let mut mesh = Mesh::new();
        mesh.add_triangle(Triangle::new(
            v(-10.0, 0.0, 10.0),
            v(0.0, 0.0, -10.0),
            v(10.0, 0.0, 10.0),
        ));
        let mut scene = lit_scene();
        add_mesh(&mut scene, mesh);

        let mut rasterizer = Rasterizer::new(80, 60);
        rasterizer.draw_frame(&scene, &Camera::new(80, 60)).unwrap();
        assert!(!rasterizer.framebuffer().covered(40, 30));
    }

    #[test]
    fn test_resize_reallocates() {
        let mut rasterizer = Rasterizer::new(8, 6);
        rasterizer.resize(16, 4);
        assert_eq!(rasterizer.framebuffer().width(), 16);
        assert_eq!(rasterizer.framebuffer().height(), 4);
    }
}
