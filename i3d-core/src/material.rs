/// Colors, materials and lights
use nalgebra::{Point3, Vector3};
use std::ops::{Add, Mul};

/// Linear RGB color with components in `0.0..=1.0`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Build a color from a `0xRRGGBB` value
    pub fn from_hex(hex: u32) -> Self {
        let channel = |shift: u32| ((hex >> shift) & 0xff) as f32 / 255.0;
        Self::new(channel(16), channel(8), channel(0))
    }

    pub fn to_rgba8(self) -> [u8; 4] {
        let quantize = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [quantize(self.r), quantize(self.g), quantize(self.b), 255]
    }

    /// Perceived brightness, used for character ramps
    pub fn luminance(self) -> f32 {
        0.2126 * self.r + 0.7152 * self.g + 0.0722 * self.b
    }
}

impl Add for Color {
    type Output = Color;

    fn add(self, other: Color) -> Color {
        Color::new(self.r + other.r, self.g + other.g, self.b + other.b)
    }
}

impl Mul for Color {
    type Output = Color;

    fn mul(self, other: Color) -> Color {
        Color::new(self.r * other.r, self.g * other.g, self.b * other.b)
    }
}

impl Mul<f32> for Color {
    type Output = Color;

    fn mul(self, k: f32) -> Color {
        Color::new(self.r * k, self.g * k, self.b * k)
    }
}

/// Surface material of a model
#[derive(Debug, Clone, PartialEq)]
pub enum Material {
    /// Diffuse-only shading
    Lambert { color: Color },
}

impl Material {
    pub fn lambert(color: Color) -> Self {
        Material::Lambert { color }
    }

    pub fn color(&self) -> Color {
        match self {
            Material::Lambert { color } => *color,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientLight {
    pub color: Color,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub color: Color,
    pub position: Point3<f32>,
    pub cast_shadow: bool,
}

/// Lights collected from the scene for one frame
#[derive(Debug, Clone, Default)]
pub struct Lighting {
    pub ambient: Vec<AmbientLight>,
    pub points: Vec<PointLight>,
}

impl Lighting {
    /// Lambert reflectance at a surface point with unit `normal`
    pub fn shade(&self, material: &Material, point: &Point3<f32>, normal: &Vector3<f32>) -> Color {
        let mut light = Color::new(0.0, 0.0, 0.0);
        for ambient in &self.ambient {
            light = light + ambient.color;
        }
        for source in &self.points {
            let Some(dir) = (source.position - point).try_normalize(f32::EPSILON) else {
                continue;
            };
            let diffuse = normal.dot(&dir).max(0.0);
            light = light + source.color * diffuse;
        }
        material.color() * light
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_hex() {
        let c = Color::from_hex(0x00ffff);
        assert_eq!(c, Color::new(0.0, 1.0, 1.0));
        assert_eq!(Color::from_hex(0x444444).to_rgba8(), [0x44, 0x44, 0x44, 255]);
    }

    #[test]
    fn test_lambert_facing_light() {
        let lighting = Lighting {
            ambient: vec![AmbientLight {
                color: Color::from_hex(0x444444),
            }],
            points: vec![PointLight {
                color: Color::from_hex(0xffffff),
                position: Point3::new(0.0, 10.0, 0.0),
                cast_shadow: false,
            }],
        };
        let material = Material::lambert(Color::from_hex(0x00ffff));

        let lit = lighting.shade(&material, &Point3::origin(), &Vector3::y());
        assert_eq!(lit.r, 0.0);
        assert!(lit.g > 1.0);

        let unlit = lighting.shade(&material, &Point3::origin(), &-Vector3::y());
        assert!((unlit.g - 0x44 as f32 / 255.0).abs() < 1e-6);
    }
}
