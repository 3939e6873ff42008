/// Viewer configuration with the stock defaults
use nalgebra::Point3;

use crate::material::Color;

#[derive(Debug, Clone, PartialEq)]
pub struct CameraConfig {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub position: Point3<f32>,
    pub target: Point3<f32>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 45.0,
            near: 0.1,
            far: 1000.0,
            position: Point3::new(0.0, 40.0, 50.0),
            target: Point3::origin(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LightingConfig {
    pub ambient: Color,
    pub point: Color,
    pub point_position: Point3<f32>,
    pub cast_shadow: bool,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            ambient: Color::from_hex(0x444444),
            point: Color::from_hex(0xffffff),
            point_position: Point3::new(0.0, 50.0, 50.0),
            cast_shadow: true,
        }
    }
}

/// Orbit controller knobs
#[derive(Debug, Clone, PartialEq)]
pub struct ControlsConfig {
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub enable_zoom: bool,
    pub zoom_speed: f32,
    pub enable_pan: bool,
    pub auto_rotate: bool,
    /// Orbits per minute at 60 frames per second
    pub auto_rotate_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            enable_damping: true,
            damping_factor: 0.05,
            enable_zoom: true,
            zoom_speed: 1.0,
            enable_pan: true,
            auto_rotate: false,
            auto_rotate_speed: 0.5,
            min_distance: 1.0,
            max_distance: 200.0,
        }
    }
}

/// How freshly loaded geometry is placed in the scene
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeConfig {
    /// Rotation about X converting the file's Z-up convention to Y-up
    pub up_axis_rotation: f32,
    pub scale: f32,
    pub color: Color,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            up_axis_rotation: -std::f32::consts::FRAC_PI_2,
            scale: 0.1,
            color: Color::from_hex(0x00ffff),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    pub camera: CameraConfig,
    pub lighting: LightingConfig,
    pub controls: ControlsConfig,
    pub normalize: NormalizeConfig,
    pub clear_color: Color,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            lighting: LightingConfig::default(),
            controls: ControlsConfig::default(),
            normalize: NormalizeConfig::default(),
            clear_color: Color::from_hex(0xffffff),
        }
    }
}
