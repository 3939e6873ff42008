/// Orbit camera controller with damping
use std::f32::consts::PI;

use nalgebra::{Point3, Vector2, Vector3};

use crate::config::ControlsConfig;
use crate::error::ControlsError;
use crate::projection::Camera;

const EPS: f32 = 1e-6;

/// Orbits the camera around a target point.
///
/// Input methods only record intent; [`OrbitControls::tick`] applies it to the
/// camera once per frame, bleeding off motion when damping is enabled.
#[derive(Debug, Clone)]
pub struct OrbitControls {
    config: ControlsConfig,
    target: Point3<f32>,
    delta_theta: f32,
    delta_phi: f32,
    scale: f32,
    /// Pending pan in viewport heights, y pointing down
    pending_pan: Vector2<f32>,
    pan_offset: Vector3<f32>,
}

impl OrbitControls {
    pub fn new(camera: &Camera, config: ControlsConfig) -> Result<Self, ControlsError> {
        if !(config.min_distance > 0.0 && config.min_distance <= config.max_distance) {
            return Err(ControlsError::InvalidDistanceRange {
                min: config.min_distance,
                max: config.max_distance,
            });
        }
        if (camera.position - camera.target).norm() < EPS {
            return Err(ControlsError::DegenerateCamera);
        }

        Ok(Self {
            config,
            target: camera.target,
            delta_theta: 0.0,
            delta_phi: 0.0,
            scale: 1.0,
            pending_pan: Vector2::zeros(),
            pan_offset: Vector3::zeros(),
        })
    }

    pub fn config(&self) -> &ControlsConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ControlsConfig {
        &mut self.config
    }

    pub fn target(&self) -> Point3<f32> {
        self.target
    }

    /// Orbit left and up by the given angles (in radians)
    pub fn rotate(&mut self, left: f32, up: f32) {
        self.delta_theta -= left;
        self.delta_phi -= up;
    }

    /// Move towards the target; negative steps move away
    pub fn zoom(&mut self, steps: f32) {
        if !self.config.enable_zoom {
            return;
        }
        self.scale *= 0.95f32.powf(self.config.zoom_speed * steps);
    }

    /// Drag the view by a fraction of the viewport height
    pub fn pan(&mut self, dx: f32, dy: f32) {
        if !self.config.enable_pan {
            return;
        }
        self.pending_pan += Vector2::new(dx, dy);
    }

    /// Apply recorded input (and auto-rotation) to the camera
    pub fn tick(&mut self, camera: &mut Camera) {
        let offset = camera.position - self.target;
        let mut radius = offset.norm();
        let mut theta = offset.x.atan2(offset.z);
        let mut phi = (offset.y / radius.max(EPS)).clamp(-1.0, 1.0).acos();

        if self.config.auto_rotate {
            self.rotate(2.0 * PI / 60.0 / 60.0 * self.config.auto_rotate_speed, 0.0);
        }

        let factor = if self.config.enable_damping {
            self.config.damping_factor
        } else {
            1.0
        };

        theta += self.delta_theta * factor;
        phi = (phi + self.delta_phi * factor).clamp(EPS, PI - EPS);
        radius = (radius * self.scale).clamp(self.config.min_distance, self.config.max_distance);

        self.absorb_pan(camera, radius);
        self.target += self.pan_offset * factor;

        let offset = Vector3::new(
            radius * phi.sin() * theta.sin(),
            radius * phi.cos(),
            radius * phi.sin() * theta.cos(),
        );
        camera.target = self.target;
        camera.position = self.target + offset;

        if self.config.enable_damping {
            self.delta_theta *= 1.0 - factor;
            self.delta_phi *= 1.0 - factor;
            self.pan_offset *= 1.0 - factor;
        } else {
            self.delta_theta = 0.0;
            self.delta_phi = 0.0;
            self.pan_offset = Vector3::zeros();
        }
        self.scale = 1.0;
    }

    /// Convert pending screen-space pan into a world-space offset
    fn absorb_pan(&mut self, camera: &Camera, distance: f32) {
        if self.pending_pan == Vector2::zeros() {
            return;
        }
        let forward = (self.target - camera.position).normalize();
        let Some(right) = forward.cross(&camera.up).try_normalize(EPS) else {
            self.pending_pan = Vector2::zeros();
            return;
        };
        let up = right.cross(&forward);

        let view_height = 2.0 * distance * (camera.fov / 2.0).tan();
        self.pan_offset += right * (-self.pending_pan.x * view_height)
            + up * (self.pending_pan.y * view_height);
        self.pending_pan = Vector2::zeros();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn distance(camera: &Camera) -> f32 {
        (camera.position - camera.target).norm()
    }

    #[test]
    fn test_rejects_invalid_range() {
        let camera = Camera::default();
        let config = ControlsConfig {
            min_distance: 10.0,
            max_distance: 1.0,
            ..ControlsConfig::default()
        };
        assert_eq!(
            OrbitControls::new(&camera, config).unwrap_err(),
            ControlsError::InvalidDistanceRange { min: 10.0, max: 1.0 }
        );
    }

    #[test]
    fn test_rejects_degenerate_camera() {
        let mut camera = Camera::default();
        camera.position = camera.target;
        assert_eq!(
            OrbitControls::new(&camera, ControlsConfig::default()).unwrap_err(),
            ControlsError::DegenerateCamera
        );
    }

    #[test]
    fn test_idle_tick_keeps_camera() {
        let mut camera = Camera::default();
        let start = camera.position;
        let mut controls = OrbitControls::new(&camera, ControlsConfig::default()).unwrap();
        for _ in 0..10 {
            controls.tick(&mut camera);
        }
        assert!((camera.position - start).norm() < 1e-3);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut camera = Camera::default();
        let config = ControlsConfig {
            enable_damping: false,
            ..ControlsConfig::default()
        };
        let mut controls = OrbitControls::new(&camera, config).unwrap();

        controls.zoom(-1000.0);
        controls.tick(&mut camera);
        assert_relative_eq!(distance(&camera), 200.0, epsilon = 1e-3);

        controls.zoom(1000.0);
        controls.tick(&mut camera);
        assert_relative_eq!(distance(&camera), 1.0, epsilon = 1e-3);
    }

    #[test]
    fn test_zoom_disabled() {
        let mut camera = Camera::default();
        let before = distance(&camera);
        let config = ControlsConfig {
            enable_zoom: false,
            ..ControlsConfig::default()
        };
        let mut controls = OrbitControls::new(&camera, config).unwrap();
        controls.zoom(10.0);
        controls.tick(&mut camera);
        assert_relative_eq!(distance(&camera), before, epsilon = 1e-3);
    }

    #[test]
    fn test_damped_rotation_settles() {
        let mut camera = Camera::default();
        let mut controls = OrbitControls::new(&camera, ControlsConfig::default()).unwrap();
        controls.rotate(0.5, 0.0);

        controls.tick(&mut camera);
        let after_one = camera.position;
        for _ in 0..500 {
            controls.tick(&mut camera);
        }
        let settled = camera.position;
        controls.tick(&mut camera);

        assert!((after_one - Point3::new(0.0, 40.0, 50.0)).norm() > 1e-3);
        assert!((camera.position - settled).norm() < 1e-4);
        assert_relative_eq!(distance(&camera), 64.031_24, epsilon = 1e-2);
    }

    #[test]
    fn test_auto_rotate_orbits_at_constant_distance() {
        let mut camera = Camera::default();
        let config = ControlsConfig {
            auto_rotate: true,
            enable_damping: false,
            ..ControlsConfig::default()
        };
        let start = camera.position;
        let mut controls = OrbitControls::new(&camera, config).unwrap();
        for _ in 0..60 {
            controls.tick(&mut camera);
        }
        assert!((camera.position - start).norm() > 1e-2);
        assert_relative_eq!(camera.position.y, start.y, epsilon = 1e-3);
    }

    #[test]
    fn test_pan_moves_target() {
        let mut camera = Camera::default();
        let config = ControlsConfig {
            enable_damping: false,
            ..ControlsConfig::default()
        };
        let mut controls = OrbitControls::new(&camera, config).unwrap();
        controls.pan(0.1, 0.0);
        controls.tick(&mut camera);
        // Dragging right moves the target towards -X
        assert!(controls.target().x < 0.0);
        assert_eq!(camera.target, controls.target());
    }
}
