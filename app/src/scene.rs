//! Scene state fed to the shape pipeline: camera and lighting uniforms.
//!
//! Both uniform structs follow std140 layout rules so they can be copied
//! into uniform buffers byte for byte.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use static_assertions::const_assert_eq;

use vista_graphics::Extent2d;

/// Camera block, bound at [`CAMERA_BINDING`].
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CameraUniform {
    /// Column-major projection times view.
    pub view_projection: [[f32; 4]; 4],
    /// World-space eye position; `w` is unused.
    pub position: [f32; 4],
}

/// Directional light block, bound at [`LIGHT_BINDING`].
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightUniform {
    /// Normalized direction the light travels in.
    pub direction: [f32; 3],
    /// Ambient term in `0..=1`.
    pub ambient_strength: f32,
    /// Color premultiplied by intensity; `w` is unused.
    pub color: [f32; 4],
}

const_assert_eq!(std::mem::size_of::<CameraUniform>(), 80);
const_assert_eq!(std::mem::size_of::<LightUniform>(), 32);

/// Uniform binding of the camera block.
pub const CAMERA_BINDING: u32 = 0;
/// Uniform binding of the light block.
pub const LIGHT_BINDING: u32 = 1;

impl Default for LightUniform {
    fn default() -> Self {
        Self {
            direction: Vec3::new(-0.4, -1.0, -0.3).normalize().to_array(),
            ambient_strength: 0.15,
            color: [1.0, 1.0, 1.0, 1.0],
        }
    }
}

/// A read-modify-write change to the light block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightEdit {
    /// New direction; normalized before it is stored. Zero vectors are ignored.
    Direction(Vec3),
    /// New color scaled by `intensity`.
    Color { color: Vec3, intensity: f32 },
    /// New ambient term, clamped to `0..=1`.
    Ambient(f32),
}

impl LightEdit {
    /// Write this edit into `light`, leaving the other fields untouched.
    pub fn apply(self, light: &mut LightUniform) {
        match self {
            LightEdit::Direction(direction) => {
                let direction = direction.normalize_or_zero();
                if direction != Vec3::ZERO {
                    light.direction = direction.to_array();
                }
            }
            LightEdit::Color { color, intensity } => {
                light.color = (color * intensity.max(0.0)).extend(1.0).to_array();
            }
            LightEdit::Ambient(strength) => {
                light.ambient_strength = strength.clamp(0.0, 1.0);
            }
        }
    }
}

/// A camera orbiting a target point.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitCamera {
    /// Point the camera looks at and orbits around.
    pub target: Vec3,
    /// Distance from the target.
    pub distance: f32,
    /// Rotation around the vertical axis, in radians.
    pub yaw: f32,
    /// Elevation above the horizontal plane, in radians.
    pub pitch: f32,
    /// Vertical field of view, in radians.
    pub fov_y: f32,
    /// Near clip plane distance.
    pub near: f32,
    /// Far clip plane distance.
    pub far: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            distance: 6.0,
            yaw: 0.0,
            pitch: 0.35,
            fov_y: 45f32.to_radians(),
            near: 0.1,
            far: 100.0,
        }
    }
}

impl OrbitCamera {
    const PITCH_LIMIT: f32 = 1.5;

    /// Rotate around the target. Pitch is kept short of the poles.
    pub fn orbit(&mut self, delta_yaw: f32, delta_pitch: f32) {
        self.yaw = (self.yaw + delta_yaw) % std::f32::consts::TAU;
        self.pitch = (self.pitch + delta_pitch).clamp(-Self::PITCH_LIMIT, Self::PITCH_LIMIT);
    }

    /// Camera position in world space.
    pub fn eye(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        self.target + self.distance * Vec3::new(cos_pitch * sin_yaw, sin_pitch, cos_pitch * cos_yaw)
    }

    /// Right-handed view-projection matrix for a target of `extent`.
    pub fn view_projection(&self, extent: Extent2d) -> Mat4 {
        let projection =
            Mat4::perspective_rh(self.fov_y, extent.aspect_ratio(), self.near, self.far);
        let view = Mat4::look_at_rh(self.eye(), self.target, Vec3::Y);
        projection * view
    }

    /// Camera block as uploaded to the GPU.
    pub fn uniform(&self, extent: Extent2d) -> CameraUniform {
        CameraUniform {
            view_projection: self.view_projection(extent).to_cols_array_2d(),
            position: self.eye().extend(1.0).to_array(),
        }
    }
}

/// Shapes drawn by the scene pass, with their vertex counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Cube,
    Sphere,
    Cylinder,
    Plane,
}

impl Shape {
    /// Every shape, in draw order.
    pub const ALL: [Shape; 4] = [Shape::Cube, Shape::Sphere, Shape::Cylinder, Shape::Plane];

    /// Non-indexed vertex count of the generated mesh.
    pub fn vertex_count(self) -> u32 {
        match self {
            Shape::Cube => 36,
            Shape::Sphere => 32 * 16 * 6,
            Shape::Cylinder => 32 * 12,
            Shape::Plane => 6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_edit_normalizes() {
        let mut light = LightUniform::default();
        LightEdit::Direction(Vec3::new(0.0, -4.0, 0.0)).apply(&mut light);
        assert_eq!(light.direction, [0.0, -1.0, 0.0]);
    }

    #[test]
    fn test_zero_direction_is_ignored() {
        let mut light = LightUniform::default();
        let before = light.direction;
        LightEdit::Direction(Vec3::ZERO).apply(&mut light);
        assert_eq!(light.direction, before);
    }

    #[test]
    fn test_color_scaled_by_intensity() {
        let mut light = LightUniform::default();
        LightEdit::Color {
            color: Vec3::new(1.0, 0.5, 0.25),
            intensity: 2.0,
        }
        .apply(&mut light);
        assert_eq!(light.color, [2.0, 1.0, 0.5, 1.0]);
    }

    #[test]
    fn test_ambient_clamped() {
        let mut light = LightUniform::default();
        LightEdit::Ambient(3.0).apply(&mut light);
        assert_eq!(light.ambient_strength, 1.0);
    }

    #[test]
    fn test_orbit_clamps_pitch() {
        let mut camera = OrbitCamera::default();
        camera.orbit(0.0, 10.0);
        assert_eq!(camera.pitch, OrbitCamera::PITCH_LIMIT);
    }

    #[test]
    fn test_eye_at_distance() {
        let mut camera = OrbitCamera::default();
        camera.orbit(1.0, 0.2);
        assert!((camera.eye().distance(camera.target) - camera.distance).abs() < 1e-4);
    }

    #[test]
    fn test_uniform_for_degenerate_extent_is_finite() {
        let uniform = OrbitCamera::default().uniform(Extent2d::new(0, 0));
        assert!(uniform.view_projection.iter().flatten().all(|v| v.is_finite()));
    }
}
