use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::{LanternError, Transform};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Camera {
    /// Vertical field of view in radians.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            fov: 45.0f32.to_radians(),
            near: 0.1,
            far: 100.0,
        }
    }
}

impl Camera {
    pub fn validate(&self) -> Result<(), LanternError> {
        if !(self.near > 0.0 && self.near < self.far) {
            return Err(LanternError::InvalidClipRange {
                near: self.near,
                far: self.far,
            });
        }
        Ok(())
    }

    /// Perspective projection (view -> clip) for the given viewport aspect.
    pub fn compute_projection_matrix(&self, aspect_ratio: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov, aspect_ratio, self.near, self.far)
    }

    /// Collects the per-frame scalar and matrix inputs of the shading pass.
    pub fn frame_uniforms(
        &self,
        transform: &Transform,
        width: u32,
        height: u32,
    ) -> Result<FrameUniforms, LanternError> {
        self.validate()?;
        if width == 0 || height == 0 {
            return Err(LanternError::EmptyViewport { width, height });
        }
        Ok(FrameUniforms {
            view: transform.view_matrix(),
            near: self.near,
            far: self.far,
            width: width as f32,
            height: height as f32,
            camera_position: transform.translation,
        })
    }
}

/// Uniform inputs shared by every fragment of a frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameUniforms {
    pub view: Mat4,
    pub near: f32,
    pub far: f32,
    pub width: f32,
    pub height: f32,
    /// Only read by the forward+ specular term.
    pub camera_position: Vec3,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_inverted_clip_range() {
        let camera = Camera {
            near: 10.0,
            far: 1.0,
            ..Default::default()
        };
        assert!(matches!(
            camera.validate(),
            Err(LanternError::InvalidClipRange { .. })
        ));
    }

    #[test]
    fn frame_uniforms_reject_empty_viewport() {
        let camera = Camera::default();
        let err = camera
            .frame_uniforms(&Transform::default(), 0, 720)
            .unwrap_err();
        assert_eq!(err, LanternError::EmptyViewport { width: 0, height: 720 });
    }

    #[test]
    fn frame_uniforms_carry_camera_state() {
        let camera = Camera::default();
        let transform = Transform::from_xyz(1.0, 2.0, 3.0);
        let uniforms = camera.frame_uniforms(&transform, 1280, 720).unwrap();
        assert_eq!(uniforms.width, 1280.0);
        assert_eq!(uniforms.height, 720.0);
        assert_eq!(uniforms.near, camera.near);
        assert_eq!(uniforms.camera_position, Vec3::new(1.0, 2.0, 3.0));
    }
}
