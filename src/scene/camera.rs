use glam::Vec3;

/// Pinhole camera consumed by primary ray generation.
///
/// Orientation is kept as an orthonormal `direction`/`up` pair; `right` is
/// derived. `fov` is the vertical field of view in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    position: Vec3,
    direction: Vec3,
    up: Vec3,
    fov: f32,
}

impl Camera {
    #[must_use]
    pub fn new_perspective(position: Vec3, direction: Vec3, up: Vec3, fov: f32) -> Self {
        let direction = direction.normalize_or(Vec3::NEG_Z);
        let right = direction.cross(up).normalize_or(Vec3::X);
        Self {
            position,
            direction,
            up: right.cross(direction),
            fov: fov.clamp(1e-3, std::f32::consts::PI - 1e-3),
        }
    }

    #[must_use]
    pub fn look_at(position: Vec3, target: Vec3, up: Vec3, fov: f32) -> Self {
        Self::new_perspective(position, target - position, up, fov)
    }

    #[inline]
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    #[inline]
    #[must_use]
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    #[inline]
    #[must_use]
    pub fn up(&self) -> Vec3 {
        self.up
    }

    #[inline]
    #[must_use]
    pub fn right(&self) -> Vec3 {
        self.direction.cross(self.up)
    }

    #[inline]
    #[must_use]
    pub fn field_of_view(&self) -> f32 {
        self.fov
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::look_at(Vec3::new(0.0, 1.0, 5.0), Vec3::ZERO, Vec3::Y, 45f32.to_radians())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basis_is_orthonormal() {
        let camera = Camera::look_at(Vec3::new(3.0, 2.0, 1.0), Vec3::ZERO, Vec3::Y, 1.0);
        assert!(camera.direction().dot(camera.up()).abs() < 1e-5);
        assert!(camera.direction().dot(camera.right()).abs() < 1e-5);
        assert!((camera.right().length() - 1.0).abs() < 1e-5);
    }
}
