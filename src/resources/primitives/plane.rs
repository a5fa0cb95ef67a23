use glam::{Vec2, Vec3};

use crate::resources::mesh::{Aabb, AnalyticShape, Mesh, MeshHit, Ray};

/// Finite plane spanned by two half-extent vectors.
///
/// The face normal is `u × v`; both sides are intersectable.
pub struct PlaneOptions {
    pub center: Vec3,
    pub half_u: Vec3,
    pub half_v: Vec3,
}

impl Default for PlaneOptions {
    fn default() -> Self {
        // 10×10 floor at y = 0 facing +Y
        Self {
            center: Vec3::ZERO,
            half_u: Vec3::new(0.0, 0.0, 5.0),
            half_v: Vec3::new(5.0, 0.0, 0.0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Plane {
    center: Vec3,
    half_u: Vec3,
    half_v: Vec3,
    normal: Vec3,
}

pub fn create_plane(options: PlaneOptions) -> Plane {
    let normal = options.half_u.cross(options.half_v).normalize_or(Vec3::Y);
    Plane {
        center: options.center,
        half_u: options.half_u,
        half_v: options.half_v,
        normal,
    }
}

impl Plane {
    #[must_use]
    pub fn normal(&self) -> Vec3 {
        self.normal
    }
}

impl Mesh for Plane {
    fn bounding_box(&self) -> Aabb {
        let corners = [
            self.center + self.half_u + self.half_v,
            self.center + self.half_u - self.half_v,
            self.center - self.half_u + self.half_v,
            self.center - self.half_u - self.half_v,
        ];
        let aabb = corners
            .iter()
            .fold(Aabb::new(corners[0], corners[0]), |acc, c| {
                acc.union(&Aabb::new(*c, *c))
            });
        // Flat boxes would reject grazing rays in the slab test.
        aabb.expanded(1e-4)
    }

    fn intersect(&self, ray: &Ray, t_min: f32, t_max: f32) -> Option<MeshHit> {
        let denom = self.normal.dot(ray.direction);
        if denom.abs() < 1e-8 {
            return None;
        }
        let t = (self.center - ray.origin).dot(self.normal) / denom;
        if t <= t_min || t >= t_max {
            return None;
        }

        let local = ray.at(t) - self.center;
        let s = local.dot(self.half_u) / self.half_u.length_squared();
        let r = local.dot(self.half_v) / self.half_v.length_squared();
        if s.abs() > 1.0 || r.abs() > 1.0 {
            return None;
        }

        Some(MeshHit {
            t,
            normal: self.normal,
            tangent: self.half_u.normalize(),
            uv: Vec2::new((s + 1.0) * 0.5, (r + 1.0) * 0.5),
        })
    }

    fn analytic_shape(&self) -> Option<AnalyticShape> {
        Some(AnalyticShape::Quad {
            center: self.center,
            u: self.half_u,
            v: self.half_v,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_plane_faces_up() {
        let plane = create_plane(PlaneOptions::default());
        assert!((plane.normal() - Vec3::Y).length() < 1e-6);
    }

    #[test]
    fn rejects_hits_outside_extent() {
        let plane = create_plane(PlaneOptions::default());
        let inside = Ray::new(Vec3::new(1.0, 2.0, 1.0), Vec3::NEG_Y);
        let outside = Ray::new(Vec3::new(8.0, 2.0, 0.0), Vec3::NEG_Y);
        assert!(plane.intersect(&inside, 0.0, f32::MAX).is_some());
        assert!(plane.intersect(&outside, 0.0, f32::MAX).is_none());
    }
}
