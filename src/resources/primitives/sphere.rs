use glam::{Vec2, Vec3};
use std::f32::consts::PI;

use crate::resources::mesh::{Aabb, AnalyticShape, Mesh, MeshHit, Ray, any_tangent};

pub struct SphereOptions {
    pub center: Vec3,
    pub radius: f32,
}

impl Default for SphereOptions {
    fn default() -> Self {
        Self {
            center: Vec3::ZERO,
            radius: 1.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Sphere {
    center: Vec3,
    radius: f32,
}

pub fn create_sphere(options: SphereOptions) -> Sphere {
    Sphere {
        center: options.center,
        radius: options.radius.abs().max(f32::EPSILON),
    }
}

impl Mesh for Sphere {
    fn bounding_box(&self) -> Aabb {
        Aabb::new(
            self.center - Vec3::splat(self.radius),
            self.center + Vec3::splat(self.radius),
        )
    }

    fn intersect(&self, ray: &Ray, t_min: f32, t_max: f32) -> Option<MeshHit> {
        let oc = ray.origin - self.center;
        let b = oc.dot(ray.direction);
        let c = oc.length_squared() - self.radius * self.radius;
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }
        let sqrt_d = discriminant.sqrt();

        // Near root first; the far root covers rays starting inside the sphere.
        let t = [-b - sqrt_d, -b + sqrt_d]
            .into_iter()
            .find(|t| *t > t_min && *t < t_max)?;

        let normal = (ray.at(t) - self.center) / self.radius;

        // Latitude/longitude parameterization, Y-up
        let phi = normal.z.atan2(-normal.x);
        let theta = (-normal.y).clamp(-1.0, 1.0).acos();
        let uv = Vec2::new((phi + PI) / (2.0 * PI), 1.0 - theta / PI);

        let tangent = Vec3::new(-normal.z, 0.0, normal.x);
        let tangent = if tangent.length_squared() > 1e-8 {
            tangent.normalize()
        } else {
            any_tangent(normal)
        };

        Some(MeshHit {
            t,
            normal,
            tangent,
            uv,
        })
    }

    fn analytic_shape(&self) -> Option<AnalyticShape> {
        Some(AnalyticShape::Sphere {
            center: self.center,
            radius: self.radius,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hits_front_face_from_outside() {
        let sphere = create_sphere(SphereOptions::default());
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z);
        let hit = sphere.intersect(&ray, 0.0, f32::MAX).unwrap();
        assert!((hit.t - 4.0).abs() < 1e-5);
        assert!((hit.normal - Vec3::NEG_Z).length() < 1e-5);
    }

    #[test]
    fn hits_back_face_from_inside() {
        let sphere = create_sphere(SphereOptions::default());
        let ray = Ray::new(Vec3::ZERO, Vec3::Z);
        let hit = sphere.intersect(&ray, 1e-3, f32::MAX).unwrap();
        assert!((hit.t - 1.0).abs() < 1e-5);
        // Outward normal, same side as the ray direction.
        assert!(hit.normal.dot(ray.direction) > 0.0);
    }
}
