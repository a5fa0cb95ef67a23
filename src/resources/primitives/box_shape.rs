use glam::{Vec2, Vec3};

use crate::resources::mesh::{Aabb, AnalyticShape, Mesh, MeshHit, Ray};

#[derive(Debug, Clone)]
pub struct BoxShape {
    bounds: Aabb,
}

/// Axis-aligned box centered at `center` with full extents `size`.
pub fn create_box(center: Vec3, size: Vec3) -> BoxShape {
    let half = size.abs() * 0.5;
    BoxShape {
        bounds: Aabb::new(center - half, center + half),
    }
}

impl Mesh for BoxShape {
    fn bounding_box(&self) -> Aabb {
        self.bounds
    }

    fn intersect(&self, ray: &Ray, t_min: f32, t_max: f32) -> Option<MeshHit> {
        let (enter, exit) = self.bounds.intersect_ray(ray, f32::MIN, f32::MAX)?;
        let t = if enter > t_min && enter < t_max {
            enter
        } else if exit > t_min && exit < t_max {
            exit
        } else {
            return None;
        };

        let center = self.bounds.center();
        let half = (self.bounds.max - self.bounds.min) * 0.5;
        let local = (ray.at(t) - center) / half;
        let abs = local.abs();

        // Dominant axis picks the face.
        let (normal, tangent, uv) = if abs.x >= abs.y && abs.x >= abs.z {
            (
                Vec3::new(local.x.signum(), 0.0, 0.0),
                Vec3::Z,
                Vec2::new(local.z, local.y),
            )
        } else if abs.y >= abs.z {
            (
                Vec3::new(0.0, local.y.signum(), 0.0),
                Vec3::X,
                Vec2::new(local.x, local.z),
            )
        } else {
            (
                Vec3::new(0.0, 0.0, local.z.signum()),
                Vec3::X,
                Vec2::new(local.x, local.y),
            )
        };

        Some(MeshHit {
            t,
            normal,
            tangent,
            uv: (uv + Vec2::ONE) * 0.5,
        })
    }

    fn analytic_shape(&self) -> Option<AnalyticShape> {
        Some(AnalyticShape::Box {
            min: self.bounds.min,
            max: self.bounds.max,
        })
    }
}
