//! Intersectable Geometry
//!
//! The compositor never builds or walks acceleration structures itself. Meshes are
//! external collaborators exposing exactly two things: a precomputed world-space
//! bounding box and a closest-hit query. Whatever BVH a mesh uses stays inside it.
//!
//! Compute backends that cannot call back into Rust ask for an [`AnalyticShape`]
//! instead; meshes that cannot describe themselves that way are CPU-only.

use std::fmt::Debug;

use glam::{Vec2, Vec3};

/// A ray with a normalized direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    #[inline]
    #[must_use]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    #[inline]
    #[must_use]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    #[must_use]
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    #[must_use]
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    #[must_use]
    pub fn expanded(&self, margin: f32) -> Aabb {
        Aabb {
            min: self.min - Vec3::splat(margin),
            max: self.max + Vec3::splat(margin),
        }
    }

    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Slab test. Returns the parametric entry/exit interval clipped to
    /// `[t_min, t_max]`, or `None` when the ray misses the box in that range.
    #[must_use]
    pub fn intersect_ray(&self, ray: &Ray, t_min: f32, t_max: f32) -> Option<(f32, f32)> {
        let inv = ray.direction.recip();
        let t0 = (self.min - ray.origin) * inv;
        let t1 = (self.max - ray.origin) * inv;
        let near = t0.min(t1);
        let far = t0.max(t1);

        // NaN (0 * inf) lanes come out of min/max as the other operand, which
        // keeps axis-parallel rays inside a slab they start in.
        let enter = near.max_element().max(t_min);
        let exit = far.min_element().min(t_max);
        (enter <= exit).then_some((enter, exit))
    }
}

/// Closest-hit result reported by a mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshHit {
    /// Ray parameter of the hit.
    pub t: f32,
    /// Outward-facing geometric normal (normalized).
    pub normal: Vec3,
    /// Surface tangent along increasing `uv.x` (normalized).
    pub tangent: Vec3,
    /// Surface parameterization used for texture lookups.
    pub uv: Vec2,
}

/// Analytic shape description consumed by compute backends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnalyticShape {
    Sphere { center: Vec3, radius: f32 },
    /// Parallelogram spanned by `u` and `v` around `center` (half extents).
    Quad { center: Vec3, u: Vec3, v: Vec3 },
    Box { min: Vec3, max: Vec3 },
}

/// Intersectable geometry owned by an actor's model.
pub trait Mesh: Send + Sync + Debug {
    /// World-space bounds, precomputed by the mesh.
    fn bounding_box(&self) -> Aabb;

    /// Closest intersection with `t` in `(t_min, t_max)`.
    fn intersect(&self, ray: &Ray, t_min: f32, t_max: f32) -> Option<MeshHit>;

    /// Analytic description for backends that trace on the GPU.
    fn analytic_shape(&self) -> Option<AnalyticShape> {
        None
    }
}

/// Builds an orthonormal tangent for `normal` when a mesh has no natural one.
#[must_use]
pub fn any_tangent(normal: Vec3) -> Vec3 {
    let helper = if normal.y.abs() < 0.999 { Vec3::Y } else { Vec3::X };
    helper.cross(normal).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aabb_slab_hits_and_misses() {
        let aabb = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        let hit = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z);
        let miss = Ray::new(Vec3::new(3.0, 0.0, -5.0), Vec3::Z);

        let (enter, exit) = aabb.intersect_ray(&hit, 0.0, f32::MAX).unwrap();
        assert!((enter - 4.0).abs() < 1e-5);
        assert!((exit - 6.0).abs() < 1e-5);
        assert!(aabb.intersect_ray(&miss, 0.0, f32::MAX).is_none());
    }

    #[test]
    fn aabb_respects_t_max() {
        let aabb = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z);
        assert!(aabb.intersect_ray(&ray, 0.0, 3.0).is_none());
    }
}
