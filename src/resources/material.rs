//! Surface Materials
//!
//! A [`Material`] is a set of [`TextureSlot`]s, each an optional texture scaled
//! by a color multiplier. Sampling a material at a [`MeshHit`] yields the
//! [`SurfaceSample`] the tracer writes into the hit-record buffers.
//!
//! | Slot | Channels used | Meaning |
//! |------|---------------|---------|
//! | `albedo` | rgb + a | base color, a = opacity (1 opaque, 0 fully transmissive) |
//! | `normal` | rgb | tangent-space normal map |
//! | `metalness` | r | 0 dielectric, 1 metal |
//! | `roughness` | r | 0 mirror, 1 fully rough |
//! | `refractive_index` | r | index of refraction, 0 = surface does not transmit |
//! | `emissive` | rgb | emitted radiance |

use std::sync::Arc;

use glam::{Vec3, Vec4, Vec4Swizzles};

use super::mesh::MeshHit;
use super::texture::Texture;

/// Optional texture times a constant multiplier.
#[derive(Debug, Clone)]
pub struct TextureSlot {
    pub texture: Option<Arc<Texture>>,
    pub multiplier: Vec4,
}

impl TextureSlot {
    #[must_use]
    pub fn constant(value: Vec4) -> Self {
        Self {
            texture: None,
            multiplier: value,
        }
    }

    #[must_use]
    pub fn scalar(value: f32) -> Self {
        Self::constant(Vec4::splat(value))
    }

    #[must_use]
    pub fn textured(texture: Arc<Texture>, multiplier: Vec4) -> Self {
        Self {
            texture: Some(texture),
            multiplier,
        }
    }

    #[inline]
    #[must_use]
    pub fn sample(&self, uv: glam::Vec2) -> Vec4 {
        match &self.texture {
            Some(texture) => texture.sample(uv) * self.multiplier,
            None => self.multiplier,
        }
    }
}

/// Per-hit material attributes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSample {
    pub albedo: Vec3,
    pub opacity: f32,
    /// Shading normal (normal map applied), outward facing.
    pub normal: Vec3,
    pub metalness: f32,
    pub roughness: f32,
    pub refractive_index: f32,
    pub emissive: Vec3,
}

#[derive(Debug, Clone)]
pub struct Material {
    pub albedo: TextureSlot,
    pub normal: Option<Arc<Texture>>,
    pub metalness: TextureSlot,
    pub roughness: TextureSlot,
    pub refractive_index: TextureSlot,
    pub emissive: TextureSlot,
    /// Hits whose opacity falls below the frame's alpha cutoff are skipped.
    pub alpha_tested: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            albedo: TextureSlot::constant(Vec4::new(0.8, 0.8, 0.8, 1.0)),
            normal: None,
            metalness: TextureSlot::scalar(0.0),
            roughness: TextureSlot::scalar(1.0),
            refractive_index: TextureSlot::scalar(0.0),
            emissive: TextureSlot::scalar(0.0),
            alpha_tested: false,
        }
    }
}

impl Material {
    /// Opaque rough dielectric.
    #[must_use]
    pub fn diffuse(color: Vec3) -> Self {
        Self {
            albedo: TextureSlot::constant(color.extend(1.0)),
            ..Default::default()
        }
    }

    /// Polished metal.
    #[must_use]
    pub fn mirror(color: Vec3) -> Self {
        Self {
            albedo: TextureSlot::constant(color.extend(1.0)),
            metalness: TextureSlot::scalar(1.0),
            roughness: TextureSlot::scalar(0.0),
            ..Default::default()
        }
    }

    /// Clear, fully transmissive dielectric.
    #[must_use]
    pub fn glass(refractive_index: f32) -> Self {
        Self {
            albedo: TextureSlot::constant(Vec4::new(1.0, 1.0, 1.0, 0.0)),
            roughness: TextureSlot::scalar(0.0),
            refractive_index: TextureSlot::scalar(refractive_index),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_roughness(mut self, roughness: f32) -> Self {
        self.roughness = TextureSlot::scalar(roughness);
        self
    }

    #[must_use]
    pub fn with_metalness(mut self, metalness: f32) -> Self {
        self.metalness = TextureSlot::scalar(metalness);
        self
    }

    #[must_use]
    pub fn with_emissive(mut self, emissive: Vec3) -> Self {
        self.emissive = TextureSlot::constant(emissive.extend(0.0));
        self
    }

    #[must_use]
    pub fn with_albedo_texture(mut self, texture: Arc<Texture>) -> Self {
        self.albedo.texture = Some(texture);
        self
    }

    #[must_use]
    pub fn with_alpha_test(mut self) -> Self {
        self.alpha_tested = true;
        self
    }

    /// Opacity only; used by alpha-tested traversal before committing a hit.
    #[must_use]
    pub fn opacity(&self, uv: glam::Vec2) -> f32 {
        self.albedo.sample(uv).w
    }

    #[must_use]
    pub fn sample(&self, hit: &MeshHit) -> SurfaceSample {
        let albedo = self.albedo.sample(hit.uv);

        let normal = match &self.normal {
            Some(map) => {
                let t = map.sample(hit.uv).xyz() * 2.0 - Vec3::ONE;
                let bitangent = hit.normal.cross(hit.tangent);
                (hit.tangent * t.x + bitangent * t.y + hit.normal * t.z).normalize_or(hit.normal)
            }
            None => hit.normal,
        };

        SurfaceSample {
            albedo: albedo.xyz(),
            opacity: albedo.w.clamp(0.0, 1.0),
            normal,
            metalness: self.metalness.sample(hit.uv).x.clamp(0.0, 1.0),
            roughness: self.roughness.sample(hit.uv).x.clamp(0.0, 1.0),
            refractive_index: self.refractive_index.sample(hit.uv).x.max(0.0),
            emissive: self.emissive.sample(hit.uv).xyz(),
        }
    }
}
