//! Pass Uniform Blocks
//!
//! One `#[repr(C)]` block per pass family, laid out for WGSL uniform rules
//! (16-byte rows, no implicit padding). [`PassParams`] is the tagged union a
//! [`PassDesc`](super::PassDesc) carries; backends that trace on the CPU also
//! get the borrowed actor/light the block was built from.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::resources::AnalyticShape;
use crate::scene::{Actor, Camera, Light, LightKind};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CameraUniforms {
    pub position: [f32; 4],
    pub forward: [f32; 4],
    pub right: [f32; 4],
    pub up: [f32; 4],
    /// width, height, tan(fov / 2), aspect
    pub viewport: [f32; 4],
}

impl CameraUniforms {
    #[must_use]
    pub fn new(camera: &Camera, width: u32, height: u32) -> Self {
        let (w, h) = (width as f32, height as f32);
        Self {
            position: camera.position().extend(1.0).to_array(),
            forward: camera.direction().extend(0.0).to_array(),
            right: camera.right().extend(0.0).to_array(),
            up: camera.up().extend(0.0).to_array(),
            viewport: [w, h, (camera.field_of_view() * 0.5).tan(), w / h],
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SecondaryRayUniforms {
    pub ray_bias: f32,
    pub roughness_jitter: f32,
    pub ambient_index: f32,
    pub seed: u32,
}

/// Shape and material constants of one actor.
///
/// `shape_kind`: 0 = CPU-only mesh, 1 = sphere (`shape_a` = center, `.w` =
/// radius), 2 = quad (`a` = center, `b`/`c` = half extents), 3 = box (`a` =
/// min, `b` = max).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TraceUniforms {
    pub t_min: f32,
    pub alpha_cutoff: f32,
    pub shape_kind: u32,
    pub alpha_tested: u32,
    pub shape_a: [f32; 4],
    pub shape_b: [f32; 4],
    pub shape_c: [f32; 4],
    pub bounds_min: [f32; 4],
    pub bounds_max: [f32; 4],
    pub albedo_opacity: [f32; 4],
    pub emissive_metalness: [f32; 4],
    /// roughness, refractive index, unused, unused
    pub roughness_index: [f32; 4],
}

impl TraceUniforms {
    #[must_use]
    pub fn for_actor(actor: &Actor, t_min: f32, alpha_cutoff: f32) -> Self {
        let (shape_kind, shape_a, shape_b, shape_c) = match actor.mesh().analytic_shape() {
            None => (0, [0.0; 4], [0.0; 4], [0.0; 4]),
            Some(AnalyticShape::Sphere { center, radius }) => {
                (1, center.extend(radius).to_array(), [0.0; 4], [0.0; 4])
            }
            Some(AnalyticShape::Quad { center, u, v }) => (
                2,
                center.extend(1.0).to_array(),
                u.extend(0.0).to_array(),
                v.extend(0.0).to_array(),
            ),
            Some(AnalyticShape::Box { min, max }) => {
                (3, min.extend(1.0).to_array(), max.extend(1.0).to_array(), [0.0; 4])
            }
        };
        let material = actor.material();
        let bounds = actor.bounding_box();
        Self {
            t_min,
            alpha_cutoff,
            shape_kind,
            alpha_tested: u32::from(material.alpha_tested),
            shape_a,
            shape_b,
            shape_c,
            bounds_min: bounds.min.extend(0.0).to_array(),
            bounds_max: bounds.max.extend(0.0).to_array(),
            albedo_opacity: material.albedo.multiplier.to_array(),
            emissive_metalness: material
                .emissive
                .multiplier
                .truncate()
                .extend(material.metalness.multiplier.x)
                .to_array(),
            roughness_index: [
                material.roughness.multiplier.x,
                material.refractive_index.multiplier.x,
                0.0,
                0.0,
            ],
        }
    }
}

/// Ambient medium, shared by the contribution kernels.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MediumUniforms {
    pub ambient_index: f32,
    pub _pad: [f32; 3],
}

impl MediumUniforms {
    #[must_use]
    pub fn new(ambient_index: f32) -> Self {
        Self {
            ambient_index,
            _pad: [0.0; 3],
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ShadingUniforms {
    pub background: [f32; 4],
    pub ambient: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightUniforms {
    /// xyz = direction of travel (w = 0) or position (w = 1)
    pub vector: [f32; 4],
    /// rgb = color, a = intensity
    pub color_intensity: [f32; 4],
    /// x = range (0 = unbounded)
    pub params: [f32; 4],
}

impl LightUniforms {
    #[must_use]
    pub fn new(light: &Light) -> Self {
        let (vector, range) = match light.kind {
            LightKind::Directional(d) => (d.direction.extend(0.0), 0.0),
            LightKind::Point(p) => (p.position.extend(1.0), p.range),
        };
        Self {
            vector: vector.to_array(),
            color_intensity: light.color.extend(light.intensity).to_array(),
            params: [range, 0.0, 0.0, 0.0],
        }
    }

    #[must_use]
    pub fn color(&self) -> Vec3 {
        Vec3::new(
            self.color_intensity[0],
            self.color_intensity[1],
            self.color_intensity[2],
        ) * self.color_intensity[3]
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ShadowUniforms {
    pub light: LightUniforms,
    pub occluder: TraceUniforms,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct BlurUniforms {
    pub radius: u32,
    pub sigma: f32,
    pub position_threshold: f32,
    pub normal_threshold: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct HitDistanceUniforms {
    pub search_radius: u32,
    pub max_radius: f32,
    pub roughness_multiplier: f32,
    /// Pixels per world unit at distance 1: height / (2 tan(fov / 2)).
    pub pixel_scale: f32,
    pub position_threshold: f32,
    pub normal_threshold: f32,
    pub _pad: [f32; 2],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MipUniforms {
    /// Level being read; the pass writes `source_level + 1`.
    pub source_level: u32,
    pub _pad: [u32; 3],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CombineUniforms {
    pub position_threshold: f32,
    pub normal_threshold: f32,
    pub mip_count: u32,
    pub blur_enabled: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ToneMapUniforms {
    pub exposure: f32,
    pub mode: u32,
    pub _pad: [u32; 2],
}

/// Channel routing of a debug-view copy: output channel `i` takes source
/// channel `swizzle[i]`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct CopyUniforms {
    pub swizzle: [u32; 4],
}

impl CopyUniforms {
    pub const IDENTITY: Self = Self {
        swizzle: [0, 1, 2, 3],
    };
}

/// Constant-parameter block of one dispatch.
#[derive(Debug, Clone, Copy)]
pub enum PassParams<'a> {
    None,
    Camera(CameraUniforms),
    SecondaryRays(SecondaryRayUniforms),
    Trace {
        uniforms: TraceUniforms,
        actor: &'a Actor,
    },
    Medium(MediumUniforms),
    Shading(ShadingUniforms),
    Shadow {
        uniforms: ShadowUniforms,
        light: &'a Light,
        occluder: &'a Actor,
    },
    Light {
        uniforms: LightUniforms,
        light: &'a Light,
    },
    Blur(BlurUniforms),
    HitDistance(HitDistanceUniforms),
    Mip(MipUniforms),
    Combine(CombineUniforms),
    ToneMap(ToneMapUniforms),
    Copy(CopyUniforms),
}

impl PassParams<'_> {
    /// Raw uniform bytes; empty for parameterless passes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        match self {
            Self::None => &[],
            Self::Camera(u) => bytemuck::bytes_of(u),
            Self::SecondaryRays(u) => bytemuck::bytes_of(u),
            Self::Trace { uniforms, .. } => bytemuck::bytes_of(uniforms),
            Self::Medium(u) => bytemuck::bytes_of(u),
            Self::Shading(u) => bytemuck::bytes_of(u),
            Self::Shadow { uniforms, .. } => bytemuck::bytes_of(uniforms),
            Self::Light { uniforms, .. } => bytemuck::bytes_of(uniforms),
            Self::Blur(u) => bytemuck::bytes_of(u),
            Self::HitDistance(u) => bytemuck::bytes_of(u),
            Self::Mip(u) => bytemuck::bytes_of(u),
            Self::Combine(u) => bytemuck::bytes_of(u),
            Self::ToneMap(u) => bytemuck::bytes_of(u),
            Self::Copy(u) => bytemuck::bytes_of(u),
        }
    }
}
