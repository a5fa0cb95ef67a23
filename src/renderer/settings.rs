//! Renderer Settings
//!
//! Two layers of configuration:
//!
//! - [`RendererConfig`]: structural parameters (output extent, pool capacity,
//!   recursion ceiling). Validated once by [`Renderer::new`](super::Renderer::new)
//!   and [`Renderer::resize`](super::Renderer::resize); never re-checked per frame.
//! - [`FrameSettings`]: the per-frame knob snapshot passed into
//!   [`Renderer::render`](super::Renderer::render). Immutable for the duration of
//!   the frame and threaded explicitly through every stage; nothing is cached
//!   across frames.
//!
//! # Example
//!
//! ```rust,ignore
//! use prism::prelude::*;
//!
//! let config = RendererConfig {
//!     width: 1280,
//!     height: 720,
//!     max_level_count: 6,
//!     ..Default::default()
//! };
//!
//! let settings = FrameSettings::from_json_str(r#"{
//!     "maxLevelCount": 2,
//!     "branches": "REFLECTION",
//!     "exposure": 1.5
//! }"#)?;
//! ```

use std::path::{Path, PathBuf};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::errors::{RenderError, Result};
use crate::renderer::core::TargetFormat;

// ---------------------------------------------------------------------------
// RendererConfig
// ---------------------------------------------------------------------------

/// Structural renderer configuration.
///
/// | Field                     | Description                                   | Default     |
/// |---------------------------|-----------------------------------------------|-------------|
/// | `width` / `height`        | Output extent in pixels                       | 640 × 360   |
/// | `max_render_target_count` | Pool capacity, in per-level target sets       | 10          |
/// | `max_level_count`         | Deepest recursion any frame may request       | 4           |
/// | `radiance_mip_levels`     | Length of the roughness blur mip chain        | 5           |
/// | `shader_root`             | Directory holding `<PassName>/` kernel folders | `shaders`  |
#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    pub width: u32,
    pub height: u32,
    /// Number of level target sets the pool may hold at once. The root level
    /// plus one set per nested level along the deepest branch must fit.
    pub max_render_target_count: usize,
    pub max_level_count: u32,
    pub radiance_mip_levels: u32,
    /// Only consulted by backends that compile kernels from source.
    pub shader_root: PathBuf,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 360,
            max_render_target_count: 10,
            max_level_count: 4,
            radiance_mip_levels: 5,
            shader_root: PathBuf::from("shaders"),
        }
    }
}

impl RendererConfig {
    /// Checks every structural invariant the recursion relies on.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(RenderError::InvalidConfig(format!(
                "output extent must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if self.max_render_target_count == 0 {
            return Err(RenderError::InvalidConfig(
                "max_render_target_count must be at least 1".into(),
            ));
        }
        let required = self.max_level_count as usize + 1;
        if required > self.max_render_target_count {
            return Err(RenderError::DepthExceedsCapacity {
                requested: self.max_level_count,
                supported: self.supported_level_count(),
            });
        }
        let max_mips = self.width.max(self.height).ilog2() + 1;
        if self.radiance_mip_levels == 0 || self.radiance_mip_levels > max_mips {
            return Err(RenderError::InvalidConfig(format!(
                "radiance_mip_levels must be within 1..={max_mips} for {}x{}, got {}",
                self.width, self.height, self.radiance_mip_levels
            )));
        }
        Ok(())
    }

    /// Deepest recursion the configured pool can hold.
    #[inline]
    #[must_use]
    pub fn supported_level_count(&self) -> u32 {
        u32::try_from(self.max_render_target_count.saturating_sub(1)).unwrap_or(u32::MAX)
    }
}

// ---------------------------------------------------------------------------
// Frame knobs
// ---------------------------------------------------------------------------

bitflags! {
    /// Secondary branches the recursion may spawn.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Branches: u8 {
        const REFLECTION = 1 << 0;
        const REFRACTION = 1 << 1;
    }
}

impl Default for Branches {
    fn default() -> Self {
        Self::all()
    }
}

/// Which child of a level is walked first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TraversalOrder {
    #[default]
    ReflectionFirst,
    RefractionFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ToneMappingMode {
    /// No curve, clamp only
    Linear,
    /// Reinhard operator (classic, soft highlights)
    Reinhard,
    /// ACES Filmic (industry standard)
    #[default]
    ACESFilmic,
}

impl ToneMappingMode {
    #[must_use]
    pub fn as_u32(self) -> u32 {
        match self {
            Self::Linear => 0,
            Self::Reinhard => 1,
            Self::ACESFilmic => 2,
        }
    }

    /// Inverse of [`as_u32`](Self::as_u32); unknown codes fall back to ACES.
    #[must_use]
    pub fn from_u32(code: u32) -> Self {
        match code {
            0 => Self::Linear,
            1 => Self::Reinhard,
            _ => Self::ACESFilmic,
        }
    }
}

/// Shadow blur flavor.
///
/// Both produce the same result on regions of uniform geometry; they differ
/// at position/normal discontinuities, where the single pass gates on the
/// full 2-D neighborhood and the separable path gates each axis on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BlurMode {
    #[default]
    Separable,
    SinglePass,
}

/// Image exported through [`FrameOutput::view`](super::FrameOutput).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ActiveView {
    /// Tone-mapped composite (byte4)
    #[default]
    ToneMapped,
    /// Linear composite before tone mapping (float4)
    Hdr,
    /// First light's primary-level shadow mask (byte)
    PrimaryShadow,
    /// Primary hit distance (float)
    PrimaryHitDistance,
    /// Primary contribution and roughness (float2)
    PrimaryContribution,
    /// Primary albedo and opacity (float4)
    PrimaryAlbedo,
}

impl ActiveView {
    #[must_use]
    pub fn format(self) -> TargetFormat {
        match self {
            Self::ToneMapped => TargetFormat::Rgba8Unorm,
            Self::Hdr | Self::PrimaryAlbedo => TargetFormat::Rgba32Float,
            Self::PrimaryShadow => TargetFormat::R8Unorm,
            Self::PrimaryHitDistance => TargetFormat::R32Float,
            Self::PrimaryContribution => TargetFormat::Rg32Float,
        }
    }

    #[must_use]
    pub fn as_u32(self) -> u32 {
        match self {
            Self::ToneMapped => 0,
            Self::Hdr => 1,
            Self::PrimaryShadow => 2,
            Self::PrimaryHitDistance => 3,
            Self::PrimaryContribution => 4,
            Self::PrimaryAlbedo => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ShadowBlurSettings {
    pub enabled: bool,
    pub mode: BlurMode,
    /// Kernel half-width in pixels.
    pub radius: u32,
}

impl Default for ShadowBlurSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: BlurMode::Separable,
            radius: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ShadowSettings {
    pub enabled: bool,
    /// Deepest level whose lights are shadow-traced. Deeper levels shade unshadowed.
    pub max_level: u32,
    pub blur: ShadowBlurSettings,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_level: 1,
            blur: ShadowBlurSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReflectionBlurSettings {
    pub enabled: bool,
    /// Half-width of the hit-distance averaging window, in pixels.
    pub search_radius: u32,
    /// Upper bound of the per-pixel blur radius, in pixels.
    pub max_radius: f32,
}

impl Default for ReflectionBlurSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            search_radius: 2,
            max_radius: 16.0,
        }
    }
}

// ---------------------------------------------------------------------------
// FrameSettings
// ---------------------------------------------------------------------------

/// Per-frame knob snapshot.
///
/// Deserializes from camelCase JSON; every field is optional and falls back
/// to [`FrameSettings::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FrameSettings {
    // === Recursion ===
    /// Nested secondary levels per branch. `0` renders primary visibility only.
    pub max_level_count: u32,
    pub branches: Branches,
    pub traversal: TraversalOrder,
    /// A level whose largest contribution weight falls below this spawns no
    /// children. Only honored by backends that support read-back; `0` disables.
    pub contribution_epsilon: f32,

    // === Ray generation ===
    /// Offset along the surface normal applied to secondary ray origins.
    pub ray_bias: f32,
    /// Scales the roughness-driven direction jitter of reflection rays.
    pub roughness_jitter: f32,
    /// Medium the camera sits in.
    pub ambient_refractive_index: f32,
    /// Alpha-tested surfaces with opacity below this are passed through.
    pub alpha_cutoff: f32,

    // === Shading ===
    pub background: [f32; 3],
    pub ambient: [f32; 3],
    pub shadows: ShadowSettings,

    // === Denoise / combine ===
    /// World-space distance under which two samples count as the same surface.
    pub position_threshold: f32,
    /// Minimum normal cosine for two samples to count as the same surface.
    pub normal_threshold: f32,
    pub roughness_blur_multiplier: f32,
    pub reflection_blur: ReflectionBlurSettings,

    // === Output ===
    pub exposure: f32,
    pub tone_mapping: ToneMappingMode,
    pub active_view: ActiveView,
}

impl Default for FrameSettings {
    fn default() -> Self {
        Self {
            max_level_count: 2,
            branches: Branches::all(),
            traversal: TraversalOrder::ReflectionFirst,
            contribution_epsilon: 1e-4,
            ray_bias: 1e-3,
            roughness_jitter: 1.0,
            ambient_refractive_index: 1.0,
            alpha_cutoff: 0.5,
            background: [0.05, 0.07, 0.1],
            ambient: [0.03, 0.03, 0.03],
            shadows: ShadowSettings::default(),
            position_threshold: 0.1,
            normal_threshold: 0.9,
            roughness_blur_multiplier: 1.0,
            reflection_blur: ReflectionBlurSettings::default(),
            exposure: 1.0,
            tone_mapping: ToneMappingMode::default(),
            active_view: ActiveView::default(),
        }
    }
}

impl FrameSettings {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Rejects values no stage can work with.
    pub fn validate(&self) -> Result<()> {
        let finite = [
            ("contributionEpsilon", self.contribution_epsilon),
            ("rayBias", self.ray_bias),
            ("roughnessJitter", self.roughness_jitter),
            ("ambientRefractiveIndex", self.ambient_refractive_index),
            ("alphaCutoff", self.alpha_cutoff),
            ("positionThreshold", self.position_threshold),
            ("normalThreshold", self.normal_threshold),
            ("roughnessBlurMultiplier", self.roughness_blur_multiplier),
            ("exposure", self.exposure),
        ];
        if let Some((name, value)) = finite.iter().find(|(_, v)| !v.is_finite()) {
            return Err(RenderError::InvalidConfig(format!("{name} must be finite, got {value}")));
        }
        if self.ambient_refractive_index <= 0.0 {
            return Err(RenderError::InvalidConfig(format!(
                "ambientRefractiveIndex must be positive, got {}",
                self.ambient_refractive_index
            )));
        }
        if self.exposure < 0.0 || self.ray_bias < 0.0 || self.position_threshold < 0.0 {
            return Err(RenderError::InvalidConfig(
                "exposure, rayBias and positionThreshold must not be negative".into(),
            ));
        }
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn traces_reflections(&self) -> bool {
        self.branches.contains(Branches::REFLECTION)
    }

    #[inline]
    #[must_use]
    pub fn traces_refractions(&self) -> bool {
        self.branches.contains(Branches::REFRACTION)
    }

    /// Background radiance as a uniform row.
    #[must_use]
    pub fn background_color(&self) -> [f32; 4] {
        let [r, g, b] = self.background;
        [r, g, b, 1.0]
    }

    /// Ambient irradiance as a uniform row.
    #[must_use]
    pub fn ambient_color(&self) -> [f32; 4] {
        let [r, g, b] = self.ambient;
        [r, g, b, 0.0]
    }

    /// Whether lights at `depth` are shadow-traced.
    #[inline]
    #[must_use]
    pub fn shadows_at(&self, depth: u32) -> bool {
        self.shadows.enabled && depth <= self.shadows.max_level
    }
}
