//! Compute Kernels
//!
//! The closed set of kernels the compositor dispatches. Every pass is one
//! [`Kernel`] variant plus a uniform block; there is no per-kernel type
//! hierarchy. Backends compile each kernel exactly once, tracked by a
//! [`KernelRegistry`].
//!
//! | Group | Kernels | Tile |
//! |-------|---------|------|
//! | Ray generation | `GeneratePrimaryRays`, `GenerateReflectionRays`, `GenerateRefractionRays` | 32 / 16 |
//! | Tracing | `ClearHits`, `TraceActor` | 32 (primary) / 16 |
//! | Contribution | `SeedContribution`, `ComputeContribution` | 16 |
//! | Shading | `ShadeBase`, `ClearShadow`, `TraceShadow`, `ShadeLight` | 16 |
//! | Denoise | `BlurShadow`, `HitDistanceSearch`, `GenerateMip` | 16 |
//! | Compose | `Combine` | 16 |
//! | Output | `ToneMap`, `CopyView` | 8 |

use rustc_hash::FxHashSet;

use crate::errors::{RenderError, Result};

/// Which secondary branch a level belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BranchKind {
    Reflection,
    Refraction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LevelKind {
    Root,
    Branch(BranchKind),
}

/// Identifies the level a pass ran for. `ordinal` is the level's index in
/// frame traversal order (root = 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LevelTag {
    pub ordinal: u32,
    pub depth: u32,
    pub kind: LevelKind,
}

impl LevelTag {
    pub const ROOT: Self = Self {
        ordinal: 0,
        depth: 0,
        kind: LevelKind::Root,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraceVariant {
    /// Camera rays; no origin offset.
    Primary,
    /// Bounce rays; starts past the ray bias.
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlurPass {
    Horizontal,
    Vertical,
    SinglePass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CombineVariant {
    /// Level 1: the parent is the primary level.
    FirstLevel,
    /// Level 2 and deeper: also gates on the parent's hit position.
    Deeper,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kernel {
    GeneratePrimaryRays,
    GenerateReflectionRays,
    GenerateRefractionRays,
    ClearHits,
    TraceActor(TraceVariant),
    SeedContribution,
    ComputeContribution(BranchKind),
    ShadeBase,
    ClearShadow,
    TraceShadow,
    BlurShadow(BlurPass),
    ShadeLight,
    HitDistanceSearch,
    GenerateMip,
    Combine(CombineVariant),
    ToneMap,
    CopyView,
}

impl Kernel {
    pub const ALL: [Kernel; 22] = [
        Kernel::GeneratePrimaryRays,
        Kernel::GenerateReflectionRays,
        Kernel::GenerateRefractionRays,
        Kernel::ClearHits,
        Kernel::TraceActor(TraceVariant::Primary),
        Kernel::TraceActor(TraceVariant::Secondary),
        Kernel::SeedContribution,
        Kernel::ComputeContribution(BranchKind::Reflection),
        Kernel::ComputeContribution(BranchKind::Refraction),
        Kernel::ShadeBase,
        Kernel::ClearShadow,
        Kernel::TraceShadow,
        Kernel::BlurShadow(BlurPass::Horizontal),
        Kernel::BlurShadow(BlurPass::Vertical),
        Kernel::BlurShadow(BlurPass::SinglePass),
        Kernel::ShadeLight,
        Kernel::HitDistanceSearch,
        Kernel::GenerateMip,
        Kernel::Combine(CombineVariant::FirstLevel),
        Kernel::Combine(CombineVariant::Deeper),
        Kernel::ToneMap,
        Kernel::CopyView,
    ];

    /// Kernel entry name; also the file stem under the pass directory.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::GeneratePrimaryRays => "generate_primary_rays",
            Self::GenerateReflectionRays => "generate_reflection_rays",
            Self::GenerateRefractionRays => "generate_refraction_rays",
            Self::ClearHits => "clear_hits",
            Self::TraceActor(TraceVariant::Primary) => "trace_actor_primary",
            Self::TraceActor(TraceVariant::Secondary) => "trace_actor_secondary",
            Self::SeedContribution => "seed_contribution",
            Self::ComputeContribution(BranchKind::Reflection) => "reflection_contribution",
            Self::ComputeContribution(BranchKind::Refraction) => "refraction_contribution",
            Self::ShadeBase => "shade_base",
            Self::ClearShadow => "clear_shadow",
            Self::TraceShadow => "trace_shadow",
            Self::BlurShadow(BlurPass::Horizontal) => "blur_shadow_horizontal",
            Self::BlurShadow(BlurPass::Vertical) => "blur_shadow_vertical",
            Self::BlurShadow(BlurPass::SinglePass) => "blur_shadow_single_pass",
            Self::ShadeLight => "shade_light",
            Self::HitDistanceSearch => "hit_distance_search",
            Self::GenerateMip => "generate_mip",
            Self::Combine(CombineVariant::FirstLevel) => "combine_first_level",
            Self::Combine(CombineVariant::Deeper) => "combine_deeper",
            Self::ToneMap => "tone_map",
            Self::CopyView => "copy_view",
        }
    }

    /// Directory under the shader root holding this kernel's source.
    #[must_use]
    pub fn pass_name(self) -> &'static str {
        match self {
            Self::GeneratePrimaryRays
            | Self::GenerateReflectionRays
            | Self::GenerateRefractionRays => "RayGeneration",
            Self::ClearHits | Self::TraceActor(_) => "Trace",
            Self::SeedContribution | Self::ComputeContribution(_) => "Contribution",
            Self::ShadeBase | Self::ShadeLight => "Shading",
            Self::ClearShadow | Self::TraceShadow => "Shadow",
            Self::BlurShadow(_) => "ShadowBlur",
            Self::HitDistanceSearch => "HitDistanceSearch",
            Self::GenerateMip => "Mipmap",
            Self::Combine(_) => "Combine",
            Self::ToneMap => "ToneMapping",
            Self::CopyView => "CopyView",
        }
    }

    /// Edge length of the square thread group.
    #[must_use]
    pub fn tile_size(self) -> u32 {
        match self {
            Self::GeneratePrimaryRays | Self::TraceActor(TraceVariant::Primary) => 32,
            Self::ToneMap | Self::CopyView => 8,
            _ => 16,
        }
    }

    /// Read and read-write view counts the kernel consumes, in binding order.
    #[must_use]
    pub fn binding_counts(self) -> (usize, usize) {
        match self {
            Self::GeneratePrimaryRays => (0, 2),
            Self::GenerateReflectionRays => (4, 2),
            Self::GenerateRefractionRays => (6, 3),
            Self::ClearHits => (0, 5),
            Self::TraceActor(_) => (2, 5),
            Self::SeedContribution => (1, 2),
            Self::ComputeContribution(BranchKind::Reflection) => (8, 1),
            Self::ComputeContribution(BranchKind::Refraction) => (9, 1),
            Self::ShadeBase => (5, 1),
            Self::ClearShadow => (0, 1),
            Self::TraceShadow => (2, 1),
            Self::BlurShadow(_) => (3, 1),
            Self::ShadeLight => (6, 1),
            Self::HitDistanceSearch => (4, 1),
            Self::GenerateMip | Self::ToneMap | Self::CopyView => (1, 1),
            Self::Combine(CombineVariant::FirstLevel) => (5, 1),
            Self::Combine(CombineVariant::Deeper) => (6, 1),
        }
    }

    /// Thread groups needed to cover a `width × height` output.
    #[must_use]
    pub fn group_count(self, width: u32, height: u32) -> [u32; 3] {
        let tile = self.tile_size();
        [width.div_ceil(tile), height.div_ceil(tile), 1]
    }
}

/// Tracks which kernels a backend has compiled.
#[derive(Debug, Default)]
pub struct KernelRegistry {
    ready: FxHashSet<Kernel>,
}

impl KernelRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `kernel` compiled. Compiling a kernel twice is a precondition
    /// violation.
    pub fn register(&mut self, kernel: Kernel) -> Result<()> {
        if !self.ready.insert(kernel) {
            return Err(RenderError::KernelAlreadyInitialized(kernel.name()));
        }
        log::debug!("Kernel '{}' initialized", kernel.name());
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn is_ready(&self, kernel: Kernel) -> bool {
        self.ready.contains(&kernel)
    }

    pub fn ensure_ready(&self, kernel: Kernel) -> Result<()> {
        if self.is_ready(kernel) {
            Ok(())
        } else {
            Err(RenderError::KernelNotInitialized(kernel.name()))
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ready.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ready.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_names_are_unique() {
        let names: FxHashSet<_> = Kernel::ALL.iter().map(|k| k.name()).collect();
        assert_eq!(names.len(), Kernel::ALL.len());
    }

    #[test]
    fn tile_sizes_follow_pass_family() {
        assert_eq!(Kernel::GeneratePrimaryRays.tile_size(), 32);
        assert_eq!(Kernel::TraceActor(TraceVariant::Primary).tile_size(), 32);
        assert_eq!(Kernel::TraceActor(TraceVariant::Secondary).tile_size(), 16);
        assert_eq!(Kernel::ToneMap.tile_size(), 8);
        assert_eq!(Kernel::GenerateMip.group_count(33, 16), [3, 1, 1]);
    }

    #[test]
    fn no_kernel_binds_more_than_ten_views() {
        for kernel in Kernel::ALL {
            let (reads, writes) = kernel.binding_counts();
            assert!(writes >= 1, "{} writes nothing", kernel.name());
            assert!(reads + writes <= 10, "{} binds too many views", kernel.name());
        }
    }

    #[test]
    fn double_registration_is_rejected() {
        let mut registry = KernelRegistry::new();
        registry.register(Kernel::ClearHits).unwrap();
        assert!(matches!(
            registry.register(Kernel::ClearHits),
            Err(RenderError::KernelAlreadyInitialized("clear_hits"))
        ));
        assert!(registry.ensure_ready(Kernel::ToneMap).is_err());
    }
}
