//! Level Target Sets
//!
//! Every recursion level owns one [`LevelTargets`] set for as long as it or
//! any of its descendants still needs it: its rays, its hit records, its
//! contribution term and, for transmissive levels, its refractive index
//! stack.
//!
//! | Target | Format | Contents |
//! |--------|--------|----------|
//! | `rays.origin` | Rgba32Float | xyz origin |
//! | `rays.direction` | Rgba32Float | xyz direction, zero = no ray |
//! | `hits.position_distance` | Rgba32Float | xyz position, w distance (`HIT_DISTANCE_MISS` = miss) |
//! | `hits.normal_roughness` | Rgba32Float | xyz shading normal, w roughness |
//! | `hits.albedo_opacity` | Rgba32Float | rgb albedo, a opacity |
//! | `hits.emissive_metalness` | Rgba32Float | rgb emissive, a metalness |
//! | `hits.refractive_index` | R32Float | index, 0 = opaque |
//! | `contribution` | Rg32Float | weight, accumulated roughness |
//! | `ior_stack` | Rgba32Float | previous, current, depth (transmissive layout only) |

use smallvec::SmallVec;

use crate::errors::Result;
use crate::renderer::core::{
    BranchKind, GpuDispatch, LevelKind, LevelTag, TargetDesc, TargetFormat, TargetId,
};

/// Which targets a set carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetLayout {
    /// Root and refraction levels: carries a refractive index stack.
    Transmissive,
    /// Reflection levels: no stack of their own.
    Reflective,
}

impl SetLayout {
    #[must_use]
    pub fn for_level(kind: LevelKind) -> Self {
        match kind {
            LevelKind::Root | LevelKind::Branch(BranchKind::Refraction) => Self::Transmissive,
            LevelKind::Branch(BranchKind::Reflection) => Self::Reflective,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RayTargets {
    pub origin: TargetId,
    pub direction: TargetId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitTargets {
    pub position_distance: TargetId,
    pub normal_roughness: TargetId,
    pub albedo_opacity: TargetId,
    pub emissive_metalness: TargetId,
    pub refractive_index: TargetId,
}

impl HitTargets {
    #[must_use]
    pub fn ids(&self) -> [TargetId; 5] {
        [
            self.position_distance,
            self.normal_roughness,
            self.albedo_opacity,
            self.emissive_metalness,
            self.refractive_index,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelTargets {
    pub layout: SetLayout,
    pub rays: RayTargets,
    pub hits: HitTargets,
    pub contribution: TargetId,
    pub ior_stack: Option<TargetId>,
}

impl LevelTargets {
    /// Allocates a full set. Partially created sets are released on failure.
    pub fn create<D: GpuDispatch + ?Sized>(
        dispatch: &mut D,
        layout: SetLayout,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let mut created: SmallVec<[TargetId; 10]> = SmallVec::new();
        let result = Self::create_inner(dispatch, layout, width, height, &mut created);
        if result.is_err() {
            for id in created {
                dispatch.release_target(id);
            }
        }
        result
    }

    fn create_inner<D: GpuDispatch + ?Sized>(
        dispatch: &mut D,
        layout: SetLayout,
        width: u32,
        height: u32,
        created: &mut SmallVec<[TargetId; 10]>,
    ) -> Result<Self> {
        let mut make = |label: &'static str, format: TargetFormat| -> Result<TargetId> {
            let id = dispatch.create_target(&TargetDesc::new(label, format, width, height))?;
            created.push(id);
            Ok(id)
        };

        let rays = RayTargets {
            origin: make("level.ray_origin", TargetFormat::Rgba32Float)?,
            direction: make("level.ray_direction", TargetFormat::Rgba32Float)?,
        };
        let hits = HitTargets {
            position_distance: make("level.hit_position_distance", TargetFormat::Rgba32Float)?,
            normal_roughness: make("level.hit_normal_roughness", TargetFormat::Rgba32Float)?,
            albedo_opacity: make("level.hit_albedo_opacity", TargetFormat::Rgba32Float)?,
            emissive_metalness: make("level.hit_emissive_metalness", TargetFormat::Rgba32Float)?,
            refractive_index: make("level.hit_refractive_index", TargetFormat::R32Float)?,
        };
        let contribution = make("level.contribution", TargetFormat::Rg32Float)?;
        let ior_stack = match layout {
            SetLayout::Transmissive => Some(make("level.ior_stack", TargetFormat::Rgba32Float)?),
            SetLayout::Reflective => None,
        };

        Ok(Self {
            layout,
            rays,
            hits,
            contribution,
            ior_stack,
        })
    }

    /// Every target in the set.
    #[must_use]
    pub fn ids(&self) -> SmallVec<[TargetId; 10]> {
        let mut ids: SmallVec<[TargetId; 10]> = SmallVec::new();
        ids.push(self.rays.origin);
        ids.push(self.rays.direction);
        ids.extend(self.hits.ids());
        ids.push(self.contribution);
        ids.extend(self.ior_stack);
        ids
    }

    pub fn release<D: GpuDispatch + ?Sized>(self, dispatch: &mut D) {
        for id in self.ids() {
            dispatch.release_target(id);
        }
    }
}

/// A level as the stages see it: its tag, its set and the refractive index
/// stack in effect for it.
///
/// Transmissive levels own their stack; reflective levels carry the nearest
/// transmissive ancestor's stack through unread, so a refraction child of a
/// reflection level continues from the right media.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelView {
    pub tag: LevelTag,
    pub targets: LevelTargets,
    pub stack: TargetId,
}

impl LevelView {
    /// `inherited` is used only when the set has no stack of its own.
    #[must_use]
    pub fn new(tag: LevelTag, targets: LevelTargets, inherited: TargetId) -> Self {
        Self {
            tag,
            targets,
            stack: targets.ior_stack.unwrap_or(inherited),
        }
    }

    /// The primary level. Root sets are always transmissive.
    #[must_use]
    pub fn root(targets: LevelTargets) -> Self {
        debug_assert_eq!(targets.layout, SetLayout::Transmissive);
        Self::new(LevelTag::ROOT, targets, targets.contribution)
    }

    #[inline]
    #[must_use]
    pub fn hits(&self) -> &HitTargets {
        &self.targets.hits
    }
}
