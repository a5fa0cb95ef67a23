//! Frame Targets & Context
//!
//! [`FrameTargets`] owns every target that outlives a single level: the HDR
//! composite, the tone-mapped image, the debug-view exports and the shading
//! scratch reused by every level in turn. They are created once per extent
//! and never pooled.
//!
//! [`FrameContext`] is the immutable per-frame snapshot every stage receives:
//! scene inputs, settings, extent and the frame targets.

use rustc_hash::FxHashMap;

use crate::errors::Result;
use crate::renderer::core::{GpuDispatch, TargetDesc, TargetFormat, TargetId};
use crate::renderer::settings::{FrameSettings, RendererConfig};
use crate::scene::{Actor, Camera, Light};

/// Scratch written and consumed within one level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadingTargets {
    /// Level radiance, with the roughness blur mip chain.
    pub radiance: TargetId,
    pub mip_levels: u32,
    pub shadow: TargetId,
    /// Intermediate of the separable blur, output of the single-pass one.
    pub shadow_pingpong: TargetId,
    pub blur_radius: TargetId,
}

#[derive(Debug)]
pub struct FrameTargets {
    pub width: u32,
    pub height: u32,
    pub hdr: TargetId,
    pub tone_mapped: TargetId,
    pub shading: ShadingTargets,
    views: FxHashMap<TargetFormat, TargetId>,
}

impl FrameTargets {
    pub fn create<D: GpuDispatch + ?Sized>(dispatch: &mut D, config: &RendererConfig) -> Result<Self> {
        let (w, h) = (config.width, config.height);
        let mut create = |label, format| dispatch.create_target(&TargetDesc::new(label, format, w, h));

        let hdr = create("frame.hdr", TargetFormat::Rgba32Float)?;
        let tone_mapped = create("frame.tone_mapped", TargetFormat::Rgba8Unorm)?;
        let shadow = create("shading.shadow", TargetFormat::R8Unorm)?;
        let shadow_pingpong = create("shading.shadow_pingpong", TargetFormat::R8Unorm)?;
        let blur_radius = create("shading.blur_radius", TargetFormat::R32Float)?;
        let radiance = dispatch.create_target(
            &TargetDesc::new("shading.radiance", TargetFormat::Rgba32Float, w, h)
                .with_mips(config.radiance_mip_levels),
        )?;

        Ok(Self {
            width: w,
            height: h,
            hdr,
            tone_mapped,
            shading: ShadingTargets {
                radiance,
                mip_levels: config.radiance_mip_levels,
                shadow,
                shadow_pingpong,
                blur_radius,
            },
            views: FxHashMap::default(),
        })
    }

    /// Debug-view export target of `format`, created on first use.
    pub fn view_target<D: GpuDispatch + ?Sized>(
        &mut self,
        dispatch: &mut D,
        format: TargetFormat,
    ) -> Result<TargetId> {
        if let Some(id) = self.views.get(&format) {
            return Ok(*id);
        }
        let id = dispatch.create_target(&TargetDesc::new(
            "frame.debug_view",
            format,
            self.width,
            self.height,
        ))?;
        log::debug!("Created {format:?} debug view target");
        self.views.insert(format, id);
        Ok(id)
    }

    pub fn release<D: GpuDispatch + ?Sized>(self, dispatch: &mut D) {
        let shading = self.shading;
        for id in [
            self.hdr,
            self.tone_mapped,
            shading.radiance,
            shading.shadow,
            shading.shadow_pingpong,
            shading.blur_radius,
        ]
        .into_iter()
        .chain(self.views.into_values())
        {
            dispatch.release_target(id);
        }
    }
}

/// Everything a stage reads besides its level views.
#[derive(Debug, Clone, Copy)]
pub struct FrameContext<'a> {
    pub camera: &'a Camera,
    pub actors: &'a [Actor],
    pub lights: &'a [Light],
    pub settings: &'a FrameSettings,
    pub width: u32,
    pub height: u32,
    pub hdr: TargetId,
    pub shading: ShadingTargets,
}

impl<'a> FrameContext<'a> {
    #[must_use]
    pub fn new(
        camera: &'a Camera,
        actors: &'a [Actor],
        lights: &'a [Light],
        settings: &'a FrameSettings,
        targets: &FrameTargets,
    ) -> Self {
        Self {
            camera,
            actors,
            lights,
            settings,
            width: targets.width,
            height: targets.height,
            hdr: targets.hdr,
            shading: targets.shading,
        }
    }

    /// Pixels per world unit at unit distance from the camera.
    #[must_use]
    pub fn pixel_scale(&self) -> f32 {
        self.height as f32 / (2.0 * (self.camera.field_of_view() * 0.5).tan())
    }
}
