//! Renderer
//!
//! [`Renderer`] is the compositor's entry point. It owns a [`GpuDispatch`]
//! backend, the persistent frame targets and the render-target pool, and
//! turns one `(camera, actors, lights, settings)` snapshot into a frame:
//!
//! 1. validate the frame settings against the structural configuration
//! 2. walk the reflection/refraction level tree ([`graph::RecursionDriver`])
//! 3. tone map the HDR composite
//! 4. submit, age the pool
//!
//! Kernels are compiled once, in [`Renderer::new`]. Targets are recreated
//! only on [`Renderer::resize`].

pub mod core;
pub mod graph;
pub mod optics;
pub mod settings;
pub mod software;

#[cfg(feature = "gpu")]
pub mod gpu;

use crate::errors::{RenderError, Result};
use crate::scene::{Actor, Camera, Light};

use self::core::{GpuDispatch, Kernel, TargetFormat, TargetId};
use self::graph::passes::tone_mapping;
use self::graph::{FrameContext, FrameStats, FrameTargets, RecursionDriver, RenderTargetPool, ViewExport};
use self::settings::{ActiveView, FrameSettings, RendererConfig};

/// Free level sets unused for this many frames are destroyed.
const POOL_MAX_IDLE_FRAMES: u32 = 8;

/// Targets a rendered frame can be read back from.
#[derive(Debug, Clone, Copy)]
pub struct FrameOutput {
    /// Linear composite.
    pub hdr: TargetId,
    /// Display image, byte4.
    pub tone_mapped: TargetId,
    /// Image selected by [`FrameSettings::active_view`].
    pub view: TargetId,
    pub view_format: TargetFormat,
    pub stats: FrameStats,
}

pub struct Renderer<D: GpuDispatch> {
    dispatch: D,
    config: RendererConfig,
    pool: RenderTargetPool,
    targets: FrameTargets,
    frame_index: u64,
}

impl<D: GpuDispatch> Renderer<D> {
    /// Validates `config`, compiles every kernel and allocates the frame
    /// targets.
    pub fn new(mut dispatch: D, config: RendererConfig) -> Result<Self> {
        config.validate()?;
        for kernel in Kernel::ALL {
            dispatch.init_kernel(kernel)?;
        }
        let targets = FrameTargets::create(&mut dispatch, &config)?;
        log::info!(
            "Renderer initialized on '{}' backend: {}x{}, pool capacity {}, max depth {}",
            dispatch.backend_name(),
            config.width,
            config.height,
            config.max_render_target_count,
            config.max_level_count
        );

        Ok(Self {
            pool: RenderTargetPool::new(config.max_render_target_count),
            dispatch,
            config,
            targets,
            frame_index: 0,
        })
    }

    /// Renders one frame.
    ///
    /// Fails without touching the composite when `settings` is invalid or
    /// asks for more levels than the configuration supports. A failure
    /// during the level walk returns every pooled set before propagating.
    pub fn render(
        &mut self,
        camera: &Camera,
        actors: &[Actor],
        lights: &[Light],
        settings: &FrameSettings,
    ) -> Result<FrameOutput> {
        settings.validate()?;
        if settings.max_level_count > self.config.max_level_count {
            return Err(RenderError::DepthExceedsCapacity {
                requested: settings.max_level_count,
                supported: self.config.max_level_count,
            });
        }

        self.pool.begin_frame();
        let view = settings.active_view;
        let view_target = match view {
            ActiveView::ToneMapped => self.targets.tone_mapped,
            ActiveView::Hdr => self.targets.hdr,
            ActiveView::PrimaryShadow
            | ActiveView::PrimaryHitDistance
            | ActiveView::PrimaryContribution
            | ActiveView::PrimaryAlbedo => {
                self.targets.view_target(&mut self.dispatch, view.format())?
            }
        };
        let export = (!matches!(view, ActiveView::ToneMapped | ActiveView::Hdr)).then_some(ViewExport {
            view,
            target: view_target,
        });

        let ctx = FrameContext::new(camera, actors, lights, settings, &self.targets);
        let stats = match RecursionDriver::new(&mut self.dispatch, &mut self.pool, ctx).run(export) {
            Ok(stats) => stats,
            Err(err) => {
                log::error!("Frame {} failed: {err}", self.frame_index);
                self.pool.reclaim_all();
                return Err(err);
            }
        };

        tone_mapping::tone_map(&mut self.dispatch, &ctx, self.targets.tone_mapped)?;
        self.dispatch.submit()?;
        self.pool.trim(&mut self.dispatch, POOL_MAX_IDLE_FRAMES);

        log::trace!(
            "Frame {}: {} levels, deepest {}, peak {} sets",
            self.frame_index,
            stats.levels_rendered,
            stats.deepest_level,
            stats.peak_active_sets
        );
        self.frame_index += 1;

        Ok(FrameOutput {
            hdr: self.targets.hdr,
            tone_mapped: self.targets.tone_mapped,
            view: view_target,
            view_format: view.format(),
            stats,
        })
    }

    /// Reallocates every target for a new output extent. Zero extents are
    /// ignored.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        if (width, height) == (self.config.width, self.config.height) {
            return Ok(());
        }
        let config = RendererConfig {
            width,
            height,
            ..self.config.clone()
        };
        config.validate()?;

        self.pool.clear_free(&mut self.dispatch);
        let targets = FrameTargets::create(&mut self.dispatch, &config)?;
        std::mem::replace(&mut self.targets, targets).release(&mut self.dispatch);
        self.config = config;
        log::info!("Renderer resized to {width}x{height}");
        Ok(())
    }

    #[must_use]
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    #[must_use]
    pub fn pool(&self) -> &RenderTargetPool {
        &self.pool
    }

    #[must_use]
    pub fn dispatch(&self) -> &D {
        &self.dispatch
    }

    pub fn dispatch_mut(&mut self) -> &mut D {
        &mut self.dispatch
    }

    /// Frames rendered successfully so far.
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }
}
