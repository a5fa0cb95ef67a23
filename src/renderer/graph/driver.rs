//! Recursion Driver
//!
//! Walks the bounded reflection/refraction level tree for one frame.
//!
//! # Traversal
//!
//! The tree is walked depth-first with an explicit work stack, so at most one
//! root-to-leaf path of levels holds pooled target sets at any time:
//!
//! ```text
//!             root (depth 0)
//!            /              \
//!     reflection (1)     refraction (1)
//!       /      \            /      \
//!   refl (2)  refr (2)  refl (2)  refr (2)
//! ```
//!
//! With `max_level_count = N` at most `N + 1` sets are alive, which is what
//! [`RendererConfig::validate`](crate::renderer::settings::RendererConfig::validate)
//! checks against the pool capacity.
//!
//! # Per level
//!
//! 1. acquire a set from the pool
//! 2. generate rays from the parent's hits
//! 3. trace every actor
//! 4. compute the contribution term against the parent
//! 5. shade into the radiance scratch
//! 6. optionally build the radiance LOD chain and the blur radius
//! 7. combine into the HDR composite
//! 8. queue children, unless at the depth limit or early-out
//!
//! A level's set is returned once the level and every descendant are done,
//! since descendants read its hits and, for reflection levels, inherit its
//! stack view. The root set is returned last: every combine reads the
//! screen-space position and normal from it.

use crate::errors::Result;
use crate::renderer::core::{
    BranchKind, GpuDispatch, LevelKind, LevelTag, TargetId, TargetView, TraceVariant,
};
use crate::renderer::settings::{ActiveView, TraversalOrder};

use super::frame::FrameContext;
use super::level::{LevelView, SetLayout};
use super::passes::{blur, combine, contribution, mipmap, ray_gen, shading, tone_mapping, trace};
use super::target_pool::{RenderTargetPool, SetId};

/// Per-frame recursion counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Secondary levels rendered (the root is not counted).
    pub levels_rendered: u32,
    pub deepest_level: u32,
    /// Most pooled sets held at once.
    pub peak_active_sets: usize,
    /// Levels whose children were skipped because their weight was negligible.
    pub early_outs: u32,
}

/// Where the frame's active view is exported, if it is a primary buffer.
#[derive(Debug, Clone, Copy)]
pub struct ViewExport {
    pub view: ActiveView,
    pub target: TargetId,
}

/// A level waiting to be rendered.
#[derive(Debug, Clone, Copy)]
struct PendingLevel {
    parent: usize,
    kind: BranchKind,
    depth: u32,
}

#[derive(Debug, Clone, Copy)]
struct LevelRecord {
    view: LevelView,
    set: SetId,
    parent: Option<usize>,
    /// Children queued or running that still read this level.
    pending_children: u32,
}

pub struct RecursionDriver<'f, D: GpuDispatch + ?Sized> {
    dispatch: &'f mut D,
    pool: &'f mut RenderTargetPool,
    ctx: FrameContext<'f>,
    records: Vec<LevelRecord>,
    work: Vec<PendingLevel>,
    next_ordinal: u32,
    stats: FrameStats,
}

impl<'f, D: GpuDispatch + ?Sized> RecursionDriver<'f, D> {
    pub fn new(dispatch: &'f mut D, pool: &'f mut RenderTargetPool, ctx: FrameContext<'f>) -> Self {
        Self {
            dispatch,
            pool,
            ctx,
            records: Vec::new(),
            work: Vec::new(),
            next_ordinal: 1,
            stats: FrameStats::default(),
        }
    }

    /// Renders primary visibility and the full level tree into the HDR
    /// composite.
    ///
    /// On error, sets still held by the walk stay active; the caller reclaims
    /// them.
    pub fn run(mut self, export: Option<ViewExport>) -> Result<FrameStats> {
        let (width, height) = (self.ctx.width, self.ctx.height);
        let root_set = self.pool.acquire(
            &mut *self.dispatch,
            SetLayout::Transmissive,
            width,
            height,
            LevelTag::ROOT,
        )?;
        let root = LevelView::root(root_set.targets);
        self.render_root(&root, export)?;
        self.records.push(LevelRecord {
            view: root,
            set: root_set.set,
            parent: None,
            pending_children: 0,
        });

        self.queue_children(0)?;
        while let Some(pending) = self.work.pop() {
            self.render_branch(pending)?;
        }

        self.pool.release(root_set.set, LevelTag::ROOT);
        self.stats.peak_active_sets = self.pool.peak_active();
        log::debug!("Frame recursion finished: {:?}", self.stats);
        Ok(self.stats)
    }

    fn render_root(&mut self, root: &LevelView, export: Option<ViewExport>) -> Result<()> {
        let ctx = self.ctx;
        let dispatch = &mut *self.dispatch;
        ray_gen::generate_primary(dispatch, &ctx, root)?;
        trace::trace_level(dispatch, &ctx, root, TraceVariant::Primary)?;
        contribution::seed(dispatch, &ctx, root)?;

        let shadow_export = export
            .filter(|e| e.view == ActiveView::PrimaryShadow)
            .map(|e| e.target);
        shading::shade_level(dispatch, &ctx, root, ctx.hdr.into(), shadow_export)?;

        if let Some(export) = export {
            tone_mapping::export_primary(dispatch, root, export.view, export.target)?;
        }
        Ok(())
    }

    fn render_branch(&mut self, pending: PendingLevel) -> Result<()> {
        let ctx = self.ctx;
        let parent = self.records[pending.parent].view;
        let screen = self.records[0].view;
        let tag = LevelTag {
            ordinal: self.next_ordinal,
            depth: pending.depth,
            kind: LevelKind::Branch(pending.kind),
        };
        self.next_ordinal += 1;

        let pooled = self.pool.acquire(
            &mut *self.dispatch,
            SetLayout::for_level(tag.kind),
            ctx.width,
            ctx.height,
            tag,
        )?;
        let level = LevelView::new(tag, pooled.targets, parent.stack);
        log::debug!(
            "Level {} ({:?}, depth {}) from level {} on set {:?}",
            tag.ordinal,
            pending.kind,
            tag.depth,
            parent.tag.ordinal,
            pooled.set
        );

        let dispatch = &mut *self.dispatch;
        ray_gen::generate_secondary(dispatch, &ctx, pending.kind, &parent, &level)?;
        trace::trace_level(dispatch, &ctx, &level, TraceVariant::Secondary)?;
        contribution::compute(dispatch, &ctx, pending.kind, &parent, &level)?;
        shading::shade_level(
            dispatch,
            &ctx,
            &level,
            TargetView::mip(ctx.shading.radiance, 0),
            None,
        )?;
        if ctx.settings.reflection_blur.enabled {
            mipmap::generate_radiance_mips(dispatch, &ctx, tag)?;
            blur::search_hit_distance(dispatch, &ctx, &level, &screen)?;
        }
        combine::combine_level(dispatch, &ctx, &level, &parent, &screen)?;

        self.stats.levels_rendered += 1;
        self.stats.deepest_level = self.stats.deepest_level.max(tag.depth);

        let index = self.records.len();
        self.records.push(LevelRecord {
            view: level,
            set: pooled.set,
            parent: Some(pending.parent),
            pending_children: 0,
        });
        if self.queue_children(index)? == 0 {
            self.finish(index);
        }
        Ok(())
    }

    /// Queues the enabled children of `index`. Returns how many were queued.
    fn queue_children(&mut self, index: usize) -> Result<u32> {
        let settings = self.ctx.settings;
        let view = self.records[index].view;
        let depth = view.tag.depth;
        if depth >= settings.max_level_count {
            return Ok(0);
        }

        if settings.contribution_epsilon > 0.0 {
            let weight = self
                .dispatch
                .read_max(TargetView::whole(view.targets.contribution), 0);
            if let Some(max) = weight.filter(|max| *max < settings.contribution_epsilon) {
                log::debug!(
                    "Level {} early-out: max weight {max:e} below {:e}",
                    view.tag.ordinal,
                    settings.contribution_epsilon
                );
                self.stats.early_outs += 1;
                return Ok(0);
            }
        }

        let order = match settings.traversal {
            TraversalOrder::ReflectionFirst => [BranchKind::Reflection, BranchKind::Refraction],
            TraversalOrder::RefractionFirst => [BranchKind::Refraction, BranchKind::Reflection],
        };
        let enabled: Vec<BranchKind> = order
            .into_iter()
            .filter(|kind| match kind {
                BranchKind::Reflection => settings.traces_reflections(),
                BranchKind::Refraction => settings.traces_refractions(),
            })
            .collect();

        // Reversed so the preferred branch pops first.
        for kind in enabled.iter().rev() {
            self.work.push(PendingLevel {
                parent: index,
                kind: *kind,
                depth: depth + 1,
            });
        }
        let count = enabled.len() as u32;
        self.records[index].pending_children = count;
        Ok(count)
    }

    /// Returns `index`'s set to the pool and, cascading upwards, every
    /// ancestor whose last child just finished. The root is left alone.
    fn finish(&mut self, index: usize) {
        let mut current = index;
        loop {
            let record = self.records[current];
            let Some(parent) = record.parent else {
                return;
            };
            self.pool.release(record.set, record.view.tag);
            log::debug!("Level {} released set {:?}", record.view.tag.ordinal, record.set);

            let parent_record = &mut self.records[parent];
            parent_record.pending_children -= 1;
            if parent_record.pending_children > 0 || parent_record.parent.is_none() {
                return;
            }
            current = parent;
        }
    }
}
