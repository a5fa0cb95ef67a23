//! Software Backend
//!
//! [`SoftwareDispatch`] implements [`GpuDispatch`] on the CPU. Every target is
//! a chain of [`Image`]s, every kernel a rayon-parallel per-pixel function in
//! [`kernels`]. It is the reference the WGSL kernels are checked against and
//! the backend every test runs on.
//!
//! Besides executing passes it keeps a dispatch history and can capture the
//! outputs of selected kernels, so tests can observe intermediate results
//! (per-actor hit buffers, per-level radiance) that never leave a real GPU.

pub mod image;
mod kernels;

use glam::{UVec2, Vec4};
use rustc_hash::FxHashSet;
use slotmap::SlotMap;

use self::image::Image;
use self::kernels::KernelArgs;
use crate::errors::{RenderError, Result};
use crate::renderer::core::{
    GpuDispatch, Kernel, KernelRegistry, LevelTag, MipSelect, PassDesc, TargetDesc, TargetId,
    TargetView, ViewList,
};

#[derive(Debug)]
struct SoftwareTarget {
    desc: TargetDesc,
    mips: Vec<Image>,
}

/// One executed pass.
#[derive(Debug, Clone)]
pub struct DispatchRecord {
    pub kernel: Kernel,
    pub level: Option<LevelTag>,
    pub reads: ViewList,
    pub read_writes: ViewList,
    pub groups: [u32; 3],
}

/// Outputs of one captured pass, as they were right after it ran.
#[derive(Debug, Clone)]
pub struct Capture {
    pub kernel: Kernel,
    pub level: Option<LevelTag>,
    pub outputs: Vec<Image>,
}

#[derive(Debug)]
pub struct SoftwareDispatch {
    targets: SlotMap<TargetId, SoftwareTarget>,
    kernels: KernelRegistry,
    bound_reads: ViewList,
    bound_read_writes: ViewList,
    record_history: bool,
    history: Vec<DispatchRecord>,
    captured_kernels: FxHashSet<Kernel>,
    captures: Vec<Capture>,
}

impl Default for SoftwareDispatch {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftwareDispatch {
    #[must_use]
    pub fn new() -> Self {
        log::info!(
            "Software dispatch created ({} worker threads)",
            rayon::current_num_threads()
        );
        Self {
            targets: SlotMap::with_key(),
            kernels: KernelRegistry::new(),
            bound_reads: ViewList::new(),
            bound_read_writes: ViewList::new(),
            record_history: true,
            history: Vec::new(),
            captured_kernels: FxHashSet::default(),
            captures: Vec::new(),
        }
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// Base level of a target.
    #[must_use]
    pub fn image(&self, id: TargetId) -> Option<&Image> {
        self.mip_image(id, 0)
    }

    #[must_use]
    pub fn mip_image(&self, id: TargetId, mip: u32) -> Option<&Image> {
        self.targets.get(id)?.mips.get(mip as usize)
    }

    /// Texel of a target's base level.
    #[must_use]
    pub fn texel(&self, id: TargetId, x: u32, y: u32) -> Option<Vec4> {
        let image = self.image(id)?;
        (x < image.width() && y < image.height()).then(|| image.load(x as i32, y as i32))
    }

    /// Overwrites one mip level of a target with `texels` in row order,
    /// quantized to the target's format.
    pub fn upload(&mut self, id: TargetId, mip: u32, texels: &[Vec4]) -> Result<()> {
        let image = self
            .targets
            .get_mut(id)
            .and_then(|target| target.mips.get_mut(mip as usize))
            .ok_or_else(|| RenderError::UnknownTarget(format!("{id:?} mip {mip}")))?;
        let expected = image.texels().len();
        if texels.len() != expected {
            return Err(RenderError::UploadSizeMismatch {
                target: format!("{id:?} mip {mip}"),
                expected,
                found: texels.len(),
            });
        }
        let width = image.width() as usize;
        for (y, row) in texels.chunks(width).enumerate() {
            image.store_row(y as u32, row);
        }
        Ok(())
    }

    #[must_use]
    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    #[must_use]
    pub fn kernel_count(&self) -> usize {
        self.kernels.len()
    }

    pub fn set_record_history(&mut self, enabled: bool) {
        self.record_history = enabled;
    }

    #[must_use]
    pub fn history(&self) -> &[DispatchRecord] {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Starts capturing the outputs of every later dispatch of `kernel`.
    pub fn capture(&mut self, kernel: Kernel) {
        self.captured_kernels.insert(kernel);
    }

    #[must_use]
    pub fn captures(&self) -> &[Capture] {
        &self.captures
    }

    pub fn take_captures(&mut self) -> Vec<Capture> {
        std::mem::take(&mut self.captures)
    }

    // ========================================================================
    // Internal
    // ========================================================================

    fn unknown(view: TargetView) -> RenderError {
        RenderError::UnknownTarget(format!("{view:?}"))
    }

    /// Mip chain a read view exposes to a kernel.
    fn read_chain(&self, view: TargetView) -> Result<&[Image]> {
        let target = self.targets.get(view.id).ok_or_else(|| Self::unknown(view))?;
        match view.mip {
            MipSelect::All => Ok(&target.mips),
            MipSelect::Level(level) => target
                .mips
                .get(level as usize..level as usize + 1)
                .ok_or_else(|| Self::unknown(view)),
        }
    }

    fn check_views(&self, views: &[TargetView]) -> Result<()> {
        for view in views {
            let target = self.targets.get(view.id).ok_or_else(|| Self::unknown(*view))?;
            if view.base_mip() as usize >= target.mips.len() {
                return Err(Self::unknown(*view));
            }
        }
        Ok(())
    }
}

impl GpuDispatch for SoftwareDispatch {
    fn backend_name(&self) -> &'static str {
        "software"
    }

    fn create_target(&mut self, desc: &TargetDesc) -> Result<TargetId> {
        if desc.width == 0 || desc.height == 0 {
            return Err(RenderError::TargetCreateFailed {
                label: desc.label,
                reason: format!("zero extent {}x{}", desc.width, desc.height),
            });
        }
        let mips = (0..desc.mip_levels)
            .map(|mip| {
                let (w, h) = desc.mip_extent(mip);
                Image::new(desc.format, w, h)
            })
            .collect();
        Ok(self.targets.insert(SoftwareTarget { desc: desc.clone(), mips }))
    }

    fn release_target(&mut self, id: TargetId) {
        self.targets.remove(id);
    }

    fn target_desc(&self, id: TargetId) -> Option<&TargetDesc> {
        self.targets.get(id).map(|t| &t.desc)
    }

    fn init_kernel(&mut self, kernel: Kernel) -> Result<()> {
        self.kernels.register(kernel)
    }

    fn kernel_ready(&self, kernel: Kernel) -> bool {
        self.kernels.is_ready(kernel)
    }

    fn bind_reads(&mut self, views: &[TargetView]) -> Result<()> {
        self.check_views(views)?;
        self.bound_reads = views.iter().copied().collect();
        Ok(())
    }

    fn bind_read_writes(&mut self, views: &[TargetView]) -> Result<()> {
        self.check_views(views)?;
        self.bound_read_writes = views.iter().copied().collect();
        Ok(())
    }

    fn dispatch(&mut self, pass: &PassDesc<'_>, groups: [u32; 3]) -> Result<()> {
        self.kernels.ensure_ready(pass.kernel)?;
        let write_views = self.bound_read_writes.clone();
        self.check_views(&write_views)?;

        // Outputs leave their targets for the duration of the kernel so the
        // read chains can borrow the remaining storage.
        let mut outputs: Vec<Image> = write_views
            .iter()
            .map(|view| {
                let mip = view.base_mip() as usize;
                std::mem::take(&mut self.targets[view.id].mips[mip])
            })
            .collect();

        let tile = pass.kernel.tile_size();
        let region = UVec2::new(groups[0] * tile, groups[1] * tile);
        let result = self
            .bound_reads
            .iter()
            .map(|view| self.read_chain(*view))
            .collect::<Result<Vec<_>>>()
            .and_then(|reads| {
                let args = KernelArgs {
                    kernel: pass.kernel,
                    reads: &reads,
                    params: &pass.params,
                    region,
                };
                kernels::run(&args, &mut outputs)
            });

        if result.is_ok() && self.captured_kernels.contains(&pass.kernel) {
            self.captures.push(Capture {
                kernel: pass.kernel,
                level: pass.level,
                outputs: outputs.clone(),
            });
        }
        for (view, image) in write_views.iter().zip(outputs) {
            let mip = view.base_mip() as usize;
            self.targets[view.id].mips[mip] = image;
        }

        if self.record_history {
            self.history.push(DispatchRecord {
                kernel: pass.kernel,
                level: pass.level,
                reads: self.bound_reads.clone(),
                read_writes: write_views,
                groups,
            });
        }
        result
    }

    fn unbind_all(&mut self) {
        self.bound_reads.clear();
        self.bound_read_writes.clear();
    }

    fn read_max(&mut self, view: TargetView, channel: usize) -> Option<f32> {
        let image = self.mip_image(view.id, view.base_mip())?;
        let channel = channel.min(3);
        image
            .texels()
            .iter()
            .map(|texel| texel[channel])
            .reduce(f32::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::core::{PassParams, TargetFormat};
    use crate::renderer::core::uniforms::CopyUniforms;
    use crate::renderer::graph::run_pass;

    fn target(dispatch: &mut SoftwareDispatch, format: TargetFormat) -> TargetId {
        dispatch
            .create_target(&TargetDesc::new("test", format, 4, 4))
            .unwrap()
    }

    #[test]
    fn kernels_initialize_once() {
        let mut dispatch = SoftwareDispatch::new();
        dispatch.init_kernel(Kernel::ClearShadow).unwrap();
        let err = dispatch.init_kernel(Kernel::ClearShadow).unwrap_err();
        assert!(matches!(err, RenderError::KernelAlreadyInitialized(_)));
    }

    #[test]
    fn uninitialized_kernel_is_rejected() {
        let mut dispatch = SoftwareDispatch::new();
        let shadow = target(&mut dispatch, TargetFormat::R8Unorm);
        let err = run_pass(&mut dispatch, &PassDesc::new(Kernel::ClearShadow).write(shadow))
            .unwrap_err();
        assert!(matches!(err, RenderError::KernelNotInitialized(_)));
        assert!(dispatch.history().is_empty());
    }

    #[test]
    fn copy_view_routes_channels() {
        let mut dispatch = SoftwareDispatch::new();
        dispatch.init_kernel(Kernel::ClearShadow).unwrap();
        dispatch.init_kernel(Kernel::CopyView).unwrap();
        let shadow = target(&mut dispatch, TargetFormat::R8Unorm);
        let out = target(&mut dispatch, TargetFormat::Rgba32Float);

        run_pass(&mut dispatch, &PassDesc::new(Kernel::ClearShadow).write(shadow)).unwrap();
        let copy = PassDesc::new(Kernel::CopyView)
            .read(shadow)
            .write(out)
            .params(PassParams::Copy(CopyUniforms {
                swizzle: [1, 0, 0, 0],
            }));
        run_pass(&mut dispatch, &copy).unwrap();

        assert_eq!(dispatch.texel(out, 3, 3), Some(Vec4::new(0.0, 1.0, 1.0, 1.0)));
        assert_eq!(dispatch.history().len(), 2);
        assert_eq!(dispatch.read_max(TargetView::whole(out), 0), Some(0.0));
    }

    #[test]
    fn mismatched_params_fail_without_losing_outputs() {
        let mut dispatch = SoftwareDispatch::new();
        dispatch.init_kernel(Kernel::ToneMap).unwrap();
        let hdr = target(&mut dispatch, TargetFormat::Rgba32Float);
        let ldr = target(&mut dispatch, TargetFormat::Rgba8Unorm);

        let err = run_pass(&mut dispatch, &PassDesc::new(Kernel::ToneMap).read(hdr).write(ldr))
            .unwrap_err();
        assert!(matches!(err, RenderError::ParamsMismatch(_)));
        assert_eq!(dispatch.image(ldr).map(Image::width), Some(4));
    }

    #[test]
    fn upload_quantizes_and_checks_extent() {
        let mut dispatch = SoftwareDispatch::new();
        let mask = target(&mut dispatch, TargetFormat::R8Unorm);
        let mut texels = vec![Vec4::ZERO; 16];
        texels[6] = Vec4::new(0.2, 1.0, 1.0, 1.0);
        dispatch.upload(mask, 0, &texels).unwrap();
        assert_eq!(dispatch.texel(mask, 2, 1), Some(Vec4::new(51.0 / 255.0, 0.0, 0.0, 0.0)));

        let err = dispatch.upload(mask, 0, &texels[..15]).unwrap_err();
        assert!(matches!(err, RenderError::UploadSizeMismatch { expected: 16, found: 15, .. }));
        assert!(matches!(
            dispatch.upload(mask, 1, &texels).unwrap_err(),
            RenderError::UnknownTarget(_)
        ));
    }
}
