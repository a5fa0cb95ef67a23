//! wgpu Backend
//!
//! [`WgpuDispatch`] implements [`GpuDispatch`] with WGSL compute kernels.
//! Dispatches are recorded into one command encoder and submitted on
//! [`GpuDispatch::submit`] or before a read-back.
//!
//! Tracing is analytic on this backend: actors whose mesh has no
//! [`AnalyticShape`](crate::resources::AnalyticShape) are skipped, and
//! material textures are not sampled (slot multipliers only).

mod context;
mod kernels;
mod storage;

use std::path::PathBuf;

use slotmap::SlotMap;
use smallvec::SmallVec;
use wgpu::util::DeviceExt;

pub use context::{GpuContext, GpuContextOptions};

use self::kernels::{DISPATCH_BINDING, FIRST_STORAGE_BINDING, KernelCache, PARAMS_BINDING};
use self::storage::{DispatchInfo, GpuTarget, MAX_VIEWS, TEXEL_BYTES, ViewInfo};
use crate::errors::{RenderError, Result};
use crate::renderer::core::{
    GpuDispatch, Kernel, PassDesc, PassParams, TargetDesc, TargetId, TargetView, ViewList,
};

pub struct WgpuDispatch {
    ctx: GpuContext,
    targets: SlotMap<TargetId, GpuTarget>,
    kernels: KernelCache,
    bound_reads: ViewList,
    bound_read_writes: ViewList,
    encoder: Option<wgpu::CommandEncoder>,
    /// Bound to storage slots a dispatch leaves unused, one per slot.
    placeholders: Vec<wgpu::Buffer>,
    warned_mesh_actor: bool,
}

impl WgpuDispatch {
    /// Creates a device and a backend compiling kernels from `shader_root`.
    pub fn new(shader_root: impl Into<PathBuf>) -> Result<Self> {
        let ctx = pollster::block_on(GpuContext::new(&GpuContextOptions::default()))?;
        Ok(Self::with_context(ctx, shader_root))
    }

    pub fn with_context(ctx: GpuContext, shader_root: impl Into<PathBuf>) -> Self {
        let kernels = KernelCache::new(&ctx.device, shader_root);
        let placeholders = (0..context::MAX_STORAGE_BINDINGS)
            .map(|_| {
                ctx.device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("Placeholder Storage"),
                    size: TEXEL_BYTES,
                    usage: wgpu::BufferUsages::STORAGE,
                    mapped_at_creation: false,
                })
            })
            .collect();
        Self {
            ctx,
            targets: SlotMap::with_key(),
            kernels,
            bound_reads: ViewList::new(),
            bound_read_writes: ViewList::new(),
            encoder: None,
            placeholders,
            warned_mesh_actor: false,
        }
    }

    #[must_use]
    pub fn context(&self) -> &GpuContext {
        &self.ctx
    }

    fn encoder(&mut self) -> &mut wgpu::CommandEncoder {
        let device = &self.ctx.device;
        self.encoder.get_or_insert_with(|| {
            device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Compositor Encoder"),
            })
        })
    }

    fn flush(&mut self) {
        if let Some(encoder) = self.encoder.take() {
            self.ctx.queue.submit(std::iter::once(encoder.finish()));
        }
    }

    fn check_views(&self, views: &[TargetView]) -> Result<()> {
        if let Some(view) = views.iter().find(|v| !self.targets.contains_key(v.id)) {
            return Err(RenderError::UnknownTarget(format!("{view:?}")));
        }
        Ok(())
    }

    /// Copies the texels of `view` back to the host.
    pub fn read_texels(&mut self, view: TargetView) -> Result<Vec<[f32; 4]>> {
        self.flush();
        let target = self
            .targets
            .get(view.id)
            .ok_or_else(|| RenderError::UnknownTarget(format!("{view:?}")))?;
        let (start, end) = target.texel_range(view.mip);
        let size = u64::from(end - start) * TEXEL_BYTES;

        let staging = self.ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Staging"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Readback Encoder"),
            });
        encoder.copy_buffer_to_buffer(
            &target.buffer,
            u64::from(start) * TEXEL_BYTES,
            &staging,
            0,
            size,
        );
        self.ctx.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.ctx.wait_idle()?;
        rx.recv()
            .map_err(|e| RenderError::ReadbackFailed(e.to_string()))?
            .map_err(|e| RenderError::ReadbackFailed(e.to_string()))?;

        let texels = {
            let mapped = slice.get_mapped_range();
            bytemuck::pod_collect_to_vec::<u8, [f32; 4]>(&mapped)
        };
        staging.unmap();
        Ok(texels)
    }

    /// Builds the binding table of one dispatch. Each distinct buffer is
    /// bound once, however many views address it.
    fn binding_table(&self) -> Result<(DispatchInfo, SmallVec<[TargetId; MAX_VIEWS]>)> {
        let views = self.bound_reads.iter().chain(&self.bound_read_writes);
        let mut buffers: SmallVec<[TargetId; MAX_VIEWS]> = SmallVec::new();
        let mut info = DispatchInfo {
            read_count: self.bound_reads.len() as u32,
            write_count: self.bound_read_writes.len() as u32,
            tile: 0,
            _pad: 0,
            views: [ViewInfo::default(); MAX_VIEWS],
        };

        for (slot, view) in views.enumerate() {
            if slot >= MAX_VIEWS {
                return Err(RenderError::BindingMismatch {
                    kernel: "dispatch",
                    role: "bound",
                    expected: MAX_VIEWS,
                    found: slot + 1,
                });
            }
            let target = self
                .targets
                .get(view.id)
                .ok_or_else(|| RenderError::UnknownTarget(format!("{view:?}")))?;
            let binding = match buffers.iter().position(|id| *id == view.id) {
                Some(index) => index,
                None => {
                    buffers.push(view.id);
                    buffers.len() - 1
                }
            };
            info.views[slot] = target.view_info(*view, binding as u32);
        }
        Ok((info, buffers))
    }
}

impl GpuDispatch for WgpuDispatch {
    fn backend_name(&self) -> &'static str {
        "wgpu"
    }

    fn create_target(&mut self, desc: &TargetDesc) -> Result<TargetId> {
        if desc.width == 0 || desc.height == 0 {
            return Err(RenderError::TargetCreateFailed {
                label: desc.label,
                reason: format!("zero extent {}x{}", desc.width, desc.height),
            });
        }
        let target = GpuTarget::new(&self.ctx.device, desc);
        Ok(self.targets.insert(target))
    }

    fn release_target(&mut self, id: TargetId) {
        if let Some(target) = self.targets.remove(id) {
            target.buffer.destroy();
        }
    }

    fn target_desc(&self, id: TargetId) -> Option<&TargetDesc> {
        self.targets.get(id).map(|t| &t.desc)
    }

    fn init_kernel(&mut self, kernel: Kernel) -> Result<()> {
        self.kernels.compile(&self.ctx.device, kernel)
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
        let kernel = pass.kernel;
        let (reads, writes) = kernel.binding_counts();
        for (role, expected, found) in [
            ("read", reads, self.bound_reads.len()),
            ("read-write", writes, self.bound_read_writes.len()),
        ] {
            if found < expected {
                return Err(RenderError::BindingMismatch {
                    kernel: kernel.name(),
                    role,
                    expected,
                    found,
                });
            }
        }
        if let PassParams::Trace { uniforms, actor } = pass.params
            && uniforms.shape_kind == 0
        {
            if !self.warned_mesh_actor {
                log::warn!(
                    "Actor '{}' has no analytic shape; it is invisible to the wgpu backend",
                    actor.name
                );
                self.warned_mesh_actor = true;
            }
            return Ok(());
        }

        let (mut info, buffers) = self.binding_table()?;
        info.tile = kernel.tile_size();

        let device = &self.ctx.device;
        let params = pass.params.bytes();
        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Pass Uniforms"),
            contents: if params.is_empty() { &[0u8; 16] } else { params },
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let info_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Dispatch Info"),
            contents: bytemuck::bytes_of(&info),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let mut entries = vec![
            wgpu::BindGroupEntry {
                binding: PARAMS_BINDING,
                resource: params_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: DISPATCH_BINDING,
                resource: info_buffer.as_entire_binding(),
            },
        ];
        for slot in 0..context::MAX_STORAGE_BINDINGS {
            let buffer = match buffers.get(slot as usize) {
                Some(id) => &self.targets[*id].buffer,
                None => &self.placeholders[slot as usize],
            };
            entries.push(wgpu::BindGroupEntry {
                binding: FIRST_STORAGE_BINDING + slot,
                resource: buffer.as_entire_binding(),
            });
        }
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(kernel.name()),
            layout: &self.kernels.bind_group_layout,
            entries: &entries,
        });

        let pipeline = self.kernels.pipeline(kernel)?.clone();
        let encoder = self.encoder();
        let mut cpass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(kernel.name()),
            timestamp_writes: None,
        });
        cpass.set_pipeline(&pipeline);
        cpass.set_bind_group(0, &bind_group, &[]);
        cpass.dispatch_workgroups(groups[0], groups[1], groups[2]);
        Ok(())
    }

    fn unbind_all(&mut self) {
        self.bound_reads.clear();
        self.bound_read_writes.clear();
    }

    fn read_max(&mut self, view: TargetView, channel: usize) -> Option<f32> {
        let texels = match self.read_texels(view) {
            Ok(texels) => texels,
            Err(err) => {
                log::warn!("read_max failed: {err}");
                return None;
            }
        };
        texels
            .iter()
            .map(|t| t[channel.min(3)])
            .reduce(f32::max)
    }

    fn submit(&mut self) -> Result<()> {
        self.flush();
        Ok(())
    }
}
