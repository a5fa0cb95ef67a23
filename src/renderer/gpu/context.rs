//! wgpu Context
//!
//! The [`GpuContext`] holds the headless device and queue the compute
//! backend records into. No surface is involved: results are read back or
//! copied out by the caller.

use crate::errors::{RenderError, Result};

/// Storage buffers a kernel may bind at once.
pub const MAX_STORAGE_BINDINGS: u32 = 10;

/// Adapter preferences for [`GpuContext::new`].
#[derive(Debug, Clone)]
pub struct GpuContextOptions {
    pub power_preference: wgpu::PowerPreference,
    /// Use a software adapter if the platform offers one.
    pub force_fallback_adapter: bool,
}

impl Default for GpuContextOptions {
    fn default() -> Self {
        Self {
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
        }
    }
}

pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_info: wgpu::AdapterInfo,
}

impl GpuContext {
    pub async fn new(options: &GpuContextOptions) -> Result<Self> {
        let instance = wgpu::Instance::default();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: options.power_preference,
                compatible_surface: None,
                force_fallback_adapter: options.force_fallback_adapter,
            })
            .await
            .map_err(|e| RenderError::AdapterRequestFailed(e.to_string()))?;

        let supported = adapter.limits();
        if supported.max_storage_buffers_per_shader_stage < MAX_STORAGE_BINDINGS {
            return Err(RenderError::AdapterRequestFailed(format!(
                "adapter supports {} storage buffers per stage, {MAX_STORAGE_BINDINGS} required",
                supported.max_storage_buffers_per_shader_stage
            )));
        }
        let required_limits = wgpu::Limits {
            max_storage_buffers_per_shader_stage: MAX_STORAGE_BINDINGS,
            max_storage_buffer_binding_size: supported.max_storage_buffer_binding_size,
            max_buffer_size: supported.max_buffer_size,
            ..wgpu::Limits::default()
        };

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("prism compute device"),
                required_features: wgpu::Features::empty(),
                required_limits,
                memory_hints: wgpu::MemoryHints::Performance,
                ..Default::default()
            })
            .await?;

        let adapter_info = adapter.get_info();
        log::info!(
            "GPU adapter: {} ({:?}, {:?})",
            adapter_info.name,
            adapter_info.device_type,
            adapter_info.backend
        );
        Ok(Self {
            device,
            queue,
            adapter_info,
        })
    }

    /// Blocks until every submitted command buffer has finished.
    pub fn wait_idle(&self) -> Result<()> {
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map(|_| ())
            .map_err(|e| RenderError::ReadbackFailed(e.to_string()))
    }
}
