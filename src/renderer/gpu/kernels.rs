//! Kernel Pipelines
//!
//! Compiles each [`Kernel`] from `<shader_root>/<PassName>/<kernel>.wgsl`,
//! prefixed with `<shader_root>/common.wgsl`. All kernels share one bind
//! group layout:
//!
//! | Binding | Resource |
//! |---------|----------|
//! | 0 | pass uniforms |
//! | 1 | [`DispatchInfo`](super::storage::DispatchInfo) |
//! | 2..12 | storage buffers `t0`..`t9`, read-write |
//!
//! so the backend never has to know which kernel reads what.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use super::context::MAX_STORAGE_BINDINGS;
use crate::errors::{RenderError, Result};
use crate::renderer::core::{Kernel, KernelRegistry};

pub const PARAMS_BINDING: u32 = 0;
pub const DISPATCH_BINDING: u32 = 1;
pub const FIRST_STORAGE_BINDING: u32 = 2;

pub struct KernelCache {
    shader_root: PathBuf,
    common_source: Option<String>,
    pub bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    pipelines: FxHashMap<Kernel, wgpu::ComputePipeline>,
    registry: KernelRegistry,
}

impl KernelCache {
    pub fn new(device: &wgpu::Device, shader_root: impl Into<PathBuf>) -> Self {
        let uniform = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let mut entries = vec![uniform(PARAMS_BINDING), uniform(DISPATCH_BINDING)];
        entries.extend((0..MAX_STORAGE_BINDINGS).map(|i| wgpu::BindGroupLayoutEntry {
            binding: FIRST_STORAGE_BINDING + i,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: false },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }));

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Kernel Layout"),
            entries: &entries,
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Kernel Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        Self {
            shader_root: shader_root.into(),
            common_source: None,
            bind_group_layout,
            pipeline_layout,
            pipelines: FxHashMap::default(),
            registry: KernelRegistry::new(),
        }
    }

    fn read_source(kernel: Kernel, path: &Path) -> Result<String> {
        std::fs::read_to_string(path).map_err(|source| RenderError::KernelLoadFailed {
            kernel: kernel.name(),
            path: path.to_path_buf(),
            source,
        })
    }

    /// Conventional source location of `kernel`.
    #[must_use]
    pub fn source_path(&self, kernel: Kernel) -> PathBuf {
        self.shader_root
            .join(kernel.pass_name())
            .join(format!("{}.wgsl", kernel.name()))
    }

    pub fn compile(&mut self, device: &wgpu::Device, kernel: Kernel) -> Result<()> {
        if self.registry.is_ready(kernel) {
            return Err(RenderError::KernelAlreadyInitialized(kernel.name()));
        }
        if self.common_source.is_none() {
            let common = Self::read_source(kernel, &self.shader_root.join("common.wgsl"))?;
            self.common_source = Some(common);
        }
        let body = Self::read_source(kernel, &self.source_path(kernel))?;
        let source = format!("{}\n{body}", self.common_source.as_deref().unwrap_or_default());

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(kernel.name()),
            source: wgpu::ShaderSource::Wgsl(Cow::Owned(source)),
        });
        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(kernel.name()),
            layout: Some(&self.pipeline_layout),
            module: &module,
            entry_point: Some("main"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            cache: None,
        });

        self.registry.register(kernel)?;
        self.pipelines.insert(kernel, pipeline);
        Ok(())
    }

    #[inline]
    pub fn is_ready(&self, kernel: Kernel) -> bool {
        self.registry.is_ready(kernel)
    }

    pub fn pipeline(&self, kernel: Kernel) -> Result<&wgpu::ComputePipeline> {
        self.pipelines
            .get(&kernel)
            .ok_or(RenderError::KernelNotInitialized(kernel.name()))
    }
}
