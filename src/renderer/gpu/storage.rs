//! Target Storage
//!
//! Every target is one storage buffer of `vec4<f32>` texels holding its whole
//! mip chain back to back, level 0 first. Kernels address views through a
//! [`ViewInfo`] row: which binding the buffer sits in, where the view's base
//! level starts and how it is laid out. Narrow formats are stored widened;
//! kernels quantize on store (see `store` in `common.wgsl`).

use bytemuck::{Pod, Zeroable};

use crate::renderer::core::{MipSelect, TargetDesc, TargetView};

/// Views a single dispatch may address.
pub const MAX_VIEWS: usize = 12;

pub const TEXEL_BYTES: u64 = 16;

pub struct GpuTarget {
    pub desc: TargetDesc,
    pub buffer: wgpu::Buffer,
    /// First texel of each mip level.
    pub mip_offsets: Vec<u32>,
}

impl GpuTarget {
    pub fn new(device: &wgpu::Device, desc: &TargetDesc) -> Self {
        let mut mip_offsets = Vec::with_capacity(desc.mip_levels as usize);
        let mut texels = 0u32;
        for mip in 0..desc.mip_levels {
            mip_offsets.push(texels);
            let (w, h) = desc.mip_extent(mip);
            texels += w * h;
        }

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(desc.label),
            size: u64::from(texels) * TEXEL_BYTES,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Self {
            desc: desc.clone(),
            buffer,
            mip_offsets,
        }
    }

    /// Texel range `[start, end)` a view covers.
    pub fn texel_range(&self, mip: MipSelect) -> (u32, u32) {
        let last = self.desc.mip_levels - 1;
        let (first, end_level) = match mip {
            MipSelect::All => (0, last),
            MipSelect::Level(level) => (level.min(last), level.min(last)),
        };
        let (w, h) = self.desc.mip_extent(end_level);
        (
            self.mip_offsets[first as usize],
            self.mip_offsets[end_level as usize] + w * h,
        )
    }

    pub fn view_info(&self, view: TargetView, binding: u32) -> ViewInfo {
        let base = view.base_mip().min(self.desc.mip_levels - 1);
        let levels = match view.mip {
            MipSelect::All => self.desc.mip_levels,
            MipSelect::Level(_) => 1,
        };
        let (width, height) = self.desc.mip_extent(base);
        ViewInfo {
            binding,
            offset: self.mip_offsets[base as usize],
            width,
            height,
            levels,
            format: self.desc.format.as_u32(),
            _pad: [0; 2],
        }
    }
}

/// Layout of one bound view, as `common.wgsl` reads it.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct ViewInfo {
    /// Storage binding slot (0-based) holding the target's buffer.
    pub binding: u32,
    /// First texel of the view's base level.
    pub offset: u32,
    pub width: u32,
    pub height: u32,
    /// Mip levels reachable from the base level.
    pub levels: u32,
    pub format: u32,
    pub _pad: [u32; 2],
}

/// Per-dispatch binding table. Read views come first, then read-write views.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct DispatchInfo {
    pub read_count: u32,
    pub write_count: u32,
    pub tile: u32,
    pub _pad: u32,
    pub views: [ViewInfo; MAX_VIEWS],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_info_is_row_aligned() {
        assert_eq!(size_of::<ViewInfo>(), 32);
        assert_eq!(size_of::<DispatchInfo>() % 16, 0);
    }
}
