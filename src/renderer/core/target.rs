//! Render Targets
//!
//! Backend-neutral description of the 2-D images every pass reads and writes.
//! Backends allocate storage for a [`TargetDesc`] and hand back a [`TargetId`];
//! passes address a target (or one mip level of it) through a [`TargetView`].

use glam::Vec4;
use slotmap::new_key_type;

new_key_type! {
    /// Handle to a backend-owned render target.
    pub struct TargetId;
}

/// Pixel formats used by the compositor.
///
/// | Format | Channels | Role |
/// |--------|----------|------|
/// | `R32Float` | 1 | hit distance, refractive index, blur radius |
/// | `Rg32Float` | 2 | contribution weight + roughness |
/// | `Rgba32Float` | 4 | rays, hit attributes, radiance, HDR composite |
/// | `R8Unorm` | 1 | shadow mask |
/// | `Rgba8Unorm` | 4 | tone-mapped output |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetFormat {
    R32Float,
    Rg32Float,
    Rgba32Float,
    R8Unorm,
    Rgba8Unorm,
}

impl TargetFormat {
    #[inline]
    #[must_use]
    pub fn channels(self) -> usize {
        match self {
            Self::R32Float | Self::R8Unorm => 1,
            Self::Rg32Float => 2,
            Self::Rgba32Float | Self::Rgba8Unorm => 4,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_normalized(self) -> bool {
        matches!(self, Self::R8Unorm | Self::Rgba8Unorm)
    }

    /// Value a texel of this format actually stores when `value` is written:
    /// unused channels are zeroed, byte formats are clamped and rounded to
    /// 1/255 steps.
    #[must_use]
    pub fn quantize(self, value: Vec4) -> Vec4 {
        let mut v = match self.channels() {
            1 => Vec4::new(value.x, 0.0, 0.0, 0.0),
            2 => Vec4::new(value.x, value.y, 0.0, 0.0),
            _ => value,
        };
        if self.is_normalized() {
            v = (v.clamp(Vec4::ZERO, Vec4::ONE) * 255.0).round() / 255.0;
        }
        v
    }

    /// Stable code handed to kernels that branch on format.
    #[must_use]
    pub fn as_u32(self) -> u32 {
        match self {
            Self::R32Float => 0,
            Self::Rg32Float => 1,
            Self::Rgba32Float => 2,
            Self::R8Unorm => 3,
            Self::Rgba8Unorm => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetDesc {
    pub label: &'static str,
    pub format: TargetFormat,
    pub width: u32,
    pub height: u32,
    pub mip_levels: u32,
}

impl TargetDesc {
    #[must_use]
    pub fn new(label: &'static str, format: TargetFormat, width: u32, height: u32) -> Self {
        Self {
            label,
            format,
            width,
            height,
            mip_levels: 1,
        }
    }

    #[must_use]
    pub fn with_mips(mut self, mip_levels: u32) -> Self {
        self.mip_levels = mip_levels.max(1);
        self
    }

    /// Extent of mip level `mip`, never smaller than 1×1.
    #[inline]
    #[must_use]
    pub fn mip_extent(&self, mip: u32) -> (u32, u32) {
        ((self.width >> mip).max(1), (self.height >> mip).max(1))
    }
}

/// Subresource selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MipSelect {
    /// Every mip level (sampled chains, single-level targets).
    All,
    Level(u32),
}

/// A target, or one mip level of it, as bound to a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetView {
    pub id: TargetId,
    pub mip: MipSelect,
}

impl TargetView {
    #[inline]
    #[must_use]
    pub fn whole(id: TargetId) -> Self {
        Self {
            id,
            mip: MipSelect::All,
        }
    }

    #[inline]
    #[must_use]
    pub fn mip(id: TargetId, level: u32) -> Self {
        Self {
            id,
            mip: MipSelect::Level(level),
        }
    }

    /// Whether two views touch a common subresource.
    #[must_use]
    pub fn overlaps(&self, other: &TargetView) -> bool {
        if self.id != other.id {
            return false;
        }
        match (self.mip, other.mip) {
            (MipSelect::Level(a), MipSelect::Level(b)) => a == b,
            _ => true,
        }
    }

    /// First mip level the view covers.
    #[inline]
    #[must_use]
    pub fn base_mip(&self) -> u32 {
        match self.mip {
            MipSelect::All => 0,
            MipSelect::Level(level) => level,
        }
    }
}

impl From<TargetId> for TargetView {
    fn from(id: TargetId) -> Self {
        Self::whole(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn byte_formats_quantize() {
        let v = TargetFormat::R8Unorm.quantize(Vec4::new(0.5, 0.7, 0.0, 1.0));
        assert_eq!(v, Vec4::new(128.0 / 255.0, 0.0, 0.0, 0.0));
        let v = TargetFormat::Rgba8Unorm.quantize(Vec4::new(-1.0, 2.0, 0.0, 1.0));
        assert_eq!(v, Vec4::new(0.0, 1.0, 0.0, 1.0));
    }

    #[test]
    fn float2_drops_upper_channels() {
        let v = TargetFormat::Rg32Float.quantize(Vec4::new(0.25, 0.5, 3.0, 4.0));
        assert_eq!(v, Vec4::new(0.25, 0.5, 0.0, 0.0));
    }

    #[test]
    fn view_overlap_respects_mips() {
        let mut ids: SlotMap<TargetId, ()> = SlotMap::with_key();
        let a = ids.insert(());
        let b = ids.insert(());
        assert!(TargetView::whole(a).overlaps(&TargetView::mip(a, 2)));
        assert!(!TargetView::mip(a, 1).overlaps(&TargetView::mip(a, 2)));
        assert!(!TargetView::whole(a).overlaps(&TargetView::whole(b)));
    }

    #[test]
    fn mip_extent_never_collapses() {
        let desc = TargetDesc::new("t", TargetFormat::R32Float, 5, 3).with_mips(4);
        assert_eq!(desc.mip_extent(0), (5, 3));
        assert_eq!(desc.mip_extent(1), (2, 1));
        assert_eq!(desc.mip_extent(3), (1, 1));
    }
}
