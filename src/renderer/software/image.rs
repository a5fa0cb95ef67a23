//! CPU texel storage for the software backend.

use glam::{Vec2, Vec4};

use crate::renderer::core::TargetFormat;

/// One mip level of a software target.
///
/// Texels are always held as `Vec4`; [`Image::store`] applies the format's
/// quantization so reads observe exactly what a GPU target would hold.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Image {
    width: u32,
    height: u32,
    format: Option<TargetFormat>,
    texels: Vec<Vec4>,
}

impl Image {
    #[must_use]
    pub fn new(format: TargetFormat, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            format: Some(format),
            texels: vec![Vec4::ZERO; (width * height) as usize],
        }
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    #[must_use]
    pub fn format(&self) -> Option<TargetFormat> {
        self.format
    }

    #[inline]
    #[must_use]
    pub fn texels(&self) -> &[Vec4] {
        &self.texels
    }

    #[inline]
    fn quantize(&self, value: Vec4) -> Vec4 {
        match self.format {
            Some(format) => format.quantize(value),
            None => value,
        }
    }

    #[inline]
    #[must_use]
    pub fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Texel at `(x, y)`, clamped to the edge.
    #[inline]
    #[must_use]
    pub fn load(&self, x: i32, y: i32) -> Vec4 {
        let x = x.clamp(0, self.width as i32 - 1) as u32;
        let y = y.clamp(0, self.height as i32 - 1) as u32;
        self.texels[self.index(x, y)]
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    #[inline]
    pub fn store(&mut self, x: u32, y: u32, value: Vec4) {
        let i = self.index(x, y);
        self.texels[i] = self.quantize(value);
    }

    /// Writes a full row starting at `(0, y)`.
    pub(crate) fn store_row(&mut self, y: u32, row: &[Vec4]) {
        let start = self.index(0, y);
        let format = self.format;
        for (dst, src) in self.texels[start..start + row.len()].iter_mut().zip(row) {
            *dst = match format {
                Some(format) => format.quantize(*src),
                None => *src,
            };
        }
    }

    pub fn fill(&mut self, value: Vec4) {
        let value = self.quantize(value);
        self.texels.fill(value);
    }

    /// Bilinear sample at normalized `uv`, clamped to the edge.
    #[must_use]
    pub fn sample(&self, uv: Vec2) -> Vec4 {
        let p = uv * Vec2::new(self.width as f32, self.height as f32) - Vec2::splat(0.5);
        let base = p.floor();
        let f = p - base;
        let (x, y) = (base.x as i32, base.y as i32);
        let top = self.load(x, y).lerp(self.load(x + 1, y), f.x);
        let bottom = self.load(x, y + 1).lerp(self.load(x + 1, y + 1), f.x);
        top.lerp(bottom, f.y)
    }

    /// Mean of every texel.
    #[must_use]
    pub fn mean(&self) -> Vec4 {
        if self.texels.is_empty() {
            return Vec4::ZERO;
        }
        self.texels.iter().copied().sum::<Vec4>() / self.texels.len() as f32
    }
}

/// Trilinear sample across a mip chain.
#[must_use]
pub fn sample_lod(chain: &[Image], uv: Vec2, lod: f32) -> Vec4 {
    let Some(last) = chain.len().checked_sub(1) else {
        return Vec4::ZERO;
    };
    let lod = lod.clamp(0.0, last as f32);
    let lo = lod.floor() as usize;
    let hi = (lo + 1).min(last);
    let t = lod - lo as f32;
    let a = chain[lo].sample(uv);
    if t <= 0.0 || hi == lo {
        return a;
    }
    a.lerp(chain[hi].sample(uv), t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_quantizes_to_format() {
        let mut img = Image::new(TargetFormat::R8Unorm, 2, 1);
        img.store(0, 0, Vec4::new(0.2, 1.0, 1.0, 1.0));
        assert_eq!(img.load(0, 0), Vec4::new(51.0 / 255.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn sample_at_texel_center_is_exact() {
        let mut img = Image::new(TargetFormat::Rgba32Float, 2, 2);
        img.store(1, 0, Vec4::ONE);
        assert_eq!(img.sample(Vec2::new(0.75, 0.25)), Vec4::ONE);
        assert_eq!(img.sample(Vec2::new(0.25, 0.25)), Vec4::ZERO);
    }

    #[test]
    fn loads_clamp_to_edge() {
        let mut img = Image::new(TargetFormat::R32Float, 2, 2);
        img.store(1, 1, Vec4::new(5.0, 0.0, 0.0, 0.0));
        assert_eq!(img.load(7, 9).x, 5.0);
    }
}
