//! CPU-side material textures.
//!
//! Textures are owned by the asset side of the application and handed to the
//! compositor read-only. Sampling wraps (repeat) in both directions.

use glam::{Vec2, Vec4};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    Nearest,
    #[default]
    Linear,
}

#[derive(Debug, Clone)]
pub struct Texture {
    width: u32,
    height: u32,
    texels: Vec<Vec4>,
    pub filter: FilterMode,
}

impl Texture {
    /// Creates a texture from row-major texels.
    ///
    /// # Panics
    ///
    /// Panics if `texels.len() != width * height` or either dimension is zero.
    #[must_use]
    pub fn new(width: u32, height: u32, texels: Vec<Vec4>) -> Self {
        assert!(width > 0 && height > 0, "Texture dimensions must be non-zero");
        assert_eq!(
            texels.len(),
            (width * height) as usize,
            "Texel count does not match dimensions"
        );
        Self {
            width,
            height,
            texels,
            filter: FilterMode::default(),
        }
    }

    #[must_use]
    pub fn solid(value: Vec4) -> Self {
        Self::new(1, 1, vec![value])
    }

    #[must_use]
    pub fn from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> Vec4) -> Self {
        let texels = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| f(x, y))
            .collect();
        Self::new(width, height, texels)
    }

    /// Checkerboard with `tiles × tiles` cells, nearest-filtered.
    #[must_use]
    pub fn checker(tiles: u32, a: Vec4, b: Vec4) -> Self {
        let tiles = tiles.max(1);
        let mut texture = Self::from_fn(tiles, tiles, |x, y| if (x + y) % 2 == 0 { a } else { b });
        texture.filter = FilterMode::Nearest;
        texture
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
    fn texel(&self, x: i64, y: i64) -> Vec4 {
        let x = x.rem_euclid(i64::from(self.width)) as usize;
        let y = y.rem_euclid(i64::from(self.height)) as usize;
        self.texels[y * self.width as usize + x]
    }

    #[must_use]
    pub fn sample(&self, uv: Vec2) -> Vec4 {
        let size = Vec2::new(self.width as f32, self.height as f32);
        match self.filter {
            FilterMode::Nearest => {
                let p = (uv * size).floor();
                self.texel(p.x as i64, p.y as i64)
            }
            FilterMode::Linear => {
                let p = uv * size - Vec2::splat(0.5);
                let base = p.floor();
                let f = p - base;
                let (x, y) = (base.x as i64, base.y as i64);
                let top = self.texel(x, y).lerp(self.texel(x + 1, y), f.x);
                let bottom = self.texel(x, y + 1).lerp(self.texel(x + 1, y + 1), f.x);
                top.lerp(bottom, f.y)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solid_texture_is_constant() {
        let t = Texture::solid(Vec4::new(0.2, 0.4, 0.6, 1.0));
        assert_eq!(t.sample(Vec2::new(0.3, 0.9)), Vec4::new(0.2, 0.4, 0.6, 1.0));
    }

    #[test]
    fn checker_wraps() {
        let t = Texture::checker(2, Vec4::ONE, Vec4::ZERO);
        assert_eq!(t.sample(Vec2::new(0.25, 0.25)), Vec4::ONE);
        assert_eq!(t.sample(Vec2::new(0.75, 0.25)), Vec4::ZERO);
        assert_eq!(t.sample(Vec2::new(1.25, 0.25)), Vec4::ONE);
    }
}
