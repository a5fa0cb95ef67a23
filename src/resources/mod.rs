//! Scene Resources
//!
//! Data owned by the asset side of the application and consumed read-only by
//! the compositor: intersectable meshes, textures and materials.

pub mod material;
pub mod mesh;
pub mod primitives;
pub mod texture;

pub use material::{Material, SurfaceSample, TextureSlot};
pub use mesh::{Aabb, AnalyticShape, Mesh, MeshHit, Ray};
pub use primitives::*;
pub use texture::{FilterMode, Texture};
