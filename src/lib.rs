#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

//! # Prism
//!
//! A recursive multi-bounce compositor: primary visibility is traced and shaded
//! into an HDR image, then a bounded tree of reflection and refraction levels is
//! walked, each level traced, weighted and merged back into the composite.
//!
//! All GPU work goes through the [`GpuDispatch`](renderer::core::GpuDispatch)
//! capability. Two implementations ship with the crate:
//!
//! - [`SoftwareDispatch`](renderer::software::SoftwareDispatch): CPU reference
//!   kernels, always available, used by the test-suite.
//! - `WgpuDispatch` (feature `gpu`): WGSL compute kernels on a wgpu device.
//!
//! ```rust,ignore
//! use prism::prelude::*;
//!
//! let config = RendererConfig { width: 320, height: 180, ..Default::default() };
//! let mut renderer = Renderer::new(SoftwareDispatch::new(), config)?;
//! let scene = prism::scene::presets::mirror_sphere_over_floor();
//! let output = renderer.render(&scene.camera, &scene.actors, &scene.lights, &FrameSettings::default())?;
//! ```

pub mod errors;
pub mod renderer;
pub mod resources;
pub mod scene;

pub use errors::{RenderError, Result};
pub use renderer::{FrameOutput, Renderer};

/// Commonly used types.
pub mod prelude {
    pub use crate::errors::{RenderError, Result};
    pub use crate::renderer::core::{GpuDispatch, TargetFormat, TargetId};
    #[cfg(feature = "gpu")]
    pub use crate::renderer::gpu::WgpuDispatch;
    pub use crate::renderer::settings::{
        ActiveView, Branches, FrameSettings, RendererConfig, ToneMappingMode, TraversalOrder,
    };
    pub use crate::renderer::software::SoftwareDispatch;
    pub use crate::renderer::{FrameOutput, Renderer};
    pub use crate::resources::{Material, Mesh, Texture, TextureSlot};
    pub use crate::scene::{Actor, Camera, Light, LightKind, Model};
}
