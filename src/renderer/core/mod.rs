//! Compositor Core
//!
//! Backend-neutral building blocks:
//! - target: pixel formats, target descriptors, views
//! - kernel: the closed kernel set and the once-only kernel registry
//! - uniforms: per-pass constant blocks
//! - binding: pass descriptors and read/write hazard checks
//! - dispatch: the `GpuDispatch` capability every backend implements

pub mod binding;
pub mod dispatch;
pub mod kernel;
pub mod target;
pub mod uniforms;

pub use binding::{PassDesc, ViewList};
pub use dispatch::GpuDispatch;
pub use kernel::{
    BlurPass, BranchKind, CombineVariant, Kernel, KernelRegistry, LevelKind, LevelTag,
    TraceVariant,
};
pub use target::{MipSelect, TargetDesc, TargetFormat, TargetId, TargetView};
pub use uniforms::PassParams;
