//! Stage Modules
//!
//! One module per compositor stage. Each builds [`PassDesc`](crate::renderer::core::PassDesc)s
//! for its kernels in the binding order its header documents and issues
//! them through [`run_pass`](super::run_pass).

pub mod blur;
pub mod combine;
pub mod contribution;
pub mod mipmap;
pub mod ray_gen;
pub mod shading;
pub mod tone_mapping;
pub mod trace;
